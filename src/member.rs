//! The shared council member lifecycle: peer registry, inbound queue,
//! listener thread, and the single dispatch thread that keeps a member's
//! state machine single-threaded (§4.2, §5 of the design doc).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::info;

use crate::acceptor::{AcceptorOutcome, AcceptorState};
use crate::barrier::CompletionBarrier;
use crate::message::Message;
use crate::proposer::{ProposerAction, ProposerState};
use crate::transport::{self, Peer};

/// Capacity of a member's inbound FIFO. Bounded, per §4.2/§5: a producer
/// (an accept-handler thread) blocks on `send` if a member falls behind,
/// rather than memory growing without limit.
const INBOUND_QUEUE_CAPACITY: usize = 256;

/// The back-off a proposer sleeps through after a majority of acceptors
/// reject its round, before renumbering and retrying (§4.4 step 3).
const BACKOFF: Duration = Duration::from_millis(1000);

pub enum Role {
    Proposer(ProposerState),
    Acceptor(AcceptorState),
}

/// A single council member: owns one TCP listener, one inbound queue, and
/// one role-specific state machine. Peers are wired in before `run` is
/// ever called (the orchestrator builds every member first, then links
/// them all, per the forward-reference note in the design doc).
pub struct CouncilMember {
    id: String,
    role: Role,
    peers: Vec<Peer>,
    response_delay_ms: u64,
    completed: Arc<AtomicBool>,
    barrier: Arc<CompletionBarrier>,
    listener: std::net::TcpListener,
    listen_addr: SocketAddr,
    inbound_tx: Sender<Message>,
    inbound_rx: Receiver<Message>,
}

impl CouncilMember {
    pub fn new(
        id: String,
        role: Role,
        listen_addr: SocketAddr,
        response_delay_ms: u64,
        peers: Vec<Peer>,
        barrier: Arc<CompletionBarrier>,
    ) -> std::io::Result<Self> {
        let listener = transport::bind_listener(listen_addr)?;
        let (inbound_tx, inbound_rx) = bounded(INBOUND_QUEUE_CAPACITY);

        Ok(CouncilMember {
            id,
            role,
            peers,
            response_delay_ms,
            completed: Arc::new(AtomicBool::new(false)),
            barrier,
            listener,
            listen_addr,
            inbound_tx,
            inbound_rx,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn acceptors(&self) -> Vec<Peer> {
        self.peers.iter().filter(|p| p.is_acceptor).cloned().collect()
    }

    /// Begins listening and consuming the inbound queue; if this member is
    /// a proposer, also kicks off its initial PREPARE. Blocks until this
    /// member shuts down.
    pub fn run(mut self) {
        let tx = self.inbound_tx.clone();
        let listener_completed = Arc::clone(&self.completed);
        let listener = self
            .listener
            .try_clone()
            .expect("failed to clone listener socket");

        let listen_handle = thread::spawn(move || {
            transport::run_accept_loop(&listener, &listener_completed, move |msg| {
                let _ = tx.send(msg);
            });
        });

        if let Role::Proposer(ref mut proposer) = self.role {
            let prepare = proposer.initiate();
            info!("[{}] initiating round with proposal {}", self.id, proposer.proposal_number());
            transport::broadcast(&prepare, &self.acceptors(), &self.completed);
        }

        self.dispatch_loop();

        // Nudge the listener's blocking accept() so it notices `completed`
        // and exits instead of waiting for a connection that will never come.
        transport::unblock_accept(self.listen_addr);
        let _ = listen_handle.join();
    }

    fn dispatch_loop(&mut self) {
        loop {
            let msg = match self.inbound_rx.recv() {
                Ok(msg) => msg,
                Err(_) => break, // every sender dropped: nothing left to arrive
            };

            let skip_delay = matches!(&self.role, Role::Proposer(p) if !p.is_responsive());
            if !skip_delay && self.response_delay_ms > 0 {
                thread::sleep(Duration::from_millis(self.response_delay_ms));
            }

            if self.dispatch(msg) {
                break;
            }
        }

        self.shutdown();
    }

    /// Applies one message to this member's state machine and carries out
    /// the resulting side effects. Returns `true` once this member should
    /// shut down.
    fn dispatch(&mut self, msg: Message) -> bool {
        match &mut self.role {
            Role::Acceptor(acceptor) => match acceptor.handle(&msg, &self.id) {
                AcceptorOutcome::Reply { message, to } => {
                    if let Some(peer) = self.peers.iter().find(|p| p.id == to) {
                        transport::send(&message, peer, &self.completed);
                    }
                    false
                }
                AcceptorOutcome::Learned { winner } => {
                    info!("[{}] learned winner {}", self.id, winner);
                    true
                }
                AcceptorOutcome::Ignore => false,
            },
            Role::Proposer(proposer) => {
                let mut shutting_down = false;
                for action in proposer.handle(&msg) {
                    match action {
                        ProposerAction::SendAcceptRequestToAcceptors(m) => {
                            info!("[{}] quorum of promises reached, sending ACCEPT_REQUEST", self.id);
                            transport::broadcast(&m, &self.acceptors(), &self.completed);
                        }
                        ProposerAction::BackOffThenRetry(m) => {
                            info!("[{}] rejected by a majority, backing off before retrying as {}", self.id, m.proposal_number);
                            thread::sleep(BACKOFF);
                            if !self.completed.load(Ordering::SeqCst) {
                                transport::broadcast(&m, &self.acceptors(), &self.completed);
                            }
                        }
                        ProposerAction::DeclareConsensus => {
                            info!("[{}] Consensus Achieved", self.id);
                            println!("[{}] Consensus Achieved", self.id);
                        }
                        ProposerAction::BroadcastLearnToAll(m) => {
                            transport::broadcast(&m, &self.peers, &self.completed);
                        }
                        ProposerAction::Shutdown => shutting_down = true,
                    }
                }
                shutting_down
            }
        }
    }

    /// Silences further sends, and decrements the orchestrator's
    /// completion barrier. Idempotent: only the first call has any effect.
    fn shutdown(&self) {
        if self.completed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("[{}] shutting down", self.id);
        self.barrier.decrement();
    }
}
