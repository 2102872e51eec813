//! The proposer state machine: drives PREPARE -> quorum of PROMISE ->
//! ACCEPT_REQUEST -> quorum of ACCEPTED -> LEARN, with REJECT handling
//! back-off and renumbering. Like `acceptor::AcceptorState`, this has no
//! knowledge of sockets; `member::CouncilMember` executes the `ProposerAction`s
//! it returns.

use std::cmp::max;
use std::collections::HashSet;

use crate::message::{Message, MessageType};

/// A side effect the proposer wants its member to perform. Several may be
/// returned from a single `handle()` call (e.g. declaring consensus is a
/// log line, a broadcast, and a shutdown all at once).
pub enum ProposerAction {
    /// Broadcast an ACCEPT_REQUEST to every acceptor peer: quorum of PROMISE
    /// was just reached.
    SendAcceptRequestToAcceptors(Message),
    /// A majority of acceptors rejected this round. Sleep for the back-off
    /// window, then broadcast the already-renumbered PREPARE in `.0` to
    /// every acceptor peer.
    BackOffThenRetry(Message),
    /// Log the externally-contracted "Consensus Achieved" line.
    DeclareConsensus,
    /// Broadcast LEARN to every peer (acceptors and proposers alike).
    BroadcastLearnToAll(Message),
    /// This member should now shut down.
    Shutdown,
}

pub struct ProposerState {
    id: String,
    proposal_number: i64,
    promised_set: HashSet<String>,
    accepted_set: HashSet<String>,
    received_promises_flag: bool,
    num_rejections: usize,
    responsive: bool,
    quorum: usize,
    election_winner: Option<String>,
}

impl ProposerState {
    pub fn new(id: String, quorum: usize, responsive: bool) -> Self {
        ProposerState {
            id,
            proposal_number: 0,
            promised_set: HashSet::new(),
            accepted_set: HashSet::new(),
            received_promises_flag: false,
            num_rejections: 0,
            responsive,
            quorum,
            election_winner: None,
        }
    }

    pub fn is_responsive(&self) -> bool {
        self.responsive
    }

    pub fn proposal_number(&self) -> i64 {
        self.proposal_number
    }

    pub fn election_winner(&self) -> Option<&str> {
        self.election_winner.as_deref()
    }

    /// Starts (or restarts) a round: bumps the proposal number, clears the
    /// per-round bookkeeping, and returns the PREPARE to broadcast.
    pub fn initiate(&mut self) -> Message {
        self.proposal_number += 1;
        self.promised_set.clear();
        self.accepted_set.clear();
        self.received_promises_flag = false;
        self.num_rejections = 0;

        Message::new(MessageType::Prepare, self.id.clone(), self.proposal_number, self.id.clone())
    }

    /// Applies one inbound message, returning the actions this member
    /// should now perform. LEARN is handled even when `responsive` is
    /// false: a silent proposer still stops ignoring long enough to shut
    /// down once the round concludes (it just never progresses its own
    /// candidacy).
    pub fn handle(&mut self, msg: &Message) -> Vec<ProposerAction> {
        if msg.msg_type == MessageType::Learn {
            self.election_winner = Some(msg.sender_id.clone());
            return vec![ProposerAction::Shutdown];
        }

        if !self.responsive {
            return vec![];
        }

        match msg.msg_type {
            MessageType::Promise => self.handle_promise(msg),
            MessageType::Reject => self.handle_reject(msg),
            MessageType::Accepted => self.handle_accepted(msg),
            MessageType::Prepare | MessageType::AcceptRequest | MessageType::Learn => vec![],
        }
    }

    fn handle_promise(&mut self, msg: &Message) -> Vec<ProposerAction> {
        self.promised_set.insert(msg.sender_id.clone());

        if self.received_promises_flag {
            return vec![]; // already broadcast ACCEPT_REQUEST this round
        }

        if self.promised_set.len() >= self.quorum {
            self.received_promises_flag = true;
            let accept_request = Message::new(
                MessageType::AcceptRequest,
                self.id.clone(),
                self.proposal_number,
                self.id.clone(),
            );
            vec![ProposerAction::SendAcceptRequestToAcceptors(accept_request)]
        } else {
            vec![]
        }
    }

    fn handle_reject(&mut self, msg: &Message) -> Vec<ProposerAction> {
        self.num_rejections += 1;
        self.proposal_number = max(self.proposal_number, msg.proposal_number + 1);

        if self.num_rejections >= self.quorum {
            self.num_rejections = 0;
            let retry = self.initiate();
            vec![ProposerAction::BackOffThenRetry(retry)]
        } else {
            vec![]
        }
    }

    fn handle_accepted(&mut self, msg: &Message) -> Vec<ProposerAction> {
        self.accepted_set.insert(msg.sender_id.clone());

        if self.accepted_set.len() >= self.quorum {
            // Cleared so that any ACCEPTED already queued behind this one
            // cannot cross the threshold a second time and re-broadcast
            // LEARN; the member shuts down right after this call anyway.
            self.accepted_set.clear();

            let learn = Message::new(MessageType::Learn, self.id.clone(), self.proposal_number, self.id.clone());
            vec![
                ProposerAction::DeclareConsensus,
                ProposerAction::BroadcastLearnToAll(learn),
                ProposerAction::Shutdown,
            ]
        } else {
            vec![]
        }
    }
}
