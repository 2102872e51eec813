//! Point-to-point TCP transport: send, broadcast, and the listener that
//! turns accepted connections into messages on a member's inbound queue.
//!
//! A send opens a fresh connection, writes exactly one framed `Message`,
//! and closes. There is no connection reuse and no cross-message ordering
//! guarantee between two sends from the same member (§5 of the design
//! doc) — each message carries enough of its own context (proposal
//! number, sender id) that the protocol tolerates reordering.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::message::Message;

/// A lightweight handle to another council member: just enough to address
/// it and to know whether it is allowed to receive ACCEPT_REQUEST/PREPARE
/// traffic. This is the "peer record with an `isAcceptor` capability"
/// called for in the design notes — the transport itself contains no
/// role logic, it just addresses bytes at a socket.
#[derive(Debug, Clone)]
pub struct Peer {
    pub id: String,
    pub addr: SocketAddr,
    pub is_acceptor: bool,
}

/// A dropped-and-logged transport failure. Never surfaced past the
/// `send`/`broadcast` call site: Paxos tolerates message loss, so there is
/// nothing for a caller to do with this besides note it happened.
#[derive(Debug)]
enum TransportError {
    Connect(io::Error),
    Write(io::Error),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Connect(e) => write!(f, "connect failed: {}", e),
            TransportError::Write(e) => write!(f, "write failed: {}", e),
        }
    }
}

/// Delivers `msg` to a single `peer` over a fresh TCP connection.
///
/// A no-op once `completed` has been set: after a member has shut down
/// (or observed the round conclude), further sends from it are suppressed
/// rather than attempted.
pub fn send(msg: &Message, peer: &Peer, completed: &AtomicBool) {
    if completed.load(Ordering::SeqCst) {
        return;
    }

    if let Err(e) = try_send(msg, peer.addr) {
        warn!(
            "[{}] send of {:?} to {} ({}) failed: {}",
            msg.sender_id, msg.msg_type, peer.id, peer.addr, e
        );
    } else {
        debug!("[{}] sent {:?} to {}", msg.sender_id, msg.msg_type, peer.id);
    }
}

fn try_send(msg: &Message, addr: SocketAddr) -> Result<(), TransportError> {
    let mut stream = TcpStream::connect_timeout(&addr, Duration::from_millis(500))
        .map_err(TransportError::Connect)?;
    msg.write_framed(&mut stream).map_err(TransportError::Write)
}

/// Delivers `msg` to every peer in `peers`, skipping any peer whose id
/// matches `msg.sender_id` (self-delivery is never wanted: a member never
/// needs to message itself, and the LEARN fan-out relies on this to avoid
/// talking to itself over the network).
pub fn broadcast(msg: &Message, peers: &[Peer], completed: &AtomicBool) {
    for peer in peers {
        if peer.id == msg.sender_id {
            continue;
        }
        send(msg, peer, completed);
    }
}

/// Spawns the listener thread for a member: accepts connections serially,
/// and for each one spawns a short-lived worker that reads exactly one
/// framed message and hands it to `on_message`. Returns the bound
/// `TcpListener` so the orchestrator/member can later nudge it awake to
/// exit its accept loop (see `unblock_accept`).
pub fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    TcpListener::bind(addr)
}

/// Runs the accept loop on `listener` until `completed` is observed. Rust's
/// std `TcpListener` cannot be closed from another thread while a blocking
/// `accept()` is in flight, so shutdown works by having the shutdown path
/// open (and immediately drop) a loopback connection to this listener's
/// own address: that connection unblocks `accept()`, at which point the
/// loop re-checks `completed` and exits instead of spawning a reader for
/// it. This stands in for "closing the listening socket" in the design
/// doc, which has no direct std equivalent.
pub fn run_accept_loop<F>(listener: &TcpListener, completed: &Arc<AtomicBool>, mut on_message: F)
where
    F: FnMut(Message) + Send + Clone + 'static,
{
    loop {
        match listener.accept() {
            Ok((stream, _peer_addr)) => {
                if completed.load(Ordering::SeqCst) {
                    drop(stream);
                    break;
                }

                let mut handler = on_message.clone();
                let completed = Arc::clone(completed);
                std::thread::spawn(move || {
                    if completed.load(Ordering::SeqCst) {
                        return;
                    }
                    match Message::read_framed(&stream) {
                        Ok(msg) => handler(msg),
                        Err(e) => warn!("dropping malformed inbound message: {}", e),
                    }
                });
            }
            Err(e) => {
                warn!("accept failed: {}", e);
                if completed.load(Ordering::SeqCst) {
                    break;
                }
            }
        }
    }
}

/// Unblocks a listener's in-flight `accept()` by connecting to its own
/// address. Connection failures are ignored: if the listener has already
/// stopped accepting there is nothing left to unblock.
pub fn unblock_accept(addr: SocketAddr) {
    let _ = TcpStream::connect_timeout(&addr, Duration::from_millis(200));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageType;
    use std::sync::mpsc;

    #[test]
    fn send_and_accept_round_trip() {
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let completed = Arc::new(AtomicBool::new(false));

        let (tx, rx) = mpsc::channel();
        let completed_clone = Arc::clone(&completed);
        let handle = std::thread::spawn(move || {
            run_accept_loop(&listener, &completed_clone, move |msg| {
                tx.send(msg).unwrap();
            });
        });

        let peer = Peer {
            id: "acceptor".into(),
            addr,
            is_acceptor: true,
        };
        let msg = Message::new(MessageType::Prepare, "M1", 1, "M1");
        send(&msg, &peer, &completed);

        let received = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(received, msg);

        completed.store(true, Ordering::SeqCst);
        unblock_accept(addr);
        handle.join().unwrap();
    }

    #[test]
    fn broadcast_skips_the_sender() {
        let peers = vec![
            Peer {
                id: "M1".into(),
                addr: "127.0.0.1:1".parse().unwrap(),
                is_acceptor: false,
            },
            Peer {
                id: "M2".into(),
                addr: "127.0.0.1:2".parse().unwrap(),
                is_acceptor: true,
            },
        ];
        let completed = AtomicBool::new(true); // force a no-op so the test has no real sockets to hit
        let msg = Message::new(MessageType::Learn, "M1", 1, "M1");
        // With completed=true every send short-circuits; this just exercises
        // that broadcast doesn't panic and does skip peers[0] (same id as sender).
        broadcast(&msg, &peers, &completed);
    }

    #[test]
    fn send_is_a_no_op_once_completed() {
        let completed = AtomicBool::new(true);
        let peer = Peer {
            id: "ghost".into(),
            addr: "127.0.0.1:1".parse().unwrap(),
            is_acceptor: true,
        };
        // Nothing listens on that port; if `send` attempted to connect this
        // would fail loudly rather than silently no-op. It must not try.
        send(&Message::new(MessageType::Prepare, "", 1, "M1"), &peer, &completed);
    }
}
