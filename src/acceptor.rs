//! The acceptor state machine: responds to PREPARE and ACCEPT_REQUEST with
//! PROMISE/REJECT/ACCEPTED, and shuts down on LEARN. This module has no
//! knowledge of sockets or threads — `member::CouncilMember` drives it and
//! turns its outcomes into actual sends.

use crate::message::{Message, MessageType};

/// `promisedProposalNumber` and `acceptedProposalNumber` both start at -1
/// so that any non-negative proposal number from a real proposer compares
/// greater.
const UNSET: i64 = -1;

#[derive(Debug)]
pub struct AcceptorState {
    promised_proposal_number: i64,
    accepted_proposal_number: i64,
    accepted_value: Option<String>,
    election_winner: Option<String>,
}

/// What an acceptor does in response to one inbound message.
pub enum AcceptorOutcome {
    /// Send `message` back to the peer id `to`.
    Reply { message: Message, to: String },
    /// A LEARN was received: the acceptor must now shut down.
    Learned { winner: String },
    /// No reply warranted (a stale ACCEPT_REQUEST, or an unexpected type).
    Ignore,
}

impl AcceptorState {
    pub fn new() -> Self {
        AcceptorState {
            promised_proposal_number: UNSET,
            accepted_proposal_number: UNSET,
            accepted_value: None,
            election_winner: None,
        }
    }

    pub fn election_winner(&self) -> Option<&str> {
        self.election_winner.as_deref()
    }

    pub fn handle(&mut self, msg: &Message, self_id: &str) -> AcceptorOutcome {
        match msg.msg_type {
            MessageType::Prepare => self.handle_prepare(msg, self_id),
            MessageType::AcceptRequest => self.handle_accept_request(msg, self_id),
            MessageType::Learn => self.handle_learn(msg),
            MessageType::Promise | MessageType::Reject | MessageType::Accepted => {
                AcceptorOutcome::Ignore
            }
        }
    }

    fn handle_prepare(&mut self, msg: &Message, self_id: &str) -> AcceptorOutcome {
        let n = msg.proposal_number;

        if n > self.promised_proposal_number {
            self.promised_proposal_number = n;

            AcceptorOutcome::Reply {
                message: Message::new(
                    MessageType::Promise,
                    self.accepted_value.clone().unwrap_or_default(),
                    self.accepted_proposal_number,
                    self_id,
                ),
                to: msg.sender_id.clone(),
            }
        } else {
            AcceptorOutcome::Reply {
                message: Message::new(MessageType::Reject, "", self.promised_proposal_number, self_id),
                to: msg.sender_id.clone(),
            }
        }
    }

    fn handle_accept_request(&mut self, msg: &Message, self_id: &str) -> AcceptorOutcome {
        let n = msg.proposal_number;

        // An acceptor that promised exactly N is entitled to have its own
        // ACCEPT_REQUEST at N honored, hence >= rather than >.
        if n >= self.promised_proposal_number {
            self.accepted_proposal_number = n;
            self.accepted_value = Some(msg.value.clone());

            AcceptorOutcome::Reply {
                message: Message::new(
                    MessageType::Accepted,
                    self.accepted_value.clone().unwrap_or_default(),
                    self.accepted_proposal_number,
                    self_id,
                ),
                to: msg.sender_id.clone(),
            }
        } else {
            AcceptorOutcome::Ignore
        }
    }

    fn handle_learn(&mut self, msg: &Message) -> AcceptorOutcome {
        self.election_winner = Some(msg.sender_id.clone());
        AcceptorOutcome::Learned {
            winner: msg.sender_id.clone(),
        }
    }
}
