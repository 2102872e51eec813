//! A single-decree Paxos council election, simulated among a fixed set of
//! members connected over loopback TCP. See `orchestrator::run_council`
//! for the entry point used by the `council` binary.

pub mod acceptor;
pub mod barrier;
pub mod config;
pub mod error;
pub mod member;
pub mod message;
pub mod orchestrator;
pub mod proposer;
pub mod transport;
