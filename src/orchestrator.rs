//! Builds the council from validated member descriptors, wires every
//! member's peer registry, launches each member concurrently, and waits
//! on the shared completion barrier.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::thread;

use log::{info, warn};

use crate::acceptor::AcceptorState;
use crate::barrier::CompletionBarrier;
use crate::config::{MemberDescriptor, Role as ConfigRole};
use crate::member::{CouncilMember, Role as MemberRole};
use crate::proposer::ProposerState;
use crate::transport::Peer;

const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Runs one full council election to completion: builds every member,
/// starts them all, and blocks until every member has shut down.
pub fn run_council(members: Vec<MemberDescriptor>) -> io::Result<()> {
    let quorum = members.len() / 2;
    warn_if_acceptor_majority_is_missing(&members, quorum);

    let peers: Vec<Peer> = members
        .iter()
        .map(|m| Peer {
            id: m.id.clone(),
            addr: SocketAddr::new(LOOPBACK, m.port),
            is_acceptor: m.role == ConfigRole::Acceptor,
        })
        .collect();

    let barrier = Arc::new(CompletionBarrier::new(members.len()));

    let mut council_members = Vec::with_capacity(members.len());
    for descriptor in &members {
        let role = match descriptor.role {
            ConfigRole::Proposer => {
                MemberRole::Proposer(ProposerState::new(descriptor.id.clone(), quorum, !descriptor.is_silent_proposer()))
            }
            ConfigRole::Acceptor => MemberRole::Acceptor(AcceptorState::new()),
        };

        let addr = SocketAddr::new(LOOPBACK, descriptor.port);
        let member = CouncilMember::new(
            descriptor.id.clone(),
            role,
            addr,
            descriptor.response_delay_ms,
            peers.clone(),
            Arc::clone(&barrier),
        )?;
        council_members.push(member);
    }

    info!("starting {} council members", council_members.len());

    let handles: Vec<_> = council_members
        .into_iter()
        .map(|member| thread::spawn(move || member.run()))
        .collect();

    barrier.wait();

    info!("ELECTION COMPLETE");
    println!("ELECTION COMPLETE");

    for handle in handles {
        let _ = handle.join();
    }

    Ok(())
}

/// §4.4's quorum note: a proposer can only collect as many ACCEPTED
/// replies as there are acceptors, so the config must supply a strict
/// majority of acceptors among the peer list. This is a documented
/// contract, not an enforced one (§4.4) — violating it can make a round
/// un-terminatable, so it is worth a loud warning rather than silence.
fn warn_if_acceptor_majority_is_missing(members: &[MemberDescriptor], quorum: usize) {
    let acceptor_count = members.iter().filter(|m| m.role == ConfigRole::Acceptor).count();
    if acceptor_count < quorum {
        warn!(
            "config supplies only {} acceptors but quorum is {}; a proposer may never reach quorum",
            acceptor_count, quorum
        );
    }
}
