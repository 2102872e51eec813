//! Drives a handful of the seed scenarios end-to-end over real loopback
//! TCP, asserting only the externally-contracted property: the council
//! terminates within a bounded wall clock. Per-message protocol behavior
//! (quorum thresholds, reject/retry monotonicity, silent-proposer
//! handling) is covered by the unit tests in `src/acceptor.rs` and
//! `src/proposer.rs`, which exercise the state machines directly.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use council_paxos::config::{MemberDescriptor, Role};
use council_paxos::orchestrator::run_council;

fn descriptor(id: &str, role: Role, response_delay_ms: u64, port: u16) -> MemberDescriptor {
    MemberDescriptor {
        id: id.to_string(),
        role,
        response_delay_ms,
        port,
    }
}

/// Runs a council to completion on a background thread and fails the test
/// if it has not terminated within `timeout`.
fn run_with_timeout(members: Vec<MemberDescriptor>, timeout: Duration) {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        run_council(members).expect("council run should not hit an I/O error");
        let _ = tx.send(());
    });

    rx.recv_timeout(timeout)
        .expect("council did not reach ELECTION COMPLETE within the expected wall clock");
}

#[test]
fn two_concurrent_proposers_zero_delay() {
    let _ = env_logger::builder().is_test(true).try_init();

    let members = vec![
        descriptor("M1", Role::Proposer, 0, 23451),
        descriptor("M2", Role::Acceptor, 0, 23452),
        descriptor("M3", Role::Acceptor, 0, 23453),
        descriptor("M4", Role::Acceptor, 0, 23454),
        descriptor("M5", Role::Proposer, 0, 23455),
    ];

    run_with_timeout(members, Duration::from_secs(10));
}

#[test]
fn nine_members_three_proposers_zero_delay() {
    let _ = env_logger::builder().is_test(true).try_init();

    let members = vec![
        descriptor("M1", Role::Proposer, 0, 23461),
        descriptor("M2", Role::Proposer, 0, 23462),
        descriptor("M3", Role::Proposer, 0, 23463),
        descriptor("M4", Role::Acceptor, 0, 23464),
        descriptor("M5", Role::Acceptor, 0, 23465),
        descriptor("M6", Role::Acceptor, 0, 23466),
        descriptor("M7", Role::Acceptor, 0, 23467),
        descriptor("M8", Role::Acceptor, 0, 23468),
        descriptor("M9", Role::Acceptor, 0, 23469),
    ];

    run_with_timeout(members, Duration::from_secs(15));
}

#[test]
fn nine_members_with_staggered_delays() {
    let _ = env_logger::builder().is_test(true).try_init();

    let members = vec![
        descriptor("M1", Role::Proposer, 0, 23471),
        descriptor("M2", Role::Proposer, 250, 23472),
        descriptor("M3", Role::Proposer, 500, 23473),
        descriptor("M4", Role::Acceptor, 0, 23474),
        descriptor("M5", Role::Acceptor, 250, 23475),
        descriptor("M6", Role::Acceptor, 500, 23476),
        descriptor("M7", Role::Acceptor, 1000, 23477),
        descriptor("M8", Role::Acceptor, 2000, 23478),
        descriptor("M9", Role::Acceptor, 0, 23479),
    ];

    run_with_timeout(members, Duration::from_secs(30));
}

#[test]
fn silent_proposers_still_terminate_on_learn() {
    let _ = env_logger::builder().is_test(true).try_init();

    let members = vec![
        descriptor("M1", Role::Proposer, 0, 23481),
        descriptor("M2", Role::Proposer, 12345, 23482), // silent
        descriptor("M3", Role::Proposer, 12345, 23483), // silent
        descriptor("M4", Role::Acceptor, 0, 23484),
        descriptor("M5", Role::Acceptor, 0, 23485),
        descriptor("M6", Role::Acceptor, 0, 23486),
        descriptor("M7", Role::Acceptor, 0, 23487),
        descriptor("M8", Role::Acceptor, 0, 23488),
        descriptor("M9", Role::Acceptor, 0, 23489),
    ];

    run_with_timeout(members, Duration::from_secs(15));
}
