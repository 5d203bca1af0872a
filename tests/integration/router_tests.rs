//! Routing through a full service: bare commands, envelopes addressed
//! here, relays and TTL drops.

use std::net::{Ipv4Addr, SocketAddrV4};

use meshnode::config::RelayMode;
use meshnode::device::LockState;

use crate::mock_hw::*;

fn lock_cfg() -> meshnode::config::NodeConfig {
    node_config("lock_207")
}

#[test]
fn bare_command_executes_locally() {
    let mut svc = lock_service(lock_cfg(), MockCards::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("UNLOCK", &mut net, &mut sink);

    assert_eq!(svc.device().state(), LockState::Unlocked);
    assert_eq!(
        sink.events,
        vec![Recorded::Applied {
            command: "UNLOCK".into(),
            via_mesh: false
        }]
    );
    assert!(net.broadcasts().is_empty());
}

#[test]
fn envelope_for_this_node_is_unwrapped() {
    let mut svc = lock_service(lock_cfg(), MockCards::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("192.168.137.207:UNLOCK:3", &mut net, &mut sink);

    assert_eq!(svc.device().state(), LockState::Unlocked);
    assert_eq!(
        sink.events,
        vec![Recorded::Applied {
            command: "UNLOCK".into(),
            via_mesh: true
        }]
    );
    // Only the status line goes out; nothing is re-wrapped.
    assert_eq!(net.sent_to(master()), vec!["lock_207:UNLOCKED"]);
    assert_eq!(net.sent.len(), 1);
}

#[test]
fn envelope_for_this_node_with_zero_ttl_still_executes() {
    let mut svc = lock_service(lock_cfg(), MockCards::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("192.168.137.207:UNLOCK:0", &mut net, &mut sink);

    assert_eq!(svc.device().state(), LockState::Unlocked);
}

#[test]
fn foreign_envelope_is_flooded_with_one_less_hop() {
    let mut svc = lock_service(lock_cfg(), MockCards::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("10.0.0.5:LOCK:2", &mut net, &mut sink);

    assert_eq!(net.broadcasts(), vec!["10.0.0.5:LOCK:1"]);
    assert_eq!(sink.events, vec![Recorded::Relayed("10.0.0.5:LOCK:1".into())]);
    // The local lock is untouched.
    assert_eq!(svc.device().actuator().calls, vec![BoltCall::Engage]);
}

#[test]
fn last_hop_is_still_relayed_with_ttl_zero() {
    let mut svc = lock_service(lock_cfg(), MockCards::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("10.0.0.5:ON:1", &mut net, &mut sink);

    assert_eq!(net.broadcasts(), vec!["10.0.0.5:ON:0"]);
}

#[test]
fn foreign_envelope_without_budget_is_dropped() {
    let mut svc = lock_service(lock_cfg(), MockCards::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("10.0.0.5:LOCK:0", &mut net, &mut sink);

    assert!(net.sent.is_empty());
    assert_eq!(sink.events, vec![Recorded::Dropped("10.0.0.5:LOCK:0".into())]);
}

#[test]
fn unicast_mode_sends_to_target_on_mesh_port() {
    let mut cfg = lock_cfg();
    cfg.relay_mode = RelayMode::Unicast;
    let mesh_port = cfg.mesh_port;
    let mut svc = lock_service(cfg, MockCards::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("10.0.0.5:LOCK:4", &mut net, &mut sink);

    let target = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 5), mesh_port);
    assert_eq!(net.sent_to(target), vec!["10.0.0.5:LOCK:3"]);
    assert!(net.broadcasts().is_empty());
}

#[test]
fn text_that_is_not_an_envelope_is_parsed_as_a_command() {
    let mut svc = lock_service(lock_cfg(), MockCards::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    // Three delimiters: not an envelope, and not a valid command either.
    svc.route("10.0.0.5:LOCK:2:9", &mut net, &mut sink);
    // Bad address field: same.
    svc.route("10.0.0:LOCK:2", &mut net, &mut sink);

    assert!(net.sent.is_empty());
    assert_eq!(
        sink.count(|e| matches!(e, Recorded::Rejected(_))),
        2,
        "{:?}",
        sink.events
    );
}

#[test]
fn envelope_with_unknown_command_for_this_node_is_rejected() {
    let mut svc = lock_service(lock_cfg(), MockCards::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("192.168.137.207:OPEN:2", &mut net, &mut sink);

    assert_eq!(sink.events, vec![Recorded::Rejected("OPEN".into())]);
    assert_eq!(svc.device().state(), LockState::Locked);
}

#[test]
fn relay_send_failure_is_reported() {
    let mut svc = lock_service(lock_cfg(), MockCards::default());
    let mut net = MockTransport {
        fail_sends: true,
        ..MockTransport::default()
    };
    let mut sink = RecordingSink::default();

    svc.route("10.0.0.5:LOCK:2", &mut net, &mut sink);

    assert_eq!(sink.events, vec![Recorded::SendFailed("relay")]);
}
