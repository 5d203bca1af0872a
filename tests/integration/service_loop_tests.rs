//! The cooperative loop: drain order and limit, timers, best-effort
//! status sends and the start announcement.

use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};

use meshnode::adapters::udp::UdpTransport;
use meshnode::config::DeviceRole;
use meshnode::device::LockState;

use crate::mock_hw::*;

fn lock_cfg() -> meshnode::config::NodeConfig {
    node_config("lock_207")
}

#[test]
fn start_announces_the_node() {
    let mut svc = lock_service(lock_cfg(), MockCards::default());
    let mut sink = RecordingSink::default();

    svc.start(DeviceRole::Lock, &mut sink);

    assert_eq!(sink.events, vec![Recorded::Started("lock_207".into())]);
    assert_eq!(svc.local_addr(), LOCK_ADDR);
}

#[test]
fn datagrams_are_handled_in_arrival_order() {
    let mut svc = lock_service(lock_cfg(), MockCards::default());
    let mut net = MockTransport::with_inbound(&["UNLOCK", "LOCK", "UNLOCK"]);
    let mut sink = RecordingSink::default();

    svc.run_once(&mut net, &FakeClock::at(1), &mut sink);

    assert_eq!(sink.applied(), vec!["UNLOCK", "LOCK", "UNLOCK"]);
    assert_eq!(svc.device().state(), LockState::Unlocked);
}

#[test]
fn drain_stops_at_the_limit() {
    let cfg = lock_cfg();
    let limit = cfg.drain_limit;
    let mut svc = lock_service(cfg, MockCards::default());
    let mut net = MockTransport::default();
    for _ in 0..limit + 4 {
        net.push("LOCK");
    }
    let mut sink = RecordingSink::default();

    svc.run_once(&mut net, &FakeClock::at(1), &mut sink);
    assert_eq!(net.recv_calls, limit);
    assert_eq!(net.inbound.len(), 4);

    svc.run_once(&mut net, &FakeClock::at(2), &mut sink);
    assert!(net.inbound.is_empty());
    assert_eq!(sink.applied().len(), limit + 4);
}

#[test]
fn empty_receive_ends_the_drain() {
    let mut svc = lock_service(lock_cfg(), MockCards::default());
    let mut net = MockTransport::with_inbound(&["LOCK"]);
    let mut sink = RecordingSink::default();

    svc.run_once(&mut net, &FakeClock::at(1), &mut sink);

    // One datagram, then one empty poll.
    assert_eq!(net.recv_calls, 2);
}

#[test]
fn heartbeat_toggles_the_indicator() {
    let cfg = lock_cfg();
    let beat = u64::from(cfg.heartbeat_period_ms);
    let led = MockLed::default();
    let device = meshnode::device::LockNode::new(&cfg, MockBolt::default(), MockCards::default());
    let mut svc = meshnode::app::service::NodeService::new(cfg, LOCK_ADDR, device, led.clone(), 0);
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();
    let clock = FakeClock::at(0);

    for _ in 0..3 {
        clock.advance(beat);
        svc.run_once(&mut net, &clock, &mut sink);
    }

    assert_eq!(*led.states.borrow(), vec![true, false, true]);
}

#[test]
fn failed_status_send_is_not_fatal() {
    let cfg = lock_cfg();
    let status_ms = u64::from(cfg.status_period_ms);
    let mut svc = lock_service(cfg, MockCards::default());
    let mut net = MockTransport {
        fail_sends: true,
        ..MockTransport::default()
    };
    net.push("UNLOCK");
    let mut sink = RecordingSink::default();

    svc.run_once(&mut net, &FakeClock::at(status_ms), &mut sink);

    // The command still applied; both its ack and the heartbeat failed.
    assert_eq!(svc.device().state(), LockState::Unlocked);
    assert_eq!(
        sink.count(|e| *e == Recorded::SendFailed("status")),
        2,
        "{:?}",
        sink.events
    );

    net.fail_sends = false;
    svc.run_once(&mut net, &FakeClock::at(2 * status_ms), &mut sink);
    assert_eq!(net.sent_to(master()), vec!["lock_207:HEARTBEAT"]);
}

#[test]
fn relays_and_local_commands_interleave_in_one_drain() {
    let mut svc = lock_service(lock_cfg(), MockCards::default());
    let mut net = MockTransport::with_inbound(&[
        "10.0.0.5:LOCK:3",
        "192.168.137.207:UNLOCK:3",
        "10.0.0.6:ON:0",
    ]);
    let mut sink = RecordingSink::default();

    svc.run_once(&mut net, &FakeClock::at(1), &mut sink);

    assert_eq!(
        sink.events,
        vec![
            Recorded::Relayed("10.0.0.5:LOCK:2".into()),
            Recorded::Applied {
                command: "UNLOCK".into(),
                via_mesh: true
            },
            Recorded::Dropped("10.0.0.6:ON:0".into()),
        ]
    );
    assert_eq!(net.broadcasts(), vec!["10.0.0.5:LOCK:2"]);
    assert_eq!(net.sent_to(master()), vec!["lock_207:UNLOCKED"]);
}

#[test]
fn malformed_datagram_does_not_end_the_drain() {
    let peer = UdpSocket::bind("127.0.0.1:0").expect("bind peer");
    let mut cfg = lock_cfg();
    // Status lines go back to the peer instead of the real master.
    cfg.master = SocketAddrV4::new(Ipv4Addr::LOCALHOST, peer.local_addr().expect("peer").port());
    let mesh_port = cfg.mesh_port;
    let mut svc = lock_service(cfg, MockCards::default());
    let mut net = UdpTransport::bind_addr(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0), mesh_port)
        .expect("bind loopback");
    let node = SocketAddrV4::new(Ipv4Addr::LOCALHOST, net.local_port().expect("bound port"));
    peer.send_to(&[0xff, 0xfe], node).expect("send garbage");
    peer.send_to(b"UNLOCK", node).expect("send command");
    let mut sink = RecordingSink::default();

    svc.run_once(&mut net, &FakeClock::at(1), &mut sink);

    assert_eq!(svc.device().state(), LockState::Unlocked);
    assert_eq!(sink.applied(), vec!["UNLOCK"]);
}
