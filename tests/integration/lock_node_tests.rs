//! Lock node driven through the service: bolt state, status lines and
//! card reports.

use meshnode::device::LockState;

use crate::mock_hw::*;

fn lock_cfg() -> meshnode::config::NodeConfig {
    node_config("lock_207")
}

#[test]
fn powers_up_locked() {
    let svc = lock_service(lock_cfg(), MockCards::default());
    assert_eq!(svc.device().state(), LockState::Locked);
    assert_eq!(svc.device().actuator().calls, vec![BoltCall::Engage]);
}

#[test]
fn unlock_then_lock_reports_each_transition() {
    let mut svc = lock_service(lock_cfg(), MockCards::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("UNLOCK", &mut net, &mut sink);
    svc.route("LOCK", &mut net, &mut sink);

    assert_eq!(svc.device().state(), LockState::Locked);
    assert_eq!(
        svc.device().actuator().calls,
        vec![BoltCall::Engage, BoltCall::Release, BoltCall::Engage]
    );
    assert_eq!(
        net.sent_to(master()),
        vec!["lock_207:UNLOCKED", "lock_207:LOCKED"]
    );
}

#[test]
fn repeated_unlock_is_idempotent_but_reported() {
    let mut svc = lock_service(lock_cfg(), MockCards::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("UNLOCK", &mut net, &mut sink);
    svc.route("UNLOCK", &mut net, &mut sink);

    assert_eq!(svc.device().state(), LockState::Unlocked);
    assert_eq!(
        net.sent_to(master()),
        vec!["lock_207:UNLOCKED", "lock_207:UNLOCKED"]
    );
    assert_eq!(sink.applied(), vec!["UNLOCK", "UNLOCK"]);
}

#[test]
fn status_period_sends_heartbeat() {
    let cfg = lock_cfg();
    let status_ms = u64::from(cfg.status_period_ms);
    let mut svc = lock_service(cfg, MockCards::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();
    let clock = FakeClock::at(status_ms - 1);

    svc.run_once(&mut net, &clock, &mut sink);
    assert!(net.sent_to(master()).is_empty());

    clock.set(status_ms);
    svc.run_once(&mut net, &clock, &mut sink);
    assert_eq!(net.sent_to(master()), vec!["lock_207:HEARTBEAT"]);
}

#[test]
fn presented_card_is_reported_as_hex_uid() {
    let cards = MockCards::default();
    let mut svc = lock_service(lock_cfg(), cards.clone());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();
    let clock = FakeClock::at(1);

    svc.run_once(&mut net, &clock, &mut sink);
    assert!(net.sent.is_empty());

    cards.present(&[0x04, 0x6F, 0x87, 0x12]);
    svc.run_once(&mut net, &clock, &mut sink);

    assert_eq!(net.sent_to(master()), vec!["lock_207:04:6F:87:12"]);
    // Reporting a card does not move the bolt.
    assert_eq!(svc.device().state(), LockState::Locked);
}

#[test]
fn light_commands_are_ignored_by_a_lock() {
    let mut svc = lock_service(lock_cfg(), MockCards::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    for cmd in ["ON", "OFF", "PWM_MANUAL", "PWM:100", "CAL:1:0:1"] {
        svc.route(cmd, &mut net, &mut sink);
    }

    assert_eq!(sink.count(|e| matches!(e, Recorded::Ignored(_))), 5);
    assert!(net.sent.is_empty());
    assert_eq!(svc.device().actuator().calls.len(), 1);
}
