//! Light node driven through the service: switching, the control loop,
//! manual output and calibration persistence.

use meshnode::app::ports::StoragePort;
use meshnode::control::ControlMode;
use meshnode::sensors::calibration::{KEY, NAMESPACE};
use meshnode::sensors::ldr;

use crate::mock_hw::*;

fn light_cfg() -> meshnode::config::NodeConfig {
    node_config("light_208")
}

#[test]
fn on_then_control_ticks_drive_output_toward_setpoint() {
    let cfg = light_cfg();
    let control_ms = u64::from(cfg.control_period_ms);
    let mut svc = light_service(cfg, 300, SharedStore::default());
    let mut net = MockTransport::with_inbound(&["ON"]);
    let mut sink = RecordingSink::default();
    let clock = FakeClock::at(0);

    svc.run_once(&mut net, &clock, &mut sink);
    assert!(svc.device().is_active());
    assert_eq!(sink.applied(), vec!["ON"]);

    // setpoint 500, raw 300, gain 0.5: +100 per tick.
    clock.advance(control_ms);
    svc.run_once(&mut net, &clock, &mut sink);
    assert_eq!(svc.device().hardware().last_duty(), Some(100));

    clock.advance(control_ms);
    svc.run_once(&mut net, &clock, &mut sink);
    assert_eq!(svc.device().hardware().last_duty(), Some(200));
}

#[test]
fn ticks_are_idle_while_off() {
    let cfg = light_cfg();
    let status_ms = u64::from(cfg.status_period_ms);
    let mut svc = light_service(cfg, 300, SharedStore::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();
    let clock = FakeClock::at(status_ms);

    svc.run_once(&mut net, &clock, &mut sink);

    // Only the power-on floor write; no status line.
    assert_eq!(svc.device().hardware().duties, vec![0]);
    assert!(net.sent_to(master()).is_empty());
}

#[test]
fn off_forces_floor_and_acks() {
    let mut svc = light_service(light_cfg(), 300, SharedStore::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("ON", &mut net, &mut sink);
    svc.route("PWM_MANUAL", &mut net, &mut sink);
    svc.route("PWM:700", &mut net, &mut sink);
    assert_eq!(svc.device().hardware().last_duty(), Some(700));

    svc.route("OFF", &mut net, &mut sink);

    assert!(!svc.device().is_active());
    assert_eq!(svc.device().hardware().last_duty(), Some(0));
    assert_eq!(net.sent_to(master()), vec!["light_208:OFF:0.0:0:0"]);
}

#[test]
fn status_line_carries_divider_lux_when_uncalibrated() {
    let cfg = light_cfg();
    let status_ms = u64::from(cfg.status_period_ms);
    let mut svc = light_service(cfg, 512, SharedStore::default());
    let mut net = MockTransport::with_inbound(&["ON", "PWM_MANUAL", "PWM:250"]);
    let mut sink = RecordingSink::default();
    let clock = FakeClock::at(0);

    svc.run_once(&mut net, &clock, &mut sink);
    clock.set(status_ms);
    svc.run_once(&mut net, &clock, &mut sink);

    let lux = ldr::divider_lux(512).expect("mid-scale reading has a divider estimate");
    assert_eq!(
        net.sent_to(master()),
        vec![format!("light_208:ON:{lux:.1}:250:512")]
    );
}

#[test]
fn calibration_is_used_and_survives_restart() {
    let store = SharedStore::default();
    let cfg = light_cfg();
    let status_ms = u64::from(cfg.status_period_ms);

    let mut svc = light_service(cfg.clone(), 300, store.clone());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();
    svc.route("CAL:2:1.0:0.01:0.0002", &mut net, &mut sink);
    assert_eq!(sink.applied(), vec!["CAL:2:1:0.01:0.0002"]);
    assert!(store.exists(NAMESPACE, KEY));
    drop(svc);

    // Fresh node on the same storage.
    let mut svc = light_service(cfg, 300, store);
    assert!(svc.device().calibration().model().is_valid());
    assert_eq!(svc.device().calibration().model().degree(), 2);

    let mut net = MockTransport::with_inbound(&["ON"]);
    let clock = FakeClock::at(0);
    svc.run_once(&mut net, &clock, &mut sink);
    clock.set(status_ms);
    svc.run_once(&mut net, &clock, &mut sink);

    // 1 + 0.01*300 + 0.0002*300^2 = 22; one auto tick moved the output to 100.
    assert_eq!(net.sent_to(master()), vec!["light_208:ON:22.0:100:300"]);
}

#[test]
fn calibration_with_bad_degree_keeps_previous_model() {
    let store = SharedStore::default();
    let mut svc = light_service(light_cfg(), 300, store.clone());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("CAL:1:5.0:0.5", &mut net, &mut sink);
    svc.route("CAL:4:1:2:3:4:5", &mut net, &mut sink);

    assert_eq!(sink.count(|e| matches!(e, Recorded::Rejected(_))), 1);
    let model = svc.device().calibration().model();
    assert_eq!(model.degree(), 1);
    assert_eq!(model.coefficients().to_vec(), vec![5.0, 0.5]);
    assert_eq!(svc.device().lux(10), 10.0);
}

#[test]
fn calibration_with_wrong_coefficient_count_is_rejected_before_the_device() {
    let mut svc = light_service(light_cfg(), 300, SharedStore::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("CAL:2:1.0:0.01", &mut net, &mut sink);

    assert_eq!(sink.events, vec![Recorded::Rejected("CAL:2:1.0:0.01".into())]);
    assert!(!svc.device().calibration().model().is_valid());
}

#[test]
fn calibration_stays_active_when_storage_write_fails() {
    let store = SharedStore::default();
    store.fail_writes.set(true);
    let mut svc = light_service(light_cfg(), 300, store.clone());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("CAL:1:0.0:2.0", &mut net, &mut sink);

    assert_eq!(sink.count(|e| matches!(e, Recorded::Rejected(_))), 1);
    assert_eq!(svc.device().lux(100), 200.0);
    assert_eq!(store.len(), 0);
}

#[test]
fn pwm_is_ignored_in_auto_and_clamped_in_manual() {
    let mut svc = light_service(light_cfg(), 300, SharedStore::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("ON", &mut net, &mut sink);
    svc.route("PWM:600", &mut net, &mut sink);
    assert_eq!(sink.events.last(), Some(&Recorded::Ignored("PWM:600".into())));
    assert_eq!(svc.device().control().output(), 0);

    svc.route("PWM_MANUAL", &mut net, &mut sink);
    svc.route("PWM:5000", &mut net, &mut sink);
    assert_eq!(svc.device().hardware().last_duty(), Some(1023));
    svc.route("PWM:-40", &mut net, &mut sink);
    assert_eq!(svc.device().hardware().last_duty(), Some(0));
    svc.route("PWM:3000000000", &mut net, &mut sink);
    assert_eq!(svc.device().hardware().last_duty(), Some(1023));
}

#[test]
fn manual_output_is_held_by_control_ticks() {
    let cfg = light_cfg();
    let control_ms = u64::from(cfg.control_period_ms);
    let mut svc = light_service(cfg, 900, SharedStore::default());
    let mut net = MockTransport::with_inbound(&["ON", "PWM_MANUAL", "PWM:333"]);
    let mut sink = RecordingSink::default();
    let clock = FakeClock::at(0);

    svc.run_once(&mut net, &clock, &mut sink);
    for _ in 0..3 {
        clock.advance(control_ms);
        svc.run_once(&mut net, &clock, &mut sink);
    }

    assert_eq!(svc.device().control().mode(), ControlMode::Manual);
    assert_eq!(svc.device().hardware().last_duty(), Some(333));
}

#[test]
fn pwm_auto_adopts_current_reading_as_setpoint() {
    let mut svc = light_service(light_cfg(), 300, SharedStore::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("PWM_MANUAL", &mut net, &mut sink);
    svc.device_mut().hardware_mut().raw = 640;
    svc.route("PWM_AUTO", &mut net, &mut sink);

    assert_eq!(svc.device().control().mode(), ControlMode::Auto);
    assert_eq!(svc.device().control().setpoint(), 640);
}

#[test]
fn lock_commands_are_ignored_by_a_light() {
    let mut svc = light_service(light_cfg(), 300, SharedStore::default());
    let mut net = MockTransport::default();
    let mut sink = RecordingSink::default();

    svc.route("LOCK", &mut net, &mut sink);

    assert_eq!(sink.events, vec![Recorded::Ignored("LOCK".into())]);
    assert!(net.sent.is_empty());
}
