//! MeshNode firmware: main entry point.
//!
//! One image per node; the role (light or lock) and identity are baked in
//! at build time. Startup is strictly sequential, then a single
//! cooperative loop runs forever.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  UdpTransport   LightHardware / LockHardware   NvsAdapter      │
//! │  (Transport)    (Sensor+Pwm / Actuator)        (StoragePort)   │
//! │  WifiAdapter    CardReader   BoardLed   MonotonicClock         │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            NodeService (pure logic)                    │    │
//! │  │  Router · Scheduler · LightNode | LockNode             │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Context, Result, anyhow};
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::gpio::PinDriver;
use esp_idf_svc::hal::ledc::{LedcDriver, LedcTimerDriver, Resolution, config::TimerConfig};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::spi::{SpiDeviceDriver, SpiDriverConfig, config::Config as SpiConfig};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;

use meshnode::adapters::card_reader::CardReader;
use meshnode::adapters::hardware::{BoardLed, LightHardware, LockHardware};
use meshnode::adapters::log_sink::LogEventSink;
use meshnode::adapters::nvs::NvsAdapter;
use meshnode::adapters::time::MonotonicClock;
use meshnode::adapters::udp::{MasterReporter, UdpTransport};
use meshnode::adapters::wifi::{ConnectivityPort, WifiAdapter};
use meshnode::app::ports::{ClockPort, IndicatorPort};
use meshnode::app::service::NodeService;
use meshnode::config::{DeviceRole, NodeConfig};
use meshnode::device::{Device, LightNode, LockNode};
use meshnode::drivers::lock_relay::LockRelay;
use meshnode::drivers::mfrc522::Mfrc522;
use meshnode::drivers::pwm::PwmDriver;
use meshnode::drivers::status_led::StatusLed;
use meshnode::drivers::hw_init;
use meshnode::pins;
use meshnode::sensors::ldr::LdrSensor;
use meshnode::update::{self, OtaManager, UpdateOutcome, http::HttpFirmwareSource};

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("MeshNode v{}", env!("CARGO_PKG_VERSION"));
    update::check_rollback();

    // ── 2. Identity ───────────────────────────────────────────
    let config = NodeConfig::from_build_env().map_err(|e| anyhow!("config: {e}"))?;
    info!("Device: {} (role {})", config.device_id, config.role);

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 3. Network ────────────────────────────────────────────
    let esp_wifi = EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs_partition))?;
    let mut wifi = WifiAdapter::new(esp_wifi, sys_loop, config.static_host_octet)
        .with_build_credentials()
        .map_err(|e| anyhow!("wifi: {e}"))?;
    let local = wifi.connect().map_err(|e| anyhow!("wifi: {e}"))?;

    let mut transport =
        UdpTransport::bind(config.mesh_port).map_err(|e| anyhow!("udp: {e}"))?;

    // ── 4. Firmware update (may restart) ──────────────────────
    run_update_check(&config, &mut transport);

    // ── 5. Shared adapters ────────────────────────────────────
    let storage = NvsAdapter::new().map_err(|e| anyhow!("nvs: {e}"))?;
    let led = BoardLed::new(StatusLed::new(PinDriver::output(peripherals.pins.gpio2)?, false));
    let clock = MonotonicClock::new();
    let mut sink = LogEventSink::new();

    // ── 6. Role-specific hardware + main loop ─────────────────
    match config.role {
        DeviceRole::Light => {
            if let Err(e) = hw_init::init_adc() {
                error!("ADC init failed: {}; light sensor reads will be 0", e);
            }
            let timer = LedcTimerDriver::new(
                peripherals.ledc.timer0,
                &TimerConfig {
                    frequency: Hertz(pins::LIGHT_PWM_FREQ_HZ),
                    resolution: Resolution::Bits10,
                    ..Default::default()
                },
            )?;
            let channel = LedcDriver::new(peripherals.ledc.channel0, timer, peripherals.pins.gpio25)
                .context("LEDC channel for dimmer")?;
            let hw = LightHardware::new(
                LdrSensor::new(pins::LDR_ADC_CHANNEL),
                PwmDriver::new(channel, config.pwm_max),
            );
            let device = LightNode::new(&config, hw, storage);
            let service = NodeService::new(config, local, device, led, clock.now_ms());
            run(service, DeviceRole::Light, &mut transport, &clock, &mut sink)
        }
        DeviceRole::Lock => {
            let relay = LockRelay::new(PinDriver::output(peripherals.pins.gpio26)?, true);

            // MFRC522 held out of reset for the life of the program.
            let mut rfid_rst = PinDriver::output(peripherals.pins.gpio22)?;
            rfid_rst.set_high()?;
            let spi = SpiDeviceDriver::new_single(
                peripherals.spi3,
                peripherals.pins.gpio18,
                peripherals.pins.gpio23,
                Some(peripherals.pins.gpio19),
                Some(peripherals.pins.gpio5),
                &SpiDriverConfig::default(),
                &SpiConfig::new().baudrate(Hertz(4_000_000)),
            )?;
            let reader = match Mfrc522::new(spi) {
                Ok(chip) => CardReader::new(chip),
                Err(e) => {
                    warn!("RFID reader unavailable ({:?}), cards will not be reported", e);
                    CardReader::absent()
                }
            };

            let device = LockNode::new(&config, LockHardware::new(relay), reader);
            let service = NodeService::new(config, local, device, led, clock.now_ms());
            run(service, DeviceRole::Lock, &mut transport, &clock, &mut sink)
        }
    }
}

/// Ask the update server for a newer image; restart into it if one was
/// installed. Failures are logged and the current image keeps running.
fn run_update_check(config: &NodeConfig, transport: &mut UdpTransport) {
    let mut source = match HttpFirmwareSource::new(config.update_server) {
        Ok(s) => s,
        Err(e) => {
            warn!("ota: update check skipped: {}", e);
            return;
        }
    };
    let mut ota = OtaManager::new();
    let mut progress = MasterReporter::new(transport, config.master);

    match update::check_for_update(
        &mut source,
        &mut ota,
        &config.device_id,
        &config.firmware_version,
        &mut progress,
    ) {
        Ok(UpdateOutcome::Installed { bytes }) => {
            info!("ota: installed {} bytes", bytes);
            ota.reboot();
        }
        Ok(UpdateOutcome::UpToDate) => {}
        Err(e) => warn!("ota: update check failed: {}", e),
    }
}

fn run<D: Device, I: IndicatorPort>(
    mut service: NodeService<D, I>,
    role: DeviceRole,
    transport: &mut UdpTransport,
    clock: &MonotonicClock,
    sink: &mut LogEventSink,
) -> ! {
    service.start(role, sink);
    info!("Mesh loop running at {}", service.local_addr());
    loop {
        service.run_once(transport, clock, sink);
    }
}
