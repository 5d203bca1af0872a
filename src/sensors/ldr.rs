//! Light-dependent resistor on a voltage divider.
//!
//! [`divider_lux`] is the uncalibrated estimate used whenever no
//! polynomial calibration is loaded. It inverts the divider to get the LDR
//! resistance and applies the usual `lux = a * (1/R)^b` power law.

/// Full-scale raw reading.
pub const ADC_MAX: u16 = 1023;

const VREF: f32 = 3.3;
const R_FIXED_OHMS: f32 = 10_000.0;
const LUX_A: f32 = 500.0;
const LUX_B: f32 = 1.4;

/// Uncalibrated illuminance estimate for a raw reading.
///
/// `None` at the rails (0 or full scale), where the divider equation has no
/// finite solution.
pub fn divider_lux(raw: u16) -> Option<f32> {
    let v_out = VREF * f32::from(raw) / f32::from(ADC_MAX);
    if v_out <= 0.0 || v_out >= VREF {
        return None;
    }
    let r_ldr = R_FIXED_OHMS * (VREF - v_out) / v_out;
    Some(LUX_A * (1.0 / r_ldr).powf(LUX_B))
}

/// Raw LDR channel.
///
/// On ESP-IDF this reads the ADC1 channel configured by `hw_init` and
/// scales the 12-bit sample to 0..=1023. On the host it returns a value
/// injected with [`sim_set_ldr_raw`].
pub struct LdrSensor {
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    channel: u32,
}

#[cfg(not(target_os = "espidf"))]
static SIM_LDR_RAW: core::sync::atomic::AtomicU16 = core::sync::atomic::AtomicU16::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_ldr_raw(raw: u16) {
    SIM_LDR_RAW.store(raw.min(ADC_MAX), core::sync::atomic::Ordering::Relaxed);
}

impl LdrSensor {
    pub fn new(channel: u32) -> Self {
        Self { channel }
    }

    #[cfg(target_os = "espidf")]
    pub fn read(&mut self) -> u16 {
        // 12-bit sample down to the 10-bit range the control constants use.
        crate::drivers::hw_init::adc1_read(self.channel) >> 2
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read(&mut self) -> u16 {
        SIM_LDR_RAW.load(core::sync::atomic::Ordering::Relaxed)
    }
}
