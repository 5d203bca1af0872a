//! GPIO / peripheral pin assignments for the node board (ESP32-DevKitC).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers. Light and lock variants share the board; a node
//! only drives the pins its role needs.

// ---------------------------------------------------------------------------
// Light variant
// ---------------------------------------------------------------------------

/// LDR voltage divider, ADC1 channel 6 (GPIO 34, input-only).
pub const LDR_ADC_GPIO: i32 = 34;
pub const LDR_ADC_CHANNEL: u32 = 6;

/// LEDC output to the dimmer MOSFET gate.
pub const LIGHT_PWM_GPIO: i32 = 25;
/// LEDC carrier frequency for the dimmer.
pub const LIGHT_PWM_FREQ_HZ: u32 = 1_000;
/// Largest duty value the 10-bit LEDC timer resolves.
pub const LIGHT_PWM_MAX_DUTY: u16 = 1023;

// ---------------------------------------------------------------------------
// Lock variant
// ---------------------------------------------------------------------------

/// Relay driving the solenoid bolt. HIGH = bolt thrown (locked).
pub const LOCK_RELAY_GPIO: i32 = 26;

/// MFRC522 RFID reader on VSPI.
pub const RFID_SCK_GPIO: i32 = 18;
pub const RFID_MISO_GPIO: i32 = 19;
pub const RFID_MOSI_GPIO: i32 = 23;
pub const RFID_SS_GPIO: i32 = 5;
pub const RFID_RST_GPIO: i32 = 22;

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// On-board blue LED, active HIGH.
pub const STATUS_LED_GPIO: i32 = 2;
