//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements                    | Connects to              |
//! |----------------|-------------------------------|--------------------------|
//! | `udp`          | Transport, StatusSink         | lwIP UDP socket          |
//! | `hardware`     | LightSensorPort, PwmPort      | ADC1, LEDC               |
//! |                | LockActuatorPort              | relay GPIO               |
//! |                | IndicatorPort                 | status LED GPIO          |
//! | `card_reader`  | CardReaderPort                | MFRC522 over SPI         |
//! | `log_sink`     | EventSink                     | Serial log output        |
//! | `nvs`          | StoragePort                   | NVS / in-memory store    |
//! | `time`         | ClockPort                     | ESP32 system timer       |
//! | `wifi`         | ConnectivityPort              | ESP-IDF WiFi STA         |

pub mod card_reader;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod udp;
pub mod wifi;
