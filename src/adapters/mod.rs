//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements                    | Connects to                 |
//! |-------------|-------------------------------|-----------------------------|
//! | `hardware`  | OutputPort, InputPort,        | ESP32 GPIO via embedded-hal |
//! |             | DelayPort, ClockPort          |                             |
//! | `log_sink`  | EventSink                     | Serial log output           |
//! | `mqtt`      | BrokerPort                    | ESP-IDF MQTT client         |
//! | `time`      | ClockPort                     | ESP32 high-resolution timer |
//! | `wifi`      | LinkPort                      | ESP-IDF WiFi STA            |
//! | `device_id` | (none)                        | eFuse factory MAC           |

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod time;
pub mod wifi;
