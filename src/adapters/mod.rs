//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter     | Implements       | Connects to                      |
//! |-------------|------------------|----------------------------------|
//! | `gatts_db`  | AttributeStore   | In-memory attribute value table  |
//! | `log_sink`  | BleEvents        | Log output                       |
//! | `sim_stack` | BleStack         | Host simulation of the BLE stack |

pub mod gatts_db;
pub mod log_sink;
pub mod sim_stack;
