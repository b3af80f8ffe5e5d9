//! blebridge: a synchronous-looking BLE adapter over an asynchronous,
//! callback-driven stack.
//!
//! The core in [`app`] is pure logic behind port traits; [`adapters`]
//! provides an in-memory attribute store, a logging event sink and a
//! host simulation of the stack for tests and the demo binary.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod uuid;

pub use app::gattc::WriteMode;
pub use app::gatts::{CharacteristicDef, DescriptorDef, ServiceDef};
pub use app::service::BleAdapter;
pub use config::AdapterConfig;
pub use error::{BleError, Result};
pub use lifecycle::AdapterState;
pub use uuid::Uuid;
