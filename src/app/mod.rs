//! Adapter core: the synchronous facade, event routing and send queue.
//!
//! Nothing in here talks to a controller directly.  The stack, the
//! application callbacks and the attribute value table are reached only
//! through the **port traits** in [`ports`], so the whole core runs on a
//! host against the simulated stack in [`crate::adapters`].

pub mod attr;
pub mod dispatch;
pub mod events;
pub mod gap;
pub mod gattc;
pub mod gatts;
pub mod pending;
pub mod ports;
pub mod service;
