//! Adapter object and lifecycle controller.
//!
//! [`BleAdapter`] owns the stack port, the upward event port and all
//! shared state.  The facade operations are split by role across
//! [`gap`](super::gap), [`gatts`](super::gatts) and [`gattc`](super::gattc);
//! event handling lives in [`dispatch`](super::dispatch).
//!
//! ```text
//!   caller ──▶ ┌──────────────────────────────┐ ──▶ BleStack
//!              │          BleAdapter           │
//!   BleEvents ◀│ state · pending · gatts db    │◀── Delivery (poll)
//!              └──────────────────────────────┘
//! ```
//!
//! Shared state sits behind one critical-section mutex.  The stack
//! itself is not shared: it is borrowed alongside the lock when a
//! deferred send must be issued atomically with a queue update.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::CriticalSectionMutex;
use log::{debug, error, info, warn};

use crate::config::AdapterConfig;
use crate::error::{BleError, Result};
use crate::lifecycle::{self, AdapterState};

use super::dispatch::packet_handler_generic;
use super::events::BdAddr;
use super::gatts::GAP_DEVICE_NAME_HANDLE;
use super::pending::PendingQueue;
use super::ports::{AttributeStore, BleEvents, BleStack, Delivery, TimerId};

// ───────────────────────────────────────────────────────────────
// Shared state
// ───────────────────────────────────────────────────────────────

/// Per-instance state that exists only between `init` and `deinit`.
pub(crate) struct Root<D> {
    pub(crate) pending: PendingQueue,
    pub(crate) gatts_db: D,
    /// Advertising payload followed by scan-response payload, kept alive
    /// for as long as the stack may read it.
    pub(crate) adv_data: Vec<u8>,
}

pub(crate) struct Shared<D> {
    pub(crate) state: AdapterState,
    pub(crate) root: Option<Root<D>>,
}

// ───────────────────────────────────────────────────────────────
// BleAdapter
// ───────────────────────────────────────────────────────────────

/// Synchronous-looking BLE facade over an asynchronous stack.
pub struct BleAdapter<S, E, D> {
    pub(crate) stack: S,
    pub(crate) events: E,
    pub(crate) config: AdapterConfig,
    pub(crate) shared: CriticalSectionMutex<RefCell<Shared<D>>>,
}

impl<S, E, D> BleAdapter<S, E, D>
where
    S: BleStack,
    E: BleEvents,
    D: AttributeStore + Default,
{
    /// Build an adapter in the `Off` state.  Nothing touches the stack
    /// until [`init`](Self::init).  A config that fails validation is
    /// rejected with `InvalidArgument`.
    pub fn new(stack: S, events: E, config: AdapterConfig) -> Result<Self> {
        if let Err(e) = config.validate() {
            error!("BLE: rejecting adapter config: {}", e);
            return Err(BleError::InvalidArgument);
        }
        Ok(Self {
            stack,
            events,
            config,
            shared: CriticalSectionMutex::new(RefCell::new(Shared {
                state: AdapterState::Off,
                root: None,
            })),
        })
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    // ── Shared-state access ───────────────────────────────────

    pub fn state(&self) -> AdapterState {
        self.shared.lock(|cell| cell.borrow().state)
    }

    pub fn is_active(&self) -> bool {
        self.state() == AdapterState::Active
    }

    pub(crate) fn set_state(&self, next: AdapterState) {
        self.shared
            .lock(|cell| lifecycle::transition(&mut cell.borrow_mut().state, next));
    }

    fn has_root(&self) -> bool {
        self.shared.lock(|cell| cell.borrow().root.is_some())
    }

    /// Run `f` on the root inside the critical section.  Facade
    /// operations go through here and need the adapter `Active`.
    pub(crate) fn with_root<R>(&self, f: impl FnOnce(&mut Root<D>) -> R) -> Result<R> {
        self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            if shared.state != AdapterState::Active {
                return Err(BleError::NotActive);
            }
            let root = shared.root.as_mut().ok_or(BleError::NotActive)?;
            Ok(f(root))
        })
    }

    /// Like [`with_root`](Self::with_root) but with the stack borrowed
    /// too, so a stack call and the queue update it implies happen under
    /// the same lock.
    pub(crate) fn with_stack_root<R>(&mut self, f: impl FnOnce(&mut S, &mut Root<D>) -> R) -> Result<R> {
        let stack = &mut self.stack;
        self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            if shared.state != AdapterState::Active {
                return Err(BleError::NotActive);
            }
            let root = shared.root.as_mut().ok_or(BleError::NotActive)?;
            Ok(f(stack, root))
        })
    }

    /// Root access for event handling: only needs the instance to exist,
    /// since deliveries can still trail a stack that went off.
    pub(crate) fn with_live_root<R>(&self, f: impl FnOnce(&mut Root<D>) -> R) -> Result<R> {
        self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            let root = shared.root.as_mut().ok_or(BleError::NotActive)?;
            Ok(f(root))
        })
    }

    pub(crate) fn with_live_stack_root<R>(&mut self, f: impl FnOnce(&mut S, &mut Root<D>) -> R) -> Result<R> {
        let stack = &mut self.stack;
        self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            let root = shared.root.as_mut().ok_or(BleError::NotActive)?;
            Ok(f(stack, root))
        })
    }

    /// Read-only view of the pending queue, `None` when not initialised.
    pub fn with_pending<R>(&self, f: impl FnOnce(&PendingQueue) -> R) -> Option<R> {
        self.with_live_root(|root| f(&root.pending)).ok()
    }

    // ── Run loop ──────────────────────────────────────────────

    /// Drain every delivery the stack has ready.
    pub fn process_events(&mut self) {
        while let Some(delivery) = self.stack.poll() {
            self.deliver(delivery);
        }
    }

    /// One step of a blocking wait: handle a delivery if there is one,
    /// otherwise let the port make progress.
    fn poll_once(&mut self) {
        match self.stack.poll() {
            Some(delivery) => self.deliver(delivery),
            None => self.stack.poll_hook(),
        }
    }

    fn deliver(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Packet {
                handler,
                packet_type,
                event,
            } => handler(self, packet_type, &event),
            Delivery::Ready(registration) => (registration.callback)(self, registration.context),
            Delivery::Timer(timer) => self.on_timer(timer),
        }
    }

    fn on_timer(&mut self, timer: TimerId) {
        match timer {
            TimerId::InitDeinit => {
                let state = self.state();
                if matches!(state, AdapterState::Starting | AdapterState::Active) {
                    warn!("BLE: init/deinit timer fired in {}", state.name());
                    self.set_state(AdapterState::TimedOut);
                }
            }
            TimerId::ScanDuration => {
                debug!("BLE: scan duration elapsed");
                if let Err(e) = self.scan_stop() {
                    warn!("BLE: scan stop after timeout failed: {}", e);
                }
            }
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring the stack up and wait for it to report ready.
    ///
    /// A no-op when already active.  Leftovers from a previous instance
    /// are torn down first.
    pub fn init(&mut self) -> Result<()> {
        if self.is_active() {
            debug!("BLE: init while active, nothing to do");
            return Ok(());
        }
        if self.has_root() {
            if let Err(e) = self.deinit() {
                warn!("BLE: cleanup before init failed: {}", e);
            }
        }

        let mut gatts_db = D::default();
        let name = self.config.gap_name.as_bytes();
        gatts_db.create_entry(GAP_DEVICE_NAME_HANDLE, name.len());
        gatts_db.write(GAP_DEVICE_NAME_HANDLE, name)?;
        self.shared.lock(|cell| {
            cell.borrow_mut().root = Some(Root {
                pending: PendingQueue::new(),
                gatts_db,
                adv_data: Vec::new(),
            });
        });

        self.stack.port_init();
        self.set_state(AdapterState::Starting);

        self.stack.stack_init(&self.config);
        self.stack.add_event_handler(packet_handler_generic);

        self.stack
            .set_timer(TimerId::InitDeinit, self.config.init_deinit_timeout_ms);
        self.stack.port_start();
        while self.state() == AdapterState::Starting {
            self.poll_once();
        }
        self.stack.remove_timer(TimerId::InitDeinit);

        if self.state() != AdapterState::Active {
            error!(
                "BLE: stack did not come up within {} ms",
                self.config.init_deinit_timeout_ms
            );
            self.set_state(AdapterState::Off);
            self.stack.port_deinit();
            self.shared.lock(|cell| cell.borrow_mut().root = None);
            return Err(BleError::Timeout);
        }

        self.stack.listen_for_value_updates(packet_handler_generic);
        info!("BLE: active");
        Ok(())
    }

    /// Shut the stack down and drop all per-instance state.
    ///
    /// A no-op on an adapter that was never initialised (or already torn
    /// down).  If the stack does not confirm within the bounded window
    /// the adapter is forced `Off` and `Timeout` is returned.
    pub fn deinit(&mut self) -> Result<()> {
        if !self.has_root() {
            debug!("BLE: deinit on inactive adapter");
            return Ok(());
        }

        if self.is_active() {
            self.advertise_stop()?;
        }
        self.stack.stop_listening_for_value_updates();

        self.stack
            .set_timer(TimerId::InitDeinit, self.config.init_deinit_timeout_ms);
        self.stack.port_deinit();
        while self.state() == AdapterState::Active {
            self.poll_once();
        }
        self.stack.remove_timer(TimerId::InitDeinit);

        let timed_out = self.state() == AdapterState::TimedOut;
        self.set_state(AdapterState::Off);
        let dropped = self.shared.lock(|cell| {
            cell.borrow_mut()
                .root
                .take()
                .map_or(0, |root| root.pending.len())
        });
        if dropped > 0 {
            debug!("BLE: dropped {} pending operations", dropped);
        }

        if timed_out {
            error!(
                "BLE: stack did not shut down within {} ms",
                self.config.init_deinit_timeout_ms
            );
            return Err(BleError::Timeout);
        }
        info!("BLE: off");
        Ok(())
    }

    /// Public controller address as `(addr_type, addr)`.
    pub fn device_address(&self) -> (u8, BdAddr) {
        self.stack.local_address()
    }

    /// Value of the GAP device-name attribute.
    pub fn gap_device_name(&self) -> Result<Vec<u8>> {
        self.gatts_read(GAP_DEVICE_NAME_HANDLE)
    }

    /// Replace the GAP device name.  The entry grows to fit.
    pub fn gap_set_device_name(&mut self, name: &[u8]) -> Result<()> {
        self.with_root(|root| {
            root.gatts_db
                .resize(GAP_DEVICE_NAME_HANDLE, name.len(), false)?;
            root.gatts_db.write(GAP_DEVICE_NAME_HANDLE, name).map(|_| ())
        })?
    }
}
