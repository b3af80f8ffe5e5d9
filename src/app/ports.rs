//! Port traits: the boundary between the adapter core and the outside world.
//!
//! ```text
//!   application ◀── BleEvents ── BleAdapter ── BleStack ──▶ controller stack
//!                                    │
//!                             AttributeStore
//! ```
//!
//! The [`BleAdapter`](super::service::BleAdapter) consumes these traits via
//! generics, so the core never touches a real controller.  The stack side
//! mirrors a C-style host stack: handlers are registered as plain `fn`
//! pointers with no context slot, and the run loop hands events back one
//! [`Delivery`] at a time.

use crate::config::AdapterConfig;
use crate::error::{BleError, Result, StackResult};
use crate::uuid::{StackUuid, Uuid};

use super::attr::AttrEntry;
use super::dispatch::CallSite;
use super::events::{AttrHandle, BdAddr, ConnHandle, LinkRole, PacketType, StackEvent};
use super::pending::PendingId;

// ───────────────────────────────────────────────────────────────
// Registered handler shapes (fixed signatures, no context slot)
// ───────────────────────────────────────────────────────────────

/// Packet handler registered with the stack.  The `fn` address is the
/// only thing that distinguishes one registration from another.
pub type PacketHandler = fn(&mut dyn StackCallbacks, PacketType, &StackEvent);

/// Readiness callback for a context registration.
pub type ReadyCallback = fn(&mut dyn StackCallbacks, PendingId);

/// Attribute server read callback.  `buffer: None` asks for the value's
/// total length.  Returns the number of bytes produced.
pub type AttReadHandler = fn(
    &mut dyn StackCallbacks,
    ConnHandle,
    AttrHandle,
    u16,
    Option<&mut [u8]>,
) -> core::result::Result<usize, AttStatus>;

/// Attribute server write callback: `(conn, handle, mode, offset, data)`.
pub type AttWriteHandler = fn(
    &mut dyn StackCallbacks,
    ConnHandle,
    AttrHandle,
    u16,
    u16,
    &[u8],
) -> core::result::Result<(), AttStatus>;

/// "Call me back with this context" record handed to the stack for
/// Notify/Indicate readiness.
#[derive(Debug, Clone, Copy)]
pub struct ContextRegistration {
    pub callback: ReadyCallback,
    pub context: PendingId,
}

/// What the handler entry points forward into.  Implemented by the
/// adapter; the stack only ever sees it behind the handler `fn`s.
pub trait StackCallbacks {
    /// Shared demultiplexer.  `site` is the call-site tag threaded in by
    /// the forwarding handler, `None` for the generic handler.
    fn packet(&mut self, packet_type: PacketType, event: &StackEvent, site: Option<CallSite>);

    /// A Notify/Indicate registration became sendable.
    fn notify_indicate_ready(&mut self, id: PendingId);

    fn att_read(
        &mut self,
        conn_handle: ConnHandle,
        attr_handle: AttrHandle,
        offset: u16,
        buffer: Option<&mut [u8]>,
    ) -> core::result::Result<usize, AttStatus>;

    fn att_write(
        &mut self,
        conn_handle: ConnHandle,
        attr_handle: AttrHandle,
        mode: u16,
        offset: u16,
        data: &[u8],
    ) -> core::result::Result<(), AttStatus>;
}

/// Attribute protocol status returned from the server callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttStatus {
    AttributeNotFound = 0x0A,
}

// ───────────────────────────────────────────────────────────────
// Run-loop deliveries
// ───────────────────────────────────────────────────────────────

/// Software timers the adapter arms on the stack's run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Bounded wait for bring-up / teardown.
    InitDeinit,
    /// Stops a scan started with a non-zero duration.
    ScanDuration,
}

/// One unit of work handed out by the run loop.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// An event routed through the handler it was registered with.
    Packet {
        handler: PacketHandler,
        packet_type: PacketType,
        event: StackEvent,
    },
    /// A context registration fired.
    Ready(ContextRegistration),
    /// An armed timer expired.
    Timer(TimerId),
}

// ───────────────────────────────────────────────────────────────
// Stack parameter records
// ───────────────────────────────────────────────────────────────

/// Advertising parameters in the stack's native units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvParams {
    /// 625 µs units.
    pub interval_min: u16,
    /// 625 µs units.
    pub interval_max: u16,
    pub adv_type: u8,
    pub direct_address_type: u8,
    pub direct_address: BdAddr,
    pub channel_map: u8,
    pub filter_policy: u8,
}

/// Connection parameters for an outgoing connection, in native units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnParams {
    /// 625 µs units.
    pub scan_interval: u16,
    /// 625 µs units.
    pub scan_window: u16,
    /// 1.25 ms units.
    pub conn_interval_min: u16,
    /// 1.25 ms units.
    pub conn_interval_max: u16,
    pub conn_latency: u16,
    /// 10 ms units.
    pub supervision_timeout: u16,
    /// 625 µs units.
    pub min_ce_length: u16,
    /// 625 µs units.
    pub max_ce_length: u16,
}

/// Access permission the attribute database enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecurityLevel {
    None,
    Encrypted,
    Authenticated,
}

// ───────────────────────────────────────────────────────────────
// Stack port (driven adapter: core → controller stack)
// ───────────────────────────────────────────────────────────────

/// The underlying host/controller stack.
///
/// Synchronous returns only say whether the primitive was accepted.
/// Everything else comes back later through [`BleStack::poll`].
pub trait BleStack {
    // --- bring-up / run loop ---

    fn port_init(&mut self);
    fn stack_init(&mut self, config: &AdapterConfig);
    fn add_event_handler(&mut self, handler: PacketHandler);
    /// Power the controller on.  Completion arrives as a state-changed event.
    fn port_start(&mut self);
    /// Power the controller off.  Completion arrives as a state-changed event.
    fn port_deinit(&mut self);
    fn set_timer(&mut self, timer: TimerId, ms: u32);
    fn remove_timer(&mut self, timer: TimerId);
    /// Next unit of work, if any is ready.
    fn poll(&mut self) -> Option<Delivery>;
    /// Called by blocking waits when nothing was ready.
    fn poll_hook(&mut self) {}
    /// Our role on a live link, `None` once the link is gone.
    fn connection_role(&self, conn_handle: ConnHandle) -> Option<LinkRole>;
    fn local_address(&self) -> (u8, BdAddr);

    /// Route notifications and indications from every peer to `handler`.
    fn listen_for_value_updates(&mut self, handler: PacketHandler);
    fn stop_listening_for_value_updates(&mut self);

    // --- GAP ---

    fn set_advertising_params(&mut self, params: &AdvParams);
    fn set_advertising_data(&mut self, data: &[u8]);
    fn set_scan_response_data(&mut self, data: &[u8]);
    fn enable_advertising(&mut self, enabled: bool);
    /// Interval and window in 625 µs units.
    fn set_scan_params(&mut self, active: bool, interval: u16, window: u16);
    fn start_scan(&mut self);
    fn stop_scan(&mut self);
    fn set_connection_params(&mut self, params: &ConnParams);
    fn connect(&mut self, addr: &BdAddr, addr_type: u8) -> StackResult;
    fn disconnect(&mut self, conn_handle: ConnHandle) -> StackResult;

    // --- attribute database / server ---

    fn att_db_init(&mut self);
    fn att_db_add_service(&mut self, uuid: StackUuid) -> AttrHandle;
    /// Returns the value handle.  A notify/indicate characteristic also
    /// gets its configuration descriptor at the following handle.
    fn att_db_add_characteristic(
        &mut self,
        uuid: StackUuid,
        properties: u16,
        read: SecurityLevel,
        write: SecurityLevel,
    ) -> AttrHandle;
    fn att_db_add_descriptor(
        &mut self,
        uuid: StackUuid,
        properties: u16,
        read: SecurityLevel,
        write: SecurityLevel,
    ) -> AttrHandle;
    fn att_server_init(&mut self, read: AttReadHandler, write: AttWriteHandler);
    fn att_server_notify(&mut self, conn_handle: ConnHandle, handle: AttrHandle, data: &[u8]) -> StackResult;
    fn att_server_indicate(&mut self, conn_handle: ConnHandle, handle: AttrHandle, data: &[u8]) -> StackResult;
    fn att_server_request_to_send_notification(&mut self, registration: ContextRegistration, conn_handle: ConnHandle) -> StackResult;
    fn att_server_request_to_send_indication(&mut self, registration: ContextRegistration, conn_handle: ConnHandle) -> StackResult;

    // --- GATT client ---

    fn discover_primary_services(&mut self, handler: PacketHandler, conn_handle: ConnHandle, uuid: Option<StackUuid>) -> StackResult;
    fn discover_characteristics(
        &mut self,
        handler: PacketHandler,
        conn_handle: ConnHandle,
        start_handle: AttrHandle,
        end_handle: AttrHandle,
        uuid: Option<StackUuid>,
    ) -> StackResult;
    fn discover_descriptors(
        &mut self,
        handler: PacketHandler,
        conn_handle: ConnHandle,
        start_handle: AttrHandle,
        end_handle: AttrHandle,
    ) -> StackResult;
    fn read_value(&mut self, handler: PacketHandler, conn_handle: ConnHandle, value_handle: AttrHandle) -> StackResult;
    fn write_value(&mut self, handler: PacketHandler, conn_handle: ConnHandle, value_handle: AttrHandle, data: &[u8]) -> StackResult;
    fn write_value_without_response(&mut self, conn_handle: ConnHandle, value_handle: AttrHandle, data: &[u8]) -> StackResult;
    /// Ask for a can-write-without-response event on `handler`.
    fn request_can_write_without_response_event(&mut self, handler: PacketHandler, conn_handle: ConnHandle) -> StackResult;
}

// ───────────────────────────────────────────────────────────────
// Upward event port (driven adapter: core → application)
// ───────────────────────────────────────────────────────────────

/// Which side of a link came or went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A peer connected to us (we are the peripheral).
    CentralConnect,
    CentralDisconnect,
    /// We connected to a peer (we are the central).
    PeripheralConnect,
    PeripheralDisconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverKind {
    Services,
    Characteristics,
    Descriptors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    ReadResult,
    Notify,
    Indicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadWriteKind {
    ReadDone,
    WriteDone,
}

/// Notifications raised to the BLE application layer.
pub trait BleEvents {
    fn on_connected_disconnected(
        &mut self,
        event: ConnectionEvent,
        conn_handle: ConnHandle,
        addr_type: u8,
        addr: &BdAddr,
    );

    fn on_scan_result(&mut self, addr_type: u8, addr: &BdAddr, adv_type: u8, rssi: i8, data: &[u8]);
    fn on_scan_complete(&mut self);

    fn on_primary_service_result(
        &mut self,
        conn_handle: ConnHandle,
        start_handle: AttrHandle,
        end_handle: AttrHandle,
        uuid: &Uuid,
    );
    fn on_characteristic_result(
        &mut self,
        conn_handle: ConnHandle,
        def_handle: AttrHandle,
        value_handle: AttrHandle,
        properties: u16,
        uuid: &Uuid,
    );
    fn on_descriptor_result(&mut self, conn_handle: ConnHandle, handle: AttrHandle, uuid: &Uuid);
    fn on_discover_complete(&mut self, kind: DiscoverKind, conn_handle: ConnHandle, status: u16);

    /// Start of a value delivery.  Returns how many of `total_len` bytes
    /// the application will take; the rest are dropped.
    fn on_data_available_begin(
        &mut self,
        kind: DataKind,
        conn_handle: ConnHandle,
        value_handle: AttrHandle,
        total_len: usize,
    ) -> usize;
    fn on_data_available_chunk(&mut self, data: &[u8]);
    fn on_data_available_end(&mut self);

    /// `value_handle` is `None` when the stack did not say which
    /// attribute completed.
    fn on_read_write_status(
        &mut self,
        kind: ReadWriteKind,
        conn_handle: ConnHandle,
        value_handle: Option<AttrHandle>,
        status: u16,
    );

    fn on_gatts_write(&mut self, conn_handle: ConnHandle, attr_handle: AttrHandle);
}

// ───────────────────────────────────────────────────────────────
// Attribute store port (driven adapter: core ↔ value table)
// ───────────────────────────────────────────────────────────────

/// Handle → resizable byte buffer table backing the attribute server.
///
/// Implementors only provide entry storage; value semantics (clamping,
/// append mode) live on [`AttrEntry`].
pub trait AttributeStore {
    /// Create (or recreate) the entry for `handle` with `capacity` bytes.
    fn create_entry(&mut self, handle: AttrHandle, capacity: usize);

    fn entry(&self, handle: AttrHandle) -> Option<&AttrEntry>;

    fn entry_mut(&mut self, handle: AttrHandle) -> Option<&mut AttrEntry>;

    /// Current value.
    fn read(&self, handle: AttrHandle) -> Result<&[u8]> {
        self.entry(handle)
            .map(AttrEntry::value)
            .ok_or(BleError::InvalidArgument)
    }

    /// Replace the value, returning the number of bytes kept.  Never fails
    /// on length: the value is clamped to capacity.
    fn write(&mut self, handle: AttrHandle, data: &[u8]) -> Result<usize> {
        self.entry_mut(handle)
            .map(|e| e.set_value(data))
            .ok_or(BleError::InvalidArgument)
    }

    /// Change capacity and append mode.
    fn resize(&mut self, handle: AttrHandle, capacity: usize, append: bool) -> Result<()> {
        self.entry_mut(handle)
            .map(|e| e.resize(capacity, append))
            .ok_or(BleError::InvalidArgument)
    }
}
