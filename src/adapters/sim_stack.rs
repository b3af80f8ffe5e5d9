//! Host simulation of the underlying BLE stack.
//!
//! Implements [`BleStack`] with an in-process run loop so the adapter can
//! be exercised without a controller.  Every primitive the stack accepts
//! is appended to a [`StackCall`] log; rejected attempts are not logged.
//!
//! Knobs make the transient paths reachable:
//!
//! | Knob                      | Effect                                              |
//! |---------------------------|-----------------------------------------------------|
//! | `set_acl_buffers_full`    | notify/indicate fail with `AclBuffersFull`          |
//! | `set_client_busy`         | write-without-response fails with `ClientBusy`      |
//! | `set_respond_to_start`    | `port_start` reports "working" (or stays silent)    |
//! | `set_respond_to_stop`     | `port_deinit` reports "off" (or stays silent)       |
//!
//! Time is virtual.  [`SimStack::advance`] moves it forward explicitly;
//! [`BleStack::poll_hook`] (called only by blocking waits) jumps straight
//! to the next armed timer so a silent controller always times out.

use std::collections::{HashMap, VecDeque};

use log::{debug, info};

use crate::app::events::{
    AdvReport, AttrHandle, BdAddr, ConnHandle, HciState, LinkRole, PacketType, StackEvent,
};
use crate::app::gatts::{FLAG_INDICATE, FLAG_NOTIFY};
use crate::app::pending::PendingId;
use crate::app::ports::{
    AdvParams, AttReadHandler, AttWriteHandler, BleStack, ConnParams, ContextRegistration, Delivery,
    PacketHandler, SecurityLevel, TimerId,
};
use crate::config::AdapterConfig;
use crate::error::{StackError, StackResult};
use crate::uuid::StackUuid;

/// HCI "unknown connection identifier".
const UNKNOWN_CONNECTION: u8 = 0x02;
/// HCI "remote user terminated connection".
const REMOTE_USER_TERMINATED: u8 = 0x13;
/// HCI "connection terminated by local host".
const LOCAL_HOST_TERMINATED: u8 = 0x16;
/// ATT status for a query cut short by the link going down.
pub const ATT_ERROR_HCI_DISCONNECT_RECEIVED: u8 = 0x1f;

const FIRST_CONN_HANDLE: ConnHandle = 0x0040;

// ───────────────────────────────────────────────────────────────
// Call log
// ───────────────────────────────────────────────────────────────

/// One primitive the simulated stack accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackCall {
    PortInit,
    StackInit,
    PortStart,
    PortDeinit,
    SetTimer(TimerId, u32),
    RemoveTimer(TimerId),
    ListenForValueUpdates,
    StopListeningForValueUpdates,

    AdvParams(AdvParams),
    /// `ptr` is the address of the first byte the stack was handed.
    AdvData { ptr: usize, data: Vec<u8> },
    ScanResponseData { ptr: usize, data: Vec<u8> },
    AdvEnable(bool),
    ScanParams { active: bool, interval: u16, window: u16 },
    StartScan,
    StopScan,
    ConnParams(ConnParams),
    Connect { addr: BdAddr, addr_type: u8 },
    Disconnect(ConnHandle),

    AttDbInit,
    AddService { handle: AttrHandle, uuid: StackUuid },
    AddCharacteristic {
        value_handle: AttrHandle,
        uuid: StackUuid,
        properties: u16,
        read: SecurityLevel,
        write: SecurityLevel,
    },
    AddDescriptor {
        handle: AttrHandle,
        uuid: StackUuid,
        properties: u16,
    },
    AttServerInit,
    Notify { conn: ConnHandle, handle: AttrHandle, data: Vec<u8> },
    Indicate { conn: ConnHandle, handle: AttrHandle, data: Vec<u8> },
    RequestToSendNotification { conn: ConnHandle, context: PendingId },
    RequestToSendIndication { conn: ConnHandle, context: PendingId },

    DiscoverServices { conn: ConnHandle, uuid: Option<StackUuid> },
    DiscoverCharacteristics {
        conn: ConnHandle,
        start: AttrHandle,
        end: AttrHandle,
        uuid: Option<StackUuid>,
    },
    DiscoverDescriptors { conn: ConnHandle, start: AttrHandle, end: AttrHandle },
    Read { conn: ConnHandle, handle: AttrHandle },
    Write { conn: ConnHandle, handle: AttrHandle, data: Vec<u8> },
    WriteWithoutResponse { conn: ConnHandle, handle: AttrHandle, data: Vec<u8> },
    RequestCanWriteWithoutResponse { conn: ConnHandle },
}

#[derive(Debug, Clone, Copy)]
struct Link {
    role: LinkRole,
    connected: bool,
}

// ───────────────────────────────────────────────────────────────
// SimStack
// ───────────────────────────────────────────────────────────────

pub struct SimStack {
    // run loop
    deliveries: VecDeque<Delivery>,
    timers: Vec<(TimerId, u64)>,
    now_ms: u64,
    event_handlers: Vec<PacketHandler>,
    value_listener: Option<PacketHandler>,

    // controller
    address: BdAddr,
    respond_to_start: bool,
    respond_to_stop: bool,
    advertising: bool,
    scanning: bool,

    // links
    links: HashMap<ConnHandle, Link>,
    next_conn_handle: ConnHandle,

    // attribute database / server
    next_attr_handle: AttrHandle,
    att_server: Option<(AttReadHandler, AttWriteHandler)>,
    acl_buffers_full: bool,
    send_requests: Vec<(ConnHandle, ContextRegistration)>,

    // GATT client
    active_queries: HashMap<ConnHandle, PacketHandler>,
    client_busy: bool,
    can_write_requests: Vec<(ConnHandle, PacketHandler)>,

    calls: Vec<StackCall>,
}

impl Default for SimStack {
    fn default() -> Self {
        Self::new()
    }
}

impl SimStack {
    pub fn new() -> Self {
        Self {
            deliveries: VecDeque::new(),
            timers: Vec::new(),
            now_ms: 0,
            event_handlers: Vec::new(),
            value_listener: None,
            address: [0x01, 0x00, 0x5e, 0xb1, 0xe5, 0x02],
            respond_to_start: true,
            respond_to_stop: true,
            advertising: false,
            scanning: false,
            links: HashMap::new(),
            next_conn_handle: FIRST_CONN_HANDLE,
            next_attr_handle: 1,
            att_server: None,
            acl_buffers_full: false,
            send_requests: Vec::new(),
            active_queries: HashMap::new(),
            client_busy: false,
            can_write_requests: Vec::new(),
            calls: Vec::new(),
        }
    }

    // ── Knobs ─────────────────────────────────────────────────

    pub fn set_respond_to_start(&mut self, respond: bool) {
        self.respond_to_start = respond;
    }

    pub fn set_respond_to_stop(&mut self, respond: bool) {
        self.respond_to_stop = respond;
    }

    pub fn set_acl_buffers_full(&mut self, full: bool) {
        self.acl_buffers_full = full;
    }

    /// Free the ACL buffers and fire every outstanding send request, in
    /// the order they were made.
    pub fn release_acl_buffers(&mut self) {
        self.acl_buffers_full = false;
        for (conn, registration) in std::mem::take(&mut self.send_requests) {
            debug!("BLE(sim): ready for conn={} context={}", conn, registration.context.raw());
            self.deliveries.push_back(Delivery::Ready(registration));
        }
    }

    pub fn set_client_busy(&mut self, busy: bool) {
        self.client_busy = busy;
    }

    /// Let the GATT client write again and raise every requested
    /// can-write-without-response event.
    pub fn release_client(&mut self) {
        self.client_busy = false;
        for (conn, handler) in std::mem::take(&mut self.can_write_requests) {
            self.push_packet(handler, StackEvent::CanWriteWithoutResponse { conn_handle: conn });
        }
    }

    // ── Peer / controller activity ────────────────────────────

    /// A link came up.  `role` is ours: `Central` when we dialled out.
    pub fn accept_connection(&mut self, role: LinkRole, peer_addr_type: u8, peer_addr: BdAddr) -> ConnHandle {
        let conn_handle = self.next_conn_handle;
        self.next_conn_handle = self.next_conn_handle.wrapping_add(1);
        self.links.insert(
            conn_handle,
            Link {
                role,
                connected: true,
            },
        );
        info!("BLE(sim): link up conn={} role={:?}", conn_handle, role);
        self.push_hci_event(StackEvent::LeConnectionComplete {
            conn_handle,
            role,
            peer_addr_type,
            peer_addr,
        });
        conn_handle
    }

    /// The peer dropped the link.
    pub fn drop_connection(&mut self, conn_handle: ConnHandle) {
        self.close_link(conn_handle, REMOTE_USER_TERMINATED);
    }

    /// Deliver an advertising report while scanning.  Returns whether it
    /// was delivered.
    pub fn inject_advertising_report(&mut self, report: AdvReport) -> bool {
        if !self.scanning {
            return false;
        }
        self.push_hci_event(StackEvent::AdvertisingReport(report));
        true
    }

    /// A peer notified one of its characteristics.
    pub fn inject_notification(&mut self, conn_handle: ConnHandle, value_handle: AttrHandle, value: &[u8]) -> bool {
        self.push_value_update(StackEvent::Notification {
            conn_handle,
            value_handle,
            value: value.to_vec(),
        })
    }

    /// A peer indicated one of its characteristics.
    pub fn inject_indication(&mut self, conn_handle: ConnHandle, value_handle: AttrHandle, value: &[u8]) -> bool {
        self.push_value_update(StackEvent::Indication {
            conn_handle,
            value_handle,
            value: value.to_vec(),
        })
    }

    /// Route a query result to the handler of the query running on
    /// `conn_handle`.  Returns whether a query was running.
    pub fn deliver_query_result(&mut self, conn_handle: ConnHandle, event: StackEvent) -> bool {
        let Some(&handler) = self.active_queries.get(&conn_handle) else {
            return false;
        };
        self.push_packet(handler, event);
        true
    }

    /// Finish the query running on `conn_handle` with `att_status`.
    pub fn complete_query(&mut self, conn_handle: ConnHandle, att_status: u8) -> bool {
        let Some(handler) = self.active_queries.remove(&conn_handle) else {
            return false;
        };
        self.push_packet(
            handler,
            StackEvent::QueryComplete {
                conn_handle,
                att_status,
            },
        );
        true
    }

    /// Raise an arbitrary HCI event on every registered event handler.
    pub fn push_hci_event(&mut self, event: StackEvent) {
        for handler in self.event_handlers.clone() {
            self.push_packet(handler, event.clone());
        }
    }

    /// Move virtual time forward, expiring timers on the way.
    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
        self.fire_expired_timers();
    }

    // ── Inspection ────────────────────────────────────────────

    pub fn calls(&self) -> &[StackCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<StackCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn timer_armed(&self, timer: TimerId) -> bool {
        self.timers.iter().any(|(t, _)| *t == timer)
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn has_active_query(&self, conn_handle: ConnHandle) -> bool {
        self.active_queries.contains_key(&conn_handle)
    }

    /// Callbacks registered by `att_server_init`.
    pub fn att_server_handlers(&self) -> Option<(AttReadHandler, AttWriteHandler)> {
        self.att_server
    }

    // ── Internals ─────────────────────────────────────────────

    fn push_packet(&mut self, handler: PacketHandler, event: StackEvent) {
        self.deliveries.push_back(Delivery::Packet {
            handler,
            packet_type: PacketType::HciEvent,
            event,
        });
    }

    fn push_value_update(&mut self, event: StackEvent) -> bool {
        let Some(handler) = self.value_listener else {
            return false;
        };
        self.push_packet(handler, event);
        true
    }

    fn is_connected(&self, conn_handle: ConnHandle) -> bool {
        self.links.get(&conn_handle).is_some_and(|l| l.connected)
    }

    fn close_link(&mut self, conn_handle: ConnHandle, reason: u8) {
        let Some(link) = self.links.get_mut(&conn_handle) else {
            return;
        };
        // Role stays readable while the disconnect event is handled.
        link.connected = false;
        if let Some(handler) = self.active_queries.remove(&conn_handle) {
            self.push_packet(
                handler,
                StackEvent::QueryComplete {
                    conn_handle,
                    att_status: ATT_ERROR_HCI_DISCONNECT_RECEIVED,
                },
            );
        }
        self.send_requests.retain(|(c, _)| *c != conn_handle);
        self.can_write_requests.retain(|(c, _)| *c != conn_handle);
        info!("BLE(sim): link down conn={} reason=0x{:02x}", conn_handle, reason);
        self.push_hci_event(StackEvent::DisconnectionComplete {
            conn_handle,
            reason,
        });
    }

    fn fire_expired_timers(&mut self) {
        let now = self.now_ms;
        let mut expired: Vec<(TimerId, u64)> = Vec::new();
        self.timers.retain(|&(timer, deadline)| {
            if deadline <= now {
                expired.push((timer, deadline));
                false
            } else {
                true
            }
        });
        expired.sort_by_key(|&(_, deadline)| deadline);
        for (timer, _) in expired {
            debug!("BLE(sim): timer {:?} fired at {} ms", timer, now);
            self.deliveries.push_back(Delivery::Timer(timer));
        }
    }

    fn begin_query(&mut self, conn_handle: ConnHandle, handler: PacketHandler) -> StackResult {
        if !self.is_connected(conn_handle) {
            return Err(StackError::ClientNotConnected);
        }
        if self.active_queries.contains_key(&conn_handle) {
            return Err(StackError::ClientInWrongState);
        }
        self.active_queries.insert(conn_handle, handler);
        Ok(())
    }

    fn server_send_check(&self, conn_handle: ConnHandle) -> StackResult {
        if !self.is_connected(conn_handle) {
            return Err(StackError::Other(UNKNOWN_CONNECTION));
        }
        if self.acl_buffers_full {
            return Err(StackError::AclBuffersFull);
        }
        Ok(())
    }

    fn request_to_send(&mut self, registration: ContextRegistration, conn_handle: ConnHandle) -> StackResult {
        if !self.is_connected(conn_handle) {
            return Err(StackError::Other(UNKNOWN_CONNECTION));
        }
        if self.acl_buffers_full {
            self.send_requests.push((conn_handle, registration));
        } else {
            self.deliveries.push_back(Delivery::Ready(registration));
        }
        Ok(())
    }

    fn alloc_handles(&mut self, count: u16) -> AttrHandle {
        let first = self.next_attr_handle;
        self.next_attr_handle += count;
        first
    }
}

impl BleStack for SimStack {
    fn port_init(&mut self) {
        self.calls.push(StackCall::PortInit);
    }

    fn stack_init(&mut self, config: &AdapterConfig) {
        info!("BLE(sim): stack init, name={}", config.gap_name);
        // A fresh stack instance: nothing from a previous run is delivered.
        self.deliveries.clear();
        self.event_handlers.clear();
        self.value_listener = None;
        self.att_server = None;
        self.send_requests.clear();
        self.active_queries.clear();
        self.can_write_requests.clear();
        self.calls.push(StackCall::StackInit);
    }

    fn add_event_handler(&mut self, handler: PacketHandler) {
        self.event_handlers.push(handler);
    }

    fn port_start(&mut self) {
        self.calls.push(StackCall::PortStart);
        if self.respond_to_start {
            self.push_hci_event(StackEvent::StateChanged(HciState::Working));
        } else {
            info!("BLE(sim): controller silent on start");
        }
    }

    fn port_deinit(&mut self) {
        self.calls.push(StackCall::PortDeinit);
        self.advertising = false;
        self.scanning = false;
        if self.respond_to_stop {
            self.push_hci_event(StackEvent::StateChanged(HciState::Off));
        } else {
            info!("BLE(sim): controller silent on stop");
        }
    }

    fn set_timer(&mut self, timer: TimerId, ms: u32) {
        self.timers.retain(|(t, _)| *t != timer);
        self.timers.push((timer, self.now_ms + u64::from(ms)));
        self.calls.push(StackCall::SetTimer(timer, ms));
    }

    fn remove_timer(&mut self, timer: TimerId) {
        self.timers.retain(|(t, _)| *t != timer);
        self.calls.push(StackCall::RemoveTimer(timer));
    }

    fn poll(&mut self) -> Option<Delivery> {
        self.deliveries.pop_front()
    }

    fn poll_hook(&mut self) {
        if let Some(next) = self.timers.iter().map(|&(_, deadline)| deadline).min() {
            self.now_ms = self.now_ms.max(next);
            self.fire_expired_timers();
        }
    }

    fn connection_role(&self, conn_handle: ConnHandle) -> Option<LinkRole> {
        self.links.get(&conn_handle).map(|l| l.role)
    }

    fn local_address(&self) -> (u8, BdAddr) {
        (0, self.address)
    }

    fn listen_for_value_updates(&mut self, handler: PacketHandler) {
        self.value_listener = Some(handler);
        self.calls.push(StackCall::ListenForValueUpdates);
    }

    fn stop_listening_for_value_updates(&mut self) {
        self.value_listener = None;
        self.calls.push(StackCall::StopListeningForValueUpdates);
    }

    // ── GAP ───────────────────────────────────────────────────

    fn set_advertising_params(&mut self, params: &AdvParams) {
        self.calls.push(StackCall::AdvParams(*params));
    }

    fn set_advertising_data(&mut self, data: &[u8]) {
        self.calls.push(StackCall::AdvData {
            ptr: data.as_ptr() as usize,
            data: data.to_vec(),
        });
    }

    fn set_scan_response_data(&mut self, data: &[u8]) {
        self.calls.push(StackCall::ScanResponseData {
            ptr: data.as_ptr() as usize,
            data: data.to_vec(),
        });
    }

    fn enable_advertising(&mut self, enabled: bool) {
        self.advertising = enabled;
        self.calls.push(StackCall::AdvEnable(enabled));
    }

    fn set_scan_params(&mut self, active: bool, interval: u16, window: u16) {
        self.calls.push(StackCall::ScanParams {
            active,
            interval,
            window,
        });
    }

    fn start_scan(&mut self) {
        self.scanning = true;
        self.calls.push(StackCall::StartScan);
    }

    fn stop_scan(&mut self) {
        self.scanning = false;
        self.calls.push(StackCall::StopScan);
    }

    fn set_connection_params(&mut self, params: &ConnParams) {
        self.calls.push(StackCall::ConnParams(*params));
    }

    fn connect(&mut self, addr: &BdAddr, addr_type: u8) -> StackResult {
        self.calls.push(StackCall::Connect {
            addr: *addr,
            addr_type,
        });
        Ok(())
    }

    fn disconnect(&mut self, conn_handle: ConnHandle) -> StackResult {
        if !self.is_connected(conn_handle) {
            return Err(StackError::Other(UNKNOWN_CONNECTION));
        }
        self.calls.push(StackCall::Disconnect(conn_handle));
        self.close_link(conn_handle, LOCAL_HOST_TERMINATED);
        Ok(())
    }

    // ── Attribute database / server ───────────────────────────

    fn att_db_init(&mut self) {
        self.next_attr_handle = 1;
        self.calls.push(StackCall::AttDbInit);
    }

    fn att_db_add_service(&mut self, uuid: StackUuid) -> AttrHandle {
        let handle = self.alloc_handles(1);
        self.calls.push(StackCall::AddService { handle, uuid });
        handle
    }

    fn att_db_add_characteristic(
        &mut self,
        uuid: StackUuid,
        properties: u16,
        read: SecurityLevel,
        write: SecurityLevel,
    ) -> AttrHandle {
        // Declaration, value, and a configuration descriptor when the
        // value can be pushed.
        let declaration = self.alloc_handles(2);
        if properties & (FLAG_NOTIFY | FLAG_INDICATE) != 0 {
            self.alloc_handles(1);
        }
        let value_handle = declaration + 1;
        self.calls.push(StackCall::AddCharacteristic {
            value_handle,
            uuid,
            properties,
            read,
            write,
        });
        value_handle
    }

    fn att_db_add_descriptor(
        &mut self,
        uuid: StackUuid,
        properties: u16,
        _read: SecurityLevel,
        _write: SecurityLevel,
    ) -> AttrHandle {
        let handle = self.alloc_handles(1);
        self.calls.push(StackCall::AddDescriptor {
            handle,
            uuid,
            properties,
        });
        handle
    }

    fn att_server_init(&mut self, read: AttReadHandler, write: AttWriteHandler) {
        self.att_server = Some((read, write));
        self.calls.push(StackCall::AttServerInit);
    }

    fn att_server_notify(&mut self, conn_handle: ConnHandle, handle: AttrHandle, data: &[u8]) -> StackResult {
        self.server_send_check(conn_handle)?;
        self.calls.push(StackCall::Notify {
            conn: conn_handle,
            handle,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn att_server_indicate(&mut self, conn_handle: ConnHandle, handle: AttrHandle, data: &[u8]) -> StackResult {
        self.server_send_check(conn_handle)?;
        self.calls.push(StackCall::Indicate {
            conn: conn_handle,
            handle,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn att_server_request_to_send_notification(&mut self, registration: ContextRegistration, conn_handle: ConnHandle) -> StackResult {
        self.request_to_send(registration, conn_handle)?;
        self.calls.push(StackCall::RequestToSendNotification {
            conn: conn_handle,
            context: registration.context,
        });
        Ok(())
    }

    fn att_server_request_to_send_indication(&mut self, registration: ContextRegistration, conn_handle: ConnHandle) -> StackResult {
        self.request_to_send(registration, conn_handle)?;
        self.calls.push(StackCall::RequestToSendIndication {
            conn: conn_handle,
            context: registration.context,
        });
        Ok(())
    }

    // ── GATT client ───────────────────────────────────────────

    fn discover_primary_services(&mut self, handler: PacketHandler, conn_handle: ConnHandle, uuid: Option<StackUuid>) -> StackResult {
        self.begin_query(conn_handle, handler)?;
        self.calls.push(StackCall::DiscoverServices {
            conn: conn_handle,
            uuid,
        });
        Ok(())
    }

    fn discover_characteristics(
        &mut self,
        handler: PacketHandler,
        conn_handle: ConnHandle,
        start_handle: AttrHandle,
        end_handle: AttrHandle,
        uuid: Option<StackUuid>,
    ) -> StackResult {
        self.begin_query(conn_handle, handler)?;
        self.calls.push(StackCall::DiscoverCharacteristics {
            conn: conn_handle,
            start: start_handle,
            end: end_handle,
            uuid,
        });
        Ok(())
    }

    fn discover_descriptors(
        &mut self,
        handler: PacketHandler,
        conn_handle: ConnHandle,
        start_handle: AttrHandle,
        end_handle: AttrHandle,
    ) -> StackResult {
        self.begin_query(conn_handle, handler)?;
        self.calls.push(StackCall::DiscoverDescriptors {
            conn: conn_handle,
            start: start_handle,
            end: end_handle,
        });
        Ok(())
    }

    fn read_value(&mut self, handler: PacketHandler, conn_handle: ConnHandle, value_handle: AttrHandle) -> StackResult {
        self.begin_query(conn_handle, handler)?;
        self.calls.push(StackCall::Read {
            conn: conn_handle,
            handle: value_handle,
        });
        Ok(())
    }

    fn write_value(&mut self, handler: PacketHandler, conn_handle: ConnHandle, value_handle: AttrHandle, data: &[u8]) -> StackResult {
        self.begin_query(conn_handle, handler)?;
        self.calls.push(StackCall::Write {
            conn: conn_handle,
            handle: value_handle,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn write_value_without_response(&mut self, conn_handle: ConnHandle, value_handle: AttrHandle, data: &[u8]) -> StackResult {
        if !self.is_connected(conn_handle) {
            return Err(StackError::ClientNotConnected);
        }
        if self.client_busy {
            return Err(StackError::ClientBusy);
        }
        self.calls.push(StackCall::WriteWithoutResponse {
            conn: conn_handle,
            handle: value_handle,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn request_can_write_without_response_event(&mut self, handler: PacketHandler, conn_handle: ConnHandle) -> StackResult {
        if !self.is_connected(conn_handle) {
            return Err(StackError::ClientNotConnected);
        }
        self.calls.push(StackCall::RequestCanWriteWithoutResponse { conn: conn_handle });
        if self.client_busy {
            self.can_write_requests.push((conn_handle, handler));
        } else {
            self.push_packet(handler, StackEvent::CanWriteWithoutResponse { conn_handle });
        }
        Ok(())
    }
}
