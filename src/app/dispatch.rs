//! Call-site tagging and the event demultiplexer.
//!
//! The stack's packet handlers carry no context slot, and several query
//! kinds finish with the same `QueryComplete` event.  Each call kind
//! therefore registers its own forwarding `fn`; the address handed to the
//! stack *is* the tag:
//!
//! ```text
//!  discover_primary_services ─▶ packet_handler_discover_services ─┐
//!  discover_characteristics  ─▶ packet_handler_discover_chars     │
//!  discover_descriptors      ─▶ packet_handler_discover_descs     ├─▶ demux(event, Some(tag))
//!  read_value                ─▶ packet_handler_read               │
//!  write_value               ─▶ packet_handler_write_with_response┘
//!  everything else           ─▶ packet_handler_generic ───────────▶ demux(event, None)
//! ```

use log::{debug, warn};

use crate::error::StackError;
use crate::lifecycle::AdapterState;
use crate::uuid::Uuid;

use super::events::{AttrHandle, ConnHandle, HciState, LinkRole, PacketType, StackEvent, ADDR_TYPE_UNKNOWN};
use super::gatts::defer_server_send;
use super::pending::{PendingId, PendingKind};
use super::ports::{
    AttStatus, AttributeStore, BleEvents, BleStack, ConnectionEvent, DataKind, DiscoverKind,
    ReadWriteKind, StackCallbacks,
};
use super::service::BleAdapter;

/// Which client call a query-complete event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSite {
    ServiceDiscovery,
    CharacteristicDiscovery,
    DescriptorDiscovery,
    Read,
    WriteWithResponse,
}

// ───────────────────────────────────────────────────────────────
// Forwarding entry points
// ───────────────────────────────────────────────────────────────

/// HCI events, value updates and can-write-without-response.
pub fn packet_handler_generic(cb: &mut dyn StackCallbacks, packet_type: PacketType, event: &StackEvent) {
    cb.packet(packet_type, event, None);
}

pub fn packet_handler_discover_services(cb: &mut dyn StackCallbacks, packet_type: PacketType, event: &StackEvent) {
    cb.packet(packet_type, event, Some(CallSite::ServiceDiscovery));
}

pub fn packet_handler_discover_characteristics(
    cb: &mut dyn StackCallbacks,
    packet_type: PacketType,
    event: &StackEvent,
) {
    cb.packet(packet_type, event, Some(CallSite::CharacteristicDiscovery));
}

pub fn packet_handler_discover_descriptors(cb: &mut dyn StackCallbacks, packet_type: PacketType, event: &StackEvent) {
    cb.packet(packet_type, event, Some(CallSite::DescriptorDiscovery));
}

pub fn packet_handler_read(cb: &mut dyn StackCallbacks, packet_type: PacketType, event: &StackEvent) {
    cb.packet(packet_type, event, Some(CallSite::Read));
}

pub fn packet_handler_write_with_response(cb: &mut dyn StackCallbacks, packet_type: PacketType, event: &StackEvent) {
    cb.packet(packet_type, event, Some(CallSite::WriteWithResponse));
}

pub fn notify_indicate_ready_handler(cb: &mut dyn StackCallbacks, id: PendingId) {
    cb.notify_indicate_ready(id);
}

pub fn att_read_handler(
    cb: &mut dyn StackCallbacks,
    conn_handle: ConnHandle,
    attr_handle: AttrHandle,
    offset: u16,
    buffer: Option<&mut [u8]>,
) -> Result<usize, AttStatus> {
    cb.att_read(conn_handle, attr_handle, offset, buffer)
}

pub fn att_write_handler(
    cb: &mut dyn StackCallbacks,
    conn_handle: ConnHandle,
    attr_handle: AttrHandle,
    mode: u16,
    offset: u16,
    data: &[u8],
) -> Result<(), AttStatus> {
    cb.att_write(conn_handle, attr_handle, mode, offset, data)
}

// ───────────────────────────────────────────────────────────────
// Callbacks implemented by the adapter
// ───────────────────────────────────────────────────────────────

impl<S, E, D> StackCallbacks for BleAdapter<S, E, D>
where
    S: BleStack,
    E: BleEvents,
    D: AttributeStore + Default,
{
    fn packet(&mut self, packet_type: PacketType, event: &StackEvent, site: Option<CallSite>) {
        if packet_type != PacketType::HciEvent {
            debug!("BLE: ignoring {:?} packet", packet_type);
            return;
        }
        self.demux(event, site);
    }

    fn notify_indicate_ready(&mut self, id: PendingId) {
        let outcome = self.with_live_stack_root(|stack, root| {
            let op = root.pending.remove(id);
            let (conn, handle) = (op.conn_handle(), op.value_handle());
            let sent = match op.kind() {
                PendingKind::Notify => stack.att_server_notify(conn, handle, op.payload()),
                PendingKind::Indicate => stack.att_server_indicate(conn, handle, op.payload()),
                kind => unreachable!("{:?} never registers a ready callback", kind),
            };
            let done = match sent {
                Err(StackError::AclBuffersFull) => {
                    defer_server_send(stack, &mut root.pending, op.kind(), conn, handle, op.payload())
                        .map(|()| false)
                }
                other => other.map(|()| true),
            };
            done.map_err(|e| (op.kind(), conn, handle, e))
        });

        match outcome {
            Ok(Ok(true)) => debug!("BLE: deferred send {} done", id.raw()),
            Ok(Ok(false)) => debug!("BLE: deferred send {} still blocked, requeued", id.raw()),
            Ok(Err((kind, conn, handle, e))) => {
                warn!("BLE: deferred {:?} conn={} handle={} failed: {}", kind, conn, handle, e);
            }
            Err(_) => debug!("BLE: ready callback {} after deinit", id.raw()),
        }
    }

    fn att_read(
        &mut self,
        conn_handle: ConnHandle,
        attr_handle: AttrHandle,
        offset: u16,
        buffer: Option<&mut [u8]>,
    ) -> Result<usize, AttStatus> {
        debug!(
            "BLE: att read conn={} handle={} offset={}",
            conn_handle, attr_handle, offset
        );
        self.with_live_root(|root| {
            root.gatts_db
                .entry(attr_handle)
                .map(|entry| entry.read_window(offset, buffer))
        })
        .ok()
        .flatten()
        .ok_or_else(|| {
            debug!("BLE: att read handle {} not found", attr_handle);
            AttStatus::AttributeNotFound
        })
    }

    fn att_write(
        &mut self,
        conn_handle: ConnHandle,
        attr_handle: AttrHandle,
        mode: u16,
        offset: u16,
        data: &[u8],
    ) -> Result<(), AttStatus> {
        debug!(
            "BLE: att write conn={} handle={} mode={} offset={} len={}",
            conn_handle,
            attr_handle,
            mode,
            offset,
            data.len()
        );
        let written = self.with_live_root(|root| {
            root.gatts_db
                .entry_mut(attr_handle)
                .map(|entry| entry.peer_write(data))
        });
        let Ok(Some(n)) = written else {
            debug!("BLE: att write handle {} not found", attr_handle);
            return Err(AttStatus::AttributeNotFound);
        };
        if n < data.len() {
            debug!("BLE: att write truncated {} -> {}", data.len(), n);
        }
        self.events.on_gatts_write(conn_handle, attr_handle);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Demultiplexer
// ───────────────────────────────────────────────────────────────

impl<S, E, D> BleAdapter<S, E, D>
where
    S: BleStack,
    E: BleEvents,
    D: AttributeStore + Default,
{
    fn demux(&mut self, event: &StackEvent, site: Option<CallSite>) {
        match event {
            StackEvent::AttConnected { conn_handle } => {
                debug!("BLE: att connected conn={}", conn_handle);
            }
            StackEvent::AttDisconnected { conn_handle } => {
                debug!("BLE: att disconnected conn={}", conn_handle);
            }
            StackEvent::LeConnectionComplete {
                conn_handle,
                role,
                peer_addr_type,
                peer_addr,
            } => {
                let kind = match role {
                    LinkRole::Central => ConnectionEvent::PeripheralConnect,
                    LinkRole::Peripheral => ConnectionEvent::CentralConnect,
                };
                debug!("BLE: {:?} conn={}", kind, conn_handle);
                self.events
                    .on_connected_disconnected(kind, *conn_handle, *peer_addr_type, peer_addr);
            }
            StackEvent::DisconnectionComplete {
                conn_handle,
                reason,
            } => self.on_disconnect(*conn_handle, *reason),
            StackEvent::StateChanged(hci) => self.on_stack_state(*hci),
            StackEvent::AdvertisingReport(report) => {
                self.events.on_scan_result(
                    report.addr_type,
                    &report.addr,
                    report.event_type,
                    report.rssi,
                    &report.data,
                );
            }
            StackEvent::QueryComplete {
                conn_handle,
                att_status,
            } => self.on_query_complete(*conn_handle, u16::from(*att_status), site),
            StackEvent::ServiceQueryResult {
                conn_handle,
                service,
            } => {
                let uuid = Uuid::from_stack(service.uuid16, &service.uuid128);
                self.events.on_primary_service_result(
                    *conn_handle,
                    service.start_group_handle,
                    service.end_group_handle,
                    &uuid,
                );
            }
            StackEvent::CharacteristicQueryResult {
                conn_handle,
                characteristic: c,
            } => {
                let uuid = Uuid::from_stack(c.uuid16, &c.uuid128);
                self.events.on_characteristic_result(
                    *conn_handle,
                    c.start_handle,
                    c.value_handle,
                    c.properties,
                    &uuid,
                );
            }
            StackEvent::DescriptorQueryResult {
                conn_handle,
                descriptor,
            } => {
                let uuid = Uuid::from_stack(descriptor.uuid16, &descriptor.uuid128);
                self.events
                    .on_descriptor_result(*conn_handle, descriptor.handle, &uuid);
            }
            StackEvent::CharacteristicValueQueryResult {
                conn_handle,
                value_handle,
                value,
            } => self.deliver_value(DataKind::ReadResult, *conn_handle, *value_handle, value),
            StackEvent::Notification {
                conn_handle,
                value_handle,
                value,
            } => self.deliver_value(DataKind::Notify, *conn_handle, *value_handle, value),
            StackEvent::Indication {
                conn_handle,
                value_handle,
                value,
            } => self.deliver_value(DataKind::Indicate, *conn_handle, *value_handle, value),
            StackEvent::CanWriteWithoutResponse { conn_handle } => {
                self.on_can_write_without_response(*conn_handle);
            }
            StackEvent::Other(code) => debug!("BLE: unhandled event 0x{:02x}", code),
        }
    }

    fn on_disconnect(&mut self, conn_handle: ConnHandle, reason: u8) {
        // The stack forgets the peer address at teardown; only our role
        // may still be known.
        let kind = match self.stack.connection_role(conn_handle) {
            Some(LinkRole::Peripheral) => ConnectionEvent::CentralDisconnect,
            Some(LinkRole::Central) | None => ConnectionEvent::PeripheralDisconnect,
        };
        debug!("BLE: {:?} conn={} reason=0x{:02x}", kind, conn_handle, reason);

        // Write-with-response entries stay: their query-complete still arrives.
        let purged = self
            .with_live_root(|root| {
                root.pending
                    .purge_connection(conn_handle, |k| k != PendingKind::WriteWithResponse)
            })
            .unwrap_or(0);
        if purged > 0 {
            debug!("BLE: purged {} pending sends for conn={}", purged, conn_handle);
        }

        self.events
            .on_connected_disconnected(kind, conn_handle, ADDR_TYPE_UNKNOWN, &[0; 6]);
    }

    fn on_stack_state(&mut self, hci: HciState) {
        let state = self.state();
        match hci {
            HciState::Working if state == AdapterState::Starting => {
                self.set_state(AdapterState::Active);
            }
            HciState::Off
                if matches!(
                    state,
                    AdapterState::Active | AdapterState::Starting | AdapterState::TimedOut
                ) =>
            {
                self.set_state(AdapterState::Off);
            }
            other => debug!("BLE: stack state {:?} in {}", other, state.name()),
        }
    }

    fn on_query_complete(&mut self, conn_handle: ConnHandle, status: u16, site: Option<CallSite>) {
        debug!(
            "BLE: query complete conn={} status={} site={:?}",
            conn_handle, status, site
        );
        match site {
            Some(CallSite::Read) => {
                self.events
                    .on_read_write_status(ReadWriteKind::ReadDone, conn_handle, None, status);
            }
            Some(CallSite::WriteWithResponse) => {
                let op = self.with_live_root(|root| {
                    root.pending
                        .find_and_remove(PendingKind::WriteWithResponse, conn_handle, None)
                });
                match op {
                    Ok(Some(op)) => self.events.on_read_write_status(
                        ReadWriteKind::WriteDone,
                        conn_handle,
                        Some(op.value_handle()),
                        status,
                    ),
                    Ok(None) => {
                        warn!("BLE: write completion on conn={} with no queued write", conn_handle);
                        self.events
                            .on_read_write_status(ReadWriteKind::WriteDone, conn_handle, None, status);
                    }
                    Err(_) => debug!("BLE: write completion after deinit"),
                }
            }
            Some(CallSite::ServiceDiscovery) => {
                self.events
                    .on_discover_complete(DiscoverKind::Services, conn_handle, status);
            }
            Some(CallSite::CharacteristicDiscovery) => {
                self.events
                    .on_discover_complete(DiscoverKind::Characteristics, conn_handle, status);
            }
            Some(CallSite::DescriptorDiscovery) => {
                self.events
                    .on_discover_complete(DiscoverKind::Descriptors, conn_handle, status);
            }
            None => debug!("BLE: untagged query complete ignored"),
        }
    }

    /// Split one value event into begin / chunk / end.  Bytes beyond what
    /// `begin` accepts are dropped.
    fn deliver_value(&mut self, kind: DataKind, conn_handle: ConnHandle, value_handle: AttrHandle, value: &[u8]) {
        let accepted = self
            .events
            .on_data_available_begin(kind, conn_handle, value_handle, value.len())
            .min(value.len());
        self.events.on_data_available_chunk(&value[..accepted]);
        self.events.on_data_available_end();
    }

    fn on_can_write_without_response(&mut self, conn_handle: ConnHandle) {
        let outcome = self.with_live_stack_root(|stack, root| {
            let op = root
                .pending
                .find_and_remove(PendingKind::WriteNoResponse, conn_handle, None)?;
            let handle = op.value_handle();
            let sent = stack.write_value_without_response(conn_handle, handle, op.payload());
            if sent == Err(StackError::ClientBusy) {
                root.pending
                    .enqueue(PendingKind::WriteNoResponse, conn_handle, handle, op.payload());
                if let Err(e) = stack.request_can_write_without_response_event(packet_handler_generic, conn_handle) {
                    root.pending
                        .find_and_remove(PendingKind::WriteNoResponse, conn_handle, Some(handle));
                    return Some((handle, Err(e)));
                }
            }
            Some((handle, sent))
        });

        match outcome {
            Ok(Some((handle, Ok(())))) => {
                debug!("BLE: deferred write conn={} handle={} sent", conn_handle, handle);
            }
            Ok(Some((handle, Err(StackError::ClientBusy)))) => {
                debug!("BLE: deferred write conn={} handle={} still busy", conn_handle, handle);
            }
            Ok(Some((handle, Err(e)))) => {
                warn!("BLE: deferred write conn={} handle={} failed: {}", conn_handle, handle, e);
            }
            Ok(None) => debug!("BLE: nothing pending for conn={}", conn_handle),
            Err(_) => debug!("BLE: can-write event after deinit"),
        }
    }
}
