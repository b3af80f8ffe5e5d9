//! GATT client facade.
//!
//! Every query is registered with the forwarding handler for its call
//! kind so the shared query-complete event can be attributed later.
//! Results always arrive asynchronously through [`BleEvents`].

use log::debug;

use crate::error::{BleError, Result, StackError};
use crate::uuid::Uuid;

use super::dispatch::{
    packet_handler_discover_characteristics, packet_handler_discover_descriptors,
    packet_handler_discover_services, packet_handler_generic, packet_handler_read,
    packet_handler_write_with_response,
};
use super::events::{AttrHandle, ConnHandle};
use super::pending::PendingKind;
use super::ports::{AttributeStore, BleEvents, BleStack};
use super::service::BleAdapter;

/// How a client write is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WriteMode {
    NoResponse = 0,
    WithResponse = 1,
}

impl TryFrom<u8> for WriteMode {
    type Error = BleError;

    fn try_from(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Self::NoResponse),
            1 => Ok(Self::WithResponse),
            _ => Err(BleError::InvalidArgument),
        }
    }
}

impl<S, E, D> BleAdapter<S, E, D>
where
    S: BleStack,
    E: BleEvents,
    D: AttributeStore + Default,
{
    // ── Discovery ─────────────────────────────────────────────

    /// Discover primary services, all of them or only those matching `uuid`.
    pub fn gattc_discover_primary_services(&mut self, conn_handle: ConnHandle, uuid: Option<&Uuid>) -> Result<()> {
        let uuid = uuid.map(Uuid::to_stack).transpose()?;
        self.with_stack_root(|stack, _| {
            stack.discover_primary_services(packet_handler_discover_services, conn_handle, uuid)
        })?
        .map_err(BleError::from)
    }

    pub fn gattc_discover_characteristics(
        &mut self,
        conn_handle: ConnHandle,
        start_handle: AttrHandle,
        end_handle: AttrHandle,
        uuid: Option<&Uuid>,
    ) -> Result<()> {
        let uuid = uuid.map(Uuid::to_stack).transpose()?;
        self.with_stack_root(|stack, _| {
            stack.discover_characteristics(
                packet_handler_discover_characteristics,
                conn_handle,
                start_handle,
                end_handle,
                uuid,
            )
        })?
        .map_err(BleError::from)
    }

    pub fn gattc_discover_descriptors(
        &mut self,
        conn_handle: ConnHandle,
        start_handle: AttrHandle,
        end_handle: AttrHandle,
    ) -> Result<()> {
        self.with_stack_root(|stack, _| {
            stack.discover_descriptors(packet_handler_discover_descriptors, conn_handle, start_handle, end_handle)
        })?
        .map_err(BleError::from)
    }

    // ── Read / write ──────────────────────────────────────────

    pub fn gattc_read(&mut self, conn_handle: ConnHandle, value_handle: AttrHandle) -> Result<()> {
        self.with_stack_root(|stack, _| stack.read_value(packet_handler_read, conn_handle, value_handle))?
            .map_err(BleError::from)
    }

    /// Write a peer's attribute.
    ///
    /// Without response: sent now if the client can, otherwise copied and
    /// sent when the stack reports it can write again.  A second write
    /// while one is queued for the connection is refused with `Busy`.
    ///
    /// With response: the payload is always held until the write's
    /// query-complete event.  Only one may be outstanding per connection;
    /// another is refused with `AlreadyInProgress`.
    pub fn gattc_write(
        &mut self,
        conn_handle: ConnHandle,
        value_handle: AttrHandle,
        value: &[u8],
        mode: WriteMode,
    ) -> Result<()> {
        match mode {
            WriteMode::NoResponse => self.write_without_response(conn_handle, value_handle, value),
            WriteMode::WithResponse => self.write_with_response(conn_handle, value_handle, value),
        }
    }

    fn write_without_response(&mut self, conn_handle: ConnHandle, value_handle: AttrHandle, value: &[u8]) -> Result<()> {
        self.with_stack_root(|stack, root| {
            if root
                .pending
                .contains(PendingKind::WriteNoResponse, conn_handle, None)
            {
                return Err(BleError::Busy);
            }
            match stack.write_value_without_response(conn_handle, value_handle, value) {
                Ok(()) => Ok(()),
                Err(StackError::ClientBusy) => {
                    debug!(
                        "BLE: write conn={} handle={} deferred, client busy",
                        conn_handle, value_handle
                    );
                    let id = root
                        .pending
                        .enqueue(PendingKind::WriteNoResponse, conn_handle, value_handle, value)
                        .id();
                    if let Err(e) = stack.request_can_write_without_response_event(packet_handler_generic, conn_handle) {
                        root.pending.remove(id);
                        return Err(e.into());
                    }
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        })?
    }

    fn write_with_response(&mut self, conn_handle: ConnHandle, value_handle: AttrHandle, value: &[u8]) -> Result<()> {
        self.with_stack_root(|stack, root| {
            if root
                .pending
                .contains(PendingKind::WriteWithResponse, conn_handle, None)
            {
                return Err(BleError::AlreadyInProgress);
            }
            let op = root
                .pending
                .enqueue(PendingKind::WriteWithResponse, conn_handle, value_handle, value);
            let id = op.id();
            let sent = stack.write_value(
                packet_handler_write_with_response,
                conn_handle,
                value_handle,
                op.payload(),
            );
            if let Err(e) = sent {
                root.pending.remove(id);
                return Err(e.into());
            }
            Ok(())
        })?
    }
}
