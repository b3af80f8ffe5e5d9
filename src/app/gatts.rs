//! GATT server facade.
//!
//! Builds the attribute database, serves the local value store and pushes
//! notifications / indications.  Sends the stack cannot take right now
//! (ACL buffers full) are copied into the pending queue and resumed from
//! the stack's ready callback.

use log::{debug, info};

use crate::error::{BleError, Result, StackError, StackResult};
use crate::uuid::{StackUuid, Uuid};

use super::dispatch::{att_read_handler, att_write_handler};
use super::events::{AttrHandle, ConnHandle};
use super::pending::{PendingKind, PendingQueue};
use super::ports::{AttributeStore, BleEvents, BleStack, SecurityLevel};
use super::service::BleAdapter;

/// The device-name characteristic always lands here when the database is
/// built from scratch.
pub const GAP_DEVICE_NAME_HANDLE: AttrHandle = 3;

const GAP_SERVICE_UUID: u16 = 0x1800;
const GAP_DEVICE_NAME_UUID: u16 = 0x2a00;
const GATT_SERVICE_UUID: u16 = 0x1801;
const GATT_SERVICE_CHANGED_UUID: u16 = 0x2a05;

// ── Characteristic / descriptor flags ─────────────────────────

pub const FLAG_BROADCAST: u16 = 0x0001;
pub const FLAG_READ: u16 = 0x0002;
pub const FLAG_WRITE_NO_RESPONSE: u16 = 0x0004;
pub const FLAG_WRITE: u16 = 0x0008;
pub const FLAG_NOTIFY: u16 = 0x0010;
pub const FLAG_INDICATE: u16 = 0x0020;
/// Value is served from the adapter's store, not the stack's database.
pub const FLAG_DYNAMIC: u16 = 0x0100;
pub const FLAG_READ_AUTHENTICATED: u16 = 0x0400;
pub const FLAG_WRITE_ENCRYPTED: u16 = 0x2000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorDef {
    pub uuid: Uuid,
    pub flags: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicDef {
    pub uuid: Uuid,
    pub flags: u16,
    pub descriptors: Vec<DescriptorDef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDef {
    pub uuid: Uuid,
    pub characteristics: Vec<CharacteristicDef>,
}

impl ServiceDef {
    /// Every UUID in stack form, or `InvalidArgument` if any has none.
    fn validate(&self) -> Result<()> {
        self.uuid.to_stack()?;
        for c in &self.characteristics {
            c.uuid.to_stack()?;
            for d in &c.descriptors {
                d.uuid.to_stack()?;
            }
        }
        Ok(())
    }
}

/// Enqueue a Notify/Indicate copy and ask the stack to call back when it
/// can send.  The record is dropped again if the stack refuses.
pub(crate) fn defer_server_send<S: BleStack>(
    stack: &mut S,
    pending: &mut PendingQueue,
    kind: PendingKind,
    conn_handle: ConnHandle,
    value_handle: AttrHandle,
    payload: &[u8],
) -> StackResult {
    let op = pending.enqueue(kind, conn_handle, value_handle, payload);
    let id = op.id();
    let requested = match (op.registration(), kind) {
        (Some(reg), PendingKind::Indicate) => {
            stack.att_server_request_to_send_indication(reg, conn_handle)
        }
        (Some(reg), _) => stack.att_server_request_to_send_notification(reg, conn_handle),
        (None, _) => Ok(()),
    };
    if requested.is_err() {
        pending.remove(id);
    }
    requested
}

impl<S, E, D> BleAdapter<S, E, D>
where
    S: BleStack,
    E: BleEvents,
    D: AttributeStore + Default,
{
    // ── Database construction ─────────────────────────────────

    /// Start (or extend, with `append`) the attribute database.  A fresh
    /// database gets the GAP and GATT services first.
    pub fn register_service_begin(&mut self, append: bool) -> Result<()> {
        self.with_stack_root(|stack, _| {
            if append {
                return;
            }
            stack.att_db_init();
            stack.att_db_add_service(StackUuid::Short(GAP_SERVICE_UUID));
            let handle = stack.att_db_add_characteristic(
                StackUuid::Short(GAP_DEVICE_NAME_UUID),
                FLAG_READ | FLAG_DYNAMIC,
                SecurityLevel::None,
                SecurityLevel::None,
            );
            assert_eq!(
                handle, GAP_DEVICE_NAME_HANDLE,
                "GAP device name registered at an unexpected handle"
            );
            stack.att_db_add_service(StackUuid::Short(GATT_SERVICE_UUID));
            stack.att_db_add_characteristic(
                StackUuid::Short(GATT_SERVICE_CHANGED_UUID),
                FLAG_READ,
                SecurityLevel::None,
                SecurityLevel::None,
            );
        })
    }

    /// Register one service.  Returns the value handle of every
    /// characteristic, each followed by its descriptors' handles.
    ///
    /// All UUIDs are checked before anything reaches the stack.
    pub fn register_service(&mut self, service: &ServiceDef) -> Result<Vec<AttrHandle>> {
        service.validate()?;
        let attr_len = self.config.default_attr_len;
        let cccb_len = self.config.cccb_len;

        self.with_stack_root(|stack, root| {
            stack.att_db_add_service(service.uuid.to_stack()?);

            let mut handles = Vec::new();
            for c in &service.characteristics {
                let props = c.flags | FLAG_DYNAMIC;
                let read = if c.flags & FLAG_READ_AUTHENTICATED != 0 {
                    SecurityLevel::Authenticated
                } else {
                    SecurityLevel::None
                };
                let write = if c.flags & FLAG_WRITE_ENCRYPTED != 0 {
                    SecurityLevel::Encrypted
                } else {
                    SecurityLevel::None
                };
                let handle = stack.att_db_add_characteristic(c.uuid.to_stack()?, props, read, write);
                root.gatts_db.create_entry(handle, attr_len);

                // The stack puts the configuration descriptor right after the value.
                if props & (FLAG_NOTIFY | FLAG_INDICATE) != 0 {
                    root.gatts_db.create_entry(handle + 1, cccb_len);
                    root.gatts_db.write(handle + 1, &[0, 0])?;
                }
                debug!("BLE: characteristic {} at handle {}", c.uuid, handle);
                handles.push(handle);

                for d in &c.descriptors {
                    let handle = stack.att_db_add_descriptor(
                        d.uuid.to_stack()?,
                        d.flags | FLAG_DYNAMIC,
                        SecurityLevel::None,
                        SecurityLevel::None,
                    );
                    root.gatts_db.create_entry(handle, attr_len);
                    debug!("BLE: descriptor {} at handle {}", d.uuid, handle);
                    handles.push(handle);
                }
            }
            info!(
                "BLE: registered service {} ({} handles)",
                service.uuid,
                handles.len()
            );
            Ok(handles)
        })?
    }

    /// Start serving the database built so far.
    pub fn register_service_end(&mut self) -> Result<()> {
        self.with_stack_root(|stack, _| stack.att_server_init(att_read_handler, att_write_handler))
    }

    // ── Local value store ─────────────────────────────────────

    pub fn gatts_read(&self, value_handle: AttrHandle) -> Result<Vec<u8>> {
        self.with_root(|root| root.gatts_db.read(value_handle).map(<[u8]>::to_vec))?
    }

    /// Store a value locally.  Returns the number of bytes kept, which is
    /// less than offered when the entry is too small.
    pub fn gatts_write(&mut self, value_handle: AttrHandle, value: &[u8]) -> Result<usize> {
        self.with_root(|root| root.gatts_db.write(value_handle, value))?
    }

    /// Resize an entry and set whether peer writes append.
    pub fn gatts_set_buffer(&mut self, value_handle: AttrHandle, len: usize, append: bool) -> Result<()> {
        self.with_root(|root| root.gatts_db.resize(value_handle, len, append))?
    }

    // ── Server-initiated sends ────────────────────────────────

    /// Notify the stored value.
    pub fn gatts_notify(&mut self, conn_handle: ConnHandle, value_handle: AttrHandle) -> Result<usize> {
        let value = self.gatts_read(value_handle)?;
        self.gatts_notify_send(conn_handle, value_handle, &value)
    }

    /// Notify `value`.  Returns the bytes sent now; `0` means the send was
    /// accepted but deferred until the stack has buffer space.
    pub fn gatts_notify_send(&mut self, conn_handle: ConnHandle, value_handle: AttrHandle, value: &[u8]) -> Result<usize> {
        self.server_send(PendingKind::Notify, conn_handle, value_handle, value)
            .map(|sent_now| if sent_now { value.len() } else { 0 })
    }

    /// Indicate the stored value.
    pub fn gatts_indicate(&mut self, conn_handle: ConnHandle, value_handle: AttrHandle) -> Result<()> {
        let value = self.gatts_read(value_handle)?;
        self.server_send(PendingKind::Indicate, conn_handle, value_handle, &value)
            .map(|_| ())
    }

    /// Try to send now, defer on full buffers.  `Ok(true)` when the stack
    /// took the bytes immediately.
    fn server_send(
        &mut self,
        kind: PendingKind,
        conn_handle: ConnHandle,
        value_handle: AttrHandle,
        value: &[u8],
    ) -> Result<bool> {
        self.with_stack_root(|stack, root| {
            // Already waiting on a ready callback: latest value wins.
            if let Some(op) = root.pending.find_mut(kind, conn_handle, Some(value_handle)) {
                op.replace_payload(value);
                debug!("BLE: {:?} conn={} handle={} coalesced", kind, conn_handle, value_handle);
                return Ok(false);
            }

            let sent = match kind {
                PendingKind::Indicate => stack.att_server_indicate(conn_handle, value_handle, value),
                _ => stack.att_server_notify(conn_handle, value_handle, value),
            };
            match sent {
                Ok(()) => Ok(true),
                Err(StackError::AclBuffersFull) => {
                    debug!(
                        "BLE: {:?} conn={} handle={} deferred, ACL buffers full",
                        kind, conn_handle, value_handle
                    );
                    defer_server_send(stack, &mut root.pending, kind, conn_handle, value_handle, value)
                        .map(|()| false)
                        .map_err(BleError::from)
                }
                Err(e) => Err(BleError::from(e)),
            }
        })?
    }
}
