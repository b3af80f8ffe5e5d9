//! Log-based event sink adapter.
//!
//! Implements [`BleEvents`] by writing every upward notification to the
//! `log` facade.  Offered data is always accepted in full.

use log::info;

use crate::app::events::{AttrHandle, BdAddr, ConnHandle};
use crate::app::ports::{BleEvents, ConnectionEvent, DataKind, DiscoverKind, ReadWriteKind};
use crate::uuid::Uuid;

/// Format an address most-significant byte first.
pub fn fmt_addr(addr: &BdAddr) -> String {
    addr.iter()
        .rev()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Sink that logs every [`BleEvents`] call.
#[derive(Debug, Default)]
pub struct LogEvents {
    /// Bytes of the value delivery in progress.
    data_len: usize,
}

impl LogEvents {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BleEvents for LogEvents {
    fn on_connected_disconnected(&mut self, event: ConnectionEvent, conn_handle: ConnHandle, addr_type: u8, addr: &BdAddr) {
        info!(
            "LINK | {:?} conn={} addr={} type={}",
            event,
            conn_handle,
            fmt_addr(addr),
            addr_type
        );
    }

    fn on_scan_result(&mut self, addr_type: u8, addr: &BdAddr, adv_type: u8, rssi: i8, data: &[u8]) {
        info!(
            "SCAN | addr={} type={} adv_type={} rssi={} len={}",
            fmt_addr(addr),
            addr_type,
            adv_type,
            rssi,
            data.len()
        );
    }

    fn on_scan_complete(&mut self) {
        info!("SCAN | complete");
    }

    fn on_primary_service_result(&mut self, conn_handle: ConnHandle, start_handle: AttrHandle, end_handle: AttrHandle, uuid: &Uuid) {
        info!(
            "GATTC | service conn={} {}..{} uuid={}",
            conn_handle, start_handle, end_handle, uuid
        );
    }

    fn on_characteristic_result(
        &mut self,
        conn_handle: ConnHandle,
        def_handle: AttrHandle,
        value_handle: AttrHandle,
        properties: u16,
        uuid: &Uuid,
    ) {
        info!(
            "GATTC | characteristic conn={} def={} value={} props=0x{:02x} uuid={}",
            conn_handle, def_handle, value_handle, properties, uuid
        );
    }

    fn on_descriptor_result(&mut self, conn_handle: ConnHandle, handle: AttrHandle, uuid: &Uuid) {
        info!("GATTC | descriptor conn={} handle={} uuid={}", conn_handle, handle, uuid);
    }

    fn on_discover_complete(&mut self, kind: DiscoverKind, conn_handle: ConnHandle, status: u16) {
        info!("GATTC | {:?} done conn={} status={}", kind, conn_handle, status);
    }

    fn on_data_available_begin(&mut self, kind: DataKind, conn_handle: ConnHandle, value_handle: AttrHandle, total_len: usize) -> usize {
        info!(
            "GATTC | {:?} conn={} handle={} len={}",
            kind, conn_handle, value_handle, total_len
        );
        self.data_len = 0;
        total_len
    }

    fn on_data_available_chunk(&mut self, data: &[u8]) {
        self.data_len += data.len();
        info!("GATTC |   data {:02x?}", data);
    }

    fn on_data_available_end(&mut self) {
        info!("GATTC |   end ({} bytes)", self.data_len);
    }

    fn on_read_write_status(&mut self, kind: ReadWriteKind, conn_handle: ConnHandle, value_handle: Option<AttrHandle>, status: u16) {
        match value_handle {
            Some(h) => info!("GATTC | {:?} conn={} handle={} status={}", kind, conn_handle, h, status),
            None => info!("GATTC | {:?} conn={} status={}", kind, conn_handle, status),
        }
    }

    fn on_gatts_write(&mut self, conn_handle: ConnHandle, attr_handle: AttrHandle) {
        info!("GATTS | write conn={} handle={}", conn_handle, attr_handle);
    }
}
