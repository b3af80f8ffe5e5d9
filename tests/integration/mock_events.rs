//! Recording event sink and adapter fixtures for integration tests.
//!
//! Records every upward notification so tests can assert on the full
//! history without a real application layer.

use blebridge::adapters::gatts_db::GattsDb;
use blebridge::adapters::sim_stack::SimStack;
use blebridge::app::events::{AttrHandle, BdAddr, ConnHandle, LinkRole};
use blebridge::app::ports::{BleEvents, ConnectionEvent, DataKind, DiscoverKind, ReadWriteKind};
use blebridge::{AdapterConfig, BleAdapter, Uuid};

// ── Event record ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ev {
    Link {
        kind: ConnectionEvent,
        conn: ConnHandle,
        addr_type: u8,
        addr: BdAddr,
    },
    ScanResult {
        addr: BdAddr,
        rssi: i8,
        data: Vec<u8>,
    },
    ScanComplete,
    Service {
        conn: ConnHandle,
        start: AttrHandle,
        end: AttrHandle,
        uuid: Uuid,
    },
    Characteristic {
        conn: ConnHandle,
        value_handle: AttrHandle,
        properties: u16,
        uuid: Uuid,
    },
    Descriptor {
        conn: ConnHandle,
        handle: AttrHandle,
        uuid: Uuid,
    },
    DiscoverComplete {
        kind: DiscoverKind,
        conn: ConnHandle,
        status: u16,
    },
    /// One begin/chunk/end sequence, folded.
    Data {
        kind: DataKind,
        conn: ConnHandle,
        handle: AttrHandle,
        total: usize,
        received: Vec<u8>,
    },
    ReadWrite {
        kind: ReadWriteKind,
        conn: ConnHandle,
        handle: Option<AttrHandle>,
        status: u16,
    },
    GattsWrite {
        conn: ConnHandle,
        handle: AttrHandle,
    },
}

// ── RecordingEvents ───────────────────────────────────────────

pub struct RecordingEvents {
    pub events: Vec<Ev>,
    /// Most bytes `on_data_available_begin` accepts.
    pub accept_limit: usize,
    open: Option<Ev>,
    pub chunks: usize,
}

#[allow(dead_code)]
impl RecordingEvents {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            accept_limit: usize::MAX,
            open: None,
            chunks: 0,
        }
    }

    pub fn take(&mut self) -> Vec<Ev> {
        std::mem::take(&mut self.events)
    }

    pub fn links(&self) -> Vec<(ConnectionEvent, ConnHandle)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Ev::Link { kind, conn, .. } => Some((*kind, *conn)),
                _ => None,
            })
            .collect()
    }
}

impl BleEvents for RecordingEvents {
    fn on_connected_disconnected(&mut self, kind: ConnectionEvent, conn: ConnHandle, addr_type: u8, addr: &BdAddr) {
        self.events.push(Ev::Link {
            kind,
            conn,
            addr_type,
            addr: *addr,
        });
    }

    fn on_scan_result(&mut self, _addr_type: u8, addr: &BdAddr, _adv_type: u8, rssi: i8, data: &[u8]) {
        self.events.push(Ev::ScanResult {
            addr: *addr,
            rssi,
            data: data.to_vec(),
        });
    }

    fn on_scan_complete(&mut self) {
        self.events.push(Ev::ScanComplete);
    }

    fn on_primary_service_result(&mut self, conn: ConnHandle, start: AttrHandle, end: AttrHandle, uuid: &Uuid) {
        self.events.push(Ev::Service {
            conn,
            start,
            end,
            uuid: *uuid,
        });
    }

    fn on_characteristic_result(
        &mut self,
        conn: ConnHandle,
        _def_handle: AttrHandle,
        value_handle: AttrHandle,
        properties: u16,
        uuid: &Uuid,
    ) {
        self.events.push(Ev::Characteristic {
            conn,
            value_handle,
            properties,
            uuid: *uuid,
        });
    }

    fn on_descriptor_result(&mut self, conn: ConnHandle, handle: AttrHandle, uuid: &Uuid) {
        self.events.push(Ev::Descriptor {
            conn,
            handle,
            uuid: *uuid,
        });
    }

    fn on_discover_complete(&mut self, kind: DiscoverKind, conn: ConnHandle, status: u16) {
        self.events.push(Ev::DiscoverComplete { kind, conn, status });
    }

    fn on_data_available_begin(&mut self, kind: DataKind, conn: ConnHandle, handle: AttrHandle, total: usize) -> usize {
        assert!(self.open.is_none(), "begin while a delivery is open");
        self.open = Some(Ev::Data {
            kind,
            conn,
            handle,
            total,
            received: Vec::new(),
        });
        self.accept_limit.min(total)
    }

    fn on_data_available_chunk(&mut self, data: &[u8]) {
        self.chunks += 1;
        match self.open.as_mut() {
            Some(Ev::Data { received, .. }) => received.extend_from_slice(data),
            _ => panic!("chunk outside a delivery"),
        }
    }

    fn on_data_available_end(&mut self) {
        let ev = self.open.take().expect("end outside a delivery");
        self.events.push(ev);
    }

    fn on_read_write_status(&mut self, kind: ReadWriteKind, conn: ConnHandle, handle: Option<AttrHandle>, status: u16) {
        self.events.push(Ev::ReadWrite {
            kind,
            conn,
            handle,
            status,
        });
    }

    fn on_gatts_write(&mut self, conn: ConnHandle, handle: AttrHandle) {
        self.events.push(Ev::GattsWrite { conn, handle });
    }
}

// ── Fixtures ──────────────────────────────────────────────────

pub type TestAdapter = BleAdapter<SimStack, RecordingEvents, GattsDb>;

pub const PEER: BdAddr = [0x06, 0x05, 0x04, 0x03, 0x02, 0x01];

/// A fresh adapter, not yet initialised.
pub fn adapter() -> TestAdapter {
    BleAdapter::new(SimStack::new(), RecordingEvents::new(), AdapterConfig::default())
        .expect("default config is valid")
}

/// An initialised adapter with the call log and event record cleared.
pub fn active_adapter() -> TestAdapter {
    let mut ble = adapter();
    ble.init().expect("init");
    ble.stack_mut().take_calls();
    ble.events_mut().take();
    ble
}

/// Bring up a link and let the adapter see it.
#[allow(dead_code)]
pub fn connect(ble: &mut TestAdapter, role: LinkRole) -> ConnHandle {
    let conn = ble.stack_mut().accept_connection(role, 0, PEER);
    ble.process_events();
    conn
}
