//! blebridge demo: one peripheral and one central session against the
//! simulated stack.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  main                                                    │
//! │    │                                                     │
//! │    ▼                                                     │
//! │  BleAdapter ──▶ SimStack      (BleStack)                 │
//! │      │    ──▶ GattsDb         (AttributeStore)           │
//! │      └─────▶ LogEvents        (BleEvents)                │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Pass a JSON config path as the first argument to override defaults.
//! Set `RUST_LOG=debug` to see event decoding.
#![deny(unused_must_use)]

use anyhow::{Context, Result, anyhow};
use log::info;

use blebridge::adapters::gatts_db::GattsDb;
use blebridge::adapters::log_sink::{LogEvents, fmt_addr};
use blebridge::adapters::sim_stack::SimStack;
use blebridge::app::events::{
    AdvReport, BdAddr, ConnHandle, GattService, LinkRole, StackEvent,
};
use blebridge::app::gatts::{FLAG_NOTIFY, FLAG_READ, FLAG_WRITE};
use blebridge::{AdapterConfig, BleAdapter, CharacteristicDef, ServiceDef, Uuid, WriteMode};

type Adapter = BleAdapter<SimStack, LogEvents, GattsDb>;

const PEER: BdAddr = [0x66, 0x55, 0x44, 0x33, 0x22, 0x11];

/// Flags, complete local name "BLEBRIDGE".
const ADV_DATA: [u8; 14] = [
    0x02, 0x01, 0x06, 0x0a, 0x09, b'B', b'L', b'E', b'B', b'R', b'I', b'D', b'G', b'E',
];
/// Complete list of 16-bit services: battery.
const SCAN_RESPONSE: [u8; 4] = [0x03, 0x03, 0x0f, 0x18];

// ── Peripheral role ───────────────────────────────────────────

fn peripheral_session(ble: &mut Adapter) -> Result<()> {
    ble.register_service_begin(false)?;
    let handles = ble.register_service(&ServiceDef {
        uuid: Uuid::Uuid16(0x180f),
        characteristics: vec![CharacteristicDef {
            uuid: Uuid::Uuid16(0x2a19),
            flags: FLAG_READ | FLAG_WRITE | FLAG_NOTIFY,
            descriptors: Vec::new(),
        }],
    })?;
    ble.register_service_end()?;
    let level = *handles
        .first()
        .ok_or_else(|| anyhow!("battery service registered no handles"))?;

    ble.advertise_start(true, 100_000, Some(&ADV_DATA), Some(&SCAN_RESPONSE))?;

    let conn = ble
        .stack_mut()
        .accept_connection(LinkRole::Peripheral, 0, PEER);
    ble.process_events();

    // A central writes the level, then reads it back.
    let (read, write) = ble
        .stack()
        .att_server_handlers()
        .ok_or_else(|| anyhow!("attribute server not started"))?;
    write(&mut *ble, conn, level, 0, 0, &[87]).map_err(|s| anyhow!("peer write rejected: {:?}", s))?;
    let len = read(&mut *ble, conn, level, 0, None).map_err(|s| anyhow!("peer read rejected: {:?}", s))?;
    info!("peer sees {} byte(s) at handle {}", len, level);

    // Notify once with room to send and once with the ACL buffers full.
    ble.gatts_write(level, &[86])?;
    let sent = ble.gatts_notify(conn, level)?;
    info!("notify sent {} byte(s) immediately", sent);

    ble.stack_mut().set_acl_buffers_full(true);
    let sent = ble.gatts_notify_send(conn, level, &[85])?;
    info!("notify sent {} byte(s) immediately, rest deferred", sent);
    ble.stack_mut().release_acl_buffers();
    ble.process_events();

    ble.advertise_stop()?;
    ble.stack_mut().drop_connection(conn);
    ble.process_events();
    Ok(())
}

// ── Central role ──────────────────────────────────────────────

fn central_session(ble: &mut Adapter) -> Result<()> {
    ble.scan_start(0, 60_000, 30_000)?;
    ble.stack_mut().inject_advertising_report(AdvReport {
        addr_type: 0,
        addr: PEER,
        event_type: 0,
        rssi: -60,
        data: ADV_DATA.to_vec(),
    });
    ble.process_events();
    ble.scan_stop()?;

    ble.gap_connect(0, &PEER, 5_000)?;
    let conn = ble.stack_mut().accept_connection(LinkRole::Central, 0, PEER);
    ble.process_events();

    ble.gattc_discover_primary_services(conn, None)?;
    answer(ble, conn, StackEvent::ServiceQueryResult {
        conn_handle: conn,
        service: GattService {
            start_group_handle: 0x0010,
            end_group_handle: 0x0014,
            uuid16: 0x180f,
            uuid128: [0; 16],
        },
    });

    ble.gattc_read(conn, 0x0012)?;
    answer(ble, conn, StackEvent::CharacteristicValueQueryResult {
        conn_handle: conn,
        value_handle: 0x0012,
        value: vec![64],
    });

    ble.gattc_write(conn, 0x0012, &[63], WriteMode::WithResponse)?;
    ble.stack_mut().complete_query(conn, 0);
    ble.process_events();

    ble.stack_mut().set_client_busy(true);
    ble.gattc_write(conn, 0x0012, &[62], WriteMode::NoResponse)?;
    ble.stack_mut().release_client();
    ble.process_events();

    ble.gap_disconnect(conn)?;
    ble.process_events();
    Ok(())
}

/// Play the peer's side of a query: one result, then completion.
fn answer(ble: &mut Adapter, conn: ConnHandle, result: StackEvent) {
    let sim = ble.stack_mut();
    sim.deliver_query_result(conn, result);
    sim.complete_query(conn, 0);
    ble.process_events();
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
            AdapterConfig::from_json(&text).with_context(|| format!("loading {}", path))?
        }
        None => AdapterConfig::default(),
    };

    let mut ble = BleAdapter::new(SimStack::new(), LogEvents::new(), config)?;
    ble.init()?;
    let (addr_type, addr) = ble.device_address();
    info!("local address {} (type {})", fmt_addr(&addr), addr_type);

    ble.gap_set_device_name(b"blebridge-demo")?;
    info!(
        "device name {:?}",
        String::from_utf8_lossy(&ble.gap_device_name()?)
    );

    peripheral_session(&mut ble)?;
    central_session(&mut ble)?;

    ble.deinit()?;
    Ok(())
}
