//! Fuzz target: attribute server callbacks
//!
//! Drives arbitrary peer reads and writes (handle, offset, buffer size,
//! payload) through the registered attribute callbacks and verifies:
//! - No panics under any byte sequence
//! - A stored value never grows past its entry's capacity
//! - A read never reports more bytes than the buffer it was given
//!
//! cargo fuzz run fuzz_peer_access

#![no_main]

use blebridge::adapters::gatts_db::GattsDb;
use blebridge::adapters::log_sink::LogEvents;
use blebridge::adapters::sim_stack::SimStack;
use blebridge::app::events::LinkRole;
use blebridge::app::gatts::{CharacteristicDef, FLAG_NOTIFY, FLAG_READ, FLAG_WRITE, ServiceDef};
use blebridge::{AdapterConfig, BleAdapter, Uuid};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let config = AdapterConfig::default();
    let capacity = config.default_attr_len;
    let Ok(mut ble) = BleAdapter::new(SimStack::new(), LogEvents::new(), config) else {
        return;
    };
    if ble.init().is_err() || ble.register_service_begin(false).is_err() {
        return;
    }
    let service = ServiceDef {
        uuid: Uuid::Uuid16(0x180f),
        characteristics: vec![CharacteristicDef {
            uuid: Uuid::Uuid16(0x2a19),
            flags: FLAG_READ | FLAG_WRITE | FLAG_NOTIFY,
            descriptors: Vec::new(),
        }],
    };
    if ble.register_service(&service).is_err() || ble.register_service_end().is_err() {
        return;
    }
    let Some((read, write)) = ble.stack().att_server_handlers() else {
        return;
    };
    let conn = ble.stack_mut().accept_connection(LinkRole::Peripheral, 0, [0; 6]);
    ble.process_events();

    // Each record: [op, handle, offset, len, payload...]
    let mut rest = data;
    while rest.len() >= 4 {
        let (op, handle, offset, len) = (rest[0], u16::from(rest[1] % 16), u16::from(rest[2]), usize::from(rest[3]));
        rest = &rest[4..];
        let take = len.min(rest.len());
        let (payload, tail) = rest.split_at(take);
        rest = tail;

        if op & 1 == 0 {
            if write(&mut ble, conn, handle, 0, offset, payload).is_ok() {
                let stored = ble.gatts_read(handle).map(|v| v.len()).unwrap_or(0);
                assert!(stored <= capacity, "value grew past its entry");
            }
        } else {
            let mut buf = vec![0u8; len % 32];
            if let Ok(n) = read(&mut ble, conn, handle, offset, Some(&mut buf)) {
                assert!(n <= buf.len(), "read past the buffer");
            }
        }
    }
});
