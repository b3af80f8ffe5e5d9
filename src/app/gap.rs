//! GAP facade: advertising, scanning and link management.

use log::debug;

use crate::error::{BleError, Result};

use super::events::{BdAddr, ConnHandle};
use super::ports::{AdvParams, AttributeStore, BleEvents, BleStack, ConnParams, TimerId};
use super::service::BleAdapter;

const ADV_IND: u8 = 0x00;
const ADV_SCAN_IND: u8 = 0x02;
/// Channels 37, 38 and 39.
const ADV_CHANNEL_MAP_ALL: u8 = 0x07;

/// Convert microseconds to the stack's native unit, saturating.
fn native_units(us: u32, unit_us: u32) -> u16 {
    u16::try_from(us / unit_us).unwrap_or(u16::MAX)
}

impl<S, E, D> BleAdapter<S, E, D>
where
    S: BleStack,
    E: BleEvents,
    D: AttributeStore + Default,
{
    // ── Advertising ───────────────────────────────────────────

    /// Start advertising.
    ///
    /// The stack reads advertising and scan-response data after this call
    /// returns, so both are copied into one adapter-owned buffer (scan
    /// response directly after advertising data) that lives until
    /// [`advertise_stop`](Self::advertise_stop).
    pub fn advertise_start(
        &mut self,
        connectable: bool,
        interval_us: u32,
        adv_data: Option<&[u8]>,
        sr_data: Option<&[u8]>,
    ) -> Result<()> {
        let interval = native_units(interval_us, 625);
        let params = AdvParams {
            interval_min: interval,
            interval_max: interval,
            adv_type: if connectable { ADV_IND } else { ADV_SCAN_IND },
            direct_address_type: 0,
            direct_address: [0; 6],
            channel_map: ADV_CHANNEL_MAP_ALL,
            filter_policy: 0,
        };

        self.with_stack_root(|stack, root| {
            stack.set_advertising_params(&params);

            let adv_len = adv_data.map_or(0, <[u8]>::len);
            root.adv_data.clear();
            root.adv_data.extend_from_slice(adv_data.unwrap_or_default());
            root.adv_data.extend_from_slice(sr_data.unwrap_or_default());

            if adv_data.is_some() {
                stack.set_advertising_data(&root.adv_data[..adv_len]);
            }
            if sr_data.is_some() {
                stack.set_scan_response_data(&root.adv_data[adv_len..]);
            }
            stack.enable_advertising(true);
            debug!(
                "BLE: advertising every {} units, {} + {} bytes",
                interval,
                adv_len,
                root.adv_data.len() - adv_len
            );
        })
    }

    /// Stop advertising and release the advertising buffer.
    pub fn advertise_stop(&mut self) -> Result<()> {
        self.with_stack_root(|stack, root| {
            stack.enable_advertising(false);
            root.adv_data = Vec::new();
        })
    }

    // ── Scanning ──────────────────────────────────────────────

    /// Start a passive scan.  A `duration_ms` of zero scans until
    /// [`scan_stop`](Self::scan_stop).
    pub fn scan_start(&mut self, duration_ms: u32, interval_us: u32, window_us: u32) -> Result<()> {
        if window_us > interval_us {
            return Err(BleError::InvalidArgument);
        }
        self.with_stack_root(|stack, _| {
            if duration_ms > 0 {
                stack.set_timer(TimerId::ScanDuration, duration_ms);
            } else {
                stack.remove_timer(TimerId::ScanDuration);
            }
            stack.set_scan_params(false, native_units(interval_us, 625), native_units(window_us, 625));
            stack.start_scan();
        })
    }

    /// Stop scanning and report completion.
    pub fn scan_stop(&mut self) -> Result<()> {
        self.with_stack_root(|stack, _| {
            stack.remove_timer(TimerId::ScanDuration);
            stack.stop_scan();
        })?;
        self.events.on_scan_complete();
        Ok(())
    }

    // ── Links ─────────────────────────────────────────────────

    /// Connect to a peripheral.  `duration_ms` becomes the link's
    /// supervision timeout.
    pub fn gap_connect(&mut self, addr_type: u8, addr: &BdAddr, duration_ms: u32) -> Result<()> {
        let c = &self.config.connect;
        let params = ConnParams {
            scan_interval: native_units(c.scan_interval_us, 625),
            scan_window: native_units(c.scan_window_us, 625),
            conn_interval_min: native_units(c.conn_interval_min_us, 1250),
            conn_interval_max: native_units(c.conn_interval_max_us, 1250),
            conn_latency: c.conn_latency,
            supervision_timeout: native_units(duration_ms, 10),
            min_ce_length: native_units(c.min_ce_length_us, 625),
            max_ce_length: native_units(c.max_ce_length_us, 625),
        };
        self.with_stack_root(|stack, _| {
            stack.set_connection_params(&params);
            stack.connect(addr, addr_type)
        })?
        .map_err(BleError::from)
    }

    pub fn gap_disconnect(&mut self, conn_handle: ConnHandle) -> Result<()> {
        self.with_stack_root(|stack, _| stack.disconnect(conn_handle))?
            .map_err(BleError::from)
    }
}
