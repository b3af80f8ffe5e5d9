//! Adapter configuration parameters
//!
//! Tunables for bring-up, the attribute store and outgoing connections.
//! Intervals are kept in microseconds here and converted to the stack's
//! native units at the call site.

use serde::{Deserialize, Serialize};

/// Core adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    // --- GAP ---
    /// Device name written to the GAP device-name attribute at init
    pub gap_name: heapless::String<32>,

    // --- Lifecycle ---
    /// How long init/deinit wait for the stack's state change (milliseconds).
    /// Some controllers take 5-6 seconds in normal operation.
    pub init_deinit_timeout_ms: u32,

    // --- Attribute store ---
    /// Capacity given to every registered characteristic/descriptor value
    pub default_attr_len: usize,
    /// Capacity of a client characteristic configuration value
    pub cccb_len: usize,

    // --- Central connections ---
    pub connect: ConnectConfig,
}

/// Parameters used when this device initiates a connection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConnectConfig {
    pub scan_interval_us: u32,
    pub scan_window_us: u32,
    pub conn_interval_min_us: u32,
    pub conn_interval_max_us: u32,
    /// Peripheral latency (connection events)
    pub conn_latency: u16,
    pub min_ce_length_us: u32,
    pub max_ce_length_us: u32,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            scan_interval_us: 60_000,
            scan_window_us: 30_000,
            conn_interval_min_us: 10_000,
            conn_interval_max_us: 30_000,
            conn_latency: 4,
            min_ce_length_us: 10_000,
            max_ce_length_us: 30_000,
        }
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        let mut gap_name = heapless::String::new();
        let _ = gap_name.push_str("BLEBRIDGE");
        Self {
            gap_name,
            init_deinit_timeout_ms: 15_000,
            default_attr_len: 20,
            cccb_len: 2,
            connect: ConnectConfig::default(),
        }
    }
}

/// A config field failed range validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigError(pub &'static str);

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "validation failed: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

impl AdapterConfig {
    /// Reject values that would leave the adapter unable to operate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gap_name.is_empty() {
            return Err(ConfigError("gap_name must not be empty"));
        }
        if self.init_deinit_timeout_ms == 0 {
            return Err(ConfigError("init_deinit_timeout_ms must be > 0"));
        }
        if self.default_attr_len == 0 {
            return Err(ConfigError("default_attr_len must be > 0"));
        }
        if self.cccb_len < 2 {
            return Err(ConfigError("cccb_len must be >= 2"));
        }
        let c = &self.connect;
        if c.scan_window_us > c.scan_interval_us {
            return Err(ConfigError("scan_window_us must be <= scan_interval_us"));
        }
        if c.conn_interval_min_us > c.conn_interval_max_us {
            return Err(ConfigError(
                "conn_interval_min_us must be <= conn_interval_max_us",
            ));
        }
        if c.min_ce_length_us > c.max_ce_length_us {
            return Err(ConfigError("min_ce_length_us must be <= max_ce_length_us"));
        }
        Ok(())
    }

    /// Compact persisted form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError("encode failed"))
    }

    /// Decode a persisted config and validate it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let cfg: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError("corrupted config"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a human-edited JSON config and validate it.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(text).map_err(|_| ConfigError("malformed JSON"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
