//! Canonical Bluetooth UUID representation.
//!
//! The host side works with little-endian UUID bytes.  The stack wants a
//! 16-bit short form or 128-bit big-endian bytes, and reports discovered
//! attributes as a `(uuid16, uuid128)` pair where a non-zero `uuid16`
//! means the short form is populated.

use crate::error::{BleError, Result};
use core::fmt;

/// A UUID as seen by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uuid {
    Uuid16(u16),
    /// Valid on the wire but the attribute database cannot register it.
    Uuid32(u32),
    /// Little-endian bytes.
    Uuid128([u8; 16]),
}

/// UUID in the form the stack's attribute database and GATT client accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackUuid {
    Short(u16),
    /// Big-endian bytes.
    Long([u8; 16]),
}

impl Uuid {
    /// Parse little-endian bytes.  Only 2-, 4- and 16-byte forms exist.
    pub fn from_le_slice(bytes: &[u8]) -> Result<Self> {
        match bytes.len() {
            2 => Ok(Self::Uuid16(u16::from_le_bytes([bytes[0], bytes[1]]))),
            4 => Ok(Self::Uuid32(u32::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ]))),
            16 => {
                let mut b = [0u8; 16];
                b.copy_from_slice(bytes);
                Ok(Self::Uuid128(b))
            }
            _ => Err(BleError::InvalidArgument),
        }
    }

    /// Build from a stack query record.  The short form wins when it is
    /// populated; otherwise the big-endian 128-bit bytes are reversed.
    pub fn from_stack(uuid16: u16, uuid128_be: &[u8; 16]) -> Self {
        if uuid16 != 0 {
            Self::Uuid16(uuid16)
        } else {
            let mut le = *uuid128_be;
            le.reverse();
            Self::Uuid128(le)
        }
    }

    /// Convert for a stack call.  32-bit UUIDs have no stack form.
    pub fn to_stack(&self) -> Result<StackUuid> {
        match *self {
            Self::Uuid16(v) => Ok(StackUuid::Short(v)),
            Self::Uuid32(_) => Err(BleError::InvalidArgument),
            Self::Uuid128(le) => {
                let mut be = le;
                be.reverse();
                Ok(StackUuid::Long(be))
            }
        }
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid16(v) => write!(f, "0x{v:04x}"),
            Self::Uuid32(v) => write!(f, "0x{v:08x}"),
            Self::Uuid128(le) => {
                for (i, b) in le.iter().rev().enumerate() {
                    if matches!(i, 4 | 6 | 8 | 10) {
                        write!(f, "-")?;
                    }
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}
