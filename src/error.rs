//! Unified error types for the BLE adapter.
//!
//! Status codes coming back from the underlying stack are never passed
//! through raw.  They are folded into the small, stable [`BleError`]
//! taxonomy that callers match on.  All variants are `Copy` so they can be
//! returned from the facade and stored in test recorders without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Caller-facing error
// ---------------------------------------------------------------------------

/// Every fallible facade operation returns this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleError {
    /// Transmit buffers exhausted or an allocation failed.
    OutOfMemory,
    /// The client state machine is mid-transaction on this connection.
    AlreadyInProgress,
    /// Transient unavailability for an operation that has no deferral path.
    Busy,
    /// The connection handle has no live link.
    NotConnected,
    /// Malformed UUID, unknown handle, or a combination rejected by validation.
    InvalidArgument,
    /// Stack bring-up or teardown did not finish inside the bounded window.
    Timeout,
    /// The adapter has not been initialised.
    NotActive,
}

impl fmt::Display for BleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::AlreadyInProgress => write!(f, "operation already in progress"),
            Self::Busy => write!(f, "busy"),
            Self::NotConnected => write!(f, "not connected"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::Timeout => write!(f, "timed out"),
            Self::NotActive => write!(f, "adapter not active"),
        }
    }
}

impl std::error::Error for BleError {}

// ---------------------------------------------------------------------------
// Underlying stack status
// ---------------------------------------------------------------------------

/// Non-success status returned synchronously by a stack primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// No free ACL buffer for the packet right now.
    AclBuffersFull,
    /// The stack could not allocate memory for the request.
    MemoryAllocFailed,
    /// A GATT client query is already running on this connection.
    ClientInWrongState,
    /// The GATT client cannot send a write-without-response right now.
    ClientBusy,
    /// The GATT client has no connection for the handle.
    ClientNotConnected,
    /// Any other stack status code.
    Other(u8),
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AclBuffersFull => write!(f, "ACL buffers full"),
            Self::MemoryAllocFailed => write!(f, "memory allocation failed"),
            Self::ClientInWrongState => write!(f, "GATT client in wrong state"),
            Self::ClientBusy => write!(f, "GATT client busy"),
            Self::ClientNotConnected => write!(f, "GATT client not connected"),
            Self::Other(code) => write!(f, "stack status 0x{code:02x}"),
        }
    }
}

impl From<StackError> for BleError {
    fn from(e: StackError) -> Self {
        match e {
            StackError::AclBuffersFull | StackError::MemoryAllocFailed => Self::OutOfMemory,
            StackError::ClientInWrongState => Self::AlreadyInProgress,
            StackError::ClientBusy => Self::Busy,
            StackError::ClientNotConnected => Self::NotConnected,
            StackError::Other(_) => Self::InvalidArgument,
        }
    }
}

/// Result of a single stack primitive.
pub type StackResult = core::result::Result<(), StackError>;

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, BleError>;
