//! Inbound events from the underlying stack.
//!
//! Packet framing belongs to the stack; by the time an event reaches the
//! adapter it has been decoded into one of these typed records.  Only the
//! fields the demultiplexer consumes are modelled.

/// Connection handle assigned by the controller.
pub type ConnHandle = u16;
/// Attribute handle in a GATT database.
pub type AttrHandle = u16;
/// Bluetooth device address, in the stack's byte order.
pub type BdAddr = [u8; 6];

/// Address type reported upward when the real one is no longer known.
pub const ADDR_TYPE_UNKNOWN: u8 = 0xff;

/// Transport packet type the stack tags every delivery with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    HciEvent = 0x04,
    AclData = 0x02,
    ScoData = 0x03,
}

/// Local role on a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    /// We initiated the link (master).
    Central,
    /// The peer initiated the link (slave).
    Peripheral,
}

/// HCI layer power state carried by the stack-state event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HciState {
    Off,
    Initializing,
    Working,
    Halting,
    Sleeping,
    FallingAsleep,
}

/// One advertising report from a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvReport {
    pub addr_type: u8,
    pub addr: BdAddr,
    pub event_type: u8,
    pub rssi: i8,
    pub data: Vec<u8>,
}

/// Primary service record from a discovery query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GattService {
    pub start_group_handle: AttrHandle,
    pub end_group_handle: AttrHandle,
    /// Non-zero when the short form is populated.
    pub uuid16: u16,
    /// Big-endian.
    pub uuid128: [u8; 16],
}

/// Characteristic record from a discovery query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GattCharacteristic {
    pub start_handle: AttrHandle,
    pub value_handle: AttrHandle,
    pub end_handle: AttrHandle,
    pub properties: u16,
    pub uuid16: u16,
    pub uuid128: [u8; 16],
}

/// Descriptor record from a discovery query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GattDescriptor {
    pub handle: AttrHandle,
    pub uuid16: u16,
    pub uuid128: [u8; 16],
}

/// Decoded stack event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEvent {
    AttConnected {
        conn_handle: ConnHandle,
    },
    AttDisconnected {
        conn_handle: ConnHandle,
    },
    LeConnectionComplete {
        conn_handle: ConnHandle,
        role: LinkRole,
        peer_addr_type: u8,
        peer_addr: BdAddr,
    },
    DisconnectionComplete {
        conn_handle: ConnHandle,
        reason: u8,
    },
    StateChanged(HciState),
    AdvertisingReport(AdvReport),
    QueryComplete {
        conn_handle: ConnHandle,
        att_status: u8,
    },
    ServiceQueryResult {
        conn_handle: ConnHandle,
        service: GattService,
    },
    CharacteristicQueryResult {
        conn_handle: ConnHandle,
        characteristic: GattCharacteristic,
    },
    DescriptorQueryResult {
        conn_handle: ConnHandle,
        descriptor: GattDescriptor,
    },
    CharacteristicValueQueryResult {
        conn_handle: ConnHandle,
        value_handle: AttrHandle,
        value: Vec<u8>,
    },
    Notification {
        conn_handle: ConnHandle,
        value_handle: AttrHandle,
        value: Vec<u8>,
    },
    Indication {
        conn_handle: ConnHandle,
        value_handle: AttrHandle,
        value: Vec<u8>,
    },
    CanWriteWithoutResponse {
        conn_handle: ConnHandle,
    },
    /// Any event type the adapter has no use for (raw HCI event code).
    Other(u8),
}
