//! Adapter lifecycle state.
//!
//! ```text
//!          init()            stack "working"
//!   Off ───────────▶ Starting ───────────────▶ Active
//!    ▲                  │                        │
//!    │     timer        ▼                        │ deinit() + stack "off"
//!    └──(forced)─── TimedOut ◀──── timer ────────┤ (or timer, forced)
//!    └───────────────────────────────────────────┘
//! ```
//!
//! Only the lifecycle controller (`BleAdapter::init`/`deinit`, the
//! init/deinit timer) and the demultiplexer's stack-state handling move
//! between these states.

use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AdapterState {
    Off = 0,
    Starting = 1,
    Active = 2,
    TimedOut = 3,
}

impl AdapterState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Starting => "Starting",
            Self::Active => "Active",
            Self::TimedOut => "TimedOut",
        }
    }

    /// Whether `self -> next` is one of the edges in the diagram above.
    /// Self-transitions are always allowed (the stack may repeat itself).
    pub fn can_transition_to(self, next: Self) -> bool {
        use AdapterState::*;
        self == next
            || matches!(
                (self, next),
                (Off, Starting)
                    | (Starting, Active)
                    | (Starting, TimedOut)
                    | (TimedOut, Off)
                    | (Active, Off)
                    | (Active, TimedOut)
                    | (Starting, Off)
            )
    }
}

/// Apply a transition, logging it.  Illegal edges trip a debug assertion
/// but are still applied so release builds track what the stack reported.
pub(crate) fn transition(current: &mut AdapterState, next: AdapterState) {
    if *current == next {
        return;
    }
    debug_assert!(
        current.can_transition_to(next),
        "illegal adapter transition {} -> {}",
        current.name(),
        next.name()
    );
    info!("BLE state: {} -> {}", current.name(), next.name());
    *current = next;
}
