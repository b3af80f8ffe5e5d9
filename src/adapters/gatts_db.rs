//! In-memory attribute value table.
//!
//! Implements [`AttributeStore`] with one [`AttrEntry`] per handle.  Entry
//! semantics (clamping, append mode) live on the entry itself; this type
//! only owns the map.

use std::collections::BTreeMap;

use log::debug;

use crate::app::attr::AttrEntry;
use crate::app::events::AttrHandle;
use crate::app::ports::AttributeStore;

#[derive(Debug, Default)]
pub struct GattsDb {
    entries: BTreeMap<AttrHandle, AttrEntry>,
}

impl GattsDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handles with an entry, ascending.
    pub fn handles(&self) -> impl Iterator<Item = AttrHandle> + '_ {
        self.entries.keys().copied()
    }
}

impl AttributeStore for GattsDb {
    fn create_entry(&mut self, handle: AttrHandle, capacity: usize) {
        debug!("gatts_db: entry {} capacity {}", handle, capacity);
        self.entries.insert(handle, AttrEntry::new(capacity));
    }

    fn entry(&self, handle: AttrHandle) -> Option<&AttrEntry> {
        self.entries.get(&handle)
    }

    fn entry_mut(&mut self, handle: AttrHandle) -> Option<&mut AttrEntry> {
        self.entries.get_mut(&handle)
    }
}
