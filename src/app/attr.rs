//! Attribute value entry.
//!
//! One resizable byte buffer per attribute handle.  Writes are clamped to
//! the entry's capacity and never fail on length; callers that care about
//! truncation compare the returned count with what they offered.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrEntry {
    value: Vec<u8>,
    capacity: usize,
    /// Peer writes land after the current value instead of replacing it.
    append: bool,
}

impl AttrEntry {
    pub fn new(capacity: usize) -> Self {
        Self {
            value: Vec::with_capacity(capacity),
            capacity,
            append: false,
        }
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_append(&self) -> bool {
        self.append
    }

    /// Replace the whole value.  Returns the number of bytes kept.
    pub fn set_value(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.capacity);
        self.value.clear();
        self.value.extend_from_slice(&data[..n]);
        n
    }

    /// Write coming from a peer through the attribute server.
    ///
    /// Without append mode the value is replaced from the start.  In
    /// append mode the bytes go after the current value, so a long write
    /// arriving in fragments is coalesced.  Returns the number of bytes
    /// kept.
    pub fn peer_write(&mut self, data: &[u8]) -> usize {
        let start = if self.append { self.value.len() } else { 0 };
        let n = data.len().min(self.capacity.saturating_sub(start));
        self.value.truncate(start);
        self.value.extend_from_slice(&data[..n]);
        n
    }

    /// Serve a read window.  With no buffer this is a size query and the
    /// full value length is returned.  An offset past the end yields zero
    /// bytes.
    pub fn read_window(&self, offset: u16, buffer: Option<&mut [u8]>) -> usize {
        let Some(buffer) = buffer else {
            return self.value.len();
        };
        let offset = usize::from(offset);
        if offset > self.value.len() {
            return 0;
        }
        let n = buffer.len().min(self.value.len() - offset);
        buffer[..n].copy_from_slice(&self.value[offset..offset + n]);
        n
    }

    /// Change capacity and append mode.  Shrinking drops the tail.
    pub fn resize(&mut self, capacity: usize, append: bool) {
        self.capacity = capacity;
        self.append = append;
        self.value.truncate(capacity);
    }
}
