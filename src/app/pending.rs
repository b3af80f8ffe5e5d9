//! Buffered send queue.
//!
//! Holds owned copies of outbound payloads for sends the stack could not
//! take synchronously, until the matching readiness callback or
//! completion event consumes them.
//!
//! The stack reports back in two shapes, so the queue offers two lookups:
//!
//! | Shape                          | Used by                          | Lookup            |
//! |--------------------------------|----------------------------------|-------------------|
//! | context callback (our id back) | Notify / Indicate ready          | [`PendingQueue::remove`] by id |
//! | bare connection handle         | write-no-response ready, write-with-response complete | [`PendingQueue::find_and_remove`] by identity |
//!
//! Queue membership is the sole owner of a [`PendingOp`]: removal hands
//! the record (and its payload) to the caller, who drops it once the
//! deferred send is done.

use log::debug;

use super::dispatch::notify_indicate_ready_handler;
use super::events::{AttrHandle, ConnHandle};
use super::ports::ContextRegistration;

/// What the deferred send will do once the stack is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingKind {
    /// Waiting for a context callback.
    Notify,
    /// Waiting for a context callback.
    Indicate,
    /// Waiting for a can-write-without-response event on the connection.
    WriteNoResponse,
    /// Payload held until the write's query-complete event.
    WriteWithResponse,
}

impl PendingKind {
    /// Kinds that are resumed through a context registration.
    pub fn uses_context_callback(self) -> bool {
        matches!(self, Self::Notify | Self::Indicate)
    }
}

/// Identity handed to the stack inside a [`ContextRegistration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PendingId(u32);

impl PendingId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// One in-flight send that could not complete synchronously.
#[derive(Debug)]
pub struct PendingOp {
    id: PendingId,
    kind: PendingKind,
    conn_handle: ConnHandle,
    value_handle: AttrHandle,
    payload: Box<[u8]>,
    registration: Option<ContextRegistration>,
}

impl PendingOp {
    pub fn id(&self) -> PendingId {
        self.id
    }

    pub fn kind(&self) -> PendingKind {
        self.kind
    }

    pub fn conn_handle(&self) -> ConnHandle {
        self.conn_handle
    }

    pub fn value_handle(&self) -> AttrHandle {
        self.value_handle
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Readiness registration, present for Notify/Indicate only.
    pub fn registration(&self) -> Option<ContextRegistration> {
        self.registration
    }

    /// Overwrite the queued payload with a newer value.
    pub(crate) fn replace_payload(&mut self, payload: &[u8]) {
        self.payload = payload.into();
    }

    fn matches(&self, kind: PendingKind, conn_handle: ConnHandle, value_handle: Option<AttrHandle>) -> bool {
        self.kind == kind
            && self.conn_handle == conn_handle
            && value_handle.is_none_or(|h| h == self.value_handle)
    }
}

/// Unordered collection of [`PendingOp`]s.  Scans are first-match in
/// insertion order.
#[derive(Debug, Default)]
pub struct PendingQueue {
    ops: Vec<PendingOp>,
    next_id: u32,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `payload` into a new record and append it.  Notify/Indicate
    /// records carry a ready-callback registration whose context is the
    /// record's own id.
    pub fn enqueue(
        &mut self,
        kind: PendingKind,
        conn_handle: ConnHandle,
        value_handle: AttrHandle,
        payload: &[u8],
    ) -> &PendingOp {
        let id = PendingId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        let registration = kind.uses_context_callback().then_some(ContextRegistration {
            callback: notify_indicate_ready_handler,
            context: id,
        });

        debug!(
            "pending: enqueue {:?} conn={} handle={} len={} id={}",
            kind,
            conn_handle,
            value_handle,
            payload.len(),
            id.0
        );

        self.ops.push(PendingOp {
            id,
            kind,
            conn_handle,
            value_handle,
            payload: payload.into(),
            registration,
        });
        let last = self.ops.len() - 1;
        &self.ops[last]
    }

    /// Remove and return the first record matching `kind` and
    /// `conn_handle`.  `value_handle: None` matches any value handle.
    pub fn find_and_remove(
        &mut self,
        kind: PendingKind,
        conn_handle: ConnHandle,
        value_handle: Option<AttrHandle>,
    ) -> Option<PendingOp> {
        let Some(pos) = self
            .ops
            .iter()
            .position(|op| op.matches(kind, conn_handle, value_handle))
        else {
            debug!("pending: no {:?} for conn={}", kind, conn_handle);
            return None;
        };
        let op = self.ops.remove(pos);
        debug!(
            "pending: found {:?} conn={} handle={} len={}",
            kind,
            conn_handle,
            op.value_handle,
            op.payload.len()
        );
        Some(op)
    }

    /// Remove exactly the record registered under `id`.
    ///
    /// # Panics
    ///
    /// When `id` is not queued.  The stack only calls back for
    /// registrations it still holds, so a miss means the queue has been
    /// corrupted.
    pub fn remove(&mut self, id: PendingId) -> PendingOp {
        let Some(pos) = self.ops.iter().position(|op| op.id == id) else {
            panic!("pending operation {} is not queued", id.0);
        };
        self.ops.remove(pos)
    }

    /// Mutable access to a queued record without removing it.
    pub fn find_mut(
        &mut self,
        kind: PendingKind,
        conn_handle: ConnHandle,
        value_handle: Option<AttrHandle>,
    ) -> Option<&mut PendingOp> {
        self.ops
            .iter_mut()
            .find(|op| op.matches(kind, conn_handle, value_handle))
    }

    pub fn get(&self, id: PendingId) -> Option<&PendingOp> {
        self.ops.iter().find(|op| op.id == id)
    }

    pub fn contains(
        &self,
        kind: PendingKind,
        conn_handle: ConnHandle,
        value_handle: Option<AttrHandle>,
    ) -> bool {
        self.ops
            .iter()
            .any(|op| op.matches(kind, conn_handle, value_handle))
    }

    /// Drop every record for `conn_handle` whose kind satisfies `filter`.
    /// Returns how many were dropped.
    pub fn purge_connection(
        &mut self,
        conn_handle: ConnHandle,
        filter: impl Fn(PendingKind) -> bool,
    ) -> usize {
        let before = self.ops.len();
        self.ops
            .retain(|op| !(op.conn_handle == conn_handle && filter(op.kind)));
        before - self.ops.len()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingOp> {
        self.ops.iter()
    }
}
