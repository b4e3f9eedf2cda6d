//! Object handles and root-count bookkeeping.
//!
//! A [`JsObjectHandle`] is an opaque, cloneable token naming a value rooted
//! in the engine heap. Handles may cross threads freely; dereferencing them
//! is the bridge's job and happens only on the engine thread. Clone and drop
//! maintain a shared [`RootLedger`]; an entry whose count reaches zero is
//! retired onto a queue, and the bridge unroots retired entries the next
//! time it runs. The split keeps native refcounting and the engine's garbage
//! collector from ever reasoning about each other directly: the ledger is
//! the only thing a foreign thread touches.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a value rooted in the engine heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(Uuid);

impl HandleId {
    /// Mints a fresh identifier.
    #[must_use]
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(formatter)
    }
}

/// Identifier of a bridge instance, stamped into every handle it produces.
///
/// The bridge refuses to dereference handles carrying a different id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BridgeId(Uuid);

impl BridgeId {
    /// Mints a fresh identifier.
    #[must_use]
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BridgeId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(formatter)
    }
}

/// Shared root-count bookkeeping between a bridge and its handles.
///
/// The ledger is plain data and may be touched from any thread; the
/// engine-side root table is confined to the engine thread. Dropping the
/// last handle to an entry only retires its id here — the actual unroot
/// happens when the bridge next drains the retired queue.
#[derive(Debug, Default)]
pub struct RootLedger {
    /// Live root counts keyed by handle id.
    counts: Mutex<HashMap<HandleId, usize>>,
    /// Ids whose count reached zero, awaiting unroot on the engine thread.
    retired: Mutex<Vec<HandleId>>,
}

impl RootLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the root count for `id`.
    pub fn retain(&self, id: HandleId) {
        let mut counts = self.lock_counts();
        *counts.entry(id).or_insert(0) += 1;
    }

    /// Decrements the root count for `id`, retiring the entry at zero.
    ///
    /// Releasing an id the ledger does not know is a no-op; this makes drops
    /// of handles that outlive their bridge harmless.
    pub fn release(&self, id: HandleId) {
        let mut counts = self.lock_counts();
        let Some(count) = counts.get_mut(&id) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            counts.remove(&id);
            drop(counts);
            self.lock_retired().push(id);
            tracing::trace!(%id, "root retired");
        }
    }

    /// Whether `id` currently has a nonzero root count.
    #[must_use]
    pub fn is_live(&self, id: HandleId) -> bool {
        self.lock_counts().contains_key(&id)
    }

    /// Number of ids with a nonzero root count.
    #[must_use]
    pub fn live_roots(&self) -> usize {
        self.lock_counts().len()
    }

    /// Takes the ids retired since the last drain.
    #[must_use]
    pub fn drain_retired(&self) -> Vec<HandleId> {
        std::mem::take(&mut *self.lock_retired())
    }

    fn lock_counts(&self) -> MutexGuard<'_, HashMap<HandleId, usize>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_retired(&self) -> MutexGuard<'_, Vec<HandleId>> {
        self.retired.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Opaque, reference-counted token for an object rooted in the engine heap.
///
/// Cloning retains the underlying root; dropping releases it. Two handles
/// compare equal exactly when they name the same rooted value of the same
/// bridge instance. The handle never dereferences anything itself, so it is
/// safe to move between threads.
#[derive(Debug)]
pub struct JsObjectHandle {
    id: HandleId,
    bridge: BridgeId,
    ledger: Arc<RootLedger>,
}

impl JsObjectHandle {
    /// Wraps an already-retained ledger entry in a handle.
    ///
    /// The caller (the bridge) must have retained `id` exactly once on this
    /// handle's behalf before constructing it.
    #[must_use]
    pub fn new(id: HandleId, bridge: BridgeId, ledger: Arc<RootLedger>) -> Self {
        Self { id, bridge, ledger }
    }

    /// Identifier of the rooted value this handle names.
    #[must_use]
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Bridge instance that produced this handle.
    #[must_use]
    pub fn bridge_id(&self) -> BridgeId {
        self.bridge
    }

    /// Whether this handle and `other` name the identical engine value.
    #[must_use]
    pub fn same_value(&self, other: &Self) -> bool {
        self.id == other.id && self.bridge == other.bridge
    }
}

impl Clone for JsObjectHandle {
    fn clone(&self) -> Self {
        self.ledger.retain(self.id);
        Self {
            id: self.id,
            bridge: self.bridge,
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl Drop for JsObjectHandle {
    fn drop(&mut self) {
        self.ledger.release(self.id);
    }
}

impl PartialEq for JsObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl Eq for JsObjectHandle {}
