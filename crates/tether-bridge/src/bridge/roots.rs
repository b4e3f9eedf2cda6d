//! Engine-side root table for handle-addressed objects.
//!
//! This is the engine-thread half of the ownership bridge: the table owns
//! the actual `JsObject` roots (strong references the engine's collector
//! honors), while the shared [`RootLedger`] carries the counts handles
//! maintain from any thread. Unrooting is deferred — a handle dropped on a
//! foreign thread retires its id into the ledger, and [`RootTable::sweep`]
//! removes the root here on the next bridge operation.

use std::collections::HashMap;
use std::sync::Arc;

use boa_engine::object::JsObject;
use tether_core::{BridgeError, BridgeId, BridgeResult, HandleId, JsObjectHandle, RootLedger};

pub(crate) struct RootTable {
    entries: HashMap<HandleId, JsObject>,
    ledger: Arc<RootLedger>,
    bridge: BridgeId,
}

impl RootTable {
    pub(crate) fn new(bridge: BridgeId) -> Self {
        Self {
            entries: HashMap::new(),
            ledger: Arc::new(RootLedger::new()),
            bridge,
        }
    }

    /// Root `object` under a fresh id and hand out the first handle to it.
    pub(crate) fn root(&mut self, object: JsObject) -> JsObjectHandle {
        let id = HandleId::fresh();
        self.entries.insert(id, object);
        self.handle_for(id)
    }

    /// Root `object` with a bridge-held count, so the root survives even
    /// with no outstanding handles. Used for the global and main objects.
    pub(crate) fn root_pinned(&mut self, object: JsObject) -> HandleId {
        let id = HandleId::fresh();
        self.entries.insert(id, object);
        self.ledger.retain(id);
        id
    }

    /// Mint a new handle for an already-rooted id.
    pub(crate) fn handle_for(&self, id: HandleId) -> JsObjectHandle {
        self.ledger.retain(id);
        JsObjectHandle::new(id, self.bridge, Arc::clone(&self.ledger))
    }

    /// Add a bridge-held count to `id` (module-registry hold).
    pub(crate) fn retain_pin(&self, id: HandleId) {
        self.ledger.retain(id);
    }

    /// Drop a bridge-held count from `id`.
    pub(crate) fn release_pin(&self, id: HandleId) {
        self.ledger.release(id);
    }

    /// Resolve a handle to its rooted object, validating that this bridge
    /// produced it.
    ///
    /// # Errors
    /// Fails with [`BridgeError::InvalidHandle`] for a handle stamped with a
    /// different bridge id or whose root is gone.
    pub(crate) fn resolve(&self, handle: &JsObjectHandle) -> BridgeResult<&JsObject> {
        if handle.bridge_id() != self.bridge {
            return Err(BridgeError::InvalidHandle(handle.id()));
        }
        self.resolve_id(handle.id())
    }

    /// Resolve a rooted id to its object.
    ///
    /// # Errors
    /// Fails with [`BridgeError::InvalidHandle`] if nothing is rooted under
    /// `id`.
    pub(crate) fn resolve_id(&self, id: HandleId) -> BridgeResult<&JsObject> {
        self.entries.get(&id).ok_or(BridgeError::InvalidHandle(id))
    }

    /// Unroot entries whose ledger count reached zero.
    pub(crate) fn sweep(&mut self) {
        let retired = self.ledger.drain_retired();
        if retired.is_empty() {
            return;
        }
        let mut dropped = 0_usize;
        for id in retired {
            // A retire can be outrun by a re-retain through `handle_for`;
            // the ledger is authoritative on liveness.
            if !self.ledger.is_live(id) && self.entries.remove(&id).is_some() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, live = self.entries.len(), "swept retired roots");
        }
    }

    /// Drop every root. Outstanding handles keep their ledger counts and
    /// simply stop resolving.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
