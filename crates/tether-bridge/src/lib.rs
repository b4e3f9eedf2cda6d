//! Embedded script-engine bridge.
//!
//! This crate owns a Boa JavaScript context and mediates between native host
//! code and the engine's object graph:
//! - rooted object handles that keep engine values alive while native code
//!   holds them, with deferred unrooting for handles dropped off-thread
//! - a named module registry making native-built objects visible to script
//!   code under a configurable global namespace
//! - native host functions callable from script
//! - value conversion across the boundary, including deep JSON conversion
//!
//! The bridge is single-threaded by construction: the engine context is not
//! `Send`, every operation takes `&mut self`, and cross-thread callers must
//! marshal through the host transport supplied at construction.
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::print_stdout,
        clippy::print_stderr,
        reason = "Allow for tests"
    )
)]

/// The engine bridge and its operation surface.
mod bridge;

pub use bridge::{BridgeBuilder, EngineBridge};
pub use tether_core::{
    BridgeError, BridgeId, BridgeResult, EngineJob, HandleId, HostFunction, HostTransport,
    InteropMediator, JsObjectHandle, RootLedger, ScriptKind, ScriptValue,
};
