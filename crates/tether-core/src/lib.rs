//! Engine-agnostic vocabulary for the Tether bridge.
//!
//! This crate defines the surface shared between the engine bridge and the
//! host that embeds it: the error taxonomy, the tagged script value crossing
//! the native/engine boundary, reference-counted object handles with their
//! root-count ledger, and the collaborator traits the host supplies at
//! construction. Nothing here depends on the engine crate; the bridge side
//! lives in `tether-bridge`.
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

/// Error taxonomy for bridge operations.
mod error;
/// Object handles and root-count bookkeeping.
mod handle;
/// Collaborator traits implemented by the embedding host.
mod interop;
/// Tagged script value crossing the native/engine boundary.
mod value;

pub use error::{BridgeError, BridgeResult};
pub use handle::{BridgeId, HandleId, JsObjectHandle, RootLedger};
pub use interop::{EngineJob, HostFunction, HostTransport, InteropMediator};
pub use value::{ScriptKind, ScriptValue};
