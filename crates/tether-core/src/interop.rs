//! Collaborator traits implemented by the embedding host.
//!
//! The bridge never implements these itself: the transport and mediator are
//! constructor dependencies supplied by whichever component embeds the
//! engine, and host functions are native capabilities the host wants script
//! code to reach.

use serde_json::Value;

use crate::error::BridgeResult;

/// A unit of work delivered onto the engine thread by a [`HostTransport`].
pub type EngineJob = Box<dyn FnOnce() + Send + 'static>;

/// Delivers host-originated work onto the engine thread.
///
/// The bridge consumes the transport as a constructor dependency only and
/// performs no marshalling of its own. A caller on a foreign thread wraps
/// its bridge interaction in an [`EngineJob`] and hands it to the transport;
/// object handles may travel with the job as opaque tokens.
pub trait HostTransport: Send + Sync {
    /// Queues `job` for execution on the engine thread.
    fn dispatch(&self, job: EngineJob);

    /// Short label used in diagnostics.
    fn label(&self) -> &str {
        "host-transport"
    }
}

/// Translates between the engine bridge and a second native-language runtime.
///
/// The bridge treats the mediator as opaque and only raises notifications at
/// the points where the second runtime needs to observe the object graph
/// changing shape.
pub trait InteropMediator: Send + Sync {
    /// A module object became reachable from script code under `name`.
    fn module_registered(&self, name: &str);

    /// The bridge was torn down; every handle it produced is now dead.
    fn bridge_closed(&self) {}
}

/// A native function invocable from script code.
///
/// Arguments and results cross the boundary as JSON. Invocation happens
/// synchronously on the engine thread while script execution is suspended,
/// so implementations must not block on work that needs the engine.
pub trait HostFunction: Send + Sync {
    /// Name under which the function is reachable from script code.
    fn name(&self) -> &str;

    /// Invokes the function with already-converted arguments.
    ///
    /// # Errors
    /// Any error is rethrown inside the engine as a script error at the
    /// call site.
    fn invoke(&self, args: &[Value]) -> BridgeResult<Value>;
}
