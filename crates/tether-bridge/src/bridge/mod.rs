//! Engine bridge over an embedded Boa context.
//!
//! One [`EngineBridge`] owns one engine context for its whole life. Native
//! code reaches the engine's object graph exclusively through the bridge:
//! handles to the global and main objects, fresh allocations, named module
//! registration, host functions, script evaluation, and property access.
//! Every operation checks the lifecycle state first and sweeps roots whose
//! handles were dropped on other threads.

/// Value conversion across the native/engine boundary.
mod conversion;
/// Host-function installation inside the engine context.
mod host_fn;
/// Settling of promise results after the job queue drains.
mod promise;
/// Named module registry.
mod registry;
/// Engine-side root table for handle-addressed objects.
mod roots;

use std::collections::HashMap;
use std::sync::Arc;

use boa_engine::object::JsObject;
use boa_engine::property::Attribute;
use boa_engine::{Context, JsValue, Source, js_string};
use serde_json::Value as JsonValue;
use tether_core::{
    BridgeError, BridgeId, BridgeResult, HandleId, HostFunction, HostTransport, InteropMediator,
    JsObjectHandle, ScriptValue,
};

use conversion::{js_to_script, js_value_to_json, json_to_js_value, script_to_js};
use registry::ModuleRegistry;
use roots::RootTable;

/// Default global property under which the main object is installed.
const DEFAULT_NAMESPACE: &str = "host";

/// Lifecycle state of a bridge instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BridgeState {
    /// Construction completed; operations are accepted.
    Ready,
    /// `teardown` ran; every operation fails fast.
    TornDown,
}

/// Builder for [`EngineBridge`].
///
/// The host transport and interop mediator are mandatory collaborators;
/// [`build`](Self::build) refuses to produce a bridge without them.
#[derive(Default)]
pub struct BridgeBuilder {
    transport: Option<Arc<dyn HostTransport>>,
    mediator: Option<Arc<dyn InteropMediator>>,
    namespace: Option<String>,
}

impl BridgeBuilder {
    /// Sets the host transport that marshals work onto the engine thread.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HostTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the mediator toward the second native-language runtime.
    #[must_use]
    pub fn mediator(mut self, mediator: Arc<dyn InteropMediator>) -> Self {
        self.mediator = Some(mediator);
        self
    }

    /// Overrides the global property name under which the main object is
    /// installed. Defaults to `"host"`.
    #[must_use]
    pub fn namespace<T: Into<String>>(mut self, namespace: T) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Creates the engine context, roots the global and main objects, and
    /// installs the main object under the configured namespace.
    ///
    /// # Errors
    /// Fails with [`BridgeError::Precondition`] if the transport or mediator
    /// is missing, or the namespace is empty; with [`BridgeError::Engine`]
    /// if installing the main object fails. No bridge instance exists after
    /// an error.
    pub fn build(self) -> BridgeResult<EngineBridge> {
        let transport = self
            .transport
            .ok_or_else(|| BridgeError::precondition("host transport is required"))?;
        let mediator = self
            .mediator
            .ok_or_else(|| BridgeError::precondition("interop mediator is required"))?;
        let namespace = self
            .namespace
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned());
        if namespace.is_empty() {
            return Err(BridgeError::precondition("namespace must be non-empty"));
        }

        let mut context = Context::default();
        let bridge_id = BridgeId::fresh();
        let mut roots = RootTable::new(bridge_id);

        let global_id = roots.root_pinned(context.global_object());

        let main = JsObject::with_object_proto(context.intrinsics());
        context
            .register_global_property(
                js_string!(namespace.as_str()),
                JsValue::from(main.clone()),
                Attribute::all(),
            )
            .map_err(|err| BridgeError::Engine(format!("failed to install main object: {err}")))?;
        let main_id = roots.root_pinned(main);

        tracing::debug!(
            bridge = %bridge_id,
            namespace = %namespace,
            transport = transport.label(),
            "engine bridge initialized"
        );

        Ok(EngineBridge {
            context,
            roots,
            modules: ModuleRegistry::new(),
            host_functions: HashMap::new(),
            transport,
            mediator,
            bridge_id,
            global_id,
            main_id,
            namespace,
            state: BridgeState::Ready,
        })
    }
}

/// Native-side owner of one embedded engine instance.
///
/// The context is not `Send`, so the bridge lives on the engine thread and
/// every operation runs there synchronously. Handles the bridge produces are
/// `Send` tokens; foreign threads marshal dereferences back through the host
/// transport.
pub struct EngineBridge {
    context: Context,
    roots: RootTable,
    modules: ModuleRegistry,
    host_functions: HashMap<String, Arc<dyn HostFunction>>,
    transport: Arc<dyn HostTransport>,
    mediator: Arc<dyn InteropMediator>,
    bridge_id: BridgeId,
    global_id: HandleId,
    main_id: HandleId,
    namespace: String,
    state: BridgeState,
}

impl EngineBridge {
    /// Starts building a bridge.
    #[must_use]
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::default()
    }

    /// Handle to the engine's global object.
    ///
    /// Idempotent: every call returns a handle with the same id, referring
    /// to the same engine value, for the whole bridge lifetime.
    ///
    /// # Errors
    /// Fails with [`BridgeError::NotInitialized`] after teardown.
    pub fn global(&mut self) -> BridgeResult<JsObjectHandle> {
        self.enter()?;
        Ok(self.roots.handle_for(self.global_id))
    }

    /// Handle to the main entry-point object, the designated target for
    /// host-initiated calls into the engine.
    ///
    /// Same stability guarantee as [`global`](Self::global).
    ///
    /// # Errors
    /// Fails with [`BridgeError::NotInitialized`] after teardown.
    pub fn main_object(&mut self) -> BridgeResult<JsObjectHandle> {
        self.enter()?;
        Ok(self.roots.handle_for(self.main_id))
    }

    /// Allocates a new empty object in the engine heap and roots it.
    ///
    /// The object stays alive as long as the returned handle or any clone
    /// of it does. Every call yields a distinct object.
    ///
    /// # Errors
    /// Fails with [`BridgeError::NotInitialized`] after teardown.
    pub fn create_object(&mut self) -> BridgeResult<JsObjectHandle> {
        self.enter()?;
        let object = JsObject::with_object_proto(self.context.intrinsics());
        Ok(self.roots.root(object))
    }

    /// Makes `module` reachable from script code as a property of the main
    /// object under `name`, and records the association in the registry.
    ///
    /// Re-registration under an existing name overwrites the previous
    /// association; the displaced object stays valid while externally
    /// referenced. The interop mediator is notified on success.
    ///
    /// # Errors
    /// Fails with [`BridgeError::Precondition`] for an empty name, with
    /// [`BridgeError::InvalidHandle`] for a handle this bridge did not
    /// produce, and with [`BridgeError::NotInitialized`] after teardown.
    pub fn register_module_object(
        &mut self,
        module: &JsObjectHandle,
        name: &str,
    ) -> BridgeResult<()> {
        self.enter()?;
        if name.is_empty() {
            return Err(BridgeError::precondition("module name must be non-empty"));
        }

        let object = self.roots.resolve(module)?.clone();
        let main = self.roots.resolve_id(self.main_id)?.clone();
        main.set(
            js_string!(name),
            JsValue::from(object),
            true,
            &mut self.context,
        )
        .map_err(|err| BridgeError::Engine(format!("failed to install module '{name}': {err}")))?;

        self.roots.retain_pin(module.id());
        if let Some(displaced) = self.modules.insert(name, module.id()) {
            self.roots.release_pin(displaced);
        }

        tracing::debug!(module = name, id = %module.id(), "module object registered");
        self.mediator.module_registered(name);
        Ok(())
    }

    /// Looks up the module registered under `name`.
    ///
    /// The returned handle is identical (by id) to the one registered.
    ///
    /// # Errors
    /// Fails with [`BridgeError::NotInitialized`] after teardown.
    pub fn module_object(&mut self, name: &str) -> BridgeResult<Option<JsObjectHandle>> {
        self.enter()?;
        Ok(self.modules.get(name).map(|id| self.roots.handle_for(id)))
    }

    /// Evaluates script source on the engine, drains the job queue, settles
    /// a promise result if any, and tags the outcome.
    ///
    /// # Errors
    /// Fails with [`BridgeError::Engine`] on a script error or promise
    /// rejection, and with [`BridgeError::NotInitialized`] after teardown.
    pub fn eval(&mut self, source: &str) -> BridgeResult<ScriptValue> {
        self.enter()?;
        let raw = self
            .context
            .eval(Source::from_bytes(source))
            .map_err(|err| BridgeError::Engine(format!("script error: {err}")))?;
        drop(self.context.run_jobs());
        let settled = promise::settle(raw, &mut self.context)?;
        Ok(js_to_script(&settled, &mut self.roots))
    }

    /// Reads one property of a rooted object.
    ///
    /// Object results are rooted under a fresh handle.
    ///
    /// # Errors
    /// Fails with [`BridgeError::InvalidHandle`] for a foreign or unrooted
    /// handle, [`BridgeError::Engine`] if the read itself fails, and
    /// [`BridgeError::NotInitialized`] after teardown.
    pub fn get_property(
        &mut self,
        target: &JsObjectHandle,
        key: &str,
    ) -> BridgeResult<ScriptValue> {
        self.enter()?;
        let object = self.roots.resolve(target)?.clone();
        let value = object
            .get(js_string!(key), &mut self.context)
            .map_err(|err| BridgeError::Engine(format!("failed to read '{key}': {err}")))?;
        Ok(js_to_script(&value, &mut self.roots))
    }

    /// Writes one property of a rooted object.
    ///
    /// # Errors
    /// Fails with [`BridgeError::InvalidHandle`] for a foreign or unrooted
    /// handle (target or value), [`BridgeError::Engine`] if the write
    /// fails, and [`BridgeError::NotInitialized`] after teardown.
    pub fn set_property(
        &mut self,
        target: &JsObjectHandle,
        key: &str,
        value: ScriptValue,
    ) -> BridgeResult<()> {
        self.enter()?;
        let object = self.roots.resolve(target)?.clone();
        let converted = script_to_js(&value, &self.roots)?;
        object
            .set(js_string!(key), converted, true, &mut self.context)
            .map_err(|err| BridgeError::Engine(format!("failed to write '{key}': {err}")))?;
        Ok(())
    }

    /// Calls a rooted callable with `undefined` receiver, drains the job
    /// queue, settles a promise result, and tags the outcome.
    ///
    /// # Errors
    /// Fails with [`BridgeError::NotCallable`] if the target is not
    /// callable, [`BridgeError::InvalidHandle`] for a foreign or unrooted
    /// handle, [`BridgeError::Engine`] on a thrown error or rejection, and
    /// [`BridgeError::NotInitialized`] after teardown.
    pub fn call_function(
        &mut self,
        target: &JsObjectHandle,
        args: &[ScriptValue],
    ) -> BridgeResult<ScriptValue> {
        self.enter()?;
        let object = self.roots.resolve(target)?.clone();
        if !object.is_callable() {
            return Err(BridgeError::NotCallable(target.id()));
        }

        let mut converted = Vec::with_capacity(args.len());
        for arg in args {
            converted.push(script_to_js(arg, &self.roots)?);
        }

        let raw = object
            .call(&JsValue::undefined(), &converted, &mut self.context)
            .map_err(|err| BridgeError::Engine(format!("function call failed: {err}")))?;
        drop(self.context.run_jobs());
        let settled = promise::settle(raw, &mut self.context)?;
        Ok(js_to_script(&settled, &mut self.roots))
    }

    /// Installs a native function as a global script callable.
    ///
    /// # Errors
    /// Fails with [`BridgeError::Precondition`] for an empty name, with
    /// [`BridgeError::Engine`] if the engine rejects the installation, and
    /// with [`BridgeError::NotInitialized`] after teardown.
    pub fn register_host_function(&mut self, function: Arc<dyn HostFunction>) -> BridgeResult<()> {
        self.enter()?;
        let name = function.name().to_owned();
        if name.is_empty() {
            return Err(BridgeError::precondition(
                "host function name must be non-empty",
            ));
        }
        host_fn::install(&mut self.context, &name, Arc::clone(&function))?;
        tracing::debug!(function = name.as_str(), "host function registered");
        self.host_functions.insert(name, function);
        Ok(())
    }

    /// Names of the host functions currently reachable from script code.
    #[must_use]
    pub fn host_function_names(&self) -> Vec<&str> {
        self.host_functions.keys().map(String::as_str).collect()
    }

    /// Deep-converts a rooted object to JSON.
    ///
    /// # Errors
    /// Fails with [`BridgeError::InvalidHandle`] for a foreign or unrooted
    /// handle, [`BridgeError::Engine`] if the engine fails while walking
    /// the value, and [`BridgeError::NotInitialized`] after teardown.
    pub fn to_json(&mut self, target: &JsObjectHandle) -> BridgeResult<JsonValue> {
        self.enter()?;
        let object = self.roots.resolve(target)?.clone();
        js_value_to_json(&JsValue::from(object), &mut self.context)
    }

    /// Builds a rooted engine object from a JSON object or array.
    ///
    /// # Errors
    /// Fails with [`BridgeError::Precondition`] if `value` is not a JSON
    /// object or array, [`BridgeError::Engine`] if allocation fails, and
    /// [`BridgeError::NotInitialized`] after teardown.
    pub fn object_from_json(&mut self, value: &JsonValue) -> BridgeResult<JsObjectHandle> {
        self.enter()?;
        let built = json_to_js_value(value, &mut self.context)
            .map_err(|err| BridgeError::Engine(format!("failed to build object: {err}")))?;
        built.as_object().map_or_else(
            || {
                Err(BridgeError::precondition(
                    "JSON value does not describe an object or array",
                ))
            },
            |object| Ok(self.roots.root(object)),
        )
    }

    /// Tears the bridge down: clears the module registry and every root,
    /// notifies the mediator, and rejects all further operations.
    ///
    /// Idempotent. Outstanding handles become opaque tokens that no longer
    /// resolve.
    pub fn teardown(&mut self) {
        if self.state == BridgeState::TornDown {
            return;
        }
        self.state = BridgeState::TornDown;
        tracing::debug!(
            bridge = %self.bridge_id,
            modules = self.modules.len(),
            "engine bridge torn down"
        );
        self.modules.clear();
        self.roots.clear();
        self.host_functions.clear();
        self.mediator.bridge_closed();
    }

    /// The host transport supplied at construction.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn HostTransport> {
        &self.transport
    }

    /// The interop mediator supplied at construction.
    #[must_use]
    pub fn mediator(&self) -> &Arc<dyn InteropMediator> {
        &self.mediator
    }

    /// Global property name under which the main object is installed.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Identifier stamped into every handle this bridge produces.
    #[must_use]
    pub fn bridge_id(&self) -> BridgeId {
        self.bridge_id
    }

    /// Lifecycle gate run at the top of every operation: reject torn-down
    /// bridges, then unroot entries retired by off-thread handle drops.
    fn enter(&mut self) -> BridgeResult<()> {
        if self.state == BridgeState::TornDown {
            return Err(BridgeError::NotInitialized);
        }
        self.roots.sweep();
        Ok(())
    }
}

impl Drop for EngineBridge {
    fn drop(&mut self) {
        self.teardown();
    }
}
