//! Host-function installation inside the engine context.
//!
//! Host functions become global script callables. Arguments are converted
//! engine→JSON before invocation, the native function runs synchronously on
//! the engine thread, and its JSON result is converted back. A native
//! failure is rethrown in the engine as a script error at the call site.

use std::sync::Arc;

use boa_engine::{Context, JsNativeError, NativeFunction, js_string};
use tether_core::{BridgeError, BridgeResult, HostFunction};

use super::conversion::{js_value_to_json_raw, json_to_js_value};

/// Install `function` as a global callable named `name`.
///
/// # Errors
/// Fails with [`BridgeError::Engine`] if the engine rejects the
/// registration.
#[allow(
    unsafe_code,
    reason = "Arc<dyn HostFunction> is not Trace, but safe to capture as documented below"
)]
pub(crate) fn install(
    context: &mut Context,
    name: &str,
    function: Arc<dyn HostFunction>,
) -> BridgeResult<()> {
    // SAFETY: Arc<dyn HostFunction> is not Trace, but the capture is sound:
    // 1. Host functions are immutable and Send + Sync behind the Arc
    // 2. The closure holds its own strong count, so the function outlives
    //    every call the context can make
    // 3. The closure captures nothing that the collector needs to trace
    let callable = unsafe {
        NativeFunction::from_closure(move |_this, args, ctx| {
            tracing::debug!(
                function = function.name(),
                argc = args.len(),
                "host function called from script"
            );

            let mut json_args = Vec::with_capacity(args.len());
            for arg in args {
                json_args.push(js_value_to_json_raw(arg, ctx)?);
            }

            let result = function
                .invoke(&json_args)
                .map_err(|err| JsNativeError::error().with_message(err.to_string()))?;

            json_to_js_value(&result, ctx)
        })
    };

    context
        .register_global_callable(js_string!(name), 0, callable)
        .map_err(|err| {
            BridgeError::Engine(format!("failed to install host function '{name}': {err}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use boa_engine::Source;
    use serde_json::{Value as JsonValue, json};

    struct Doubler;

    impl HostFunction for Doubler {
        fn name(&self) -> &str {
            "double"
        }

        fn invoke(&self, args: &[JsonValue]) -> BridgeResult<JsonValue> {
            let input = args
                .first()
                .and_then(JsonValue::as_f64)
                .ok_or_else(|| BridgeError::precondition("double expects a number"))?;
            Ok(json!(input * 2.0))
        }
    }

    /// Tests a host function called from script with a converted result.
    ///
    /// # Panics
    /// Panics if assertions fail during test execution.
    #[test]
    fn test_host_function_roundtrip() {
        let mut context = Context::default();
        install(&mut context, "double", Arc::new(Doubler)).expect("install must succeed");

        let result = context
            .eval(Source::from_bytes("double(21)"))
            .expect("call must succeed");
        assert_eq!(result.as_number(), Some(42.0));
    }

    /// Tests that a native failure surfaces as a script error.
    ///
    /// # Panics
    /// Panics if assertions fail during test execution.
    #[test]
    fn test_native_failure_throws_in_script() {
        let mut context = Context::default();
        install(&mut context, "double", Arc::new(Doubler)).expect("install must succeed");

        let outcome = context.eval(Source::from_bytes("double('not a number')"));
        assert!(outcome.is_err());

        let caught = context
            .eval(Source::from_bytes(
                "(() => { try { double(); return 'no error'; } catch (err) { return err.message; } })()",
            ))
            .expect("guarded call must succeed");
        assert!(
            caught
                .as_string()
                .map(|js_str| js_str.to_std_string_escaped())
                .is_some_and(|message| message.contains("expects a number"))
        );
    }
}
