//! Settling of promise results after the job queue drains.

use boa_engine::property::Attribute;
use boa_engine::{Context, JsValue, Source, js_string};
use tether_core::{BridgeError, BridgeResult};

/// Replace a promise result with its settled value.
///
/// Non-promise values pass through untouched. The caller must have drained
/// the job queue first; a promise that is still pending afterwards settles
/// to `undefined`.
///
/// # Errors
/// A rejected promise surfaces as [`BridgeError::Engine`] carrying the
/// rejection message.
pub(crate) fn settle(result: JsValue, context: &mut Context) -> BridgeResult<JsValue> {
    if !is_promise(&result, context) {
        return Ok(result);
    }

    tracing::debug!("settling promise result");

    context
        .register_global_property(js_string!("__tether_pending__"), result, Attribute::all())
        .map_err(|err| BridgeError::Engine(format!("failed to stage promise: {err}")))?;

    // `var` plus explicit resets, so repeated settles against one context
    // neither redeclare nor observe stale state.
    let hook = r"
        var __tether_value__ = undefined;
        var __tether_reason__ = undefined;
        var __tether_rejected__ = false;
        __tether_pending__.then(
            value => { __tether_value__ = value; },
            reason => { __tether_rejected__ = true; __tether_reason__ = reason; }
        );
    ";
    context
        .eval(Source::from_bytes(hook))
        .map_err(|err| BridgeError::Engine(format!("failed to hook promise: {err}")))?;
    drop(context.run_jobs());

    let rejected = context
        .eval(Source::from_bytes("__tether_rejected__"))
        .map_err(|err| BridgeError::Engine(format!("failed to read promise state: {err}")))?;
    if rejected.as_boolean() == Some(true) {
        let reason = context
            .eval(Source::from_bytes("__tether_reason__"))
            .map_err(|err| BridgeError::Engine(format!("failed to read promise state: {err}")))?;
        return Err(BridgeError::Engine(format!(
            "promise rejected: {}",
            describe_rejection(&reason, context)
        )));
    }

    context
        .eval(Source::from_bytes("__tether_value__"))
        .map_err(|err| BridgeError::Engine(format!("failed to read settled value: {err}")))
}

/// Promise detection via the constructor name, which also covers promises
/// from subclasses and foreign realms.
fn is_promise(value: &JsValue, context: &mut Context) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    object
        .get(js_string!("constructor"), context)
        .ok()
        .and_then(|constructor| constructor.as_object())
        .and_then(|constructor_obj| constructor_obj.get(js_string!("name"), context).ok())
        .and_then(|name| {
            name.as_string()
                .map(|js_str| js_str.to_std_string_escaped())
        })
        .is_some_and(|name| name == "Promise")
}

/// Extract a readable message from a rejection reason.
fn describe_rejection(reason: &JsValue, context: &mut Context) -> String {
    reason.as_object().map_or_else(
        || format!("{reason:?}"),
        |reason_obj| {
            let message = reason_obj
                .get(js_string!("message"), context)
                .ok()
                .and_then(|value| {
                    value
                        .as_string()
                        .map(|js_str| js_str.to_std_string_escaped())
                });
            message.unwrap_or_else(|| format!("{reason:?}"))
        },
    )
}
