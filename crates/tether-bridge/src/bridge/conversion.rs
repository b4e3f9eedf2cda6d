//! Value conversion across the native/engine boundary.

use boa_engine::object::JsObject;
use boa_engine::object::builtins::JsArray;
use boa_engine::{Context, JsResult, JsValue, js_string};
use serde_json::{Map, Number, Value as JsonValue};
use tether_core::{BridgeError, BridgeResult, ScriptValue};

use super::roots::RootTable;

/// Convert an engine value into the tagged native representation, rooting
/// objects and functions so the returned handles keep them alive.
pub(crate) fn js_to_script(value: &JsValue, roots: &mut RootTable) -> ScriptValue {
    if value.is_undefined() {
        return ScriptValue::Undefined;
    }
    if value.is_null() {
        return ScriptValue::Null;
    }
    if let Some(boolean) = value.as_boolean() {
        return ScriptValue::Boolean(boolean);
    }
    if let Some(number) = value.as_number() {
        return ScriptValue::Number(number);
    }
    if let Some(string) = value.as_string() {
        return ScriptValue::String(string.to_std_string_escaped());
    }
    if let Some(object) = value.as_object() {
        let callable = object.is_callable();
        let handle = roots.root(object);
        return if callable {
            ScriptValue::Function(handle)
        } else {
            ScriptValue::Object(handle)
        };
    }
    // Symbols and BigInts have no tagged counterpart; carry their display
    // form, matching what the JSON boundary does for them.
    ScriptValue::String(value.display().to_string())
}

/// Convert a tagged native value into an engine value.
///
/// # Errors
/// Object and function variants fail with [`BridgeError::InvalidHandle`] if
/// the handle does not resolve on this bridge.
pub(crate) fn script_to_js(value: &ScriptValue, roots: &RootTable) -> BridgeResult<JsValue> {
    match value {
        ScriptValue::Undefined => Ok(JsValue::undefined()),
        ScriptValue::Null => Ok(JsValue::null()),
        ScriptValue::Boolean(boolean) => Ok(JsValue::from(*boolean)),
        ScriptValue::Number(number) => Ok(JsValue::from(*number)),
        ScriptValue::String(string) => Ok(JsValue::from(js_string!(string.as_str()))),
        ScriptValue::Object(handle) | ScriptValue::Function(handle) => roots
            .resolve(handle)
            .map(|object| JsValue::from(object.clone())),
    }
}

/// Deep-convert an engine value to JSON.
///
/// # Errors
/// Fails with [`BridgeError::Engine`] if the engine reports an error while
/// walking the value.
pub(crate) fn js_value_to_json(value: &JsValue, context: &mut Context) -> BridgeResult<JsonValue> {
    js_value_to_json_raw(value, context)
        .map_err(|err| BridgeError::Engine(format!("JSON conversion failed: {err}")))
}

/// Deep-convert an engine value to JSON, keeping the engine's error type.
///
/// Whole finite numbers map to JSON integers; arrays convert index by index,
/// other objects by their own enumerable keys; symbols and similar exotic
/// values fall back to their display form.
///
/// # Errors
/// Returns the engine error raised while reading properties.
pub(crate) fn js_value_to_json_raw(value: &JsValue, context: &mut Context) -> JsResult<JsonValue> {
    if value.is_null() || value.is_undefined() {
        return Ok(JsonValue::Null);
    }
    if let Some(boolean) = value.as_boolean() {
        return Ok(JsonValue::Bool(boolean));
    }
    if let Some(number) = value.as_number() {
        return Ok(number_to_json(number));
    }
    if let Some(string) = value.as_string() {
        return Ok(JsonValue::String(string.to_std_string_escaped()));
    }
    if let Some(object) = value.as_object() {
        if object.is_array() {
            let length = object
                .get(js_string!("length"), context)?
                .to_u32(context)
                .unwrap_or(0);
            let mut items = Vec::with_capacity(length as usize);
            for index in 0..length {
                let element = object.get(index, context)?;
                items.push(js_value_to_json_raw(&element, context)?);
            }
            return Ok(JsonValue::Array(items));
        }
        let mut map = Map::new();
        for key in object.own_property_keys(context)? {
            let key_string = JsValue::from(key.clone()).to_string(context)?;
            let property = object.get(key, context)?;
            map.insert(
                key_string.to_std_string_escaped(),
                js_value_to_json_raw(&property, context)?,
            );
        }
        return Ok(JsonValue::Object(map));
    }
    Ok(JsonValue::String(value.display().to_string()))
}

/// Whole finite numbers become JSON integers so native consumers see `42`
/// rather than `42.0`.
fn number_to_json(number: f64) -> JsonValue {
    if number.is_finite() && number.fract().abs() < f64::EPSILON {
        JsonValue::Number(Number::from(number.round() as i64))
    } else {
        Number::from_f64(number).map_or(JsonValue::Null, JsonValue::Number)
    }
}

/// Build an engine value from JSON.
///
/// # Errors
/// Returns the engine error raised while allocating or writing properties.
pub(crate) fn json_to_js_value(value: &JsonValue, context: &mut Context) -> JsResult<JsValue> {
    match value {
        JsonValue::Null => Ok(JsValue::null()),
        JsonValue::Bool(boolean) => Ok(JsValue::from(*boolean)),
        JsonValue::Number(number) => Ok(number.as_i64().map_or_else(
            || {
                number
                    .as_f64()
                    .map_or_else(|| JsValue::from(0), JsValue::from)
            },
            JsValue::from,
        )),
        JsonValue::String(string) => Ok(JsValue::from(js_string!(string.as_str()))),
        JsonValue::Array(items) => {
            let array = JsArray::new(context);
            for (index, item) in items.iter().enumerate() {
                let element = json_to_js_value(item, context)?;
                array.set(index, element, true, context)?;
            }
            Ok(array.into())
        }
        JsonValue::Object(fields) => {
            let object = JsObject::with_object_proto(context.intrinsics());
            for (key, field) in fields {
                let element = json_to_js_value(field, context)?;
                object.set(js_string!(key.as_str()), element, true, context)?;
            }
            Ok(object.into())
        }
    }
}
