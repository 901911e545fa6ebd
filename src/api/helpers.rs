//! Shared helpers for WASM API operations
//!
//! Serialization across the JS boundary and conversion of Rust errors into
//! `JsValue` rejections. Every failure is logged before it is returned.

use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;

// ============================================================================
// Serialization/Deserialization Helpers
// ============================================================================

/// Deserialize a value from JavaScript with automatic error handling
pub fn deserialize<T: DeserializeOwned>(value: JsValue, error_context: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| js_error(error_context, e))
}

/// Deserialize an optional argument; `undefined` and `null` give `T::default()`
pub fn deserialize_or_default<T: DeserializeOwned + Default>(
    value: JsValue,
    error_context: &str,
) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    deserialize(value, error_context)
}

/// Serialize a value to JavaScript with automatic error handling
pub fn serialize<T: Serialize>(value: &T, error_context: &str) -> Result<JsValue, JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value
        .serialize(&serializer)
        .map_err(|e| js_error(error_context, e))
}

// ============================================================================
// Error Helpers
// ============================================================================

/// Log `error` and wrap it for a JavaScript rejection
pub fn js_error(context: &str, error: impl Display) -> JsValue {
    let msg = format!("{}: {}", context, error);
    log::error!("{}", msg);
    JsValue::from_str(&msg)
}

/// Wrap a user-facing error without a context prefix
///
/// Used where the message itself is shown to the user (upload rejections).
pub fn js_message(error: impl Display) -> JsValue {
    let msg = error.to_string();
    log::warn!("{}", msg);
    JsValue::from_str(&msg)
}
