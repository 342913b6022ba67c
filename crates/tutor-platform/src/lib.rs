//! Browser adapters for the tutor-core ports: `fetch` for HTTP and
//! localStorage (or memory) for persistence.

pub mod http;
pub mod storage;

use wasm_bindgen::{JsCast, JsValue};

/// Human-readable text for a thrown JS value.
pub(crate) fn js_error_message(value: &JsValue) -> String {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}
