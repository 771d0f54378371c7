//! Response parsing and optional caller transforms
//!
//! Shapes a classified payload for the caller: optional array
//! simplification and an optional transform. A failed transform degrades to
//! the untransformed JSON with a warning; it is never fatal.

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::http::dispatch::RawResponse;
use serde_json::Value;

/// Caller-supplied reshaping applied to the parsed payload
///
/// Returning `None` signals the transform could not be applied.
pub type Transform = dyn Fn(&Value) -> Option<Value> + Send + Sync;

/// Decode and shape a raw response body
///
/// Cache hits land here directly, bypassing classification. Honors the
/// raw-response passthrough flag.
pub fn parse_response(
    response: &RawResponse,
    config: &PipelineConfig,
    transform: Option<&Transform>,
) -> Result<Value> {
    if config.raw_response {
        return Ok(Value::String(response.body.clone()));
    }
    let parsed: Value = serde_json::from_str(&response.body).map_err(|e| Error::Json {
        message: format!("failed to decode response body: {e}"),
        source: e,
    })?;
    Ok(shape_payload(parsed, config, transform))
}

/// Shape an already-decoded payload
pub fn shape_payload(
    parsed: Value,
    config: &PipelineConfig,
    transform: Option<&Transform>,
) -> Value {
    let parsed = if config.simplify_arrays {
        simplify(parsed)
    } else {
        parsed
    };

    match transform {
        Some(transform) => match transform(&parsed) {
            Some(value) if !is_empty_result(&value) => value,
            _ => {
                log::warn!("response transform failed or returned empty, using raw parsed JSON");
                parsed
            }
        },
        None => parsed,
    }
}

/// Collapse a top-level single-element array to its element
fn simplify(value: Value) -> Value {
    match value {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    }
}

fn is_empty_result(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}
