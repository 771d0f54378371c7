//! Ordered response classification
//!
//! Decides success or a typed failure from a raw response. Checks run in a
//! fixed order and short-circuit on the first failure: JSON extraction,
//! content-type allow-list, API-embedded error payload, then generic HTTP
//! status. An embedded error message takes precedence over the raw status.

use crate::config::PipelineConfig;
use crate::error::{ApiErrorKind, Error, Result};
use crate::http::dispatch::RawResponse;
use serde_json::Value;

/// Classify a directly dispatched response
///
/// Returns the parsed JSON payload on success. Batched parts never pass
/// through here; they are trusted as-is by `ApiClient::parse_batch_part`.
pub fn classify(response: &RawResponse, config: &PipelineConfig) -> Result<Value> {
    if response.body.trim().is_empty() {
        return Err(Error::api(
            ApiErrorKind::Transport,
            "No JSON content detected",
            Some(response.status),
        ));
    }
    let parsed: Value = serde_json::from_str(&response.body).map_err(|_| {
        Error::api(
            ApiErrorKind::Transport,
            "JSON parsing was NULL",
            Some(response.status),
        )
    })?;

    match response.content_type() {
        None => {
            return Err(Error::api(
                ApiErrorKind::ContentType,
                "No content-type returned",
                Some(response.status),
            ))
        }
        Some(content_type) => {
            if !is_allowed(content_type, &config.allowed_content_types) {
                return Err(Error::api(
                    ApiErrorKind::ContentType,
                    format!("Unexpected content-type returned: {content_type}"),
                    Some(response.status),
                ));
            }
        }
    }

    if let Some(message) = api_error_message(&parsed) {
        return Err(Error::api(
            ApiErrorKind::ApiPayload,
            message,
            Some(response.status),
        ));
    }

    if response.is_success() {
        Ok(parsed)
    } else {
        Err(Error::api(
            ApiErrorKind::HttpStatus,
            format!("HTTP status {}", response.status),
            Some(response.status),
        ))
    }
}

/// The `error.message` field embedded in an API error payload, if present
pub(crate) fn api_error_message(payload: &Value) -> Option<String> {
    payload
        .get("error")?
        .get("message")?
        .as_str()
        .map(String::from)
}

fn is_allowed(content_type: &str, allowed: &[String]) -> bool {
    allowed
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(content_type.trim()))
}
