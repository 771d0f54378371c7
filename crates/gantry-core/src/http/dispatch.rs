//! Single-shot HTTP dispatch
//!
//! The dispatcher performs exactly one network call per invocation, merging
//! the authorization header, user agent, content type, and any configured
//! custom headers into the outgoing request. Retries live in `retry`, not
//! here.

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::http::auth::TokenHandle;
use crate::template::{ConcreteRequest, HttpMethod};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Outgoing request snapshot handed to a debug sink before dispatch
#[derive(Debug, Clone, serde::Serialize)]
pub struct RequestDump {
    pub url: String,
    pub method: String,
    pub body: Option<Value>,
}

/// Receives a dump of every outgoing request before it is sent
///
/// Injected rather than implied by a verbosity level, so tests can assert on
/// or disable the side channel deterministically.
pub trait DebugSink: Send + Sync {
    fn record(&self, dump: &RequestDump);
}

/// Writes each dump as pretty-printed JSON to a fixed-name file
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join("request_debug.json"),
        }
    }
}

impl DebugSink for FileSink {
    fn record(&self, dump: &RequestDump) {
        match serde_json::to_string_pretty(dump) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    log::warn!("failed to write request dump {}: {e}", self.path.display());
                }
            }
            Err(e) => log::warn!("failed to serialize request dump: {e}"),
        }
    }
}

/// Raw HTTP response captured for classification and caching
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    /// The content-type header value, matched case-insensitively
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Stand-in used when no response was obtained at all; classified as a
    /// transient server failure
    pub fn synthetic_transport_failure() -> Self {
        Self {
            status: 500,
            headers: Vec::new(),
            body: String::new(),
        }
    }
}

/// Issues HTTP calls for concrete requests
pub struct Dispatcher {
    client: reqwest::Client,
    user_agent: String,
}

impl Dispatcher {
    /// Build the underlying client from the pipeline configuration
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        // reqwest's gzip support inserts the Accept-Encoding header and
        // decodes transparently.
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .gzip(true)
            .danger_accept_invalid_certs(!config.validate_tls)
            .build()
            .map_err(|e| Error::HttpRequest {
                message: format!("failed to create HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }

    /// Execute exactly one network call for `request`
    pub async fn dispatch(
        &self,
        request: &ConcreteRequest,
        token: &TokenHandle,
        sink: Option<&dyn DebugSink>,
    ) -> Result<RawResponse> {
        if let Some(sink) = sink {
            sink.record(&RequestDump {
                url: request.url.clone(),
                method: request.method.as_str().to_string(),
                body: request.body.clone(),
            });
        }

        let mut builder = self
            .client
            .request(as_reqwest_method(request.method), request.url.as_str())
            .header(reqwest::header::USER_AGENT, &self.user_agent);

        if let Some(bearer) = token.bearer() {
            builder = builder.header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", bearer.access_token),
            );
        }

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), expand_env_vars(value)?);
        }

        if let Some(body) = &request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .json(body);
        }

        let response = builder.send().await.map_err(|e| Error::HttpRequest {
            message: format!("transport fault: {e}"),
            source: Some(Box::new(e)),
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(|e| Error::HttpRequest {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Fixed mapping from the method enum to transport methods
fn as_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Patch => reqwest::Method::PATCH,
    }
}

/// Expand `${ENV:VAR_NAME}` patterns in a header value
pub fn expand_env_vars(value: &str) -> Result<String> {
    let re = regex::Regex::new(r"\$\{ENV:([^}]+)\}").expect("valid regex pattern");

    let mut result = value.to_string();
    for cap in re.captures_iter(value) {
        let var_name = &cap[1];
        let env_value = std::env::var(var_name).map_err(|_| Error::Configuration {
            message: format!("environment variable {var_name} not found"),
            source: None,
        })?;
        let pattern = format!("${{ENV:{var_name}}}");
        result = result.replace(&pattern, &env_value);
    }

    Ok(result)
}
