//! Pipeline configuration
//!
//! All tunables live in an explicit `PipelineConfig` value threaded into the
//! client, replacing process-wide option state. The `Default` impl documents
//! the default set.

use std::time::Duration;

/// Configuration for the request pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of retry attempts for transient failures
    pub max_retry_attempts: u32,
    /// Whether retry backoff adds uniform jitter
    pub retry_jitter: bool,
    /// Total request timeout
    pub timeout: Duration,
    /// Whether to validate TLS certificates
    pub validate_tls: bool,
    /// Content types accepted by the response classifier
    pub allowed_content_types: Vec<String>,
    /// Collapse top-level single-element response arrays to their element
    pub simplify_arrays: bool,
    /// Skip classification and parsing, returning the raw body
    pub raw_response: bool,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: 3,
            retry_jitter: true,
            timeout: Duration::from_secs(30),
            validate_tls: true,
            allowed_content_types: vec![
                "application/json".to_string(),
                "application/json; charset=UTF-8".to_string(),
                "text/html".to_string(),
            ],
            simplify_arrays: true,
            raw_response: false,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

impl PipelineConfig {
    /// Set the maximum number of retry attempts
    pub fn with_max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = attempts;
        self
    }

    /// Enable or disable backoff jitter
    pub fn with_retry_jitter(mut self, jitter: bool) -> Self {
        self.retry_jitter = jitter;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the content-type allow-list
    pub fn with_allowed_content_types(mut self, types: Vec<String>) -> Self {
        self.allowed_content_types = types;
        self
    }

    /// Enable or disable array simplification
    pub fn with_simplify_arrays(mut self, simplify: bool) -> Self {
        self.simplify_arrays = simplify;
        self
    }

    /// Enable or disable raw-response passthrough
    pub fn with_raw_response(mut self, raw: bool) -> Self {
        self.raw_response = raw;
        self
    }

    /// Validate configuration invariants
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.timeout.is_zero() {
            return Err("timeout cannot be zero".to_string());
        }
        if self.allowed_content_types.is_empty() {
            return Err("content-type allow-list cannot be empty".to_string());
        }
        Ok(())
    }
}
