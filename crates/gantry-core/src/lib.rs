//! Gantry Core - request pipeline for Google-style REST API families
//!
//! This crate generates and executes calls against REST API families:
//! reusable request templates with per-call parameter substitution, bearer
//! token routing, a content-addressed response cache, exponential-backoff
//! retry for transient failures, and multi-layer error classification.
//!
//! # Main Components
//!
//! - **Templates**: declarative request shapes with ordered path/query
//!   defaults, substituted per call without mutation
//! - **Token routing**: supplied-over-ambient credential selection, validated
//!   before any network I/O
//! - **Cache gate**: serve repeat calls from a write-once response store,
//!   bypassing authentication and retry entirely
//! - **Retry**: status-code driven backoff for 5xx and 429, with cooperative
//!   cancellation
//! - **Classification**: transport, content-type, API payload, and HTTP
//!   status failures as one typed taxonomy
//!
//! # Example
//!
//! ```no_run
//! use gantry_core::{ApiClient, CallOptions, HttpMethod, PipelineConfig, RequestTemplate};
//! use gantry_core::http::EnvTokenProvider;
//! use std::sync::Arc;
//!
//! # async fn example() -> gantry_core::Result<()> {
//! let client = ApiClient::new(PipelineConfig::default(), Arc::new(EnvTokenProvider))?;
//! let template = RequestTemplate::new("https://www.googleapis.com/drive/v3", HttpMethod::Get)?
//!     .with_path_default("files", None);
//! let files = client
//!     .execute(&template, &CallOptions::new().with_query("pageSize", "10"))
//!     .await?;
//! # let _ = files;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod template;

// Re-export main types for convenience
pub use cache::{CacheEntry, CacheKey, CacheStore, FileStore};
pub use config::PipelineConfig;
pub use error::{ApiErrorKind, Error, Result};
pub use http::{
    ApiClient, BatchPart, BearerToken, CallOptions, CancelToken, DebugSink, PageConfig,
    RawResponse, RetryPolicy, TokenHandle, TokenProvider,
};
pub use template::{ConcreteRequest, HttpMethod, Params, RequestTemplate};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
