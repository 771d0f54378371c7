//! HTTP pipeline for API communication
//!
//! This module provides the execution half of the pipeline:
//! - Token resolution and validation
//! - Single-shot request dispatch with merged headers
//! - Retry logic with exponential backoff for transient failures
//! - Ordered error classification
//! - Response parsing with optional caller transforms

pub mod auth;
pub mod classify;
pub mod client;
pub mod dispatch;
pub mod response;
pub mod retry;

pub use auth::{resolve_token, BearerToken, EnvTokenProvider, TokenHandle, TokenProvider};
pub use classify::classify;
pub use client::{ApiClient, BatchPart, CallOptions, PageConfig};
pub use dispatch::{DebugSink, Dispatcher, FileSink, RawResponse, RequestDump};
pub use response::{parse_response, Transform};
pub use retry::{execute_with_retry, is_transient, CancelToken, RetryPolicy};
