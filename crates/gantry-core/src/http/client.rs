//! Pipeline entry point
//!
//! `ApiClient` wires the whole call chain together: parameter substitution,
//! token resolution, the cache gate, retry-wrapped dispatch, classification,
//! and parsing. Generated API functions are thin wrappers around
//! `ApiClient::execute` with a prebuilt template.

use crate::cache::{CacheEntry, CacheKey, CacheStore};
use crate::config::PipelineConfig;
use crate::error::{ApiErrorKind, Error, Result};
use crate::http::auth::{resolve_token, BearerToken, TokenHandle, TokenProvider};
use crate::http::classify::{api_error_message, classify};
use crate::http::dispatch::{DebugSink, Dispatcher, RawResponse};
use crate::http::response::{parse_response, shape_payload, Transform};
use crate::http::retry::{execute_with_retry, CancelToken, RetryPolicy};
use crate::template::{ConcreteRequest, Params, RequestTemplate};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// Per-call options threaded into `ApiClient::execute`
#[derive(Clone, Default)]
pub struct CallOptions {
    pub path_overrides: Params,
    pub query_overrides: Params,
    pub body: Option<Value>,
    /// Caller-supplied token; wins over the ambient provider
    pub token: Option<BearerToken>,
    pub transform: Option<Arc<Transform>>,
    pub cancel: Option<CancelToken>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, name: &str, value: &str) -> Self {
        self.path_overrides
            .push((name.to_string(), Some(value.to_string())));
        self
    }

    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query_overrides
            .push((name.to_string(), Some(value.to_string())));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_token(mut self, token: BearerToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_transform(mut self, transform: Arc<Transform>) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Request shaped for inclusion in a batch envelope
///
/// The aggregation itself happens outside this crate; parts carry the
/// path-plus-query relative to the API host, the method, and the body.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BatchPart {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
}

impl BatchPart {
    /// Shape a concrete request into a batch part
    pub fn from_request(request: &ConcreteRequest) -> Result<Self> {
        let url = url::Url::parse(&request.url).map_err(|e| Error::HttpRequest {
            message: format!("invalid request URL {}: {e}", request.url),
            source: Some(Box::new(e)),
        })?;
        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        Ok(Self {
            method: request.method.as_str().to_string(),
            path,
            body: request.body.clone(),
        })
    }
}

/// Pagination settings for `ApiClient::execute_paged`
#[derive(Debug, Clone)]
pub struct PageConfig {
    /// Query parameter carrying the page token
    pub param: String,
    /// JSON pointer to the next-page token in each response
    pub token_pointer: String,
    /// Upper bound on fetched pages
    pub max_pages: u32,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            param: "pageToken".to_string(),
            token_pointer: "/nextPageToken".to_string(),
            max_pages: 100,
        }
    }
}

/// High-level client executing templated API calls
pub struct ApiClient {
    dispatcher: Dispatcher,
    config: PipelineConfig,
    tokens: Arc<dyn TokenProvider>,
    cache: Option<Arc<dyn CacheStore>>,
    debug_sink: Option<Arc<dyn DebugSink>>,
}

impl ApiClient {
    /// Create a client from a configuration and an ambient token provider
    pub fn new(config: PipelineConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        config
            .validate()
            .map_err(|message| Error::Configuration {
                message,
                source: None,
            })?;
        let dispatcher = Dispatcher::new(&config)?;
        Ok(Self {
            dispatcher,
            config,
            tokens,
            cache: None,
            debug_sink: None,
        })
    }

    /// Attach a response cache; its presence switches the client into cache
    /// mode, where token validation is skipped
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attach a sink receiving a dump of every outgoing request
    pub fn with_debug_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.debug_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute one templated call through the full pipeline
    pub async fn execute(
        &self,
        template: &RequestTemplate,
        options: &CallOptions,
    ) -> Result<Value> {
        let request = template.substitute(
            &options.path_overrides,
            &options.query_overrides,
            options.body.clone(),
        );
        let token = resolve_token(
            self.tokens.as_ref(),
            options.token.as_ref(),
            self.cache.is_some(),
        )?;

        let raw = match &self.cache {
            Some(cache) => {
                let key = CacheKey::for_request(&request);
                if let Some(entry) = cache.get(&key) {
                    log::debug!("cache hit for {}", request.url);
                    let cached = RawResponse {
                        status: entry.status,
                        headers: entry.headers,
                        body: entry.body,
                    };
                    // Stored entries skip live classification entirely.
                    return parse_response(&cached, &self.config, options.transform.as_deref());
                }
                let raw = self.dispatch_with_retry(&request, &token, options).await?;
                let entry = CacheEntry {
                    status: raw.status,
                    headers: raw.headers.clone(),
                    body: raw.body.clone(),
                    cached_at: Utc::now(),
                };
                if let Err(error) = cache.put(&key, &entry) {
                    log::warn!("cache write failed for {}: {error}", key.as_str());
                }
                raw
            }
            None => self.dispatch_with_retry(&request, &token, options).await?,
        };

        if self.config.raw_response {
            return Ok(Value::String(raw.body));
        }
        let payload = classify(&raw, &self.config)?;
        Ok(shape_payload(
            payload,
            &self.config,
            options.transform.as_deref(),
        ))
    }

    /// Execute a call repeatedly, following next-page tokens
    ///
    /// After each page the token is read from `page.token_pointer` and merged
    /// into the `page.param` query parameter of the next call.
    pub async fn execute_paged(
        &self,
        template: &RequestTemplate,
        options: &CallOptions,
        page: &PageConfig,
    ) -> Result<Vec<Value>> {
        let mut pages = Vec::new();
        let mut next_token: Option<String> = None;

        for _ in 0..page.max_pages {
            let mut page_options = options.clone();
            if let Some(token) = &next_token {
                page_options
                    .query_overrides
                    .push((page.param.clone(), Some(token.clone())));
            }
            let value = self.execute(template, &page_options).await?;
            next_token = value
                .pointer(&page.token_pointer)
                .and_then(|token| token.as_str())
                .map(String::from);
            pages.push(value);
            if next_token.is_none() {
                break;
            }
        }

        if next_token.is_some() {
            log::warn!(
                "pagination stopped after {} pages with a next-page token remaining",
                page.max_pages
            );
        }
        Ok(pages)
    }

    /// Shape a templated call into a batch part instead of executing it
    pub fn shape_batch(
        &self,
        template: &RequestTemplate,
        options: &CallOptions,
    ) -> Result<BatchPart> {
        let request = template.substitute(
            &options.path_overrides,
            &options.query_overrides,
            options.body.clone(),
        );
        BatchPart::from_request(&request)
    }

    /// Parse one part of an aggregated batch response
    ///
    /// Parts carry no per-part HTTP envelope, so content-type and status
    /// classification cannot apply; the embedded error payload check is the
    /// one signal that survives aggregation and it is kept.
    pub fn parse_batch_part(&self, body: &str, transform: Option<&Transform>) -> Result<Value> {
        let parsed: Value = serde_json::from_str(body).map_err(|e| Error::Json {
            message: format!("failed to decode batch part: {e}"),
            source: e,
        })?;
        if let Some(message) = api_error_message(&parsed) {
            return Err(Error::api(ApiErrorKind::ApiPayload, message, None));
        }
        Ok(shape_payload(parsed, &self.config, transform))
    }

    async fn dispatch_with_retry(
        &self,
        request: &ConcreteRequest,
        token: &TokenHandle,
        options: &CallOptions,
    ) -> Result<RawResponse> {
        let policy = RetryPolicy::from_config(&self.config);
        let sink = self.debug_sink.as_deref();
        execute_with_retry(
            || self.dispatcher.dispatch(request, token, sink),
            &policy,
            options.cancel.as_ref(),
        )
        .await
    }
}
