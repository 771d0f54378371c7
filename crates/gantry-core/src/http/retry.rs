//! Exponential-backoff retry for transient failures
//!
//! Retry policy is pure status-code policy: 5xx and 429 are transient,
//! everything else is final. The loop returns the last raw response rather
//! than raising; deciding whether that response is ultimately an error is
//! the classifier's job, downstream.

use crate::error::{Error, Result};
use crate::http::dispatch::RawResponse;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the initial dispatch
    pub max_attempts: u32,
    /// Whether to add uniform jitter to each backoff delay
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn from_config(config: &crate::config::PipelineConfig) -> Self {
        Self {
            max_attempts: config.max_retry_attempts,
            jitter: config.retry_jitter,
        }
    }

    /// Backoff delay before 1-based retry attempt `attempt`:
    /// `2^attempt` seconds plus uniform jitter in `[0, 1)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = 2f64.powi(attempt as i32);
        let jitter = if self.jitter {
            rand::thread_rng().gen::<f64>()
        } else {
            0.0
        };
        Duration::from_secs_f64(base + jitter)
    }
}

/// Whether a status code indicates a retry may succeed
pub fn is_transient(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Cooperative cancellation for dispatch and backoff sleeps
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Execute `dispatch_fn` with retry for transient failures
///
/// Makes at most `1 + max_attempts` dispatch calls, sleeping
/// `2^i + jitter` seconds before retry `i`. Transport faults (no response
/// obtained) are folded into a synthetic status-500 response and treated as
/// transient. The last response is returned whether or not it succeeded.
pub async fn execute_with_retry<F, Fut>(
    mut dispatch_fn: F,
    policy: &RetryPolicy,
    cancel: Option<&CancelToken>,
) -> Result<RawResponse>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RawResponse>>,
{
    let mut last = attempt_once(&mut dispatch_fn, cancel).await?;
    if last.is_success() || !is_transient(last.status) {
        return Ok(last);
    }

    for attempt in 1..=policy.max_attempts {
        let delay = policy.delay_for(attempt);
        log::warn!(
            "transient status {} (attempt {attempt}), retrying after {delay:?}",
            last.status
        );
        sleep_cancellable(delay, cancel).await?;

        last = attempt_once(&mut dispatch_fn, cancel).await?;
        if last.is_success() || !is_transient(last.status) {
            return Ok(last);
        }
    }

    log::error!(
        "exhausted {} retry attempts, last status {}",
        policy.max_attempts,
        last.status
    );
    Ok(last)
}

async fn attempt_once<F, Fut>(
    dispatch_fn: &mut F,
    cancel: Option<&CancelToken>,
) -> Result<RawResponse>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RawResponse>>,
{
    let fut = dispatch_fn();
    let result = match cancel {
        Some(token) => tokio::select! {
            _ = token.cancelled() => return Err(Error::Cancelled),
            result = fut => result,
        },
        None => fut.await,
    };
    match result {
        Ok(response) => Ok(response),
        Err(Error::Cancelled) => Err(Error::Cancelled),
        Err(error) => {
            log::warn!("transport fault, treating as status 500: {error}");
            Ok(RawResponse::synthetic_transport_failure())
        }
    }
}

async fn sleep_cancellable(delay: Duration, cancel: Option<&CancelToken>) -> Result<()> {
    match cancel {
        Some(token) => tokio::select! {
            _ = token.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        },
        None => {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn response(status: u16) -> RawResponse {
        RawResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: r#"{"ok":true}"#.to_string(),
        }
    }

    /// Dispatch stub returning the scripted statuses in order, counting calls
    fn scripted(
        statuses: &'static [u16],
    ) -> (
        Arc<AtomicU32>,
        impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<RawResponse>> + Send>>,
    ) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let dispatch_fn = move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) as usize;
            let status = statuses[n.min(statuses.len() - 1)];
            Box::pin(async move { Ok(response(status)) })
                as std::pin::Pin<Box<dyn Future<Output = Result<RawResponse>> + Send>>
        };
        (calls, dispatch_fn)
    }

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient(429));
        assert!(is_transient(500));
        assert!(is_transient(503));
        assert!(is_transient(599));
        assert!(!is_transient(200));
        assert!(!is_transient(404));
        assert!(!is_transient(401));
    }

    #[test]
    fn test_delay_without_jitter_is_exact_power() {
        let policy = RetryPolicy::default().with_jitter(false);
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_jitter_bounds() {
        let policy = RetryPolicy::default();
        for attempt in 1..=3 {
            let delay = policy.delay_for(attempt).as_secs_f64();
            let base = 2f64.powi(attempt as i32);
            assert!(delay >= base);
            assert!(delay < base + 1.0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_makes_single_attempt() {
        let (calls, dispatch_fn) = scripted(&[200]);
        let result = execute_with_retry(dispatch_fn, &RetryPolicy::new(3), None)
            .await
            .unwrap();
        assert_eq!(result.status, 200);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_is_not_retried() {
        let (calls, dispatch_fn) = scripted(&[404]);
        let result = execute_with_retry(dispatch_fn, &RetryPolicy::new(3), None)
            .await
            .unwrap();
        assert_eq!(result.status, 404);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_recovers_on_second_attempt() {
        let (calls, dispatch_fn) = scripted(&[429, 200]);
        let result = execute_with_retry(dispatch_fn, &RetryPolicy::new(2), None)
            .await
            .unwrap();
        assert_eq!(result.status, 200);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_response() {
        let (calls, dispatch_fn) = scripted(&[503]);
        let result = execute_with_retry(dispatch_fn, &RetryPolicy::new(3), None)
            .await
            .unwrap();
        assert_eq!(result.status, 503);
        // Initial attempt plus max_attempts retries.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_fault_becomes_synthetic_500_and_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let dispatch_fn = move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if n == 0 {
                    Err(Error::HttpRequest {
                        message: "connection refused".to_string(),
                        source: None,
                    })
                } else {
                    Ok(response(200))
                }
            })
                as std::pin::Pin<Box<dyn Future<Output = Result<RawResponse>> + Send>>
        };
        let result = execute_with_retry(dispatch_fn, &RetryPolicy::new(2), None)
            .await
            .unwrap();
        assert_eq!(result.status, 200);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_during_backoff() {
        let token = CancelToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let cancel_on_dispatch = token.clone();
        // The first dispatch cancels the token, so the backoff sleep before
        // the next retry observes cancellation.
        let dispatch_fn = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            cancel_on_dispatch.cancel();
            Box::pin(async move { Ok(response(503)) })
                as std::pin::Pin<Box<dyn Future<Output = Result<RawResponse>> + Send>>
        };
        let result = execute_with_retry(dispatch_fn, &RetryPolicy::new(3), Some(&token)).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_token_resolves() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        // Must not hang.
        token.cancelled().await;
    }
}
