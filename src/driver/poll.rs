//! Bounded polling shared by every page-object query
//!
//! A wait evaluates a caller-supplied check against live browser state until
//! it produces a value, the timeout elapses, or the run is cancelled. The
//! check is retried at a fixed interval; the final sleep is clipped so the
//! wait never overshoots its deadline by more than one evaluation.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Default delay between two evaluations of a check
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Lower bound on the delay so a zero interval cannot spin the runtime
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Cancellation
// ============================================================================

/// Cooperative cancellation shared between the Ctrl-C handler and every wait
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Configuration and outcome
// ============================================================================

/// Configuration for one bounded wait
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub timeout: Duration,
    pub interval: Duration,
    pub cancel: Option<CancelFlag>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            interval: DEFAULT_POLL_INTERVAL,
            cancel: None,
        }
    }
}

impl PollConfig {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    pub fn from_millis(timeout_ms: u64) -> Self {
        Self::new(Duration::from_millis(timeout_ms))
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Same interval and cancellation, different timeout
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    fn effective_interval(&self) -> Duration {
        self.interval.max(MIN_POLL_INTERVAL)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, |c| c.is_cancelled())
    }
}

/// Why a bounded wait ended without a value
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PollError {
    #[error("timed out after {}ms{}", .elapsed.as_millis(), describe_last(.last_error))]
    Timeout {
        elapsed: Duration,
        last_error: Option<String>,
    },

    #[error("wait cancelled after {}ms", .elapsed.as_millis())]
    Cancelled { elapsed: Duration },
}

fn describe_last(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(" (last error: {})", e),
        None => String::new(),
    }
}

impl PollError {
    pub fn elapsed(&self) -> Duration {
        match self {
            PollError::Timeout { elapsed, .. } | PollError::Cancelled { elapsed } => *elapsed,
        }
    }
}

/// Result of a single bounded wait
#[derive(Debug)]
pub struct PollOutcome<T> {
    pub value: Option<T>,
    pub elapsed: Duration,
    pub last_error: Option<String>,
    pub cancelled: bool,
}

impl<T> PollOutcome<T> {
    pub fn succeeded(&self) -> bool {
        self.value.is_some()
    }

    pub fn into_result(self) -> Result<T, PollError> {
        match self.value {
            Some(v) => Ok(v),
            None if self.cancelled => Err(PollError::Cancelled {
                elapsed: self.elapsed,
            }),
            None => Err(PollError::Timeout {
                elapsed: self.elapsed,
                last_error: self.last_error,
            }),
        }
    }
}

// ============================================================================
// Polling
// ============================================================================

/// Evaluate `check` until it yields `Some(value)` or the wait ends
///
/// `Ok(None)` means "not yet"; `Err(e)` is remembered as the last failure
/// and polling continues. The check always runs at least once.
pub async fn poll<T, E, F, Fut>(config: &PollConfig, mut check: F) -> PollOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: fmt::Display,
{
    let start = Instant::now();
    let interval = config.effective_interval();
    let mut last_error = None;
    let mut attempts = 0u32;

    loop {
        if config.is_cancelled() {
            log::debug!("poll cancelled after {} attempts", attempts);
            return PollOutcome {
                value: None,
                elapsed: start.elapsed(),
                last_error,
                cancelled: true,
            };
        }

        attempts += 1;
        match check().await {
            Ok(Some(value)) => {
                return PollOutcome {
                    value: Some(value),
                    elapsed: start.elapsed(),
                    last_error,
                    cancelled: false,
                };
            }
            Ok(None) => {}
            Err(e) => last_error = Some(e.to_string()),
        }

        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            log::debug!(
                "poll timed out after {}ms ({} attempts)",
                elapsed.as_millis(),
                attempts
            );
            return PollOutcome {
                value: None,
                elapsed,
                last_error,
                cancelled: false,
            };
        }

        let remaining = config.timeout - elapsed;
        tokio::time::sleep(interval.min(remaining)).await;
    }
}

/// Wait for a value, failing with [`PollError`]
pub async fn wait_for<T, E, F, Fut>(config: &PollConfig, check: F) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: fmt::Display,
{
    poll(config, check).await.into_result()
}

/// Wait until a boolean check holds
pub async fn wait_until<E, F, Fut>(config: &PollConfig, mut check: F) -> Result<(), PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: fmt::Display,
{
    wait_for(config, || {
        let fut = check();
        async move { fut.await.map(|ok| if ok { Some(()) } else { None }) }
    })
    .await
}

/// Existence check: a timeout is a legitimate negative answer, cancellation is not
pub async fn holds_within<E, F, Fut>(config: &PollConfig, check: F) -> Result<bool, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: fmt::Display,
{
    match wait_until(config, check).await {
        Ok(()) => Ok(true),
        Err(PollError::Timeout { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Sleep for `duration`, waking every interval to honour the cancel flag
pub async fn pause(config: &PollConfig, duration: Duration) -> Result<(), PollError> {
    let config = config.with_timeout(duration);
    match wait_until(&config, || async { Ok::<_, Infallible>(false) }).await {
        Ok(()) | Err(PollError::Timeout { .. }) => Ok(()),
        Err(e) => Err(e),
    }
}
