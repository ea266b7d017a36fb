//! Bounded deadline polling.
//!
//! Every wait in the engine goes through [`poll_until`]: the check runs at
//! least once, then every `poll_interval` until it is satisfied or the
//! timeout elapses. Errors from the check count as "not yet" so a page that
//! is mid-navigation does not abort the wait.

use crate::result::ProbeResult;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};

/// Default wait timeout in milliseconds
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 7_000;

/// Default polling interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Options for polling waits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Result of a wait operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitResult {
    /// Whether the wait was successful
    pub success: bool,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Description of what was waited for
    pub waited_for: String,
}

impl WaitResult {
    /// Create a successful wait result
    #[must_use]
    pub fn success(elapsed: Duration, waited_for: impl Into<String>) -> Self {
        Self {
            success: true,
            elapsed,
            waited_for: waited_for.into(),
        }
    }

    /// Create a timeout wait result
    #[must_use]
    pub fn timeout(elapsed: Duration, waited_for: impl Into<String>) -> Self {
        Self {
            success: false,
            elapsed,
            waited_for: waited_for.into(),
        }
    }
}

/// One look at a polled condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation<T> {
    /// Condition holds; carries what was found
    Satisfied(T),
    /// Condition does not hold yet; carries what was seen instead
    Unsatisfied(String),
}

/// Outcome of [`poll_until`]
#[derive(Debug, Clone)]
pub struct Polled<T> {
    /// Value of the satisfying observation, if any
    pub value: Option<T>,
    /// Last thing observed before giving up (empty when satisfied)
    pub observed: String,
    /// Timing summary
    pub result: WaitResult,
}

impl<T> Polled<T> {
    /// Whether the condition was met in time
    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        self.value.is_some()
    }
}

/// Poll `check` until it is satisfied or `options.timeout` elapses.
pub async fn poll_until<T, F, Fut>(
    options: &WaitOptions,
    waited_for: impl Into<String>,
    mut check: F,
) -> Polled<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<Observation<T>>>,
{
    let waited_for = waited_for.into();
    let start = Instant::now();
    let timeout = options.timeout();
    let interval = options.poll_interval().max(Duration::from_millis(1));

    loop {
        let observed = match check().await {
            Ok(Observation::Satisfied(value)) => {
                return Polled {
                    value: Some(value),
                    observed: String::new(),
                    result: WaitResult::success(start.elapsed(), waited_for),
                };
            }
            Ok(Observation::Unsatisfied(observed)) => observed,
            Err(e) => format!("error: {e}"),
        };

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            tracing::debug!(%waited_for, ?elapsed, %observed, "wait timed out");
            return Polled {
                value: None,
                observed,
                result: WaitResult::timeout(elapsed, waited_for),
            };
        }
        tokio::time::sleep(interval.min(timeout - elapsed)).await;
    }
}
