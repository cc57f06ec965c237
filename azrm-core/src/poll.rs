//! Poll - Wait for an asynchronous operation to reach a terminal state
//!
//! Azure reports progress of long-running imports through a provisioning
//! state string. [`StateWaiter`] polls on a fixed interval until the state is
//! one of the targets, a failure is reported, or the timeout elapses.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::provider::{ProviderError, ProviderResult};

/// One observation of a remote operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRefresh {
    pub state: String,
    /// Error message reported by Azure alongside the state
    pub error: Option<String>,
}

impl StateRefresh {
    pub fn state(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            error: None,
        }
    }

    pub fn failed(state: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            error: Some(error.into()),
        }
    }
}

/// Fixed-interval poller over a set of pending and target states
#[derive(Debug, Clone)]
pub struct StateWaiter {
    pub pending: Vec<String>,
    pub target: Vec<String>,
    pub interval: Duration,
    pub timeout: Duration,
    /// Wait before the first refresh
    pub delay: Duration,
}

impl StateWaiter {
    pub fn new(pending: &[&str], target: &[&str]) -> Self {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(30 * 60),
            delay: Duration::ZERO,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Poll `refresh` until a target state is reached; returns that state
    pub async fn wait<F, Fut>(&self, mut refresh: F) -> ProviderResult<String>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<StateRefresh>>,
    {
        let deadline = Instant::now() + self.timeout;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let observed = refresh().await?;

            if let Some(message) = observed.error {
                return Err(ProviderError::new(format!(
                    "operation failed in state {:?}: {}",
                    observed.state, message
                )));
            }
            if self.target.contains(&observed.state) {
                log::debug!(
                    "reached state {:?} after {} attempt(s)",
                    observed.state,
                    attempt
                );
                return Ok(observed.state);
            }
            if !self.pending.contains(&observed.state) {
                return Err(ProviderError::new(format!(
                    "unexpected state {:?}, wanted target {:?}",
                    observed.state, self.target
                )));
            }

            if Instant::now() + self.interval > deadline {
                return Err(ProviderError::timeout(format!(
                    "timeout while waiting for state to become {:?} (last state: {:?}, timeout: {:?})",
                    self.target, observed.state, self.timeout
                )));
            }
            log::debug!(
                "waiting for state {:?} (current {:?}, attempt {})",
                self.target,
                observed.state,
                attempt
            );
            tokio::time::sleep(self.interval).await;
        }
    }
}
