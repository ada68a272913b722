//! # Request Deadline
//!
//! Every request carries a deadline fixed when it starts. The catalog fetch
//! runs under it, it is checked once more right before a statement is
//! dispatched, and the executor bounds the statement itself by it. A commit
//! that follows a completed statement is never cut short.

use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};

use super::errors::{RestError, RestResult};

/// Request-scoped deadline
#[derive(Debug, Clone, Copy)]
pub struct RequestDeadline {
    at: Instant,
}

impl RequestDeadline {
    /// Deadline `timeout` from now
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Fail if the deadline has already passed
    pub fn check(&self) -> RestResult<()> {
        if self.is_expired() {
            return Err(RestError::deadline_exceeded());
        }
        Ok(())
    }

    /// Run `fut` under the deadline.
    ///
    /// The future is dropped when the deadline fires, which rolls back any
    /// transaction it holds.
    pub async fn run<T, F>(&self, fut: F) -> RestResult<T>
    where
        F: Future<Output = RestResult<T>>,
    {
        self.within(fut)
            .await
            .unwrap_or_else(|| Err(RestError::deadline_exceeded()))
    }

    /// Run `fut` under the deadline, `None` if it fired first
    pub async fn within<F: Future>(&self, fut: F) -> Option<F::Output> {
        timeout_at(self.at, fut).await.ok()
    }
}
