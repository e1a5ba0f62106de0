//! Bounded retry around calls to the subtitle service.

use crate::error::ServiceError;
use std::future::Future;
use std::time::Duration;
use tracing::{info, trace};

/// Retry transient failures a fixed number of times with a fixed pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget without the pause.
    pub fn without_delay() -> Self {
        Self {
            delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Run `call`, repeating it after [`ServiceError::Transient`] until the
    /// attempt budget is spent. Other errors are returned at once.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut attempt = 1;
        loop {
            trace!("{operation}: attempt {attempt}/{}", self.max_attempts);
            match call().await {
                Err(ServiceError::Transient(reason)) if attempt < self.max_attempts => {
                    info!(
                        "{operation} failed ({reason}), retrying in {} ms",
                        self.delay.as_millis()
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
