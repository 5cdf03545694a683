//! Execution Timeout Management
//!
//! Wall-clock limits for child processes. Expiry is the only way a running
//! command gets cancelled.

use std::future::Future;
use std::time::Duration;
use tokio::time;

/// Default wall-clock limit for a command
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// The wrapped future did not finish in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("execution timed out after {0:?}")]
pub struct TimedOut(pub Duration);

/// Execution timeout configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionTimeout {
    duration: Duration,
}

impl Default for ExecutionTimeout {
    fn default() -> Self {
        Self::from_secs(DEFAULT_TIMEOUT_SECS)
    }
}

impl ExecutionTimeout {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Drive `future` to completion or give up after the configured duration
    ///
    /// On expiry the future is dropped. Anything it owns (such as a child
    /// process spawned with `kill_on_drop`) is released with it.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use termgate::tools::ExecutionTimeout;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let timeout = ExecutionTimeout::from_secs(1);
    ///     let value = timeout.run(async { 42 }).await;
    ///     assert_eq!(value, Ok(42));
    /// }
    /// ```
    pub async fn run<F>(&self, future: F) -> Result<F::Output, TimedOut>
    where
        F: Future,
    {
        time::timeout(self.duration, future)
            .await
            .map_err(|_| TimedOut(self.duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_default() {
        let timeout = ExecutionTimeout::default();
        assert_eq!(timeout.duration(), Duration::from_secs(15));
    }

    #[test]
    fn test_timeout_from_secs() {
        let timeout = ExecutionTimeout::from_secs(45);
        assert_eq!(timeout.duration(), Duration::from_secs(45));
        assert_eq!(timeout, ExecutionTimeout::new(Duration::from_secs(45)));
    }

    #[tokio::test]
    async fn test_timeout_run_returns_value() {
        let timeout = ExecutionTimeout::from_secs(5);
        let result = timeout.run(async { "test value".to_string() }).await;
        assert_eq!(result.unwrap(), "test value");
    }

    #[tokio::test]
    async fn test_timeout_run_expires() {
        let timeout = ExecutionTimeout::new(Duration::from_millis(50));

        let result = timeout
            .run(async {
                tokio::time::sleep(Duration::from_secs(2)).await;
            })
            .await;

        assert_eq!(result, Err(TimedOut(Duration::from_millis(50))));
        assert!(result.unwrap_err().to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_timeout_run_just_in_time() {
        let timeout = ExecutionTimeout::from_secs(1);

        let result = timeout
            .run(async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                7
            })
            .await;

        assert_eq!(result, Ok(7));
    }
}
