//! Deadline-bounded polling of asynchronous conditions.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::trace;

use crate::config::PlaybackSetting;
use crate::driver::DriverError;

/// Why a wait ended without its condition holding.
#[derive(Error, Debug)]
pub enum WaitError {
    /// The condition did not hold before the deadline.
    #[error("condition not met within {0:?}")]
    TimedOut(Duration),

    /// The condition failed with a non-transient driver error.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// A polling policy: how long to wait and how often to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Wait {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// The element wait of a device's playback settings.
    pub fn from_playback(playback: &PlaybackSetting) -> Self {
        Self::new(playback.element_wait(), playback.poll_interval())
    }

    /// Poll `condition` until it yields a value.
    ///
    /// The condition returns `Ok(Some(v))` when satisfied and `Ok(None)` to
    /// keep polling. Transient driver errors (no such element, stale element)
    /// also keep polling; any other error ends the wait immediately. The
    /// condition is always evaluated at least once.
    pub async fn until<T, F, Fut>(&self, mut condition: F) -> Result<T, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, DriverError>>,
    {
        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match condition().await {
                Ok(Some(value)) => {
                    trace!(attempts, "wait condition met");
                    return Ok(value);
                }
                Ok(None) => {}
                Err(e) if e.is_transient() => {
                    trace!(attempts, error = %e, "transient error while waiting");
                }
                Err(e) => return Err(WaitError::Driver(e)),
            }

            if tokio::time::Instant::now() >= deadline {
                trace!(attempts, "wait timed out");
                return Err(WaitError::TimedOut(self.timeout));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl Default for Wait {
    fn default() -> Self {
        Self::from_playback(&PlaybackSetting::default())
    }
}
