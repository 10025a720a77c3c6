//! Bounded, cancellable waits

use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::Browser;
use crate::error::BrowserError;

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("timed out")]
    TimedOut,

    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Point in time after which a wait gives up, plus the run's cancellation token
#[derive(Debug, Clone)]
pub struct Deadline {
    until: Instant,
    cancel: CancellationToken,
}

impl Deadline {
    pub fn after(timeout: Duration, cancel: &CancellationToken) -> Self {
        Self {
            until: Instant::now() + timeout,
            cancel: cancel.clone(),
        }
    }

    pub fn remaining(&self) -> Duration {
        self.until.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sleep for one poll interval, never past the deadline.
    ///
    /// Fails with `Cancelled` as soon as the token fires and with `TimedOut`
    /// once no time is left.
    pub async fn pause(&self, interval: Duration) -> Result<(), WaitError> {
        if self.cancel.is_cancelled() {
            return Err(WaitError::Cancelled);
        }
        let remaining = self.remaining();
        if remaining.is_zero() {
            return Err(WaitError::TimedOut);
        }

        tokio::select! {
            _ = self.cancel.cancelled() => Err(WaitError::Cancelled),
            _ = tokio::time::sleep(interval.min(remaining)) => Ok(()),
        }
    }
}

/// Poll until an element matching `css` is present in the focused window
pub async fn wait_for_element<B: Browser + ?Sized>(
    browser: &mut B,
    css: &str,
    deadline: &Deadline,
    poll_interval: Duration,
) -> Result<(), WaitError> {
    loop {
        if deadline.is_cancelled() {
            return Err(WaitError::Cancelled);
        }
        if browser.element_present(css).await? {
            return Ok(());
        }
        deadline.pause(poll_interval).await?;
    }
}
