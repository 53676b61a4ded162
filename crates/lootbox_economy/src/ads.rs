//! # Advertisement Watching
//!
//! Ad-gated tiers are paid for by watching an advertisement to completion.
//! This is the only operation in the economy that suspends; it has no
//! cancellation contract, callers wrap it in their own timeout if needed.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{EconomyError, EconomyResult};

/// Plays advertisements.
#[async_trait]
pub trait AdProvider: Send + Sync {
    /// Plays one ad; resolves once it completed or failed.
    ///
    /// # Errors
    ///
    /// Returns `AdWatchFailed` if the ad did not play to completion.
    async fn watch_ad(&self) -> EconomyResult<()>;
}

/// Stand-in provider: waits a fixed delay, then reports a fixed outcome.
#[derive(Clone, Debug)]
pub struct SimulatedAdProvider {
    delay: Duration,
    succeed: bool,
}

impl SimulatedAdProvider {
    /// Creates a provider.
    #[must_use]
    pub const fn new(delay: Duration, succeed: bool) -> Self {
        Self { delay, succeed }
    }

    /// Provider that completes immediately.
    #[must_use]
    pub const fn instant() -> Self {
        Self::new(Duration::ZERO, true)
    }

    /// Provider whose ads never complete.
    #[must_use]
    pub const fn failing() -> Self {
        Self::new(Duration::ZERO, false)
    }
}

impl Default for SimulatedAdProvider {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), true)
    }
}

#[async_trait]
impl AdProvider for SimulatedAdProvider {
    async fn watch_ad(&self) -> EconomyResult<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.succeed {
            tracing::debug!("ad watched to completion");
            Ok(())
        } else {
            Err(EconomyError::AdWatchFailed("ad was not completed".to_string()))
        }
    }
}
