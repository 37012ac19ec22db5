//! Politeness pauses between listing interactions and article requests.
//!
//! Every blocking call against the remote site is preceded or followed by a
//! randomized pause so the harvest neither hammers the server nor looks like
//! a tight automation loop. The [`Pacer`] trait lets tests swap in [`NoDelay`].

use crate::config::{DelayRange, PacingConfig};
use tokio::time::sleep;
use tracing::debug;

pub trait Pacer {
    /// Pause before attempting a load-more interaction.
    async fn before_interaction(&self);

    /// Pause after a load-more interaction while new content renders.
    async fn after_interaction(&self);

    /// Pause before a network request for an article.
    async fn before_request(&self);
}

/// Sleeps for a random duration drawn from the configured ranges.
#[derive(Debug, Clone)]
pub struct RandomPacer {
    pacing: PacingConfig,
}

impl RandomPacer {
    pub fn new(pacing: PacingConfig) -> Self {
        Self { pacing }
    }

    async fn pause(range: &DelayRange, phase: &'static str) {
        let delay = range.sample();
        if delay.is_zero() {
            return;
        }
        debug!(phase, ?delay, "Pausing");
        sleep(delay).await;
    }
}

impl Pacer for RandomPacer {
    async fn before_interaction(&self) {
        Self::pause(&self.pacing.interaction, "before_interaction").await
    }

    async fn after_interaction(&self) {
        Self::pause(&self.pacing.settle, "after_interaction").await
    }

    async fn before_request(&self) {
        Self::pause(&self.pacing.request, "before_request").await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {
    async fn before_interaction(&self) {}
    async fn after_interaction(&self) {}
    async fn before_request(&self) {}
}
