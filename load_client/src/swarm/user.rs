use rand_chacha::ChaCha20Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::stats::RequestStats;
use crate::scenario::ScenarioProfile;

/// One simulated client. Owns its HTTP session and RNG exclusively.
pub struct VirtualUser {
    pub index: u64,
    client: reqwest::Client,
    base_url: Arc<str>,
    profile: Arc<ScenarioProfile>,
    stats: Arc<RequestStats>,
    rng: ChaCha20Rng,
    cancel: CancellationToken,
}

impl VirtualUser {
    pub fn new(
        index: u64,
        client: reqwest::Client,
        base_url: Arc<str>,
        profile: Arc<ScenarioProfile>,
        stats: Arc<RequestStats>,
        rng: ChaCha20Rng,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            index,
            client,
            base_url,
            profile,
            stats,
            rng,
            cancel,
        }
    }

    /// select → execute → think, until cancelled. Cancellation is only
    /// observed before a request or during the pause; an in-flight request
    /// always completes. Returns the number of completed cycles.
    pub async fn run(mut self) -> u64 {
        let profile = Arc::clone(&self.profile);
        let mut cycles = 0u64;
        debug!("[vu {}] started", self.index);

        while !self.cancel.is_cancelled() {
            let action = profile.select_action(&mut self.rng);
            let request = action.request(&mut self.rng);

            let started = Instant::now();
            let result = request.send(&self.client, &self.base_url).await;
            let elapsed = started.elapsed();
            self.stats
                .record(request.label, action.name(), elapsed, result.as_ref().err());

            match &result {
                Ok(status) => trace!(
                    "[vu {}] {} {} -> {} in {:?}",
                    self.index,
                    request.label,
                    request.path,
                    status,
                    elapsed
                ),
                Err(failure) => debug!(
                    "[vu {}] {} {} failed: {}",
                    self.index, request.label, request.path, failure
                ),
            }
            cycles += 1;

            let pause = Duration::from_secs_f64(profile.think_time(&mut self.rng));
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        debug!("[vu {}] stopped after {} cycles", self.index, cycles);
        cycles
    }
}
