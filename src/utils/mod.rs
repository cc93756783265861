use rand::Rng;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::info;

/// A simple wall-clock timer for logging elapsed time.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "⏱  Finished: {} (took {:.2?})",
            self.label,
            self.start.elapsed()
        );
    }
}

/// Delay between detail pages: `base_ms` plus up to `jitter_ms` at random,
/// so the clerk's site sees a human-ish request rhythm.
pub fn pause_duration(base_ms: u64, jitter_ms: u64) -> Duration {
    let jitter = if jitter_ms == 0 {
        0
    } else {
        rand::rng().random_range(0..=jitter_ms)
    };
    Duration::from_millis(base_ms + jitter)
}

pub async fn polite_pause(base_ms: u64, jitter_ms: u64) {
    let pause = pause_duration(base_ms, jitter_ms);
    if !pause.is_zero() {
        sleep(pause).await;
    }
}
