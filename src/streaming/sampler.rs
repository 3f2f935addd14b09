//! The sampling task: one raw reading per tick into the rolling window.

use super::buffers::RollingBuffer;
use super::stream::PipelineStats;
use super::traits::SampleSource;
use crate::sample::{RawScale, Sample};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Periodically reads the sample source and pushes into a [`RollingBuffer`].
///
/// The sampler shares nothing with the network path except the buffer, so a
/// stalled or failing transmitter never changes its tick rate.
pub struct Sampler<S: SampleSource> {
    source: S,
    scale: RawScale,
    buffer: Arc<RollingBuffer>,
    period: Duration,
    stats: Arc<PipelineStats>,
    last: Sample,
}

impl<S: SampleSource> Sampler<S> {
    /// Create a sampler feeding `buffer` every `period`.
    pub fn new(
        source: S,
        scale: RawScale,
        buffer: Arc<RollingBuffer>,
        period: Duration,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            source,
            scale,
            buffer,
            period,
            stats,
            last: Sample::ZERO,
        }
    }

    /// Take one reading and push it.
    ///
    /// A failed read repeats the previous sample so the window keeps its
    /// cadence.
    pub fn tick(&mut self) -> Sample {
        let sample = match self.source.read_raw_sample() {
            Ok(raw) => self.scale.normalize(raw),
            Err(e) => {
                self.stats.read_errors.fetch_add(1, Ordering::Relaxed);
                self.stats.errors.lock().record_error(&e);
                warn!(error = %e, "Sample read failed, repeating previous sample");
                self.last
            }
        };
        self.buffer.push(sample);
        self.stats.samples_pushed.fetch_add(1, Ordering::Relaxed);
        self.last = sample;
        sample
    }

    /// Sample every period until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(period_ms = self.period.as_millis() as u64, "Sampler started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick();
                }
            }
        }
        debug!("Sampler stopped");
    }
}
