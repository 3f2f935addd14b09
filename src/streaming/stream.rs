//! Pipeline orchestration: shared state, task spawning and shutdown.

use super::buffers::RollingBuffer;
use super::error::{StreamErrorMetrics, StreamResult};
use super::link::{ConnectivityMonitor, LinkEvent, LinkEventSender, LinkReadyFlag, link_event_channel};
use super::sampler::Sampler;
use super::traits::{NetworkInterface, SampleSource, Transport};
use super::transmitter::{ConnectionState, Transmitter, TransmitterConfig};
use crate::config::StreamerConfig;
use crate::error::{MicStreamError, MicStreamResult};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Counters shared by every pipeline task.
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Samples written into the window
    pub samples_pushed: AtomicU64,
    /// Failed hardware reads
    pub read_errors: AtomicU64,
    /// Connect calls started
    pub connect_attempts: AtomicU64,
    /// Connect calls that failed or timed out
    pub connect_failures: AtomicU64,
    /// Frames fully written
    pub windows_sent: AtomicU64,
    /// Payload bytes written
    pub bytes_sent: AtomicU64,
    /// Frames dropped because the write failed
    pub write_failures: AtomicU64,
    /// Connections torn down
    pub connections_closed: AtomicU64,
    /// Transitions of the link-ready flag to false
    pub link_losses: AtomicU64,
    /// Association requests issued to the interface
    pub association_attempts: AtomicU64,
    /// Errors by classification
    pub errors: Mutex<StreamErrorMetrics>,
}

impl PipelineStats {
    /// Copy every counter.
    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            samples_pushed: self.samples_pushed.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            windows_sent: self.windows_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            link_losses: self.link_losses.load(Ordering::Relaxed),
            association_attempts: self.association_attempts.load(Ordering::Relaxed),
        }
    }

    /// Copy of the error classification counters.
    pub fn error_metrics(&self) -> StreamErrorMetrics {
        self.errors.lock().clone()
    }
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStatsSnapshot {
    /// Samples written into the window
    pub samples_pushed: u64,
    /// Failed hardware reads
    pub read_errors: u64,
    /// Connect calls started
    pub connect_attempts: u64,
    /// Connect calls that failed or timed out
    pub connect_failures: u64,
    /// Frames fully written
    pub windows_sent: u64,
    /// Payload bytes written
    pub bytes_sent: u64,
    /// Frames dropped because the write failed
    pub write_failures: u64,
    /// Connections torn down
    pub connections_closed: u64,
    /// Transitions of the link-ready flag to false
    pub link_losses: u64,
    /// Association requests issued to the interface
    pub association_attempts: u64,
}

/// A running sampling and transmission pipeline.
///
/// [`Pipeline::start`] builds the rolling buffer, the link-ready flag and the
/// counters once, hands them to three tasks (sampler, transmitter,
/// connectivity monitor) and reports `InterfaceStarted` to the monitor. All
/// tasks stop when the cancellation token fires; [`Pipeline::shutdown`]
/// cancels and waits for them.
pub struct Pipeline {
    buffer: Arc<RollingBuffer>,
    link: LinkReadyFlag,
    stats: Arc<PipelineStats>,
    events: LinkEventSender,
    state: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    sampler: Option<JoinHandle<()>>,
    transmitter: Option<JoinHandle<StreamResult<()>>>,
    monitor: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Validate `config` and spawn the pipeline tasks on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start<S, T, I>(
        config: &StreamerConfig,
        source: S,
        transport: T,
        interface: I,
    ) -> MicStreamResult<Self>
    where
        S: SampleSource,
        T: Transport,
        I: NetworkInterface,
    {
        config.validate()?;

        let buffer = Arc::new(RollingBuffer::new(config.buffer_length));
        let link = LinkReadyFlag::new();
        let stats = Arc::new(PipelineStats::default());
        let cancel = CancellationToken::new();
        let (events, events_rx) = link_event_channel();

        let monitor =
            ConnectivityMonitor::new(interface, link.clone(), events.clone(), Arc::clone(&stats));
        let sampler = Sampler::new(
            source,
            config.raw_scale(),
            Arc::clone(&buffer),
            config.sample_period(),
            Arc::clone(&stats),
        );
        let transmitter = Transmitter::new(
            TransmitterConfig::from(config),
            transport,
            Arc::clone(&buffer),
            link.clone(),
            Arc::clone(&stats),
        );
        let state = transmitter.subscribe_state();

        let monitor = tokio::spawn(monitor.run(events_rx, cancel.clone()));
        let sampler = tokio::spawn(sampler.run(cancel.clone()));
        let transmitter = tokio::spawn(transmitter.run(cancel.clone()));

        // The monitor holds a sender, so the channel is open.
        let _ = events.send(LinkEvent::InterfaceStarted);

        info!(
            buffer_length = config.buffer_length,
            sample_period_ms = config.sample_period_ms,
            send_period_ms = config.send_period_ms,
            endpoint = %config.endpoint,
            "Pipeline started"
        );

        Ok(Self {
            buffer,
            link,
            stats,
            events,
            state,
            cancel,
            sampler: Some(sampler),
            transmitter: Some(transmitter),
            monitor: Some(monitor),
        })
    }

    /// Sender for interface lifecycle events (the connectivity callback path).
    pub fn link_events(&self) -> LinkEventSender {
        self.events.clone()
    }

    /// The shared rolling window.
    pub fn buffer(&self) -> &Arc<RollingBuffer> {
        &self.buffer
    }

    /// The shared link-ready flag.
    pub fn link(&self) -> &LinkReadyFlag {
        &self.link
    }

    /// Current counters.
    pub fn stats(&self) -> PipelineStatsSnapshot {
        self.stats.snapshot()
    }

    /// Error classification counters.
    pub fn error_metrics(&self) -> StreamErrorMetrics {
        self.stats.error_metrics()
    }

    /// Current transmitter connection state.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver observing transmitter state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Token that stops every pipeline task when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Check whether the transmission task has exited (only happens on a
    /// fatal error or after cancellation).
    pub fn is_transmitter_finished(&self) -> bool {
        self.transmitter
            .as_ref()
            .is_none_or(|handle| handle.is_finished())
    }

    /// Check whether the sampling task is still running.
    pub fn is_sampler_running(&self) -> bool {
        self.sampler
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel every task, wait for them, and return the final counters.
    ///
    /// A fatal transmitter error is returned after all tasks have stopped.
    pub async fn shutdown(mut self) -> MicStreamResult<PipelineStatsSnapshot> {
        self.cancel.cancel();

        let sampler = join_task("sampler", self.sampler.take()).await;
        let monitor = join_task("monitor", self.monitor.take()).await;
        let transmitter = join_task("transmitter", self.transmitter.take()).await;

        let stats = self.stats.snapshot();
        info!(
            samples = stats.samples_pushed,
            windows = stats.windows_sent,
            bytes = stats.bytes_sent,
            "Pipeline stopped"
        );

        match transmitter {
            Ok(Some(Err(e))) => {
                error!(error = %e, "Transmitter had terminated with a fatal error");
                return Err(e.into());
            }
            Err(e) => return Err(e),
            Ok(_) => {}
        }
        sampler?;
        monitor?;
        Ok(stats)
    }
}

/// Wait for a task, if it was still held, turning a panic or abort into an error.
async fn join_task<R>(
    task: &'static str,
    handle: Option<JoinHandle<R>>,
) -> MicStreamResult<Option<R>> {
    match handle {
        Some(handle) => handle
            .await
            .map(Some)
            .map_err(|e| MicStreamError::task_join(task, e.to_string())),
        None => Ok(None),
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
