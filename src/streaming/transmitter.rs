//! The transmission task and its connection state machine.
//!
//! ```text
//!              link ready            connect ok
//! Disconnected ----------> Connecting ----------> Connected
//!      ^                       |                      |
//!      |      connect failed   |                      |
//!      +-----------------------+                      |
//!      |   write failed / link lost / shutdown        |
//!      +----------------------------------------------+
//! ```
//!
//! Failed connects are retried forever after the configured backoff. A window
//! whose write fails is dropped, never re-sent.

use super::buffers::RollingBuffer;
use super::error::{StreamError, StreamResult};
use super::link::{LinkReadyFlag, LinkStatus};
use super::stream::PipelineStats;
use super::traits::{ByteOrder, Connection, Transport};
use super::wire::encode_frame;
use crate::config::{BackoffPolicy, StreamerConfig};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle of the outbound connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection; the next tick may attempt one if the link is ready
    #[default]
    Disconnected,
    /// A connect call is in flight
    Connecting,
    /// Windows are being written every tick
    Connected,
}

impl ConnectionState {
    /// Check if windows can currently be sent
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Settings for the transmission task.
#[derive(Debug, Clone)]
pub struct TransmitterConfig {
    /// Collector address
    pub endpoint: String,
    /// Time between transmission ticks
    pub send_period: Duration,
    /// Base delay after a failed connect
    pub reconnect_backoff: Duration,
    /// Growth of the delay across consecutive failed connects
    pub backoff: BackoffPolicy,
    /// Bound on one connect call
    pub connect_timeout: Duration,
    /// Bound on writing one frame
    pub write_timeout: Duration,
    /// Byte order of the floats on the wire
    pub byte_order: ByteOrder,
}

impl From<&StreamerConfig> for TransmitterConfig {
    fn from(config: &StreamerConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            send_period: config.send_period(),
            reconnect_backoff: config.reconnect_backoff(),
            backoff: config.backoff,
            connect_timeout: config.connect_timeout(),
            write_timeout: config.write_timeout(),
            byte_order: config.byte_order,
        }
    }
}

/// Streams snapshots of a [`RollingBuffer`] to the collector.
///
/// The transmitter owns the connection. Each tick it either attempts a
/// connect (only when the link is ready) or writes one frame. An open
/// connection is closed as soon as the link-ready flag drops, when a write
/// fails, and when the task shuts down.
pub struct Transmitter<T: Transport> {
    config: TransmitterConfig,
    transport: T,
    buffer: Arc<RollingBuffer>,
    link: LinkReadyFlag,
    stats: Arc<PipelineStats>,
    state: watch::Sender<ConnectionState>,
    connection: Option<T::Conn>,
    consecutive_failures: u32,
    connected_losses: u64,
    window: Vec<f32>,
    frame: Vec<u8>,
}

impl<T: Transport> Transmitter<T> {
    /// Create a transmitter in the [`ConnectionState::Disconnected`] state.
    pub fn new(
        config: TransmitterConfig,
        transport: T,
        buffer: Arc<RollingBuffer>,
        link: LinkReadyFlag,
        stats: Arc<PipelineStats>,
    ) -> Self {
        let len = buffer.len();
        let (state, _rx) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            transport,
            buffer,
            link,
            stats,
            state,
            connection: None,
            consecutive_failures: 0,
            connected_losses: 0,
            window: Vec::with_capacity(len),
            frame: Vec::with_capacity(len * std::mem::size_of::<f32>()),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver observing every state transition.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Number of connect attempts that failed since the last success.
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(from = ?prev, to = ?next, "Connection state changed");
        }
    }

    /// Check whether the link went down since the current connection was opened.
    ///
    /// A loss counts even if the link has already come back.
    fn link_lost(&self, status: LinkStatus) -> bool {
        !status.ready || status.losses != self.connected_losses
    }

    /// Run one transmission tick and return how long to wait before the next.
    ///
    /// Only fatal errors are returned; everything else is absorbed into the
    /// state machine.
    pub async fn tick(&mut self) -> StreamResult<Duration> {
        if self.connection.is_some() && self.link_lost(self.link.status()) {
            info!("Link lost while connected, closing connection");
            self.disconnect().await;
            return Ok(self.config.send_period);
        }

        let conn = match self.connection.take() {
            Some(conn) => conn,
            None => {
                if !self.link.is_link_ready() {
                    return Ok(self.config.send_period);
                }
                match self.connect().await {
                    Ok(conn) => conn,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        let delay = self
                            .config
                            .backoff
                            .delay(self.config.reconnect_backoff, self.consecutive_failures);
                        warn!(
                            error = %e,
                            attempt = self.consecutive_failures,
                            retry_in_ms = delay.as_millis() as u64,
                            "Connection to collector failed"
                        );
                        return Ok(delay);
                    }
                }
            }
        };

        self.buffer.snapshot_into(&mut self.window);
        encode_frame(&self.window, self.config.byte_order, &mut self.frame);
        let conn = self.connection.insert(conn);

        let result = match timeout(self.config.write_timeout, conn.write_all(&self.frame)).await {
            Ok(result) => result,
            Err(_) => Err(StreamError::timeout("write", self.config.write_timeout)),
        };

        match result {
            Ok(()) => {
                self.stats.windows_sent.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .bytes_sent
                    .fetch_add(self.frame.len() as u64, Ordering::Relaxed);
            }
            Err(e) => {
                self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
                self.stats.errors.lock().record_error(&e);
                warn!(error = %e, "Write failed, dropping window and disconnecting");
                self.disconnect().await;
                if e.is_fatal() {
                    return Err(e);
                }
            }
        }

        Ok(self.config.send_period)
    }

    async fn connect(&mut self) -> StreamResult<T::Conn> {
        self.set_state(ConnectionState::Connecting);
        self.stats.connect_attempts.fetch_add(1, Ordering::Relaxed);
        let losses = self.link.status().losses;

        let result = match timeout(
            self.config.connect_timeout,
            self.transport.connect(&self.config.endpoint),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(StreamError::timeout("connect", self.config.connect_timeout)),
        };

        match result {
            Ok(conn) => {
                self.connected_losses = losses;
                self.consecutive_failures = 0;
                self.set_state(ConnectionState::Connected);
                info!(endpoint = %self.config.endpoint, "Connected to collector");
                Ok(conn)
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.stats.connect_failures.fetch_add(1, Ordering::Relaxed);
                self.stats.errors.lock().record_error(&e);
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Close the connection, if any, and return to `Disconnected`.
    async fn disconnect(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.close().await;
            self.stats.connections_closed.fetch_add(1, Ordering::Relaxed);
            debug!("Connection closed");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Transmit until `cancel` fires or a fatal error occurs.
    ///
    /// While connected the task also wakes on link-ready changes, so a lost
    /// link closes the connection without waiting for the next tick. Any open
    /// connection is closed before returning.
    pub async fn run(mut self, cancel: CancellationToken) -> StreamResult<()> {
        let mut link_rx = self.link.subscribe();
        let mut link_open = true;
        info!(
            endpoint = %self.config.endpoint,
            period_ms = self.config.send_period.as_millis() as u64,
            "Transmitter started"
        );

        let result = loop {
            let delay = tokio::select! {
                biased;
                _ = cancel.cancelled() => break Ok(()),
                tick = self.tick() => match tick {
                    Ok(delay) => delay,
                    Err(e) => {
                        error!(error = %e, "Transmitter stopping on fatal error");
                        break Err(e);
                    }
                },
            };

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = &mut sleep => break,
                    changed = link_rx.changed(), if link_open && self.connection.is_some() => {
                        match changed {
                            Ok(()) => {
                                let status = *link_rx.borrow_and_update();
                                if self.link_lost(status) {
                                    info!("Link lost while connected, closing connection");
                                    self.disconnect().await;
                                }
                            }
                            Err(_) => link_open = false,
                        }
                    }
                }
            }
        };

        self.disconnect().await;
        debug!("Transmitter stopped");
        result
    }
}
