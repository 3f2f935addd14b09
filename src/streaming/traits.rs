//! Seams between the pipeline core and its external collaborators.
//!
//! The core only ever reads one raw sample at a time, opens a stream
//! connection, writes bytes to it, and asks the network interface to
//! (re)associate. Everything behind these traits is hardware- or
//! platform-specific.

use super::error::StreamResult;
use super::link::LinkEventSender;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Provides raw readings from the analog-to-digital converter.
///
/// Implementations are called from the sampling task once per tick and must
/// return within a short, bounded time.
pub trait SampleSource: Send + 'static {
    /// Read one raw value in `[0, raw_max]`.
    ///
    /// Errors are treated as transient: the sampler logs them and repeats the
    /// previous sample.
    fn read_raw_sample(&mut self) -> StreamResult<u16>;
}

/// Opens stream connections to the collector.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by a successful connect.
    type Conn: Connection;

    /// Connect to `endpoint`.
    ///
    /// The caller bounds the returned future with its own timeout.
    fn connect(&self, endpoint: &str) -> impl Future<Output = StreamResult<Self::Conn>> + Send;
}

/// An established stream connection.
///
/// Closing consumes the connection, so it can be closed at most once.
pub trait Connection: Send + 'static {
    /// Write every byte of `bytes`.
    ///
    /// The caller bounds the returned future with its own timeout.
    fn write_all(&mut self, bytes: &[u8]) -> impl Future<Output = StreamResult<()>> + Send;

    /// Release the underlying connection resource.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Controls association of the network interface.
///
/// Called from the connectivity monitor's event context, so implementations
/// must only start the procedure and return. The outcome is reported later by
/// sending a [`LinkEvent`](super::link::LinkEvent) on `events`.
pub trait NetworkInterface: Send + Sync + 'static {
    /// Begin (or retry) associating with the configured network.
    fn associate(&self, events: &LinkEventSender);
}

/// Byte order for multi-byte samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// Least significant byte first
    #[default]
    LittleEndian,
    /// Most significant byte first
    BigEndian,
    /// Whatever the host uses
    Native,
}
