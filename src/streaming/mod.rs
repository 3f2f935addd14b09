//! Sampling and streaming pipeline.
//!
//! This module provides:
//! - A rolling window of the most recent samples, shared between tasks
//! - A sampling task feeding the window at a fixed period
//! - A transmission task streaming window snapshots to a collector, with
//!   reconnect-and-backoff on failure
//! - A connectivity monitor maintaining the link-ready condition
//!
//! # Example
//!
//! ```rust,no_run
//! use mic_stream::StreamerConfig;
//! use mic_stream::streaming::*;
//!
//! # async fn run() -> Result<(), mic_stream::MicStreamError> {
//! let config = StreamerConfig::default();
//! let source = GeneratorSource::sine(2.0, 50.0, config.raw_scale())?;
//! let pipeline = Pipeline::start(&config, source, TcpTransport::default(), HostInterface::default())?;
//!
//! tokio::signal::ctrl_c().await?;
//! let stats = pipeline.shutdown().await?;
//! println!("sent {} windows", stats.windows_sent);
//! # Ok(())
//! # }
//! ```

pub mod buffers;
pub mod error;
pub mod link;
pub mod sampler;
pub mod sources;
pub mod stream;
pub mod traits;
pub mod transmitter;
pub mod wire;

#[cfg(test)]
mod tests;

// Re-export main types for convenience
pub use error::{StreamError, StreamErrorMetrics, StreamResult};

pub use traits::{ByteOrder, Connection, NetworkInterface, SampleSource, Transport};

pub use stream::{Pipeline, PipelineStats, PipelineStatsSnapshot};

pub use buffers::{BufferStats, RollingBuffer};

pub use link::{
    ConnectivityMonitor, LinkEvent, LinkEventReceiver, LinkEventSender, LinkReadyFlag,
    LinkStatus, link_event_channel,
};

pub use sampler::Sampler;

pub use transmitter::{ConnectionState, Transmitter, TransmitterConfig};

pub use sources::{GeneratorConfig, GeneratorSource, HostInterface, SignalType, TcpTransport};
