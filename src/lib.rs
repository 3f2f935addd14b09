// Correctness and logic
#![warn(clippy::unit_cmp)] // Detects comparing unit types
#![warn(clippy::match_same_arms)]
// Duplicate match arms

// Performance-focused
#![warn(clippy::inefficient_to_string)] // `format!("{}", x)` vs `x.to_string()`
#![warn(clippy::map_clone)] // Cloning inside `map()` unnecessarily
#![warn(clippy::unnecessary_to_owned)] // Detects redundant `.to_owned()` or `.clone()`
#![warn(clippy::large_stack_arrays)] // Helps avoid stack overflows

// Style and idiomatic Rust
#![warn(clippy::redundant_clone)] // Detects unnecessary `.clone()`
#![warn(clippy::needless_return)] // Avoids `return` at the end of functions
#![warn(clippy::manual_map)] // Use `.map()` instead of manual `match`
#![cfg_attr(not(test), warn(clippy::unwrap_used))] // Avoids using `unwrap()`

// Maintainability
#![warn(clippy::missing_panics_doc)] // Docs for functions that might panic
#![warn(missing_docs)]

//! # mic_stream
//!
//! Samples an analog microphone at a fixed period into a rolling window and
//! streams that window to a remote collector over TCP, reconnecting
//! automatically after network loss.
//!
//! ## Overview
//!
//! Three components share explicitly owned state:
//!
//! - the **sampler** reads one raw value per tick, normalizes it to
//!   `[-1.0, 1.0]` and pushes it into a [`RollingBuffer`](streaming::RollingBuffer);
//! - the **transmitter** snapshots the window every send period and writes it
//!   as `N` little-endian `f32`s, driving a
//!   Disconnected → Connecting → Connected state machine with fixed (or
//!   exponential) reconnect backoff;
//! - the **connectivity monitor** turns interface events into the
//!   link-ready flag the transmitter checks before connecting.
//!
//! Transmission is best effort: windows are dropped while the link is down and
//! never re-sent. The sampler never waits on the network.
//!
//! ## Error Handling
//!
//! Errors stay inside the component that owns them. Only configuration
//! failures and fatal transmitter exits surface as [`MicStreamError`]:
//!
//! ```rust
//! use mic_stream::{ConfigError, MicStreamError, StreamerConfig};
//!
//! let config = StreamerConfig { buffer_length: 0, ..StreamerConfig::default() };
//! match config.validate() {
//!     Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "buffer_length"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! let err: MicStreamError = config.validate().unwrap_err().into();
//! assert!(err.to_string().contains("buffer_length"));
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use mic_stream::streaming::RollingBuffer;
//! use mic_stream::Sample;
//!
//! let window = RollingBuffer::new(4);
//! for v in [0.1, 0.2, 0.3, 0.4, 0.5] {
//!     window.push(Sample::new(v));
//! }
//! let values: Vec<f32> = window.snapshot().into_iter().map(f32::from).collect();
//! assert_eq!(values, vec![0.2, 0.3, 0.4, 0.5]);
//! ```

pub mod config;
pub mod error;
pub mod sample;
pub mod streaming;

pub use config::{BackoffPolicy, ConfigError, Credentials, StreamerConfig};
pub use error::{MicStreamError, MicStreamResult};
pub use sample::{RawScale, Sample};
