//! Streamer configuration, loaded once at startup.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sample::RawScale;
use crate::streaming::traits::ByteOrder;

/// Errors raised while loading or validating a [`StreamerConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A field holds a value the pipeline cannot run with.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Offending field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// The configuration file is not valid JSON for this schema.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// How long the transmitter waits between failed connection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffPolicy {
    /// Always wait `reconnect_backoff_ms`.
    #[default]
    Fixed,
    /// Multiply the delay by `factor` after each consecutive failure, up to `max_ms`.
    Exponential {
        /// Growth factor applied per failure, at least 1.0.
        factor: f64,
        /// Upper bound on the delay in milliseconds.
        max_ms: u64,
    },
}

impl BackoffPolicy {
    /// Delay before the next attempt after `failures` consecutive failures.
    ///
    /// `failures` counts the failure that just happened, so the first retry
    /// uses `failures == 1` and always waits exactly `base`.
    pub fn delay(&self, base: Duration, failures: u32) -> Duration {
        match *self {
            Self::Fixed => base,
            Self::Exponential { factor, max_ms } => {
                let exponent = failures.saturating_sub(1).min(64) as i32;
                let scaled = base.as_secs_f64() * factor.powi(exponent);
                let max = Duration::from_millis(max_ms).max(base);
                if scaled.is_finite() && scaled < max.as_secs_f64() {
                    Duration::from_secs_f64(scaled)
                } else {
                    max
                }
            }
        }
    }
}

/// Network credentials handed to the interface collaborator.
///
/// The core never inspects these; `Debug` output redacts the passphrase.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Credentials {
    /// Network name.
    pub ssid: String,
    /// Network passphrase.
    pub passphrase: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("ssid", &self.ssid)
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Configuration for the sampling and transmission pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    /// Number of samples in the rolling window (and in every transmitted frame)
    pub buffer_length: usize,

    /// Sampling task period
    pub sample_period_ms: u64,

    /// Transmission task period
    pub send_period_ms: u64,

    /// Collector address, `host:port`
    pub endpoint: String,

    /// Delay between failed connection attempts
    pub reconnect_backoff_ms: u64,

    /// Growth of the reconnect delay across consecutive failures
    pub backoff: BackoffPolicy,

    /// Upper bound on a single connect call
    pub connect_timeout_ms: u64,

    /// Upper bound on writing one frame
    pub write_timeout_ms: u64,

    /// Largest raw value the sampling hardware reports
    pub raw_max: u16,

    /// Byte order of the floats on the wire
    pub byte_order: ByteOrder,

    /// Credentials for the network interface, if it needs any
    pub credentials: Option<Credentials>,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            buffer_length: 512,
            sample_period_ms: 20,
            send_period_ms: 100,
            endpoint: "127.0.0.1:12345".to_string(),
            reconnect_backoff_ms: 1000,
            backoff: BackoffPolicy::Fixed,
            connect_timeout_ms: 5000,
            write_timeout_ms: 1000,
            raw_max: RawScale::TWELVE_BIT.raw_max(),
            byte_order: ByteOrder::LittleEndian,
            credentials: None,
        }
    }
}

impl StreamerConfig {
    /// Create configuration for short windows sent often
    pub fn low_latency() -> Self {
        Self {
            buffer_length: 128,
            sample_period_ms: 5,
            send_period_ms: 20,
            reconnect_backoff_ms: 250,
            connect_timeout_ms: 1000,
            write_timeout_ms: 100,
            ..Self::default()
        }
    }

    /// Create configuration for a flaky link: larger windows, slower sends,
    /// reconnect delay growing up to 30 seconds
    pub fn constrained_link() -> Self {
        Self {
            buffer_length: 1024,
            send_period_ms: 500,
            reconnect_backoff_ms: 1000,
            backoff: BackoffPolicy::Exponential {
                factor: 2.0,
                max_ms: 30_000,
            },
            connect_timeout_ms: 10_000,
            write_timeout_ms: 5000,
            ..Self::default()
        }
    }

    /// Load and validate configuration from a JSON file.
    ///
    /// Missing fields take their default values.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field for a value the pipeline can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_length == 0 {
            return Err(ConfigError::invalid("buffer_length", "must be > 0"));
        }
        if self.sample_period_ms == 0 {
            return Err(ConfigError::invalid("sample_period_ms", "must be > 0"));
        }
        if self.send_period_ms == 0 {
            return Err(ConfigError::invalid("send_period_ms", "must be > 0"));
        }
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::invalid("endpoint", "must not be empty"));
        }
        if self.reconnect_backoff_ms == 0 {
            return Err(ConfigError::invalid("reconnect_backoff_ms", "must be > 0"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::invalid("connect_timeout_ms", "must be > 0"));
        }
        if self.write_timeout_ms == 0 {
            return Err(ConfigError::invalid("write_timeout_ms", "must be > 0"));
        }
        if RawScale::new(self.raw_max).is_none() {
            return Err(ConfigError::invalid("raw_max", "must be > 0"));
        }
        if let BackoffPolicy::Exponential { factor, .. } = self.backoff
            && !(factor >= 1.0 && factor.is_finite())
        {
            return Err(ConfigError::invalid(
                "backoff.factor",
                format!("must be a finite value >= 1.0, got {factor}"),
            ));
        }
        Ok(())
    }

    /// Sampling period as a [`Duration`]
    pub const fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }

    /// Transmission period as a [`Duration`]
    pub const fn send_period(&self) -> Duration {
        Duration::from_millis(self.send_period_ms)
    }

    /// Base reconnect delay as a [`Duration`]
    pub const fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    /// Connect timeout as a [`Duration`]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Write timeout as a [`Duration`]
    pub const fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Raw value scale, falling back to 12 bits if `raw_max` is zero.
    pub fn raw_scale(&self) -> RawScale {
        RawScale::new(self.raw_max).unwrap_or_default()
    }

    /// Size in bytes of one transmitted frame
    pub const fn frame_bytes(&self) -> usize {
        self.buffer_length * std::mem::size_of::<f32>()
    }
}
