//! Error types for streaming operations.

use std::time::Duration;

/// Streaming-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Stream configuration errors
    #[error("Invalid stream configuration: {0}")]
    InvalidConfig(String),

    /// The hardware sampling interface failed to produce a reading
    #[error("Hardware read failed: {0}")]
    HardwareRead(String),

    /// Timeout during stream operation
    #[error("Operation '{operation}' timed out after {}ms", duration.as_millis())]
    Timeout {
        /// Operation that did not finish in time
        operation: String,
        /// Bound that was exceeded
        duration: Duration,
    },

    /// Resource allocation errors
    #[error("Resource allocation failed: {resource} - {reason}")]
    ResourceAllocation {
        /// Kind of resource that ran out
        resource: &'static str,
        /// Description from the failing call
        reason: String,
    },

    /// Connection-related errors
    #[error("Connection error during {operation}: {source}")]
    Connection {
        /// Transport call that failed
        operation: String,
        /// Underlying cause
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StreamError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a connection error wrapping the underlying cause
    pub fn connection(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Create a resource allocation error
    pub fn resource(resource: &'static str, reason: impl Into<String>) -> Self {
        Self::ResourceAllocation {
            resource,
            reason: reason.into(),
        }
    }

    /// Create a hardware read error
    pub fn hardware(details: impl Into<String>) -> Self {
        Self::HardwareRead(details.into())
    }

    /// Classify an I/O failure from a transport call.
    ///
    /// Exhaustion of sockets or memory becomes [`StreamError::ResourceAllocation`];
    /// everything else is a recoverable connection error.
    pub fn from_io(operation: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::OutOfMemory {
            Self::resource("socket", err.to_string())
        } else {
            Self::connection(operation, err)
        }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::HardwareRead(_) => true,
            Self::Timeout { .. } => true,
            Self::Connection { .. } => true,
            Self::InvalidConfig(_) | Self::ResourceAllocation { .. } => false,
        }
    }

    /// Check if this is a fatal error that should terminate the owning task
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

/// Result type for streaming operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Metrics for stream error tracking
#[derive(Debug, Clone, Default)]
pub struct StreamErrorMetrics {
    /// Every recorded error
    pub total_errors: u64,
    /// Connect and write failures reported by the transport
    pub network_errors: u64,
    /// Failed hardware reads
    pub hardware_errors: u64,
    /// Connects or writes that exceeded their bound
    pub timeout_errors: u64,
    /// Errors the owning task absorbed
    pub recovered_errors: u64,
    /// Errors that stopped the owning task
    pub fatal_errors: u64,
}

impl StreamErrorMetrics {
    /// Record a new error
    pub fn record_error(&mut self, error: &StreamError) {
        self.total_errors += 1;

        match error {
            StreamError::Connection { .. } => self.network_errors += 1,
            StreamError::HardwareRead(_) => self.hardware_errors += 1,
            StreamError::Timeout { .. } => self.timeout_errors += 1,
            _ => {}
        }

        if error.is_recoverable() {
            self.recovered_errors += 1;
        } else {
            self.fatal_errors += 1;
        }
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Get error rate (0.0 to 1.0)
    pub fn error_rate(&self) -> f64 {
        if self.total_errors == 0 {
            0.0
        } else {
            self.fatal_errors as f64 / self.total_errors as f64
        }
    }
}
