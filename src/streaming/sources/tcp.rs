//! TCP transport to the collector.

use crate::streaming::error::{StreamError, StreamResult};
use crate::streaming::traits::{Connection, Transport};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

/// Configuration for the TCP transport.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Disable Nagle's algorithm so each frame leaves immediately
    pub nodelay: bool,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self { nodelay: true }
    }
}

/// Opens plain TCP connections to the collector.
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    config: TcpConfig,
}

impl TcpTransport {
    /// Create a TCP transport.
    pub fn new(config: TcpConfig) -> Self {
        Self { config }
    }
}

impl Transport for TcpTransport {
    type Conn = TcpConnection;

    async fn connect(&self, endpoint: &str) -> StreamResult<TcpConnection> {
        let stream = TcpStream::connect(endpoint)
            .await
            .map_err(|e| StreamError::from_io("connect", e))?;

        if self.config.nodelay
            && let Err(e) = stream.set_nodelay(true)
        {
            return Err(StreamError::connection("set_nodelay", e));
        }

        if let Ok(peer) = stream.peer_addr() {
            debug!(%peer, "TCP connection established");
        }
        Ok(TcpConnection { stream })
    }
}

/// An established TCP connection to the collector.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
}

impl Connection for TcpConnection {
    async fn write_all(&mut self, bytes: &[u8]) -> StreamResult<()> {
        self.stream
            .write_all(bytes)
            .await
            .map_err(|e| StreamError::from_io("write", e))
    }

    async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "TCP shutdown failed, dropping socket");
        }
    }
}
