//! Concrete collaborators: a synthetic sample source, a TCP transport, and a
//! host network interface.

pub mod generator;
pub mod host;
pub mod tcp;

// Re-export main source types
pub use generator::{GeneratorConfig, GeneratorSource, SignalType};
pub use host::HostInterface;
pub use tcp::{TcpConfig, TcpConnection, TcpTransport};
