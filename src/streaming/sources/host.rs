//! Network interface for hosts whose link is managed by the operating system.

use crate::config::Credentials;
use crate::streaming::link::{LinkEvent, LinkEventSender};
use crate::streaming::traits::NetworkInterface;
use tracing::debug;

/// A [`NetworkInterface`] that treats the host network as always associated.
///
/// Every association request is answered immediately with
/// [`LinkEvent::Associated`]. Link loss can still be injected by sending
/// [`LinkEvent::Disassociated`] on the pipeline's event channel.
#[derive(Debug, Clone, Default)]
pub struct HostInterface {
    credentials: Option<Credentials>,
}

impl HostInterface {
    /// Create a host interface. Credentials are only recorded for logging
    /// the network name; the OS owns the actual association.
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self { credentials }
    }
}

impl NetworkInterface for HostInterface {
    fn associate(&self, events: &LinkEventSender) {
        match &self.credentials {
            Some(creds) => debug!(ssid = %creds.ssid, "Association requested"),
            None => debug!("Association requested"),
        }
        let _ = events.send(LinkEvent::Associated);
    }
}
