//! Connectivity monitoring and the shared link-ready condition.

use super::stream::PipelineStats;
use super::traits::NetworkInterface;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Lifecycle events emitted by the network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The interface came up and can begin associating.
    InterfaceStarted,
    /// Association succeeded; the link can carry traffic.
    Associated,
    /// Association was lost.
    Disassociated,
}

/// Sending half of the connectivity event channel.
///
/// Sending never blocks, so it is safe to call from interrupt-style callbacks.
pub type LinkEventSender = mpsc::UnboundedSender<LinkEvent>;

/// Receiving half of the connectivity event channel.
pub type LinkEventReceiver = mpsc::UnboundedReceiver<LinkEvent>;

/// Create the channel connecting interface callbacks to the monitor.
pub fn link_event_channel() -> (LinkEventSender, LinkEventReceiver) {
    mpsc::unbounded_channel()
}

/// Value published by a [`LinkReadyFlag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkStatus {
    /// Whether the interface is currently associated
    pub ready: bool,
    /// Number of ready-to-down transitions so far
    pub losses: u64,
}

/// Process-wide "link-ready" condition.
///
/// Reads and writes are atomic. Besides polling with
/// [`is_link_ready`](Self::is_link_ready), tasks can
/// [`subscribe`](Self::subscribe) to be woken on every change.
///
/// Every drop to "not ready" also bumps [`LinkStatus::losses`], so a loss
/// followed by a fast reassociation stays visible to a reader that only
/// wakes after the link is back.
#[derive(Clone, Debug)]
pub struct LinkReadyFlag {
    tx: Arc<watch::Sender<LinkStatus>>,
}

impl LinkReadyFlag {
    /// Create a flag in the "not ready" state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LinkStatus::default());
        Self { tx: Arc::new(tx) }
    }

    /// Latest known link state. Never blocks.
    pub fn is_link_ready(&self) -> bool {
        self.tx.borrow().ready
    }

    /// Latest link state together with the loss count.
    pub fn status(&self) -> LinkStatus {
        *self.tx.borrow()
    }

    /// Update the flag, notifying subscribers if the value changed.
    ///
    /// Returns `true` when the value changed.
    pub fn set(&self, ready: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if current.ready == ready {
                return false;
            }
            current.ready = ready;
            if !ready {
                current.losses += 1;
            }
            true
        })
    }

    /// Receiver that observes every subsequent change of the flag.
    pub fn subscribe(&self) -> watch::Receiver<LinkStatus> {
        self.tx.subscribe()
    }
}

impl Default for LinkReadyFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks interface association and maintains the [`LinkReadyFlag`].
///
/// Association failures are never reported upward: on every loss the monitor
/// asks the interface to associate again, indefinitely and without delay.
pub struct ConnectivityMonitor<I: NetworkInterface> {
    interface: I,
    flag: LinkReadyFlag,
    events: LinkEventSender,
    stats: Arc<PipelineStats>,
}

impl<I: NetworkInterface> ConnectivityMonitor<I> {
    /// Create a monitor driving `interface`.
    ///
    /// `events` is handed to the interface on every association request so it
    /// can report the outcome.
    pub fn new(
        interface: I,
        flag: LinkReadyFlag,
        events: LinkEventSender,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            interface,
            flag,
            events,
            stats,
        }
    }

    /// The flag maintained by this monitor.
    pub fn flag(&self) -> &LinkReadyFlag {
        &self.flag
    }

    /// Latest known link state.
    pub fn is_link_ready(&self) -> bool {
        self.flag.is_link_ready()
    }

    /// React to one interface event. Never blocks.
    pub fn handle_event(&self, event: LinkEvent) {
        match event {
            LinkEvent::InterfaceStarted => {
                debug!("Network interface started, associating");
                self.request_association();
            }
            LinkEvent::Associated => {
                if self.flag.set(true) {
                    info!("Link associated");
                }
            }
            LinkEvent::Disassociated => {
                if self.flag.set(false) {
                    self.stats.link_losses.fetch_add(1, Ordering::Relaxed);
                }
                info!("Link disassociated, retrying association");
                self.request_association();
            }
        }
    }

    fn request_association(&self) {
        self.stats
            .association_attempts
            .fetch_add(1, Ordering::Relaxed);
        self.interface.associate(&self.events);
    }

    /// Dispatch events until `cancel` fires or every sender is dropped.
    pub async fn run(self, mut events: LinkEventReceiver, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
            }
        }
        debug!("Connectivity monitor stopped");
    }
}
