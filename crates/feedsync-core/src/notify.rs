//! User-facing event derivation
//!
//! Store mutations and connection transitions are turned into the two
//! events presentation cares about. Duplicate deliveries never reach this
//! module (the store's merge return values gate it), and self-authored
//! posts are suppressed so the user is not notified about their own action.

use tokio::sync::broadcast;

use crate::connection::ConnectionState;
use crate::types::Post;

/// Default capacity for the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events surfaced to presentation
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A previously-unseen post authored by another peer arrived
    PostArrived { post: Post },
    /// The push channel changed state.
    /// Fires on every transition, including repeated transitions to the
    /// same state from different causes, so presentation can always show
    /// the latest reason text.
    ConnectionChanged {
        state: ConnectionState,
        reason: String,
    },
}

/// Broadcasts derived events to any number of observers
pub struct NotificationEmitter {
    tx: broadcast::Sender<FeedEvent>,
}

impl NotificationEmitter {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to derived events.
    ///
    /// Multiple subscribers can exist; events are broadcast to all. A slow
    /// subscriber may lag and miss events, but never blocks the producer.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.tx.subscribe()
    }

    /// Announce an inserted post, unless we authored it ourselves.
    ///
    /// Callers only invoke this for actual insertions; duplicates are
    /// already filtered out by the store.
    pub fn post_inserted(&self, post: &Post, local_peer_id: Option<&str>) {
        if let Some(local) = local_peer_id {
            if post.is_authored_by(local) {
                return;
            }
        }
        let _ = self.tx.send(FeedEvent::PostArrived { post: post.clone() });
    }

    /// Announce a connection state transition
    pub fn connection_changed(&self, state: ConnectionState, reason: &str) {
        let _ = self.tx.send(FeedEvent::ConnectionChanged {
            state,
            reason: reason.to_string(),
        });
    }
}

impl Default for NotificationEmitter {
    fn default() -> Self {
        Self::new()
    }
}
