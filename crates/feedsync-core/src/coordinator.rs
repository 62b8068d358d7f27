//! Channel orchestration: who feeds the store, and when to fall back
//!
//! The coordinator is the sole driver of store mutations from inbound
//! events. It decides, for every inbound event and outbound publish
//! request, which channel is authoritative:
//!
//! - While the push channel is up, incremental events feed the store
//!   directly. The only pull-channel use is an out-of-band roster refresh
//!   when a peer joins (the join event does not carry full peer metadata).
//! - While the push channel is down, a fixed-interval poll fetches the full
//!   snapshot so the view stays eventually fresh during outages.
//! - After the channel opens, an `init` snapshot is expected promptly; if
//!   none arrives within the configured timeout the coordinator polls once
//!   instead, so the first load never hangs on a quiet channel.
//! - Outbound posts go over the push channel when it is open at call time
//!   and fall back to the request/response publish otherwise. A post
//!   created by the fallback is merged immediately; the later push echo
//!   deduplicates by id.
//!
//! Failure semantics: malformed inbound messages are discarded and logged;
//! failed polls are logged and retried on the next interval; only publish
//! failures surface to the caller, and they are not retried automatically.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::connection::{ConnectionEvent, ConnectionManager, ConnectionState};
use crate::error::{FeedError, FeedResult};
use crate::notify::NotificationEmitter;
use crate::protocol::{ClientMessage, PushEvent};
use crate::rest::{FallbackApi, PublishRequest};
use crate::store::FeedStore;
use crate::types::{FeedSnapshot, Post};

/// Orchestrates both channels into the store
pub struct SyncCoordinator {
    store: Arc<FeedStore>,
    connection: Arc<ConnectionManager>,
    api: Arc<dyn FallbackApi>,
    emitter: Arc<NotificationEmitter>,
    poll_interval: Duration,
    init_timeout: Duration,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<FeedStore>,
        connection: Arc<ConnectionManager>,
        api: Arc<dyn FallbackApi>,
        emitter: Arc<NotificationEmitter>,
        poll_interval: Duration,
        init_timeout: Duration,
    ) -> Self {
        Self {
            store,
            connection,
            api,
            emitter,
            poll_interval,
            init_timeout,
        }
    }

    /// Spawn the event loop, consuming the connection event stream
    pub fn spawn(
        self: Arc<Self>,
        events: mpsc::UnboundedReceiver<ConnectionEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(events).await })
    }

    /// Submit a post through whichever channel is available.
    ///
    /// Returns the created post when the request/response path handled it,
    /// `None` when it went out over the push channel (the id is assigned
    /// remotely and arrives back as a regular `new_post`). A failure of the
    /// fallback path is surfaced once and not retried.
    pub async fn publish(
        &self,
        content: impl Into<String>,
        author_name: impl Into<String>,
    ) -> FeedResult<Option<Post>> {
        let request = PublishRequest {
            content: content.into(),
            author_name: author_name.into(),
        };

        let push = ClientMessage::Post {
            content: request.content.clone(),
            author_name: request.author_name.clone(),
        };
        if self.connection.send(&push) {
            debug!("post submitted over push channel");
            return Ok(None);
        }

        debug!("push channel closed; publishing via fallback");
        let post = self.api.publish(&request).await.map_err(|e| match e {
            FeedError::Publish(_) => e,
            other => FeedError::Publish(other.to_string()),
        })?;

        // The caller's own action: merged for immediate visibility, never
        // notified. The push echo is deduplicated by id.
        self.store.merge_post(post.clone());
        Ok(Some(post))
    }

    /// Event loop. Ends when the connection event stream closes (client
    /// teardown) or the task is aborted.
    async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<ConnectionEvent>) {
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The immediate first tick is not a scheduled poll
        poll.tick().await;

        // Deadline for the expected `init` after the channel opens
        let mut init_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event, &mut init_deadline).await,
                    None => break,
                },
                _ = poll.tick(), if !self.connection.is_connected() => {
                    self.poll_refresh().await;
                }
                _ = wait_for(init_deadline) => {
                    init_deadline = None;
                    debug!("no init within timeout; seeding from pull channel");
                    self.poll_refresh().await;
                }
            }
        }
        debug!("coordinator loop ended");
    }

    async fn handle_event(&self, event: ConnectionEvent, init_deadline: &mut Option<Instant>) {
        match event {
            ConnectionEvent::State { state, reason } => {
                if state == ConnectionState::Connected {
                    *init_deadline = Some(Instant::now() + self.init_timeout);
                } else {
                    *init_deadline = None;
                }
                self.emitter.connection_changed(state, &reason);
            }
            ConnectionEvent::Message(raw) => match PushEvent::decode(&raw) {
                Ok(event) => self.apply_push_event(event, init_deadline).await,
                // One bad message never stalls the stream
                Err(e) => warn!(error = %e, "discarding malformed push message"),
            },
        }
    }

    async fn apply_push_event(&self, event: PushEvent, init_deadline: &mut Option<Instant>) {
        match event {
            PushEvent::Init { peer_id, peers, posts } => {
                *init_deadline = None;
                info!(
                    %peer_id,
                    peers = peers.len(),
                    posts = posts.len(),
                    "received initial snapshot"
                );
                let inserted = self.store.apply_snapshot(FeedSnapshot {
                    local_peer_id: Some(peer_id),
                    posts,
                    peers,
                });
                self.notify_inserted(&inserted);
            }
            PushEvent::NewPost { post } => {
                if self.store.merge_post(post.clone()) {
                    self.notify_inserted(std::slice::from_ref(&post));
                }
            }
            PushEvent::PeerJoined { peer_id } => {
                debug!(%peer_id, "peer joined; refreshing roster");
                self.refresh_roster().await;
            }
            PushEvent::PeerLeft { peer_id } => {
                debug!(%peer_id, "peer left");
                self.store.remove_peer(&peer_id);
            }
            PushEvent::Ping => {
                let _ = self.connection.send(&ClientMessage::Pong);
            }
            PushEvent::Pong => {}
        }
    }

    /// Full-state refresh over the pull channel (offline poll, init fallback)
    async fn poll_refresh(&self) {
        match self.api.fetch_network().await {
            Ok(info) => {
                debug!(
                    posts = info.posts.len(),
                    peers = info.peers.len(),
                    "pull refresh applied"
                );
                let inserted = self.store.apply_snapshot(info.into_snapshot());
                self.notify_inserted(&inserted);
            }
            Err(e) => warn!(error = %e, "pull refresh failed; retrying on next interval"),
        }
    }

    /// Roster-only refresh, used while the push channel is up.
    /// Post authority stays with the push channel.
    async fn refresh_roster(&self) {
        match self.api.fetch_network().await {
            Ok(info) => self.store.replace_peers(info.peers),
            Err(e) => warn!(error = %e, "roster refresh failed"),
        }
    }

    fn notify_inserted(&self, posts: &[Post]) {
        let local = self.store.local_peer_id();
        for post in posts {
            self.emitter.post_inserted(post, local.as_deref());
        }
    }
}

/// Sleep until the deadline, or forever when there is none
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
