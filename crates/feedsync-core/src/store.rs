//! Canonical feed and roster state with idempotent, confluent merges
//!
//! The store is the single shared mutable state of the client. It receives
//! data from two producers (push events and pull refreshes) that frequently
//! deliver the same entities redundantly and out of order, so every merge
//! operation is idempotent: the final content depends only on the set of
//! observed events, not on the channel or interleaving that delivered them.
//!
//! ## Ordering
//!
//! Posts are kept newest-known-first. A post's position is fixed at first
//! insertion and never revised by a duplicate delivery. Peers carry no
//! ordering guarantee; a full roster replacement supersedes the previous set.
//!
//! All operations are synchronous and total: their only observable effect is
//! a changed snapshot or a no-op.

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::types::{FeedSnapshot, Peer, Post};

#[derive(Default)]
struct StoreInner {
    local_peer_id: Option<String>,
    posts: Vec<Post>,
    seen: HashSet<String>,
    peers: Vec<Peer>,
}

/// Deduplicated, ordered collection of posts and peers
///
/// Created empty at client start, populated by an initial full snapshot from
/// whichever channel answers first, then mutated incrementally until the
/// client is torn down. Nothing is persisted across restarts.
#[derive(Default)]
pub struct FeedStore {
    inner: RwLock<StoreInner>,
}

impl FeedStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the local peer identity reported by a channel
    pub fn set_local_identity(&self, peer_id: impl Into<String>) {
        self.inner.write().local_peer_id = Some(peer_id.into());
    }

    /// The local peer identity, once known
    pub fn local_peer_id(&self) -> Option<String> {
        self.inner.read().local_peer_id.clone()
    }

    /// Insert a post at the front if its id is unseen; no-op otherwise.
    ///
    /// Returns whether an insertion occurred. The return value drives
    /// notification and polling-fallback decisions in the coordinator.
    pub fn merge_post(&self, post: Post) -> bool {
        let mut inner = self.inner.write();
        if inner.seen.contains(&post.id) {
            return false;
        }
        inner.seen.insert(post.id.clone());
        inner.posts.insert(0, post);
        true
    }

    /// Apply a full state snapshot.
    ///
    /// Replaces the peer set, records the local identity if the snapshot
    /// carries one, and prepends any posts not already present by id,
    /// preserving the relative order of already-known posts. Applying the
    /// same snapshot twice is a no-op the second time.
    ///
    /// Returns the posts that were actually inserted, in snapshot order.
    pub fn apply_snapshot(&self, snapshot: FeedSnapshot) -> Vec<Post> {
        let mut inner = self.inner.write();

        if let Some(peer_id) = snapshot.local_peer_id {
            inner.local_peer_id = Some(peer_id);
        }

        inner.peers = dedup_peers(snapshot.peers);

        let mut fresh: Vec<Post> = Vec::new();
        for post in snapshot.posts {
            if !inner.seen.contains(&post.id) && !fresh.iter().any(|p| p.id == post.id) {
                fresh.push(post);
            }
        }
        for post in &fresh {
            inner.seen.insert(post.id.clone());
        }
        inner.posts.splice(0..0, fresh.iter().cloned());

        fresh
    }

    /// Remove exactly one roster entry by id; no-op if absent
    pub fn remove_peer(&self, peer_id: &str) -> bool {
        let mut inner = self.inner.write();
        let before = inner.peers.len();
        inner.peers.retain(|p| p.peer_id != peer_id);
        inner.peers.len() != before
    }

    /// Insert a roster entry, or update it in place if already present
    pub fn upsert_peer(&self, peer: Peer) {
        let mut inner = self.inner.write();
        match inner.peers.iter_mut().find(|p| p.peer_id == peer.peer_id) {
            Some(existing) => *existing = peer,
            None => inner.peers.push(peer),
        }
    }

    /// Replace the full roster; the new set supersedes the previous one
    pub fn replace_peers(&self, peers: Vec<Peer>) {
        self.inner.write().peers = dedup_peers(peers);
    }

    /// Materialize the current state
    pub fn snapshot(&self) -> FeedSnapshot {
        let inner = self.inner.read();
        FeedSnapshot {
            local_peer_id: inner.local_peer_id.clone(),
            posts: inner.posts.clone(),
            peers: inner.peers.clone(),
        }
    }

    /// Number of posts currently held
    pub fn post_count(&self) -> usize {
        self.inner.read().posts.len()
    }

    /// Number of roster entries currently held
    pub fn peer_count(&self) -> usize {
        self.inner.read().peers.len()
    }
}

/// Keep the first occurrence of each peer_id
fn dedup_peers(peers: Vec<Peer>) -> Vec<Peer> {
    let mut ids = HashSet::new();
    peers
        .into_iter()
        .filter(|p| ids.insert(p.peer_id.clone()))
        .collect()
}
