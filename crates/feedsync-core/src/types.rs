//! Core types for the feed synchronization client

use serde::{Deserialize, Serialize};

/// A single feed entry
///
/// Posts are immutable once created; identity is `id`. Two posts with the
/// same `id` are the same logical entity regardless of which channel
/// delivered them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Opaque unique identifier, minted by the remote end
    pub id: String,
    /// Opaque identifier of the authoring peer
    pub author: String,
    /// Display name chosen by the author (some producers omit it)
    #[serde(default)]
    pub author_name: String,
    /// Post body
    pub content: String,
    /// Unix timestamp in seconds
    pub timestamp: i64,
}

impl Post {
    /// Whether this post was authored by the given peer
    pub fn is_authored_by(&self, peer_id: &str) -> bool {
        self.author == peer_id
    }

    /// Format the timestamp as a relative time string.
    ///
    /// Returns strings like "Just now", "5m ago", "2h ago", "3d ago".
    pub fn relative_time(&self) -> String {
        let now = chrono::Utc::now().timestamp();
        let diff_secs = now - self.timestamp;

        if diff_secs < 60 {
            "Just now".to_string()
        } else if diff_secs < 3600 {
            format!("{}m ago", diff_secs / 60)
        } else if diff_secs < 86400 {
            format!("{}h ago", diff_secs / 3600)
        } else {
            format!("{}d ago", diff_secs / 86400)
        }
    }
}

/// A roster entry for a connected peer
///
/// Mutable; identity is `peer_id`. Absence from the latest roster snapshot
/// (or an explicit peer-left event) removes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Opaque peer identifier (some producers emit it as `id`)
    #[serde(alias = "id")]
    pub peer_id: String,
    /// Display name, if the peer announced one
    #[serde(default)]
    pub name: Option<String>,
    /// Network address, if known
    #[serde(default)]
    pub address: Option<String>,
    /// Whether the peer is a browser client rather than a native node
    #[serde(default)]
    pub is_browser: bool,
}

impl Peer {
    /// Display name for the peer, falling back to a generic label
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Anonymous")
    }
}

/// Materialized view of the synchronized state
///
/// Posts are newest-first and unique by id; peers are unique by peer_id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedSnapshot {
    /// Our own peer identifier, once a channel has reported it
    pub local_peer_id: Option<String>,
    /// Feed entries, newest known first
    pub posts: Vec<Post>,
    /// Current peer roster
    pub peers: Vec<Peer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, author: &str) -> Post {
        Post {
            id: id.to_string(),
            author: author.to_string(),
            author_name: "Bob".to_string(),
            content: "hi".to_string(),
            timestamp: 1000,
        }
    }

    #[test]
    fn test_post_authorship() {
        let p = post("p1", "peer-b");
        assert!(p.is_authored_by("peer-b"));
        assert!(!p.is_authored_by("peer-a"));
    }

    #[test]
    fn test_post_missing_author_name_decodes_empty() {
        let p: Post = serde_json::from_str(
            r#"{"id":"p1","author":"b","content":"hi","timestamp":1000}"#,
        )
        .unwrap();
        assert_eq!(p.author_name, "");
    }

    #[test]
    fn test_post_relative_time_recent() {
        let mut p = post("p1", "b");
        p.timestamp = chrono::Utc::now().timestamp();
        assert_eq!(p.relative_time(), "Just now");

        p.timestamp = chrono::Utc::now().timestamp() - 120;
        assert_eq!(p.relative_time(), "2m ago");
    }

    #[test]
    fn test_peer_accepts_id_alias() {
        let peer: Peer = serde_json::from_str(r#"{"id":"abc","address":"/ip4/1.2.3.4"}"#).unwrap();
        assert_eq!(peer.peer_id, "abc");
        assert_eq!(peer.address.as_deref(), Some("/ip4/1.2.3.4"));
        assert!(!peer.is_browser);
    }

    #[test]
    fn test_peer_display_name() {
        let named: Peer = serde_json::from_str(r#"{"peer_id":"abc","name":"Love"}"#).unwrap();
        assert_eq!(named.display_name(), "Love");

        let anonymous: Peer = serde_json::from_str(r#"{"peer_id":"abc"}"#).unwrap();
        assert_eq!(anonymous.display_name(), "Anonymous");
    }

    #[test]
    fn test_snapshot_default_is_empty() {
        let snapshot = FeedSnapshot::default();
        assert!(snapshot.local_peer_id.is_none());
        assert!(snapshot.posts.is_empty());
        assert!(snapshot.peers.is_empty());
    }
}
