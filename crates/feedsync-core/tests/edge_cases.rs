//! Edge case and boundary condition tests
//!
//! These tests verify the system handles unusual inputs,
//! error conditions, and boundary values correctly.

use feedsync_core::{FeedSnapshot, FeedStore, Peer, Post, PushEvent};

fn post(id: &str) -> Post {
    Post {
        id: id.to_string(),
        author: "peer-b".to_string(),
        author_name: "Bob".to_string(),
        content: format!("content {id}"),
        timestamp: 1000,
    }
}

// ============================================================================
// Empty Input Tests
// ============================================================================

/// Empty snapshot on an empty store is a complete no-op
#[test]
fn test_empty_snapshot_on_empty_store() {
    let store = FeedStore::new();
    let inserted = store.apply_snapshot(FeedSnapshot::default());

    assert!(inserted.is_empty());
    assert_eq!(store.post_count(), 0);
    assert_eq!(store.peer_count(), 0);
    assert!(store.local_peer_id().is_none());
}

/// Empty snapshot wipes the roster but leaves posts alone
#[test]
fn test_empty_snapshot_clears_roster_keeps_posts() {
    let store = FeedStore::new();
    store.merge_post(post("p1"));
    store.upsert_peer(Peer {
        peer_id: "bob".to_string(),
        name: None,
        address: None,
        is_browser: false,
    });

    store.apply_snapshot(FeedSnapshot::default());

    assert_eq!(store.post_count(), 1);
    assert_eq!(store.peer_count(), 0);
}

/// Posts with empty content are stored as-is (no client-side validation)
#[test]
fn test_empty_content_post() {
    let store = FeedStore::new();
    let mut empty = post("p1");
    empty.content = String::new();

    assert!(store.merge_post(empty));
    assert_eq!(store.snapshot().posts[0].content, "");
}

/// Removing from an empty roster is a no-op
#[test]
fn test_remove_peer_from_empty_roster() {
    let store = FeedStore::new();
    assert!(!store.remove_peer("nobody"));
}

// ============================================================================
// Unicode and Size Tests
// ============================================================================

/// Unicode content survives the wire decode intact
#[test]
fn test_unicode_post_content() {
    let content = "\u{1F680} gru\u{308}\u{df}e \u{4e16}\u{754c}";
    let raw = serde_json::json!({
        "type": "new_post",
        "post": {
            "id": "p1",
            "author": "B",
            "author_name": "B\u{e9}atrice",
            "content": content,
            "timestamp": 1000
        }
    })
    .to_string();

    match PushEvent::decode(&raw).unwrap() {
        PushEvent::NewPost { post } => {
            assert_eq!(post.content, content);
            assert_eq!(post.author_name, "B\u{e9}atrice");
        }
        other => panic!("wrong event: {other:?}"),
    }
}

/// A very long post body is stored without truncation
#[test]
fn test_long_post_content() {
    let store = FeedStore::new();
    let mut long = post("p1");
    long.content = "a".repeat(100_000);

    assert!(store.merge_post(long));
    assert_eq!(store.snapshot().posts[0].content.len(), 100_000);
}

/// Timestamps outside the plausible range are carried through untouched
#[test]
fn test_extreme_timestamps() {
    let store = FeedStore::new();
    let mut ancient = post("p1");
    ancient.timestamp = -1;
    let mut distant = post("p2");
    distant.timestamp = i64::MAX;

    store.merge_post(ancient);
    store.merge_post(distant);

    let snapshot = store.snapshot();
    assert_eq!(snapshot.posts[0].timestamp, i64::MAX);
    assert_eq!(snapshot.posts[1].timestamp, -1);
}

// ============================================================================
// Wire Shape Tolerance Tests
// ============================================================================

/// A roster entry with only an id still decodes
#[test]
fn test_minimal_peer_decodes() {
    let peer: Peer = serde_json::from_str(r#"{"peer_id":"abc"}"#).unwrap();
    assert_eq!(peer.peer_id, "abc");
    assert!(peer.name.is_none());
    assert!(peer.address.is_none());
    assert!(!peer.is_browser);
}

/// init carrying null lists behaves like missing lists
#[test]
fn test_init_with_null_lists() {
    let event =
        PushEvent::decode(r#"{"type":"init","peer_id":"A","peers":null,"posts":null}"#).unwrap();
    match event {
        PushEvent::Init { peers, posts, .. } => {
            assert!(peers.is_empty());
            assert!(posts.is_empty());
        }
        other => panic!("wrong event: {other:?}"),
    }
}

/// Extra unknown fields on a post are ignored, not fatal
#[test]
fn test_post_with_extra_fields() {
    let raw = r#"{
        "type": "new_post",
        "post": {
            "id": "p1",
            "author": "B",
            "author_name": "Bob",
            "content": "hi",
            "timestamp": 1000,
            "reactions": ["+1"],
            "thread_id": 7
        }
    }"#;
    assert!(matches!(
        PushEvent::decode(raw).unwrap(),
        PushEvent::NewPost { .. }
    ));
}

/// The discriminator is case-sensitive except for the documented aliases
#[test]
fn test_unknown_case_variant_is_rejected() {
    assert!(PushEvent::decode(r#"{"type":"INIT","peer_id":"A"}"#).is_err());
    assert!(PushEvent::decode(r#"{"type":"New_Post"}"#).is_err());
}

// ============================================================================
// Roster Boundary Tests
// ============================================================================

/// Upserting the same peer repeatedly never duplicates it
#[test]
fn test_repeated_upsert_single_entry() {
    let store = FeedStore::new();
    for i in 0..10 {
        store.upsert_peer(Peer {
            peer_id: "bob".to_string(),
            name: Some(format!("Bob v{i}")),
            address: None,
            is_browser: false,
        });
    }

    let snapshot = store.snapshot();
    assert_eq!(snapshot.peers.len(), 1);
    assert_eq!(snapshot.peers[0].name.as_deref(), Some("Bob v9"));
}

/// Replacing the roster with an empty set empties it
#[test]
fn test_replace_peers_with_empty() {
    let store = FeedStore::new();
    store.upsert_peer(Peer {
        peer_id: "bob".to_string(),
        name: None,
        address: None,
        is_browser: true,
    });

    store.replace_peers(vec![]);
    assert_eq!(store.peer_count(), 0);
}

/// Identity reported by a later snapshot overrides the earlier one
#[test]
fn test_local_identity_follows_latest_snapshot() {
    let store = FeedStore::new();
    store.apply_snapshot(FeedSnapshot {
        local_peer_id: Some("first".to_string()),
        posts: vec![],
        peers: vec![],
    });
    store.apply_snapshot(FeedSnapshot {
        local_peer_id: Some("second".to_string()),
        posts: vec![],
        peers: vec![],
    });
    // A snapshot without identity leaves the last known one in place
    store.apply_snapshot(FeedSnapshot::default());

    assert_eq!(store.local_peer_id().as_deref(), Some("second"));
}
