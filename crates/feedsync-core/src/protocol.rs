//! Push-channel message envelope
//!
//! Messages are JSON objects with a `type` discriminator. Producers are not
//! perfectly consistent about framing: posts arrive as `new_post` or `Post`
//! with the payload under `post`, `Post`, or inline, and peer membership
//! events arrive as `peer_joined`/`PeerJoined` with the id at the top level
//! or nested under the variant name. All of that tolerance lives here, in a
//! single canonical decoder; the rest of the client only ever sees
//! [`PushEvent`] variants.
//!
//! ## Vocabulary
//!
//! ```text
//! Inbound:   init {peer_id, peers[], posts[]}
//!            new_post {post}        (alias: Post)
//!            peer_joined {peer_id}  (alias: PeerJoined, nested id)
//!            peer_left {peer_id}    (alias: PeerLeft, nested id)
//!            ping / pong
//! Outbound:  post {content, author_name}
//!            ping / pong
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::error::{FeedError, FeedResult};
use crate::types::{Peer, Post};

/// Inbound push-channel events, after normalization
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// Initial full-state snapshot, sent once after the channel opens
    Init {
        peer_id: String,
        peers: Vec<Peer>,
        posts: Vec<Post>,
    },
    /// A single post broadcast incrementally
    NewPost { post: Post },
    /// A peer joined; full metadata must be fetched out of band
    PeerJoined { peer_id: String },
    /// A peer left the network
    PeerLeft { peer_id: String },
    /// Liveness probe from the remote end
    Ping,
    /// Answer to our own liveness probe
    Pong,
}

impl PushEvent {
    /// Decode one wire message, normalizing the known producer variants.
    ///
    /// Returns `FeedError::Protocol` for anything that is not a JSON object
    /// with a recognized `type`; the caller discards such messages.
    pub fn decode(raw: &str) -> FeedResult<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| FeedError::Protocol(format!("invalid JSON: {e}")))?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| FeedError::Protocol("missing type discriminator".to_string()))?;

        match kind {
            "init" => {
                let peer_id = value
                    .get("peer_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| FeedError::Protocol("init without peer_id".to_string()))?
                    .to_string();
                let peers = decode_list(&value, "peers")?;
                let posts = decode_list(&value, "posts")?;
                Ok(PushEvent::Init { peer_id, peers, posts })
            }
            "new_post" | "Post" => {
                let payload = value
                    .get("post")
                    .or_else(|| value.get("Post"))
                    .unwrap_or(&value);
                let post: Post = serde_json::from_value(payload.clone())
                    .map_err(|e| FeedError::Protocol(format!("malformed post payload: {e}")))?;
                Ok(PushEvent::NewPost { post })
            }
            "peer_joined" | "PeerJoined" => Ok(PushEvent::PeerJoined {
                peer_id: decode_peer_id(&value, "PeerJoined")?,
            }),
            "peer_left" | "PeerLeft" => Ok(PushEvent::PeerLeft {
                peer_id: decode_peer_id(&value, "PeerLeft")?,
            }),
            "ping" => Ok(PushEvent::Ping),
            "pong" => Ok(PushEvent::Pong),
            other => Err(FeedError::Protocol(format!("unknown message type: {other}"))),
        }
    }

    /// The peer id this event refers to, if any
    pub fn peer_id(&self) -> Option<&str> {
        match self {
            PushEvent::Init { peer_id, .. } => Some(peer_id),
            PushEvent::PeerJoined { peer_id } => Some(peer_id),
            PushEvent::PeerLeft { peer_id } => Some(peer_id),
            _ => None,
        }
    }

    /// Check if this is the initial snapshot message
    pub fn is_init(&self) -> bool {
        matches!(self, PushEvent::Init { .. })
    }
}

/// Missing lists decode as empty, matching producers that omit them
fn decode_list<T: serde::de::DeserializeOwned>(value: &Value, field: &str) -> FeedResult<Vec<T>> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(list) => serde_json::from_value(list.clone())
            .map_err(|e| FeedError::Protocol(format!("malformed {field} list: {e}"))),
    }
}

/// `peer_id` at the top level, or nested under the variant name
fn decode_peer_id(value: &Value, variant: &str) -> FeedResult<String> {
    value
        .get("peer_id")
        .or_else(|| value.get(variant).and_then(|v| v.get("peer_id")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| FeedError::Protocol(format!("{variant} without peer_id")))
}

/// Outbound messages sent over the push channel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Publish a new post
    Post { content: String, author_name: String },
    /// Liveness probe
    Ping,
    /// Answer to a remote liveness probe
    Pong,
}

impl ClientMessage {
    /// Encode to the JSON wire form
    pub fn encode(&self) -> FeedResult<String> {
        serde_json::to_string(self).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_init() {
        let raw = r#"{
            "type": "init",
            "peer_id": "A",
            "peers": [{"peer_id": "B", "is_browser": true}],
            "posts": [{"id": "p1", "author": "B", "author_name": "Bob", "content": "hi", "timestamp": 1000}]
        }"#;

        match PushEvent::decode(raw).unwrap() {
            PushEvent::Init { peer_id, peers, posts } => {
                assert_eq!(peer_id, "A");
                assert_eq!(peers.len(), 1);
                assert!(peers[0].is_browser);
                assert_eq!(posts.len(), 1);
                assert_eq!(posts[0].id, "p1");
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn test_decode_init_missing_lists() {
        let event = PushEvent::decode(r#"{"type":"init","peer_id":"A"}"#).unwrap();
        match event {
            PushEvent::Init { peers, posts, .. } => {
                assert!(peers.is_empty());
                assert!(posts.is_empty());
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn test_decode_new_post() {
        let raw = r#"{"type":"new_post","post":{"id":"p1","author":"B","author_name":"Bob","content":"hi","timestamp":1000}}"#;
        match PushEvent::decode(raw).unwrap() {
            PushEvent::NewPost { post } => assert_eq!(post.id, "p1"),
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn test_decode_post_alias_variants() {
        // Capitalized discriminator with payload under "Post"
        let nested = r#"{"type":"Post","Post":{"id":"p1","author":"B","content":"hi","timestamp":1}}"#;
        assert!(matches!(
            PushEvent::decode(nested).unwrap(),
            PushEvent::NewPost { .. }
        ));

        // Post fields inline next to the discriminator
        let inline = r#"{"type":"Post","id":"p2","author":"B","content":"hi","timestamp":1}"#;
        match PushEvent::decode(inline).unwrap() {
            PushEvent::NewPost { post } => assert_eq!(post.id, "p2"),
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn test_decode_peer_joined_variants() {
        let flat = r#"{"type":"peer_joined","peer_id":"B"}"#;
        assert_eq!(PushEvent::decode(flat).unwrap().peer_id(), Some("B"));

        let nested = r#"{"type":"PeerJoined","PeerJoined":{"peer_id":"C"}}"#;
        assert_eq!(PushEvent::decode(nested).unwrap().peer_id(), Some("C"));
    }

    #[test]
    fn test_decode_peer_left() {
        let event = PushEvent::decode(r#"{"type":"peer_left","peer_id":"B"}"#).unwrap();
        assert_eq!(event, PushEvent::PeerLeft { peer_id: "B".to_string() });
    }

    #[test]
    fn test_decode_ping_pong() {
        assert_eq!(PushEvent::decode(r#"{"type":"ping"}"#).unwrap(), PushEvent::Ping);
        assert_eq!(PushEvent::decode(r#"{"type":"pong"}"#).unwrap(), PushEvent::Pong);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(PushEvent::decode("{not json").is_err());
        assert!(PushEvent::decode(r#"{"no_type":true}"#).is_err());
        assert!(PushEvent::decode(r#"{"type":"mystery"}"#).is_err());
        assert!(PushEvent::decode(r#"{"type":"new_post","post":{"id":"p1"}}"#).is_err());
        assert!(PushEvent::decode(r#"{"type":"peer_joined"}"#).is_err());
    }

    #[test]
    fn test_is_init() {
        let init = PushEvent::decode(r#"{"type":"init","peer_id":"A"}"#).unwrap();
        assert!(init.is_init());
        assert!(!PushEvent::Ping.is_init());
    }

    #[test]
    fn test_encode_post_message() {
        let msg = ClientMessage::Post {
            content: "hello".to_string(),
            author_name: "Alice".to_string(),
        };
        let encoded = msg.encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["type"], "post");
        assert_eq!(value["content"], "hello");
        assert_eq!(value["author_name"], "Alice");
    }

    #[test]
    fn test_encode_ping() {
        assert_eq!(ClientMessage::Ping.encode().unwrap(), r#"{"type":"ping"}"#);
        assert_eq!(ClientMessage::Pong.encode().unwrap(), r#"{"type":"pong"}"#);
    }
}
