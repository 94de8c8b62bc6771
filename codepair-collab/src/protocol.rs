//! JSON wire protocol for the room channel.
//!
//! Every content-bearing frame carries the complete document text:
//! ```json
//! {"type": "update", "content": "def f(", "cursor_position": 6, "client_id": "…"}
//! ```
//!
//! Inbound `type` values `sync`/`code_sync` decode to [`MessageKind::Sync`]
//! (full-state push on join) and `update`/`code_update` to
//! [`MessageKind::Update`]. Outbound frames always use the short names.
//! Frames with any other type, or without `content`, are protocol errors and
//! get dropped by the connection layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Frame kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Full-state push, sent by the server when a client joins
    Sync,
    /// Content change made by some participant
    Update,
}

impl MessageKind {
    /// Map a wire `type` tag, accepting the legacy `code_*` names.
    pub fn from_wire(tag: &str) -> Option<Self> {
        match tag {
            "sync" | "code_sync" => Some(Self::Sync),
            "update" | "code_update" => Some(Self::Update),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Update => "update",
        }
    }
}

/// A decoded room frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Entire document text, never a delta
    pub content: String,
    /// Sender's caret offset at the time of the edit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_position: Option<usize>,
    /// Identifier of the originating client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Lenient shape used for decoding, validated into a [`SyncMessage`].
#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    content: Option<String>,
    #[serde(default, alias = "cursorPosition")]
    cursor_position: Option<usize>,
    #[serde(default, alias = "clientId")]
    client_id: Option<String>,
}

impl SyncMessage {
    /// Full-state push.
    pub fn sync(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Sync,
            content: content.into(),
            cursor_position: None,
            client_id: None,
        }
    }

    /// Local edit notification tagged with its origin.
    pub fn update(
        content: impl Into<String>,
        cursor_position: usize,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            kind: MessageKind::Update,
            content: content.into(),
            cursor_position: Some(cursor_position),
            client_id: Some(client_id.into()),
        }
    }

    /// Whether this frame was sent by `client_id`.
    pub fn is_from(&self, client_id: &str) -> bool {
        self.client_id.as_deref() == Some(client_id)
    }

    /// Serialize to a text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Parse and validate a text frame.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let raw: RawFrame =
            serde_json::from_str(frame).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        let tag = raw.kind.ok_or(ProtocolError::MissingType)?;
        let kind = MessageKind::from_wire(&tag).ok_or(ProtocolError::UnknownType(tag))?;
        let content = raw.content.ok_or(ProtocolError::MissingContent)?;
        Ok(Self {
            kind,
            content,
            cursor_position: raw.cursor_position,
            client_id: raw.client_id,
        })
    }
}

/// Frame-level failures. Always recoverable by dropping the frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(String),
    #[error("Frame has no type")]
    MissingType,
    #[error("Unsupported frame type: {0}")]
    UnknownType(String),
    #[error("Frame has no content")]
    MissingContent,
    #[error("Binary frames are not part of the protocol")]
    BinaryFrame,
    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_encodes_wire_shape() {
        let msg = SyncMessage::update("def f(", 6, "client-a");
        let json: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();

        assert_eq!(json["type"], "update");
        assert_eq!(json["content"], "def f(");
        assert_eq!(json["cursor_position"], 6);
        assert_eq!(json["client_id"], "client-a");
    }

    #[test]
    fn test_sync_omits_optional_fields() {
        let encoded = SyncMessage::sync("x=1").encode().unwrap();
        assert_eq!(encoded, r#"{"type":"sync","content":"x=1"}"#);
    }

    #[test]
    fn test_decode_accepts_legacy_type_names() {
        let sync =
            SyncMessage::decode(r#"{"type":"code_sync","content":"a","version":3}"#).unwrap();
        assert_eq!(sync.kind, MessageKind::Sync);
        assert_eq!(sync.content, "a");

        let update = SyncMessage::decode(r#"{"type":"code_update","content":"b"}"#).unwrap();
        assert_eq!(update.kind, MessageKind::Update);
    }

    #[test]
    fn test_decode_camel_case_aliases() {
        let msg = SyncMessage::decode(
            r#"{"type":"update","content":"x","cursorPosition":1,"clientId":"c"}"#,
        )
        .unwrap();
        assert_eq!(msg.cursor_position, Some(1));
        assert!(msg.is_from("c"));
    }

    #[test]
    fn test_decode_without_optional_fields() {
        let msg = SyncMessage::decode(r#"{"type":"sync","content":""}"#).unwrap();
        assert_eq!(msg.content, "");
        assert!(msg.cursor_position.is_none());
        assert!(msg.client_id.is_none());
        assert!(!msg.is_from("anyone"));
    }

    #[test]
    fn test_decode_rejects_missing_content() {
        assert_eq!(
            SyncMessage::decode(r#"{"type":"update"}"#),
            Err(ProtocolError::MissingContent)
        );
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert_eq!(
            SyncMessage::decode(r#"{"type":"user_left","client_id":"x"}"#),
            Err(ProtocolError::UnknownType("user_left".to_string()))
        );
    }

    #[test]
    fn test_decode_rejects_missing_type() {
        assert_eq!(
            SyncMessage::decode(r#"{"content":"x"}"#),
            Err(ProtocolError::MissingType)
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            SyncMessage::decode("{not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            SyncMessage::decode(r#"{"type":"update","content":42}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_content_is_full_text_with_newlines() {
        let content = "def f():\n    pass\n";
        let msg = SyncMessage::update(content, content.len(), "c");
        let decoded = SyncMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(MessageKind::Sync.as_str(), "sync");
        assert_eq!(MessageKind::Update.as_str(), "update");
        assert_eq!(MessageKind::from_wire("op"), None);
    }
}
