//! Wire schema for the `/ws` channel.
//!
//! Inbound messages are tagged by the transport itself: text frames are
//! control messages, binary frames carry one encoded still image. Outbound
//! messages are always JSON text:
//!
//! - `{"landmarks":[{"x":..,"y":..,"z":..,"visibility":..}, ...]}`
//! - `{"landmarks":[]}` when a frame decoded but no pose was found
//! - `{"message":"pong"}` in reply to `"ping"`

use std::fmt;

use bytes::Bytes;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::landmark::{Landmark, LandmarkSet};

/// The only recognised control payload.
pub const PING_TEXT: &str = "ping";

/// Body of the reply to [`PING_TEXT`].
pub const PONG_TEXT: &str = "pong";

/// One inbound message, classified by the transport's frame type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundMessage {
    /// Text frame.
    Control(String),
    /// Binary frame holding one compressed video frame.
    Payload(Bytes),
}

impl InboundMessage {
    /// Whether this is the literal `"ping"` control message.
    pub fn is_ping(&self) -> bool {
        matches!(self, Self::Control(text) if text == PING_TEXT)
    }
}

/// A message fanned out to clients.
#[derive(Clone, Debug, PartialEq)]
pub enum OutboundMessage {
    /// A pose was detected.
    LandmarksFound(LandmarkSet),
    /// The frame decoded but no pose was detected.
    LandmarksEmpty,
    /// Reply to a ping.
    Pong,
}

impl OutboundMessage {
    /// Map an extractor result onto the outbound schema.
    ///
    /// An empty set is reported the same way as "no pose".
    pub fn from_extraction(result: Option<LandmarkSet>) -> Self {
        match result {
            Some(set) if !set.is_empty() => Self::LandmarksFound(set),
            _ => Self::LandmarksEmpty,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LandmarksFound(_) => "landmarks",
            Self::LandmarksEmpty => "landmarks_empty",
            Self::Pong => "pong",
        }
    }

    /// Number of landmarks carried (zero for non-landmark messages).
    pub fn landmark_count(&self) -> usize {
        match self {
            Self::LandmarksFound(set) => set.len(),
            Self::LandmarksEmpty | Self::Pong => 0,
        }
    }

    /// Encode as JSON text.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse JSON text produced by [`Self::to_json`].
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

impl Serialize for OutboundMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::LandmarksFound(set) => map.serialize_entry("landmarks", set)?,
            Self::LandmarksEmpty => map.serialize_entry("landmarks", &[] as &[Landmark])?,
            Self::Pong => map.serialize_entry("message", PONG_TEXT)?,
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireOutbound {
    Landmarks { landmarks: Vec<Landmark> },
    Message { message: String },
}

impl<'de> Deserialize<'de> for OutboundMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match WireOutbound::deserialize(deserializer)? {
            WireOutbound::Landmarks { landmarks } if landmarks.is_empty() => {
                Ok(Self::LandmarksEmpty)
            }
            WireOutbound::Landmarks { landmarks } => {
                Ok(Self::LandmarksFound(LandmarkSet::new(landmarks)))
            }
            WireOutbound::Message { message } if message == PONG_TEXT => Ok(Self::Pong),
            WireOutbound::Message { message } => Err(D::Error::custom(format!(
                "unknown message: {message}"
            ))),
        }
    }
}

/// Who receives replies produced by a session's messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyScope {
    /// Every live session receives every reply (shared pose state).
    #[default]
    Broadcast,
    /// Only the session that sent the message receives the reply.
    Sender,
}

impl fmt::Display for ReplyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Broadcast => f.write_str("broadcast"),
            Self::Sender => f.write_str("sender"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_set(n: usize) -> LandmarkSet {
        (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let f = i as f32;
                Landmark::new(f / 10.0, f / 20.0, -f / 40.0, 0.5)
            })
            .collect()
    }

    #[test]
    fn ping_detection_is_exact() {
        assert!(InboundMessage::Control("ping".into()).is_ping());
        assert!(!InboundMessage::Control("PING".into()).is_ping());
        assert!(!InboundMessage::Control(" ping".into()).is_ping());
        assert!(!InboundMessage::Payload(Bytes::from_static(b"ping")).is_ping());
    }

    #[test]
    fn pong_json() {
        assert_eq!(OutboundMessage::Pong.to_json().unwrap(), r#"{"message":"pong"}"#);
    }

    #[test]
    fn empty_landmarks_json() {
        assert_eq!(
            OutboundMessage::LandmarksEmpty.to_json().unwrap(),
            r#"{"landmarks":[]}"#
        );
    }

    #[test]
    fn found_landmarks_json_shape() {
        let json = OutboundMessage::LandmarksFound(sample_set(33)).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let arr = value["landmarks"].as_array().unwrap();
        assert_eq!(arr.len(), 33);
        for entry in arr {
            let obj = entry.as_object().unwrap();
            for key in ["x", "y", "z", "visibility"] {
                assert!(obj.get(key).is_some_and(serde_json::Value::is_number));
            }
        }
    }

    #[test]
    fn from_extraction_maps_none_and_empty() {
        assert_eq!(OutboundMessage::from_extraction(None), OutboundMessage::LandmarksEmpty);
        assert_eq!(
            OutboundMessage::from_extraction(Some(LandmarkSet::default())),
            OutboundMessage::LandmarksEmpty
        );
        let found = OutboundMessage::from_extraction(Some(sample_set(2)));
        assert_eq!(found.kind(), "landmarks");
        assert_eq!(found.landmark_count(), 2);
    }

    #[test]
    fn parse_wire_messages() {
        assert_eq!(
            OutboundMessage::from_json(r#"{"message":"pong"}"#).unwrap(),
            OutboundMessage::Pong
        );
        assert_eq!(
            OutboundMessage::from_json(r#"{"landmarks":[]}"#).unwrap(),
            OutboundMessage::LandmarksEmpty
        );
        assert!(OutboundMessage::from_json(r#"{"message":"hello"}"#).is_err());
        assert!(OutboundMessage::from_json(r#"{"other":1}"#).is_err());
    }

    #[test]
    fn reply_scope_serde() {
        assert_eq!(serde_json::to_string(&ReplyScope::Sender).unwrap(), "\"sender\"");
        let scope: ReplyScope = serde_json::from_str("\"broadcast\"").unwrap();
        assert_eq!(scope, ReplyScope::Broadcast);
        assert_eq!(ReplyScope::default(), ReplyScope::Broadcast);
        assert_eq!(ReplyScope::Sender.to_string(), "sender");
    }

    fn finite() -> impl Strategy<Value = f32> {
        -1.0e6f32..1.0e6f32
    }

    proptest! {
        #[test]
        fn landmark_json_round_trip_preserves_values_and_order(
            raw in prop::collection::vec((finite(), finite(), finite(), 0.0f32..=1.0f32), 1..40)
        ) {
            let set: LandmarkSet = raw
                .iter()
                .map(|&(x, y, z, v)| Landmark { x, y, z, visibility: v })
                .collect();
            let json = OutboundMessage::LandmarksFound(set.clone()).to_json().unwrap();
            let parsed = OutboundMessage::from_json(&json).unwrap();
            prop_assert_eq!(parsed, OutboundMessage::LandmarksFound(set));
        }
    }
}
