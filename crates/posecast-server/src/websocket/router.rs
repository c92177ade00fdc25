//! Inbound message classification and dispatch.
//!
//! The message kind comes from the transport's own frame tag. A text frame
//! is a control message, a binary frame is a video frame; nothing is ever
//! inferred from a failed receive.

use std::sync::Arc;

use axum::extract::ws::Message;
use metrics::counter;
use posecast_core::{FrameError, InboundMessage, OutboundMessage, ReplyScope, SessionId};
use tracing::{debug, warn};

use super::broadcast::{BroadcastReport, Broadcaster};
use super::pipeline::FramePipeline;
use crate::metrics::{FRAME_ERRORS_TOTAL, FRAMES_TOTAL};

/// What a raw transport frame means to the session loop.
#[derive(Debug, PartialEq)]
pub enum Classified {
    /// A message for the router.
    Inbound(InboundMessage),
    /// Transport-level ping/pong; liveness only.
    Liveness,
    /// The client is closing.
    Close,
}

/// Classify one transport frame.
pub fn classify(message: Message) -> Classified {
    match message {
        Message::Text(text) => Classified::Inbound(InboundMessage::Control(text.as_str().to_owned())),
        Message::Binary(data) => Classified::Inbound(InboundMessage::Payload(data)),
        Message::Ping(_) | Message::Pong(_) => Classified::Liveness,
        Message::Close(_) => Classified::Close,
    }
}

/// What the router did with one message.
#[derive(Debug, PartialEq)]
pub enum RouteOutcome {
    /// A reply was produced and delivered per the reply scope.
    Replied {
        /// Outbound message kind.
        kind: &'static str,
        /// Delivery summary.
        report: BroadcastReport,
    },
    /// Control text other than `"ping"`; no reply.
    Ignored,
    /// The frame failed; nothing was sent and the session stays open.
    Dropped(FrameError),
}

/// Dispatches classified messages to the pipeline and broadcaster.
pub struct MessageRouter {
    broadcaster: Arc<Broadcaster>,
    pipeline: FramePipeline,
    reply_scope: ReplyScope,
}

impl MessageRouter {
    /// Create a router.
    pub fn new(broadcaster: Arc<Broadcaster>, pipeline: FramePipeline, reply_scope: ReplyScope) -> Self {
        Self {
            broadcaster,
            pipeline,
            reply_scope,
        }
    }

    /// The broadcaster replies go through.
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// The frame pipeline.
    pub fn pipeline(&self) -> &FramePipeline {
        &self.pipeline
    }

    /// Handle one inbound message from `from`.
    ///
    /// Completes before the caller reads the session's next message, which
    /// keeps per-session processing in arrival order.
    pub async fn route(&self, from: &SessionId, message: InboundMessage) -> RouteOutcome {
        if message.is_ping() {
            debug!(session_id = %from, "ping");
            return self.reply(from, &OutboundMessage::Pong);
        }
        match message {
            InboundMessage::Control(text) => {
                debug!(session_id = %from, len = text.len(), "ignoring control text");
                RouteOutcome::Ignored
            }
            InboundMessage::Payload(bytes) => {
                counter!(FRAMES_TOTAL).increment(1);
                let len = bytes.len();
                match self.pipeline.process(bytes).await {
                    Ok(reply) => {
                        debug!(
                            session_id = %from,
                            bytes = len,
                            landmarks = reply.landmark_count(),
                            "frame processed"
                        );
                        self.reply(from, &reply)
                    }
                    Err(err) => {
                        counter!(FRAME_ERRORS_TOTAL, "error" => err.error_kind()).increment(1);
                        match &err {
                            FrameError::Decode(_) => {
                                debug!(session_id = %from, bytes = len, error = %err, "dropping undecodable frame");
                            }
                            FrameError::Extract(_) | FrameError::Worker(_) => {
                                warn!(session_id = %from, bytes = len, error = %err, "dropping frame");
                            }
                        }
                        RouteOutcome::Dropped(err)
                    }
                }
            }
        }
    }

    fn reply(&self, from: &SessionId, message: &OutboundMessage) -> RouteOutcome {
        let report = match self.reply_scope {
            ReplyScope::Broadcast => self.broadcaster.broadcast(message),
            ReplyScope::Sender => self.broadcaster.send_to(from, message),
        };
        RouteOutcome::Replied {
            kind: message.kind(),
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::SessionHandle;
    use crate::websocket::pipeline::test_support::pipeline;
    use crate::websocket::registry::SessionRegistry;
    use bytes::Bytes;
    use posecast_core::DecodeError;
    use posecast_logging::capture_logs;
    use tokio::sync::mpsc;
    use tracing::Level;

    struct Harness {
        router: MessageRouter,
        a: mpsc::Receiver<Arc<str>>,
        b: mpsc::Receiver<Arc<str>>,
    }

    fn harness(scope: ReplyScope) -> Harness {
        let reg = Arc::new(SessionRegistry::new());
        let (ta, a) = mpsc::channel(8);
        let (tb, b) = mpsc::channel(8);
        reg.add(Arc::new(SessionHandle::new(SessionId::from("a"), ta))).unwrap();
        reg.add(Arc::new(SessionHandle::new(SessionId::from("b"), tb))).unwrap();
        let router = MessageRouter::new(Arc::new(Broadcaster::new(reg)), pipeline(), scope);
        Harness { router, a, b }
    }

    fn a() -> SessionId {
        SessionId::from("a")
    }

    #[test]
    fn classify_uses_frame_tag() {
        assert_eq!(
            classify(Message::Text("ping".into())),
            Classified::Inbound(InboundMessage::Control("ping".into()))
        );
        assert_eq!(
            classify(Message::Binary(Bytes::from_static(b"ping"))),
            Classified::Inbound(InboundMessage::Payload(Bytes::from_static(b"ping")))
        );
        assert_eq!(classify(Message::Ping(Bytes::new())), Classified::Liveness);
        assert_eq!(classify(Message::Pong(Bytes::new())), Classified::Liveness);
        assert_eq!(classify(Message::Close(None)), Classified::Close);
    }

    #[tokio::test]
    async fn ping_broadcasts_pong_to_all() {
        let mut h = harness(ReplyScope::Broadcast);
        let out = h.router.route(&a(), InboundMessage::Control("ping".into())).await;
        assert!(matches!(out, RouteOutcome::Replied { kind: "pong", report } if report.delivered == 2));
        assert_eq!(&*h.a.recv().await.unwrap(), r#"{"message":"pong"}"#);
        assert_eq!(&*h.b.recv().await.unwrap(), r#"{"message":"pong"}"#);
    }

    #[tokio::test]
    async fn ping_match_is_exact() {
        let mut h = harness(ReplyScope::Broadcast);
        for text in ["PING", "ping ", "pong", ""] {
            let out = h.router.route(&a(), InboundMessage::Control(text.into())).await;
            assert_eq!(out, RouteOutcome::Ignored, "{text:?}");
        }
        assert!(h.a.try_recv().is_err());
    }

    #[tokio::test]
    async fn other_text_logged_at_debug() {
        let (logs, _guard) = capture_logs();
        let h = harness(ReplyScope::Broadcast);
        let _ = h.router.route(&a(), InboundMessage::Control("hello".into())).await;
        assert!(logs.has_event(Level::DEBUG, "ignoring control text"));
    }

    #[tokio::test]
    async fn frame_broadcasts_landmarks() {
        let mut h = harness(ReplyScope::Broadcast);
        let out = h
            .router
            .route(&a(), InboundMessage::Payload(Bytes::from_static(&[b'P', 5])))
            .await;
        assert!(matches!(out, RouteOutcome::Replied { kind: "landmarks", .. }));

        for rx in [&mut h.a, &mut h.b] {
            let msg = rx.recv().await.unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&msg).unwrap();
            let lms = parsed["landmarks"].as_array().unwrap();
            assert_eq!(lms.len(), 5);
            for lm in lms {
                for key in ["x", "y", "z", "visibility"] {
                    assert!(lm[key].is_number());
                }
            }
        }
    }

    #[tokio::test]
    async fn no_pose_broadcasts_empty() {
        let mut h = harness(ReplyScope::Broadcast);
        let _ = h
            .router
            .route(&a(), InboundMessage::Payload(Bytes::from_static(&[b'P', 0])))
            .await;
        assert_eq!(&*h.a.recv().await.unwrap(), r#"{"landmarks":[]}"#);
        assert_eq!(&*h.b.recv().await.unwrap(), r#"{"landmarks":[]}"#);
    }

    #[tokio::test]
    async fn undecodable_frame_sends_nothing() {
        let mut h = harness(ReplyScope::Broadcast);
        let out = h
            .router
            .route(&a(), InboundMessage::Payload(Bytes::from_static(b"garbage")))
            .await;
        assert_eq!(out, RouteOutcome::Dropped(FrameError::Decode(DecodeError::Unsupported)));
        assert!(h.a.try_recv().is_err());
        assert!(h.b.try_recv().is_err());
    }

    #[tokio::test]
    async fn extractor_error_logged_and_dropped() {
        let (logs, _guard) = capture_logs();
        let mut h = harness(ReplyScope::Broadcast);
        let out = h
            .router
            .route(&a(), InboundMessage::Payload(Bytes::from_static(b"E")))
            .await;
        assert!(matches!(out, RouteOutcome::Dropped(FrameError::Extract(_))));
        assert!(h.a.try_recv().is_err());
        assert!(logs.has_event(Level::WARN, "dropping frame"));
    }

    #[tokio::test]
    async fn sender_scope_replies_privately() {
        let mut h = harness(ReplyScope::Sender);
        let _ = h.router.route(&a(), InboundMessage::Control("ping".into())).await;
        let _ = h
            .router
            .route(&a(), InboundMessage::Payload(Bytes::from_static(&[b'P', 0])))
            .await;
        assert_eq!(&*h.a.recv().await.unwrap(), r#"{"message":"pong"}"#);
        assert_eq!(&*h.a.recv().await.unwrap(), r#"{"landmarks":[]}"#);
        assert!(h.b.try_recv().is_err());
    }

    #[tokio::test]
    async fn replies_keep_arrival_order() {
        let mut h = harness(ReplyScope::Broadcast);
        for k in 1..=5_u8 {
            let _ = h
                .router
                .route(&a(), InboundMessage::Payload(Bytes::from(vec![b'P', k])))
                .await;
        }
        for k in 1..=5 {
            let msg = h.a.recv().await.unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&msg).unwrap();
            assert_eq!(parsed["landmarks"].as_array().unwrap().len(), k);
        }
    }
}
