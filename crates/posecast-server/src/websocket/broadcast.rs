//! Fan-out of outbound messages to registered sessions.

use std::sync::Arc;

use metrics::counter;
use posecast_core::{OutboundMessage, SessionId};
use tracing::{debug, warn};

use super::connection::{SendOutcome, SessionHandle};
use super::registry::SessionRegistry;
use crate::metrics::{BROADCASTS_TOTAL, WS_BROADCAST_DROPS_TOTAL};

/// Per-call delivery summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sessions the message was queued for.
    pub delivered: usize,
    /// Sessions whose queue was full.
    pub dropped: usize,
    /// Sessions removed because their writer was gone.
    pub removed: usize,
}

impl BroadcastReport {
    /// Sessions attempted.
    pub fn recipients(&self) -> usize {
        self.delivered + self.dropped + self.removed
    }
}

/// Delivers outbound messages over each session's bounded queue.
///
/// Delivery never waits on a recipient. A full queue drops the message for
/// that recipient only; a closed one removes the session from the registry.
pub struct Broadcaster {
    registry: Arc<SessionRegistry>,
}

impl Broadcaster {
    /// Fan out over `registry`.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this broadcaster delivers to.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Send `message` to every session live at call time.
    pub fn broadcast(&self, message: &OutboundMessage) -> BroadcastReport {
        let Some(text) = serialize(message) else {
            return BroadcastReport::default();
        };

        let mut report = BroadcastReport::default();
        self.registry
            .for_each(|session| self.deliver(session, &text, &mut report));

        counter!(BROADCASTS_TOTAL, "kind" => message.kind()).increment(1);
        debug!(
            kind = message.kind(),
            recipients = report.recipients(),
            delivered = report.delivered,
            dropped = report.dropped,
            removed = report.removed,
            "broadcast"
        );
        report
    }

    /// Send `message` to one session only.
    pub fn send_to(&self, id: &SessionId, message: &OutboundMessage) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let Some(session) = self.registry.get(id) else {
            return report;
        };
        if let Some(text) = serialize(message) {
            self.deliver(&session, &text, &mut report);
        }
        report
    }

    fn deliver(&self, session: &SessionHandle, text: &Arc<str>, report: &mut BroadcastReport) {
        match session.try_deliver(Arc::clone(text)) {
            SendOutcome::Queued => report.delivered += 1,
            SendOutcome::Full => {
                report.dropped += 1;
                counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
                warn!(
                    session_id = %session.id(),
                    dropped_total = session.drop_count(),
                    "send queue full, dropping message"
                );
            }
            SendOutcome::Closed => {
                report.removed += 1;
                let _ = self.registry.remove(session.id());
                debug!(session_id = %session.id(), "removed closed session during delivery");
            }
        }
    }
}

fn serialize(message: &OutboundMessage) -> Option<Arc<str>> {
    match message.to_json() {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            warn!(kind = message.kind(), error = %e, "failed to serialize outbound message");
            None
        }
    }
}
