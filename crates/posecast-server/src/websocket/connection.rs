//! Per-session connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use posecast_core::SessionId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Whether a session can still receive messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LivenessState {
    /// Registered and writable.
    Open,
    /// Disconnected. Terminal.
    Closed,
}

/// Result of a non-blocking enqueue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Queued for the writer task.
    Queued,
    /// The queue is full; the message was dropped for this session only.
    Full,
    /// The writer is gone or the session is closed.
    Closed,
}

/// One connected client as seen by the registry and broadcaster.
///
/// The outbound sender is the only path to the client's socket; the socket
/// halves themselves never leave the session task.
pub struct SessionHandle {
    id: SessionId,
    tx: mpsc::Sender<Arc<str>>,
    connected_at: Instant,
    closed: AtomicBool,
    is_alive: AtomicBool,
    last_activity: Mutex<Instant>,
    dropped_messages: AtomicU64,
}

impl SessionHandle {
    /// Create an open session feeding `tx`.
    pub fn new(id: SessionId, tx: mpsc::Sender<Arc<str>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            closed: AtomicBool::new(false),
            is_alive: AtomicBool::new(true),
            last_activity: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Enqueue a serialized message without waiting.
    ///
    /// A full queue increments the drop counter.
    pub fn try_deliver(&self, message: Arc<str>) -> SendOutcome {
        if self.closed.load(Ordering::Acquire) {
            return SendOutcome::Closed;
        }
        match self.tx.try_send(message) {
            Ok(()) => SendOutcome::Queued,
            Err(TrySendError::Full(_)) => {
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                SendOutcome::Full
            }
            Err(TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }

    /// Mark the session closed. Idempotent; returns `true` on the first call.
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Current liveness.
    pub fn state(&self) -> LivenessState {
        if self.closed.load(Ordering::Acquire) || self.tx.is_closed() {
            LivenessState::Closed
        } else {
            LivenessState::Open
        }
    }

    /// Record inbound activity (any frame, including pongs).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_activity.lock() = Instant::now();
    }

    /// Check and reset the alive flag.
    ///
    /// Returns `true` if the client was active since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Time since the last inbound frame (or connect).
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Messages dropped because the queue was full.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("dropped", &self.drop_count())
            .finish_non_exhaustive()
    }
}
