//! One client's session from upgrade through disconnect.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use posecast_core::SessionId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::SessionHandle;
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use super::registry::SessionRegistry;
use super::router::{Classified, MessageRouter, classify};
use crate::config::ServerConfig;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};

/// How long cleanup waits for the writer to flush a close frame.
const WRITER_DRAIN: Duration = Duration::from_secs(1);

/// Timing knobs for a session.
#[derive(Clone, Copy, Debug)]
pub struct SessionLimits {
    /// Outbound queue depth.
    pub send_queue_capacity: usize,
    /// Ping and liveness check interval.
    pub heartbeat_interval: Duration,
    /// Silence tolerated before the session is dead.
    pub heartbeat_timeout: Duration,
    /// Max wait for the next inbound frame.
    pub idle_timeout: Option<Duration>,
}

impl From<&ServerConfig> for SessionLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            send_queue_capacity: config.send_queue_capacity,
            heartbeat_interval: config.heartbeat_interval,
            heartbeat_timeout: config.heartbeat_timeout,
            idle_timeout: config.idle_timeout,
        }
    }
}

/// Shared state every session needs.
#[derive(Clone)]
pub struct SessionDeps {
    /// Live sessions.
    pub registry: Arc<SessionRegistry>,
    /// Message dispatch.
    pub router: Arc<MessageRouter>,
    /// Timing knobs.
    pub limits: SessionLimits,
    /// Server-wide shutdown token.
    pub shutdown: CancellationToken,
}

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The client sent a close frame or the stream ended.
    ClientClosed,
    /// Reading from the socket failed.
    TransportError,
    /// No inbound frame within the idle timeout.
    IdleTimeout,
    /// Missed too many heartbeats.
    HeartbeatTimeout,
    /// The writer task ended (socket write failed).
    WriterClosed,
    /// The server is shutting down.
    Shutdown,
    /// The id was already registered.
    Rejected,
}

impl CloseReason {
    /// Short label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientClosed => "client_closed",
            Self::TransportError => "transport_error",
            Self::IdleTimeout => "idle_timeout",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::WriterClosed => "writer_closed",
            Self::Shutdown => "shutdown",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Next {
    Frame(Message),
    Idle,
    End,
    Error(axum::Error),
}

/// Run a session until the client leaves, it goes silent, or the server
/// shuts down.
///
/// 1. Registers a [`SessionHandle`] with a bounded outbound queue
/// 2. Spawns the writer (queue → socket, periodic Ping) and heartbeat
/// 3. Reads frames one at a time and routes each to completion
/// 4. Removes the session on any exit path
#[instrument(skip_all, fields(session_id = %id))]
pub async fn run_ws_session(ws: WebSocket, id: SessionId, deps: SessionDeps) -> CloseReason {
    let limits = deps.limits;
    let (ws_tx, mut ws_rx) = ws.split();
    let (send_tx, send_rx) = mpsc::channel::<Arc<str>>(limits.send_queue_capacity.max(1));
    let session = Arc::new(SessionHandle::new(id.clone(), send_tx));

    if let Err(e) = deps.registry.add(Arc::clone(&session)) {
        warn!(error = %e, "session rejected");
        return CloseReason::Rejected;
    }
    info!(sessions = deps.registry.len(), "session opened");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let cancel = deps.shutdown.child_token();
    let mut writer = tokio::spawn(write_loop(
        ws_tx,
        send_rx,
        limits.heartbeat_interval,
        cancel.clone(),
    ));
    let mut heartbeat = tokio::spawn(run_heartbeat(
        Arc::clone(&session),
        limits.heartbeat_interval,
        limits.heartbeat_timeout,
        cancel.clone(),
    ));

    let mut writer_done = false;
    let reason = loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => break CloseReason::Shutdown,
            result = &mut heartbeat => match result {
                Ok(HeartbeatResult::TimedOut) => {
                    warn!(timeout = ?limits.heartbeat_timeout, "client unresponsive");
                    break CloseReason::HeartbeatTimeout;
                }
                Ok(HeartbeatResult::Cancelled) | Err(_) => break CloseReason::Shutdown,
            },
            _ = &mut writer => {
                writer_done = true;
                break CloseReason::WriterClosed;
            }
            next = next_frame(&mut ws_rx, limits.idle_timeout) => next,
        };

        match next {
            Next::Frame(message) => {
                session.mark_alive();
                match classify(message) {
                    Classified::Inbound(inbound) => {
                        let _ = deps.router.route(&id, inbound).await;
                    }
                    Classified::Liveness => {}
                    Classified::Close => break CloseReason::ClientClosed,
                }
            }
            Next::Idle => break CloseReason::IdleTimeout,
            Next::End => break CloseReason::ClientClosed,
            Next::Error(e) => {
                debug!(error = %e, "socket read failed");
                break CloseReason::TransportError;
            }
        }
    };

    cancel.cancel();
    heartbeat.abort();
    if !writer_done && tokio::time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
        writer.abort();
    }
    let _ = deps.registry.remove(&id);

    counter!(WS_DISCONNECTIONS_TOTAL, "reason" => reason.as_str()).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(session.age().as_secs_f64());
    info!(
        %reason,
        dropped = session.drop_count(),
        sessions = deps.registry.len(),
        "session closed"
    );
    reason
}

async fn next_frame(rx: &mut SplitStream<WebSocket>, idle: Option<Duration>) -> Next {
    let next = match idle {
        Some(limit) => match tokio::time::timeout(limit, rx.next()).await {
            Ok(next) => next,
            Err(_) => return Next::Idle,
        },
        None => rx.next().await,
    };
    match next {
        Some(Ok(message)) => Next::Frame(message),
        Some(Err(e)) => Next::Error(e),
        None => Next::End,
    }
}

/// Forward queued messages to the socket and send periodic Pings.
///
/// On cancellation a close frame is sent before returning.
async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut queue: mpsc::Receiver<Arc<str>>,
    ping_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ping = tokio::time::interval_at(
        tokio::time::Instant::now() + ping_interval,
        ping_interval,
    );
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
            msg = queue.recv() => {
                let Some(text) = msg else { break };
                if let Err(e) = ws_tx.send(Message::Text(text.as_ref().into())).await {
                    debug!(error = %e, "socket write failed");
                    break;
                }
            }
            _ = ping.tick() => {
                if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_from_config() {
        let config = ServerConfig {
            send_queue_capacity: 7,
            idle_timeout: None,
            ..ServerConfig::default()
        };
        let limits = SessionLimits::from(&config);
        assert_eq!(limits.send_queue_capacity, 7);
        assert_eq!(limits.idle_timeout, None);
        assert_eq!(limits.heartbeat_interval, config.heartbeat_interval);
    }

    #[test]
    fn close_reason_labels() {
        assert_eq!(CloseReason::IdleTimeout.to_string(), "idle_timeout");
        assert_eq!(CloseReason::HeartbeatTimeout.as_str(), "heartbeat_timeout");
        assert_eq!(CloseReason::ClientClosed.as_str(), "client_closed");
    }

    // Full session behavior needs a real socket; see tests/integration.rs.
}
