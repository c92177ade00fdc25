//! HTTP router assembly and listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use posecast_core::{FrameDecoder, LandmarkExtractor, SessionId};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::cors::cors_layer;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::broadcast::Broadcaster;
use crate::websocket::pipeline::FramePipeline;
use crate::websocket::registry::SessionRegistry;
use crate::websocket::router::MessageRouter;
use crate::websocket::session::{SessionDeps, SessionLimits, run_ws_session};

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Everything a new session needs.
    pub deps: SessionDeps,
    /// Max inbound `WebSocket` message size.
    pub max_message_size: usize,
    /// Server start time.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The relay server.
pub struct PosecastServer {
    config: ServerConfig,
    registry: Arc<SessionRegistry>,
    router: Arc<MessageRouter>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl PosecastServer {
    /// Wire the registry, broadcaster, and router around the collaborators.
    pub fn new(
        config: ServerConfig,
        decoder: Arc<dyn FrameDecoder>,
        extractor: Arc<dyn LandmarkExtractor>,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&registry)));
        let pipeline = FramePipeline::new(decoder, extractor, config.max_frame_bytes);
        let router = Arc::new(MessageRouter::new(broadcaster, pipeline, config.reply_scope));
        Self {
            config,
            registry,
            router,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the axum router.
    pub fn router(&self) -> Router {
        let state = AppState {
            deps: SessionDeps {
                registry: Arc::clone(&self.registry),
                router: Arc::clone(&self.router),
                limits: SessionLimits::from(&self.config),
                shutdown: self.shutdown.token(),
            },
            max_message_size: self.config.max_message_size,
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
            .layer(cors_layer(&self.config.allowed_origins))
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve in the background.
    ///
    /// Returns the bound address (useful with port `0`) and the server task,
    /// which finishes once [`ShutdownCoordinator::shutdown`] is called.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        info!(%addr, reply_scope = %self.config.reply_scope, "posecast server listening");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                warn!(error = %e, "server exited with error");
            }
        });
        Ok((addr, handle))
    }

    /// Live sessions.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Active configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.deps.shutdown.is_cancelled() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let deps = state.deps;
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| async move {
            let _ = run_ws_session(socket, SessionId::new(), deps).await;
        })
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.deps.registry.len(),
        state.deps.router.pipeline().extractor_name(),
    ))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::SessionHandle;
    use crate::websocket::pipeline::test_support::{StubDecoder, StubExtractor};
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn make_server() -> PosecastServer {
        PosecastServer::new(
            ServerConfig::default(),
            Arc::new(StubDecoder),
            Arc::new(StubExtractor),
        )
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    #[tokio::test]
    async fn health_endpoint_reports_state() {
        let server = make_server();
        let (tx, _rx) = mpsc::channel(1);
        server
            .registry()
            .add(Arc::new(SessionHandle::new(SessionId::from("s"), tx)))
            .unwrap();

        let (status, body) = get_json(server.router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["connections"], 1);
        assert_eq!(body["extractor"], "stub");
        assert!(body["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn ws_requires_upgrade() {
        let req = Request::builder().uri("/ws").body(Body::empty()).unwrap();
        let resp = make_server().router().oneshot(req).await.unwrap();
        assert!(!resp.status().is_success());
    }

    #[tokio::test]
    async fn metrics_absent_without_recorder() {
        let (status, _) = get_json(make_server().router(), "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_rendered_with_handle() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let app = make_server().with_metrics(handle).router();
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (status, _) = get_json(make_server().router(), "/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_binds_ephemeral_port_and_stops() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);

        let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");

        server.shutdown().shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
