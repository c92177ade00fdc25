//! # posecast-server
//!
//! Axum HTTP + `WebSocket` relay for pose landmarks.
//!
//! - `/ws`: one session per client; binary frames are decoded and run
//!   through the landmark extractor, text `"ping"` is answered with a pong
//! - Results fan out to every live session through the [`Broadcaster`]
//!   (or only to the sender, per [`ReplyScope`])
//! - `/health` and `/metrics` for operators
//! - Graceful shutdown via `CancellationToken`
//!
//! [`Broadcaster`]: websocket::broadcast::Broadcaster
//! [`ReplyScope`]: posecast_core::ReplyScope

#![deny(unsafe_code)]

pub mod config;
pub mod cors;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::PosecastServer;
pub use shutdown::ShutdownCoordinator;
