//! `WebSocket` session handling: registry, fan-out, routing, and liveness.

pub mod broadcast;
pub mod connection;
pub mod heartbeat;
pub mod pipeline;
pub mod registry;
pub mod router;
pub mod session;
