//! # posecast-core
//!
//! Shared vocabulary for the posecast relay.
//!
//! - **IDs**: [`SessionId`] newtype over a UUID v7 string
//! - **Landmarks**: [`Landmark`] and the ordered [`LandmarkSet`]
//! - **Wire schema**: [`InboundMessage`] (text control vs. binary frame) and
//!   [`OutboundMessage`] (landmarks / empty / pong) with their JSON encoding
//! - **Collaborators**: [`FrameDecoder`] and [`LandmarkExtractor`] traits over
//!   a [`PixelBuffer`]
//! - **Errors**: per-frame error taxonomy via `thiserror`

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod landmark;
pub mod messages;
pub mod vision;

pub use errors::{DecodeError, ExtractError, FrameError};
pub use ids::SessionId;
pub use landmark::{Landmark, LandmarkSet};
pub use messages::{InboundMessage, OutboundMessage, PING_TEXT, ReplyScope};
pub use vision::{FrameDecoder, LandmarkExtractor, PixelBuffer};
