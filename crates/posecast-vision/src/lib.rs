//! # posecast-vision
//!
//! Concrete collaborators behind the core [`FrameDecoder`] and
//! [`LandmarkExtractor`] traits.
//!
//! - [`ImageFrameDecoder`]: JPEG/PNG to RGB8 via the `image` crate
//! - [`DisabledExtractor`]: never finds a pose, so the relay runs without a model
//! - `OnnxPoseExtractor` (feature `ort`): single-pose `MoveNet` inference
//!
//! [`build_extractor`] picks the extractor from [`PoseSettings`].
//!
//! [`FrameDecoder`]: posecast_core::FrameDecoder
//! [`LandmarkExtractor`]: posecast_core::LandmarkExtractor
//! [`PoseSettings`]: posecast_settings::PoseSettings

#![deny(unsafe_code)]

pub mod decoder;
pub mod extractor;

pub use decoder::ImageFrameDecoder;
pub use extractor::{DisabledExtractor, build_extractor};

#[cfg(feature = "ort")]
pub use extractor::onnx::OnnxPoseExtractor;
