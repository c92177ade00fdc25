//! Decode + extract for one binary frame, off the async executor.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use metrics::histogram;
use posecast_core::{
    DecodeError, ExtractError, FrameDecoder, FrameError, LandmarkExtractor, LandmarkSet,
    OutboundMessage,
};

use crate::metrics::FRAME_PROCESSING_SECONDS;

/// Turns payload bytes into an [`OutboundMessage`].
#[derive(Clone)]
pub struct FramePipeline {
    decoder: Arc<dyn FrameDecoder>,
    extractor: Arc<dyn LandmarkExtractor>,
    max_frame_bytes: usize,
}

impl FramePipeline {
    /// Build a pipeline over the given collaborators.
    pub fn new(
        decoder: Arc<dyn FrameDecoder>,
        extractor: Arc<dyn LandmarkExtractor>,
        max_frame_bytes: usize,
    ) -> Self {
        Self {
            decoder,
            extractor,
            max_frame_bytes,
        }
    }

    /// Extractor name for health and logs.
    pub fn extractor_name(&self) -> &str {
        self.extractor.name()
    }

    /// Process one frame on the blocking pool.
    ///
    /// Oversized frames are rejected before any work is scheduled.
    pub async fn process(&self, frame: Bytes) -> Result<OutboundMessage, FrameError> {
        self.check_size(&frame)?;
        let this = self.clone();
        let started = Instant::now();
        let result = tokio::task::spawn_blocking(move || this.decode_and_extract(&frame))
            .await
            .map_err(|e| FrameError::Worker(e.to_string()))?;
        histogram!(FRAME_PROCESSING_SECONDS).record(started.elapsed().as_secs_f64());
        result
    }

    fn decode_and_extract(&self, frame: &[u8]) -> Result<OutboundMessage, FrameError> {
        let pixels = self.decoder.decode(frame)?;
        let landmarks = self.extractor.extract(&pixels)?;
        if let Some(set) = &landmarks {
            self.check_landmarks(set)?;
        }
        Ok(OutboundMessage::from_extraction(landmarks))
    }

    fn check_size(&self, frame: &[u8]) -> Result<(), FrameError> {
        if frame.len() > self.max_frame_bytes {
            return Err(DecodeError::TooLarge {
                limit: self.max_frame_bytes,
                actual: frame.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Output must be representable as JSON and match the model's cardinality.
    fn check_landmarks(&self, set: &LandmarkSet) -> Result<(), ExtractError> {
        if !set.is_finite() {
            return Err(ExtractError::Inference(
                "extractor produced non-finite landmarks".into(),
            ));
        }
        match self.extractor.landmark_count() {
            Some(expected) if !set.is_empty() && set.len() != expected => {
                Err(ExtractError::Inference(format!(
                    "extractor produced {} landmarks, model declares {expected}",
                    set.len()
                )))
            }
            _ => Ok(()),
        }
    }
}
