//! `MoveNet` inference through ONNX Runtime.

use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;
use posecast_core::{ExtractError, LandmarkExtractor, LandmarkSet, PixelBuffer};
use posecast_settings::PoseSettings;
use tracing::{debug, info};

use super::movenet;

/// Single-pose landmark extractor backed by an ONNX `MoveNet` model.
pub struct OnnxPoseExtractor {
    session: Mutex<Session>,
    input_size: u32,
    min_detection_confidence: f32,
}

impl OnnxPoseExtractor {
    /// Load the model at `path` and build an inference session.
    pub fn load(path: &str, settings: &PoseSettings) -> Result<Self, ExtractError> {
        info!(model = path, input_size = settings.input_size, "loading pose model");

        let session = Session::builder()
            .map_err(|e| ExtractError::ModelInit(format!("session builder: {e}")))?
            .with_intra_threads(settings.intra_threads)
            .map_err(|e| ExtractError::ModelInit(format!("thread config: {e}")))?
            .commit_from_file(path)
            .map_err(|e| ExtractError::ModelInit(format!("model load: {e}")))?;

        Ok(Self {
            session: Mutex::new(session),
            input_size: settings.input_size,
            min_detection_confidence: settings.min_detection_confidence,
        })
    }
}

impl LandmarkExtractor for OnnxPoseExtractor {
    fn extract(&self, frame: &PixelBuffer) -> Result<Option<LandmarkSet>, ExtractError> {
        let input = movenet::preprocess(frame, self.input_size)?;
        let side = i64::from(self.input_size);
        let tensor = Tensor::from_array((vec![1_i64, side, side, 3], input))
            .map_err(|e| ExtractError::Inference(format!("input tensor: {e}")))?;

        // Session::run takes &mut; frames from all sessions serialize here.
        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| ExtractError::Inference(format!("inference: {e}")))?;
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExtractError::Inference(format!("extract tensor: {e}")))?;

        let result = movenet::postprocess(shape, data, self.min_detection_confidence)?;
        debug!(found = result.is_some(), "pose inference complete");
        Ok(result)
    }

    fn name(&self) -> &str {
        "movenet-onnx"
    }

    fn landmark_count(&self) -> Option<usize> {
        Some(movenet::KEYPOINT_COUNT)
    }
}
