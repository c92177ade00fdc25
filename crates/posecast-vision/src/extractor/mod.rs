//! Landmark extractors and the factory that selects one from settings.

pub mod movenet;
#[cfg(feature = "ort")]
pub mod onnx;

use std::path::Path;
use std::sync::Arc;

use posecast_core::{ExtractError, LandmarkExtractor, LandmarkSet, PixelBuffer};
use posecast_settings::{ExtractorKind, PoseSettings};
use tracing::info;

/// Extractor that never finds a pose.
///
/// Every decoded frame yields `{"landmarks":[]}`, which keeps the relay
/// usable for wiring and client development without a model file.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledExtractor;

impl LandmarkExtractor for DisabledExtractor {
    fn extract(&self, _frame: &PixelBuffer) -> Result<Option<LandmarkSet>, ExtractError> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

/// Build the extractor named by `settings`.
///
/// Errors here are fatal at startup: a configured model that cannot be
/// loaded must not silently degrade into an always-empty relay.
pub fn build_extractor(
    settings: &PoseSettings,
) -> Result<Arc<dyn LandmarkExtractor>, ExtractError> {
    match settings.extractor {
        ExtractorKind::Disabled => {
            info!("landmark extraction disabled");
            Ok(Arc::new(DisabledExtractor))
        }
        ExtractorKind::Onnx => {
            let path = settings
                .model_path
                .as_deref()
                .ok_or_else(|| ExtractError::ModelInit("pose.modelPath is not set".into()))?;
            if !Path::new(path).is_file() {
                return Err(ExtractError::ModelInit(format!(
                    "model file not found: {path}"
                )));
            }
            load_onnx(path, settings)
        }
    }
}

#[cfg(feature = "ort")]
fn load_onnx(
    path: &str,
    settings: &PoseSettings,
) -> Result<Arc<dyn LandmarkExtractor>, ExtractError> {
    let extractor = onnx::OnnxPoseExtractor::load(path, settings)?;
    Ok(Arc::new(extractor))
}

#[cfg(not(feature = "ort"))]
fn load_onnx(
    _path: &str,
    _settings: &PoseSettings,
) -> Result<Arc<dyn LandmarkExtractor>, ExtractError> {
    Err(ExtractError::ModelInit(
        "onnx extractor requested but this build lacks the `ort` feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> PixelBuffer {
        PixelBuffer::from_rgb8(2, 2, vec![0; 12]).unwrap()
    }

    #[test]
    fn disabled_never_finds_pose() {
        let ex = DisabledExtractor;
        assert_eq!(ex.extract(&frame()).unwrap(), None);
        assert_eq!(ex.name(), "disabled");
        assert_eq!(ex.landmark_count(), None);
    }

    #[test]
    fn default_settings_build_disabled() {
        let ex = build_extractor(&PoseSettings::default()).unwrap();
        assert_eq!(ex.name(), "disabled");
    }

    #[test]
    fn onnx_without_model_path_fails() {
        let settings = PoseSettings {
            extractor: ExtractorKind::Onnx,
            ..PoseSettings::default()
        };
        let err = build_extractor(&settings).err().unwrap();
        assert!(matches!(err, ExtractError::ModelInit(ref m) if m.contains("modelPath")));
    }

    #[test]
    fn onnx_with_missing_file_fails() {
        let settings = PoseSettings {
            extractor: ExtractorKind::Onnx,
            model_path: Some("/nonexistent/movenet.onnx".into()),
            ..PoseSettings::default()
        };
        let err = build_extractor(&settings).err().unwrap();
        assert!(matches!(err, ExtractError::ModelInit(ref m) if m.contains("not found")));
    }

    #[test]
    fn onnx_with_unloadable_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        std::fs::write(&path, b"not a model").unwrap();
        let settings = PoseSettings {
            extractor: ExtractorKind::Onnx,
            model_path: Some(path.to_string_lossy().into_owned()),
            ..PoseSettings::default()
        };
        assert!(matches!(
            build_extractor(&settings).err().unwrap(),
            ExtractError::ModelInit(_)
        ));
    }
}
