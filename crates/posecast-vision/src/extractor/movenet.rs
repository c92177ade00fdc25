//! Tensor layout for single-pose `MoveNet` models.
//!
//! Input is `[1, S, S, 3]` float RGB in `0..=255`; output is `[1, 1, K, 3]`
//! with each keypoint as `(y, x, score)` normalized to the input square.
//! Kept free of any inference runtime so the layout logic is testable alone.

use image::RgbImage;
use image::imageops::{self, FilterType};
use posecast_core::{ExtractError, Landmark, LandmarkSet, PixelBuffer};

/// Keypoints in the COCO layout `MoveNet` emits.
pub const KEYPOINT_COUNT: usize = 17;

/// Resize `frame` to `size`×`size` and flatten it as NHWC `f32`.
pub fn preprocess(frame: &PixelBuffer, size: u32) -> Result<Vec<f32>, ExtractError> {
    if size == 0 {
        return Err(ExtractError::InvalidInput("input size is zero".into()));
    }
    let image = RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or_else(|| ExtractError::InvalidInput("pixel buffer size mismatch".into()))?;
    let resized = imageops::resize(&image, size, size, FilterType::Triangle);
    Ok(resized.into_raw().into_iter().map(f32::from).collect())
}

/// Map raw `[1, 1, K, 3]` output to landmarks.
///
/// Returns `None` when the mean keypoint score is below `min_confidence`.
pub fn postprocess(
    shape: &[i64],
    data: &[f32],
    min_confidence: f32,
) -> Result<Option<LandmarkSet>, ExtractError> {
    let [1, 1, count, 3] = *shape else {
        return Err(ExtractError::Inference(format!(
            "unexpected output shape: {shape:?}"
        )));
    };
    let count = usize::try_from(count)
        .map_err(|_| ExtractError::Inference(format!("negative keypoint count: {count}")))?;
    if data.len() != count * 3 {
        return Err(ExtractError::Inference(format!(
            "output has {} values, shape implies {}",
            data.len(),
            count * 3
        )));
    }
    if count == 0 {
        return Ok(None);
    }

    if let Some(bad) = data.iter().find(|v| !v.is_finite()) {
        return Err(ExtractError::Inference(format!(
            "non-finite keypoint value: {bad}"
        )));
    }

    let landmarks: LandmarkSet = data
        .chunks_exact(3)
        .map(|kp| Landmark::new(kp[1], kp[0], 0.0, kp[2]))
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let mean = landmarks.iter().map(|l| l.visibility).sum::<f32>() / count as f32;
    if mean < min_confidence {
        return Ok(None);
    }
    Ok(Some(landmarks))
}
