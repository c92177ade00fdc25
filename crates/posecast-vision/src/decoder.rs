//! Still-image decoding.

use std::io::Cursor;

use image::{ImageError, ImageFormat, ImageReader};
use posecast_core::{DecodeError, FrameDecoder, PixelBuffer};

/// Default cap on either image side.
pub const DEFAULT_MAX_DIMENSION: u32 = 4096;

/// Decodes JPEG or PNG frames into RGB8 pixel buffers.
#[derive(Clone, Copy, Debug)]
pub struct ImageFrameDecoder {
    max_dimension: u32,
}

impl Default for ImageFrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIMENSION)
    }
}

impl ImageFrameDecoder {
    /// Create a decoder rejecting images wider or taller than `max_dimension`.
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    /// Largest accepted width or height.
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, DecodeError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        match reader.format() {
            Some(ImageFormat::Jpeg | ImageFormat::Png) => Ok(reader),
            _ => Err(DecodeError::Unsupported),
        }
    }
}

impl FrameDecoder for ImageFrameDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        // Header-only pass so oversized images are rejected before allocation.
        let (width, height) = Self::reader(bytes)?
            .into_dimensions()
            .map_err(map_image_error)?;
        let longest = width.max(height);
        if longest > self.max_dimension {
            return Err(DecodeError::TooLarge {
                limit: self.max_dimension as usize,
                actual: longest as usize,
            });
        }

        let image = Self::reader(bytes)?.decode().map_err(map_image_error)?;
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        PixelBuffer::from_rgb8(width, height, rgb.into_raw())
    }
}

fn map_image_error(err: ImageError) -> DecodeError {
    match err {
        ImageError::Unsupported(_) => DecodeError::Unsupported,
        other => DecodeError::Malformed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 10) as u8, (y * 10) as u8, 128])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, format)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_png_exactly() {
        let bytes = encode(4, 3, ImageFormat::Png);
        let frame = ImageFrameDecoder::default().decode(&bytes).unwrap();
        assert_eq!((frame.width(), frame.height()), (4, 3));
        assert_eq!(frame.pixel(2, 1), Some([20, 10, 128]));
    }

    #[test]
    fn decodes_jpeg_dimensions() {
        let bytes = encode(16, 8, ImageFormat::Jpeg);
        let frame = ImageFrameDecoder::default().decode(&bytes).unwrap();
        assert_eq!((frame.width(), frame.height()), (16, 8));
        assert_eq!(frame.data().len(), 16 * 8 * 3);
    }

    #[test]
    fn empty_input() {
        let err = ImageFrameDecoder::default().decode(&[]).unwrap_err();
        assert_eq!(err, DecodeError::Empty);
    }

    #[test]
    fn unknown_bytes_are_unsupported() {
        let err = ImageFrameDecoder::default()
            .decode(b"definitely not an image")
            .unwrap_err();
        assert_eq!(err, DecodeError::Unsupported);
    }

    #[test]
    fn truncated_png_is_malformed() {
        let bytes = encode(32, 32, ImageFormat::Png);
        let err = ImageFrameDecoder::default()
            .decode(&bytes[..bytes.len() / 2])
            .unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)), "got {err:?}");
    }

    #[test]
    fn oversized_image_rejected() {
        let bytes = encode(32, 8, ImageFormat::Png);
        let err = ImageFrameDecoder::new(16).decode(&bytes).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TooLarge {
                limit: 16,
                actual: 32
            }
        );
    }
}
