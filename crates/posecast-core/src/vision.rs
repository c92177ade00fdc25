//! Collaborator contracts for frame decoding and landmark extraction.
//!
//! Both traits are synchronous: implementations are CPU-bound and are driven
//! from a blocking worker, never directly on the async executor.

use crate::errors::{DecodeError, ExtractError};
use crate::landmark::LandmarkSet;

/// A decoded frame as packed, row-major RGB8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Bytes per pixel.
    pub const CHANNELS: usize = 3;

    /// Wrap raw RGB8 data, checking that its length matches the dimensions.
    pub fn from_rgb8(width: u32, height: u32, data: Vec<u8>) -> Result<Self, DecodeError> {
        let expected = width as usize * height as usize * Self::CHANNELS;
        if width == 0 || height == 0 {
            return Err(DecodeError::Malformed(format!(
                "zero-sized frame {width}x{height}"
            )));
        }
        if data.len() != expected {
            return Err(DecodeError::Malformed(format!(
                "expected {expected} bytes for {width}x{height}, got {}",
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// RGB value at `(x, y)`, or `None` if out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }
}

/// Turns an encoded still image into pixels.
pub trait FrameDecoder: Send + Sync {
    /// Decode one frame.
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, DecodeError>;
}

/// Finds body landmarks in a decoded frame.
pub trait LandmarkExtractor: Send + Sync {
    /// Extract landmarks; `Ok(None)` means no pose was found.
    fn extract(&self, frame: &PixelBuffer) -> Result<Option<LandmarkSet>, ExtractError>;

    /// Human-readable name for health output and logs.
    fn name(&self) -> &str;

    /// Fixed landmark cardinality of the model, if known.
    fn landmark_count(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgb8_checks_length() {
        assert!(PixelBuffer::from_rgb8(2, 2, vec![0; 12]).is_ok());
        assert!(matches!(
            PixelBuffer::from_rgb8(2, 2, vec![0; 11]),
            Err(DecodeError::Malformed(_))
        ));
        assert!(PixelBuffer::from_rgb8(0, 4, Vec::new()).is_err());
    }

    #[test]
    fn pixel_lookup() {
        let data = vec![1, 2, 3, 4, 5, 6];
        let buf = PixelBuffer::from_rgb8(2, 1, data).unwrap();
        assert_eq!(buf.pixel(0, 0), Some([1, 2, 3]));
        assert_eq!(buf.pixel(1, 0), Some([4, 5, 6]));
        assert_eq!(buf.pixel(2, 0), None);
        assert_eq!(buf.pixel(0, 1), None);
        assert_eq!((buf.width(), buf.height()), (2, 1));
        assert_eq!(buf.data().len(), 6);
    }
}
