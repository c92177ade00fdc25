//! Per-frame error taxonomy.
//!
//! None of these errors end a session: a frame that fails to decode or
//! extract is dropped and the connection keeps reading.

use thiserror::Error;

/// The frame bytes could not be turned into a pixel buffer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Zero-length payload.
    #[error("empty frame")]
    Empty,
    /// Bytes do not start with a known image signature.
    #[error("unsupported image format")]
    Unsupported,
    /// Known container but corrupt or truncated data.
    #[error("malformed image: {0}")]
    Malformed(String),
    /// Payload or decoded dimensions exceed the configured limit.
    #[error("frame too large: {actual} > {limit}")]
    TooLarge {
        /// Configured limit.
        limit: usize,
        /// Observed size.
        actual: usize,
    },
}

/// The landmark extractor failed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// Model could not be loaded. Fatal at startup.
    #[error("model initialization failed: {0}")]
    ModelInit(String),
    /// Inference on a single frame failed.
    #[error("inference failed: {0}")]
    Inference(String),
    /// The pixel buffer is unusable for this model.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Any failure while turning one payload message into an outbound message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Decoding failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Extraction failed.
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// The blocking worker panicked or was cancelled.
    #[error("frame worker failed: {0}")]
    Worker(String),
}

impl FrameError {
    /// Short classification string for logs.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Decode(DecodeError::Empty) => "empty_frame",
            Self::Decode(DecodeError::Unsupported) => "unsupported_format",
            Self::Decode(DecodeError::Malformed(_)) => "malformed_frame",
            Self::Decode(DecodeError::TooLarge { .. }) => "frame_too_large",
            Self::Extract(ExtractError::ModelInit(_)) => "model_init",
            Self::Extract(ExtractError::Inference(_)) => "inference",
            Self::Extract(ExtractError::InvalidInput(_)) => "invalid_input",
            Self::Worker(_) => "worker",
        }
    }
}
