//! Compression error types.

use thiserror::Error;

/// Image compression errors.
#[derive(Debug, Error)]
pub enum CompressionError {
    /// Zero-byte input.
    #[error("image is empty")]
    Empty,

    /// Input is not a recognizable image.
    #[error("file is not a supported image")]
    NotAnImage,

    /// Input looks like an image but cannot be decoded.
    #[error("invalid image data: {0}")]
    InvalidImage(String),

    /// Encoding or worker failure.
    #[error("image codec failure: {0}")]
    Codec(String),
}

impl CompressionError {
    /// Create an invalid image error.
    #[must_use]
    pub fn invalid_image(msg: impl Into<String>) -> Self {
        Self::InvalidImage(msg.into())
    }

    /// Create a codec error.
    #[must_use]
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    /// Returns `true` when the caller sent bad input.
    ///
    /// Codec failures on valid input are server-side problems.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Codec(_))
    }
}
