//! Image normalization for uploaded photos.
//!
//! Uploaded images are auto-rotated from their EXIF orientation, shrunk to
//! fit inside a bounding box and re-encoded before they are sent to remote
//! storage.

mod compressor;
mod error;

pub use compressor::{CompressionOptions, ImageCompressor, TargetFormat};
pub use error::CompressionError;
