//! Upload error types.

use sitesurvey_shared::AppError;
use thiserror::Error;

use crate::compression::CompressionError;
use crate::storage::StorageError;

/// Upload pipeline errors.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Zero-byte file.
    #[error("file '{file_name}' is empty")]
    Empty {
        /// Client-supplied file name.
        file_name: String,
    },

    /// MIME type not allowed.
    #[error("file type '{content_type}' is not allowed")]
    UnsupportedType {
        /// The rejected MIME type.
        content_type: String,
    },

    /// File size exceeds maximum allowed.
    #[error("file size {size} bytes exceeds maximum allowed {max} bytes")]
    TooLarge {
        /// Actual file size.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// Image could not be processed.
    #[error("image processing failed: {0}")]
    Compression(#[from] CompressionError),

    /// Remote storage failed after retries.
    #[error("remote storage failed: {0}")]
    Storage(#[from] StorageError),

    /// At least one file of a batch failed; carries the first failure.
    #[error("{failed} of {total} files failed to upload: {source}")]
    Batch {
        /// Number of failed files in the aborted batch.
        failed: usize,
        /// Number of files submitted.
        total: usize,
        /// First failure.
        source: Box<UploadError>,
    },
}

impl UploadError {
    /// Returns `true` when the client sent something unusable.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Empty { .. } | Self::UnsupportedType { .. } | Self::TooLarge { .. } => true,
            Self::Compression(e) => e.is_client_error(),
            Self::Storage(_) => false,
            Self::Batch { source, .. } => source.is_client_error(),
        }
    }

    /// The underlying failure, unwrapping batch reports.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Batch { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        let message = err.to_string();
        let root = err.root();

        if root.is_client_error() {
            Self::Validation(message)
        } else if matches!(root, UploadError::Storage(_)) {
            Self::UploadFailed(message)
        } else {
            Self::Internal(message)
        }
    }
}
