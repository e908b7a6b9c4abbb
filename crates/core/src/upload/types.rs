//! Upload domain types.

use std::time::Duration;

use bytes::Bytes;
use sitesurvey_shared::config::UploadSettings;

use crate::compression::CompressionOptions;
use crate::retry::RetryPolicy;

/// A file received from a client, held in memory.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Multipart field the file arrived in.
    pub field_name: String,
    /// Client-supplied file name.
    pub file_name: String,
    /// Declared MIME type.
    pub content_type: String,
    /// File contents.
    pub data: Bytes,
}

impl UploadFile {
    /// Create an upload file.
    #[must_use]
    pub fn new(
        field_name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::try_from(self.data.len()).unwrap_or(u64::MAX)
    }
}

/// A stored file paired with the field it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    /// Multipart field the file arrived in.
    pub field_name: String,
    /// Public URL of the stored object.
    pub url: String,
}

/// What an upload is for. Decides the top-level folder and whether the
/// image is normalized before storing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetCategory {
    /// Dealer branding; stored as received.
    DealerLogo,
    /// Survey evidence photo; resized and re-encoded.
    SurveyPhoto,
}

impl AssetCategory {
    /// Top-level folder for this category.
    #[must_use]
    pub const fn folder(self) -> &'static str {
        match self {
            Self::DealerLogo => "dealers",
            Self::SurveyPhoto => "surveys",
        }
    }

    /// Compression applied before storing, if any.
    #[must_use]
    pub fn compression(self) -> Option<CompressionOptions> {
        match self {
            Self::DealerLogo => None,
            Self::SurveyPhoto => Some(CompressionOptions::default()),
        }
    }
}

/// Lifecycle of a single upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    /// Received, not yet processed.
    Pending,
    /// Being resized and re-encoded.
    Compressing,
    /// Being written to remote storage.
    Uploading,
    /// Stored; URL available.
    Done,
    /// Gave up.
    Failed,
}

impl UploadStage {
    /// Stage name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Compressing => "compressing",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Validation limits, batching and retry for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Maximum accepted size of one file in bytes.
    pub max_file_size: u64,
    /// Accepted MIME types.
    pub allowed_mime_types: Vec<String>,
    /// Files uploaded concurrently per batch.
    pub batch_size: usize,
    /// Retry policy for remote calls.
    pub retry: RetryPolicy,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::from_settings(&UploadSettings::default())
    }
}

impl UploadPolicy {
    /// Build from the `upload` configuration section.
    #[must_use]
    pub fn from_settings(settings: &UploadSettings) -> Self {
        Self {
            max_file_size: settings.max_file_size,
            allowed_mime_types: settings.allowed_mime_types.clone(),
            batch_size: settings.batch_size.max(1),
            retry: RetryPolicy::new(
                settings.retry_attempts,
                Duration::from_millis(settings.retry_initial_delay_ms),
                settings.retry_backoff_multiplier,
            ),
        }
    }

    /// Check if a MIME type is allowed.
    #[must_use]
    pub fn is_mime_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(mime_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.max_file_size, 5 * 1024 * 1024);
        assert_eq!(policy.batch_size, 3);
        assert_eq!(policy.retry, RetryPolicy::default());
        assert!(policy.is_mime_type_allowed("image/jpeg"));
        assert!(policy.is_mime_type_allowed("IMAGE/PNG"));
        assert!(policy.is_mime_type_allowed("image/gif"));
        assert!(!policy.is_mime_type_allowed("image/webp"));
        assert!(!policy.is_mime_type_allowed("application/pdf"));
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let settings = UploadSettings {
            batch_size: 0,
            ..UploadSettings::default()
        };
        assert_eq!(UploadPolicy::from_settings(&settings).batch_size, 1);
    }

    #[test]
    fn test_category_folders_and_compression() {
        assert_eq!(AssetCategory::DealerLogo.folder(), "dealers");
        assert_eq!(AssetCategory::SurveyPhoto.folder(), "surveys");
        assert!(AssetCategory::DealerLogo.compression().is_none());
        assert_eq!(
            AssetCategory::SurveyPhoto.compression(),
            Some(CompressionOptions::default())
        );
    }
}
