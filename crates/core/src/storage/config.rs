//! Storage configuration built once at startup.

use std::time::Duration;

use sitesurvey_shared::config::{StorageProvider, UploadSettings};

use crate::retry::RetryPolicy;

/// Immutable storage configuration shared by every backend call.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Which backend to talk to and its credentials.
    pub provider: StorageProvider,
    /// Retry policy for folder lookups and uploads.
    pub retry: RetryPolicy,
}

impl StorageConfig {
    /// Create a config with the default retry policy.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
        }
    }

    /// Build from the application's storage and upload sections.
    #[must_use]
    pub fn from_settings(provider: StorageProvider, upload: &UploadSettings) -> Self {
        Self {
            provider,
            retry: RetryPolicy::new(
                upload.retry_attempts,
                Duration::from_millis(upload.retry_initial_delay_ms),
                upload.retry_backoff_multiplier,
            ),
        }
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Base URL bucket objects are publicly readable under, without a
    /// trailing slash. `None` for Drive, whose links come from the API.
    #[must_use]
    pub fn public_base_url(&self) -> Option<String> {
        match &self.provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                public_base_url,
                ..
            } => Some(public_base_url.as_ref().map_or_else(
                || format!("{}/{bucket}", endpoint.trim_end_matches('/')),
                |base| base.trim_end_matches('/').to_string(),
            )),
            StorageProvider::LocalFs {
                public_base_url, ..
            } => Some(public_base_url.trim_end_matches('/').to_string()),
            StorageProvider::GoogleDrive { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn s3(public_base_url: Option<&str>) -> StorageProvider {
        StorageProvider::S3 {
            endpoint: "https://s3.us-central-1.wasabisys.com/".to_string(),
            bucket: "sitesurvey-images".to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            region: "us-central-1".to_string(),
            public_base_url: public_base_url.map(String::from),
        }
    }

    #[test]
    fn test_s3_public_base_defaults_to_path_style() {
        let config = StorageConfig::new(s3(None));
        assert_eq!(
            config.public_base_url().as_deref(),
            Some("https://s3.us-central-1.wasabisys.com/sitesurvey-images")
        );
    }

    #[test]
    fn test_s3_public_base_override() {
        let config = StorageConfig::new(s3(Some("https://cdn.example.com/")));
        assert_eq!(
            config.public_base_url().as_deref(),
            Some("https://cdn.example.com")
        );
    }

    #[test]
    fn test_local_and_drive_public_base() {
        let local = StorageConfig::new(StorageProvider::LocalFs {
            root: PathBuf::from("./storage"),
            public_base_url: "http://localhost:4000/api/v1/files/".to_string(),
        });
        assert_eq!(
            local.public_base_url().as_deref(),
            Some("http://localhost:4000/api/v1/files")
        );

        let drive = StorageConfig::new(StorageProvider::GoogleDrive {
            client_email: "svc@example.iam.gserviceaccount.com".to_string(),
            private_key: String::new(),
            root_folder_id: "root".to_string(),
        });
        assert!(drive.public_base_url().is_none());
    }

    #[test]
    fn test_from_settings_copies_retry_policy() {
        let upload = UploadSettings {
            retry_attempts: 5,
            retry_initial_delay_ms: 250,
            retry_backoff_multiplier: 3,
            ..UploadSettings::default()
        };
        let config = StorageConfig::from_settings(s3(None), &upload);
        assert_eq!(
            config.retry,
            RetryPolicy::new(5, Duration::from_millis(250), 3)
        );
    }
}
