//! Storage service selecting a backend from configuration.

use bytes::Bytes;
use tracing::warn;

use super::RemoteStorage;
use super::bucket::BucketStorage;
use super::config::StorageConfig;
use super::drive::DriveStorage;
use super::error::StorageError;
use super::naming::{ByteStream, FolderHandle, StoredObject};
use crate::retry::RetryPolicy;
use sitesurvey_shared::config::StorageProvider;

#[derive(Debug, Clone)]
enum Backend {
    Bucket(BucketStorage),
    Drive(DriveStorage),
}

/// The configured remote storage, built once at startup and shared.
#[derive(Debug, Clone)]
pub struct StorageService {
    backend: Backend,
    config: StorageConfig,
}

impl StorageService {
    /// Create the service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let backend = match &config.provider {
            StorageProvider::S3 { .. } | StorageProvider::LocalFs { .. } => {
                Backend::Bucket(BucketStorage::from_config(&config)?)
            }
            StorageProvider::GoogleDrive { .. } => {
                Backend::Drive(DriveStorage::from_config(&config)?)
            }
        };

        Ok(Self { backend, config })
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }

    /// Retry policy for folder lookups and uploads.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.config.retry
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

impl RemoteStorage for StorageService {
    async fn find_or_create_folder(&self, name: &str) -> Result<FolderHandle, StorageError> {
        match &self.backend {
            Backend::Bucket(b) => b.find_or_create_folder(name).await,
            Backend::Drive(d) => d.find_or_create_folder(name).await,
        }
    }

    async fn put(
        &self,
        folder: &FolderHandle,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredObject, StorageError> {
        match &self.backend {
            Backend::Bucket(b) => b.put(folder, file_name, content_type, data).await,
            Backend::Drive(d) => d.put(folder, file_name, content_type, data).await,
        }
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        match &self.backend {
            Backend::Bucket(b) => b.delete(url).await,
            Backend::Drive(d) => d.delete(url).await,
        }
    }

    /// Remote failures of any kind surface as [`StorageError::NotFound`].
    async fn get_stream(&self, path: &str) -> Result<ByteStream, StorageError> {
        let result = match &self.backend {
            Backend::Bucket(b) => b.get_stream(path).await,
            Backend::Drive(d) => d.get_stream(path).await,
        };

        result.map_err(|e| {
            if !e.is_not_found() {
                warn!(path = %path, error = %e, "Remote read failed");
            }
            StorageError::not_found(path)
        })
    }

    fn resolve_url(&self, stored: &str) -> String {
        match &self.backend {
            Backend::Bucket(b) => b.resolve_url(stored),
            Backend::Drive(d) => d.resolve_url(stored),
        }
    }
}
