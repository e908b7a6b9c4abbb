//! Object bucket backend using Apache OpenDAL.

use bytes::Bytes;
use futures::StreamExt;
use opendal::{Operator, services};
use tracing::debug;

use super::RemoteStorage;
use super::config::StorageConfig;
use super::error::StorageError;
use super::naming::{ByteStream, FolderHandle, StoredObject, sanitize_folder_name};
use sitesurvey_shared::config::StorageProvider;

/// S3-compatible bucket or local directory.
///
/// Folders are plain key prefixes. Objects are expected to be publicly
/// readable under `public_base_url` (bucket policy for S3, the `/files`
/// proxy for the local filesystem).
#[derive(Debug, Clone)]
pub struct BucketStorage {
    operator: Operator,
    public_base_url: String,
}

impl BucketStorage {
    /// Create the backend from a bucket-type provider.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a Drive provider or an invalid
    /// builder configuration.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let public_base_url = config
            .public_base_url()
            .ok_or_else(|| StorageError::configuration("provider is not a bucket"))?;
        let operator = Self::create_operator(&config.provider)?;

        Ok(Self {
            operator,
            public_base_url,
        })
    }

    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
                ..
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);

                Operator::new(builder)
                    .map(|b| b.finish())
                    .map_err(|e| StorageError::configuration(e.to_string()))
            }
            StorageProvider::LocalFs { root, .. } => {
                let root = root
                    .to_str()
                    .ok_or_else(|| StorageError::configuration("invalid path"))?;
                let builder = services::Fs::default().root(root);

                Operator::new(builder)
                    .map(|b| b.finish())
                    .map_err(|e| StorageError::configuration(e.to_string()))
            }
            StorageProvider::GoogleDrive { .. } => {
                Err(StorageError::configuration("provider is not a bucket"))
            }
        }
    }

    /// Object key behind a URL issued by this bucket. Relative references
    /// are taken as keys already.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidUrl`] for absolute URLs under a
    /// different base, or keys that try to climb out of the bucket.
    pub fn key_for_url(&self, url: &str) -> Result<String, StorageError> {
        let key = if url.contains("://") {
            url.strip_prefix(&self.public_base_url)
                .and_then(|rest| rest.strip_prefix('/'))
                .ok_or_else(|| StorageError::InvalidUrl(url.to_string()))?
        } else {
            url
        };

        let key = key.split(['?', '#']).next().unwrap_or_default();
        let key = key.trim_start_matches('/');

        if key.is_empty() || key.split('/').any(|s| s == "..") {
            return Err(StorageError::InvalidUrl(url.to_string()));
        }

        Ok(key.to_string())
    }

    fn url_for_key(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url)
    }
}

impl RemoteStorage for BucketStorage {
    async fn find_or_create_folder(&self, name: &str) -> Result<FolderHandle, StorageError> {
        Ok(FolderHandle::prefix(sanitize_folder_name(name)))
    }

    async fn put(
        &self,
        folder: &FolderHandle,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredObject, StorageError> {
        let key = if folder.path.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{file_name}", folder.path)
        };

        let size = data.len();
        self.operator
            .write_with(&key, data)
            .content_type(content_type)
            .await?;

        debug!(key = %key, size, "Stored object in bucket");

        Ok(StoredObject {
            url: self.url_for_key(&key),
            key,
        })
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let key = self.key_for_url(url)?;

        match self.operator.delete(&key).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_stream(&self, path: &str) -> Result<ByteStream, StorageError> {
        let key = self.key_for_url(path)?;
        let reader = self.operator.reader(&key).await?;
        let stream = reader.into_bytes_stream(..).await?;

        Ok(stream.boxed())
    }

    fn resolve_url(&self, stored: &str) -> String {
        if stored.contains("://") {
            stored.to_string()
        } else {
            self.url_for_key(stored.trim_start_matches('/'))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    const BASE: &str = "http://localhost:4000/api/v1/files";

    fn local_storage(dir: &tempfile::TempDir) -> BucketStorage {
        let config = StorageConfig::new(StorageProvider::LocalFs {
            root: dir.path().to_path_buf(),
            public_base_url: BASE.to_string(),
        });
        BucketStorage::from_config(&config).expect("should create storage")
    }

    async fn read_all(storage: &BucketStorage, path: &str) -> Vec<u8> {
        let chunks: Vec<Bytes> = storage
            .get_stream(path)
            .await
            .expect("stream")
            .try_collect()
            .await
            .expect("read");
        chunks.concat()
    }

    #[tokio::test]
    async fn test_folder_is_sanitized_prefix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = local_storage(&dir);

        let folder = storage
            .find_or_create_folder("dealers/ACME 01")
            .await
            .expect("folder");
        assert_eq!(folder, FolderHandle::prefix("dealers/acme-01"));
    }

    #[tokio::test]
    async fn test_put_then_stream_then_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = local_storage(&dir);
        let folder = storage.find_or_create_folder("surveys/acme/7").await.expect("folder");

        let stored = storage
            .put(&folder, "1-abc.jpg", "image/jpeg", Bytes::from_static(b"jpeg-bytes"))
            .await
            .expect("put");
        assert_eq!(stored.key, "surveys/acme/7/1-abc.jpg");
        assert_eq!(stored.url, format!("{BASE}/surveys/acme/7/1-abc.jpg"));
        assert!(dir.path().join("surveys/acme/7/1-abc.jpg").exists());

        assert_eq!(read_all(&storage, &stored.key).await, b"jpeg-bytes");
        assert_eq!(read_all(&storage, &stored.url).await, b"jpeg-bytes");

        storage.delete(&stored.url).await.expect("delete");
        assert!(!dir.path().join("surveys/acme/7/1-abc.jpg").exists());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = local_storage(&dir);

        storage
            .delete(&format!("{BASE}/dealers/none/missing.png"))
            .await
            .expect("deleting a missing object succeeds");
    }

    #[tokio::test]
    async fn test_get_stream_missing_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = local_storage(&dir);

        assert!(storage.get_stream("dealers/missing.png").await.is_err());
    }

    #[test]
    fn test_key_for_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = local_storage(&dir);

        assert_eq!(
            storage.key_for_url(&format!("{BASE}/dealers/a/b.png?x=1")).expect("key"),
            "dealers/a/b.png"
        );
        assert_eq!(storage.key_for_url("/dealers/a/b.png").expect("key"), "dealers/a/b.png");
        assert!(matches!(
            storage.key_for_url("https://elsewhere.example.com/b.png"),
            Err(StorageError::InvalidUrl(_))
        ));
        assert!(storage.key_for_url("../etc/passwd").is_err());
        assert!(storage.key_for_url("").is_err());
    }

    #[test]
    fn test_resolve_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = local_storage(&dir);

        assert_eq!(storage.resolve_url("dealers/a.png"), format!("{BASE}/dealers/a.png"));
        assert_eq!(
            storage.resolve_url("https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn test_drive_provider_rejected() {
        let config = StorageConfig::new(StorageProvider::GoogleDrive {
            client_email: "svc@example.com".to_string(),
            private_key: String::new(),
            root_folder_id: "root".to_string(),
        });
        assert!(matches!(
            BucketStorage::from_config(&config),
            Err(StorageError::Configuration(_))
        ));
    }
}
