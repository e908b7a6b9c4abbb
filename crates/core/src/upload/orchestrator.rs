//! The upload pipeline.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use super::error::UploadError;
use super::types::{AssetCategory, UploadFile, UploadPolicy, UploadStage, UploadedAsset};
use crate::compression::ImageCompressor;
use crate::retry;
use crate::storage::{RemoteStorage, extension_for, unique_file_name};

/// Runs files through validation, compression and remote storage.
pub struct UploadOrchestrator<S: RemoteStorage> {
    storage: Arc<S>,
    compressor: ImageCompressor,
    policy: UploadPolicy,
}

impl<S: RemoteStorage> UploadOrchestrator<S> {
    /// Create a new orchestrator.
    #[must_use]
    pub fn new(storage: Arc<S>, policy: UploadPolicy) -> Self {
        Self {
            storage,
            compressor: ImageCompressor::new(),
            policy,
        }
    }

    /// The storage uploads go to.
    #[must_use]
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// The active policy.
    #[must_use]
    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Validate a file against the policy without uploading it.
    ///
    /// # Errors
    ///
    /// Returns a client error for empty, oversized or disallowed files.
    pub fn validate(&self, file: &UploadFile) -> Result<(), UploadError> {
        if file.data.is_empty() {
            return Err(UploadError::Empty {
                file_name: file.file_name.clone(),
            });
        }

        if !self.policy.is_mime_type_allowed(&file.content_type) {
            return Err(UploadError::UnsupportedType {
                content_type: file.content_type.clone(),
            });
        }

        if file.size() > self.policy.max_file_size {
            return Err(UploadError::TooLarge {
                size: file.size(),
                max: self.policy.max_file_size,
            });
        }

        Ok(())
    }

    /// Store one file under `<category>/<owner_key>` and return its URL.
    ///
    /// # Errors
    ///
    /// Validation and image problems are client errors; remote failures
    /// after all retries are [`UploadError::Storage`].
    pub async fn ingest(
        &self,
        file: UploadFile,
        owner_key: &str,
        category: AssetCategory,
    ) -> Result<String, UploadError> {
        let file_name = file.file_name.clone();

        match self.run_pipeline(file, owner_key, category).await {
            Ok(url) => {
                debug!(file = %file_name, stage = UploadStage::Done.as_str(), url = %url, "Upload stage");
                Ok(url)
            }
            Err(e) => {
                debug!(file = %file_name, stage = UploadStage::Failed.as_str(), error = %e, "Upload stage");
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        file: UploadFile,
        owner_key: &str,
        category: AssetCategory,
    ) -> Result<String, UploadError> {
        debug!(file = %file.file_name, stage = UploadStage::Pending.as_str(), "Upload stage");
        self.validate(&file)?;

        let (data, content_type, extension) = match category.compression() {
            Some(options) => {
                debug!(file = %file.file_name, stage = UploadStage::Compressing.as_str(), "Upload stage");
                let data = self.compressor.compress(file.data, options).await?;
                (
                    data,
                    options.format.content_type().to_string(),
                    options.format.extension().to_string(),
                )
            }
            None => {
                let extension = extension_for(&file.content_type, &file.file_name);
                (file.data, file.content_type, extension)
            }
        };

        debug!(file = %file.file_name, stage = UploadStage::Uploading.as_str(), "Upload stage");

        let folder_name = format!("{}/{owner_key}", category.folder());
        let folder = retry::execute(
            &self.policy.retry,
            || self.storage.find_or_create_folder(&folder_name),
            |e, attempt| warn!(folder = %folder_name, attempt, error = %e, "Retrying folder lookup"),
        )
        .await?;

        let object_name = unique_file_name(&extension);
        let stored = retry::execute(
            &self.policy.retry,
            || {
                self.storage
                    .put(&folder, &object_name, &content_type, data.clone())
            },
            |e, attempt| warn!(file = %object_name, attempt, error = %e, "Retrying upload"),
        )
        .await?;

        Ok(stored.url)
    }

    /// Store several files, `batch_size` at a time, returning their URLs
    /// in input order.
    ///
    /// A batch starts only after the previous one settled. When any file of
    /// a batch fails, no further batch is started and the first failure is
    /// returned with the failure count. Files already stored stay in place.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Batch`] wrapping the first failure.
    pub async fn ingest_many(
        &self,
        files: Vec<UploadFile>,
        owner_key: &str,
        category: AssetCategory,
    ) -> Result<Vec<UploadedAsset>, UploadError> {
        let total = files.len();
        let batch_size = self.policy.batch_size.max(1);
        let mut uploaded = Vec::with_capacity(total);
        let mut files = files.into_iter().peekable();

        while files.peek().is_some() {
            let batch: Vec<UploadFile> = files.by_ref().take(batch_size).collect();

            let results = join_all(batch.into_iter().map(|file| async move {
                let field_name = file.field_name.clone();
                let file_name = file.file_name.clone();
                self.ingest(file, owner_key, category)
                    .await
                    .map(|url| UploadedAsset { field_name, url })
                    .map_err(|e| (file_name, e))
            }))
            .await;

            let mut failures = Vec::new();
            for result in results {
                match result {
                    Ok(asset) => uploaded.push(asset),
                    Err(failure) => failures.push(failure),
                }
            }

            if !failures.is_empty() {
                for (file_name, e) in &failures {
                    error!(file = %file_name, owner = %owner_key, error = %e, "Failed to upload file");
                }
                error!(
                    owner = %owner_key,
                    failed = failures.len(),
                    total,
                    "{} files failed to upload",
                    failures.len()
                );
                if !uploaded.is_empty() {
                    let orphans: Vec<&str> = uploaded.iter().map(|a| a.url.as_str()).collect();
                    warn!(owner = %owner_key, ?orphans, "Leaving already uploaded files in place");
                }

                let failed = failures.len();
                let (_, first) = failures.swap_remove(0);
                return Err(UploadError::Batch {
                    failed,
                    total,
                    source: Box::new(first),
                });
            }
        }

        info!(owner = %owner_key, count = uploaded.len(), "Uploaded files");
        Ok(uploaded)
    }

    /// Upload a replacement, persist its URL, then retire the old blob.
    ///
    /// A failed upload leaves `old_url` untouched and `persist` is never
    /// called. A failed `persist` discards the new blob and returns the
    /// persist error. Deleting the old blob is best-effort.
    ///
    /// # Errors
    ///
    /// Returns the upload error (converted) or the persist error.
    pub async fn replace<T, E, F, Fut>(
        &self,
        old_url: Option<&str>,
        file: UploadFile,
        owner_key: &str,
        category: AssetCategory,
        persist: F,
    ) -> Result<T, E>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<UploadError>,
    {
        let new_url = self.ingest(file, owner_key, category).await?;

        match persist(new_url.clone()).await {
            Ok(value) => {
                if let Some(old) = old_url.filter(|old| *old != new_url) {
                    self.discard(old).await;
                }
                Ok(value)
            }
            Err(e) => {
                self.discard(&new_url).await;
                Err(e)
            }
        }
    }

    /// Delete a stored file, logging instead of failing.
    pub async fn discard(&self, url: &str) {
        match self.storage.delete(url).await {
            Ok(()) => debug!(url = %url, "Deleted stored file"),
            Err(e) => warn!(url = %url, error = %e, "Failed to delete stored file"),
        }
    }

    /// Delete several stored files, logging failures.
    pub async fn discard_all<I, U>(&self, urls: I)
    where
        I: IntoIterator<Item = U>,
        U: AsRef<str>,
    {
        for url in urls {
            self.discard(url.as_ref()).await;
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
