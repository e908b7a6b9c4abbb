//! Remote object storage for uploaded images.
//!
//! Two backends sit behind [`RemoteStorage`]:
//! - an object bucket through Apache OpenDAL (S3-compatible services such as
//!   Wasabi, Cloudflare R2 or AWS S3, plus the local filesystem for development)
//! - a Google Drive folder tree driven through the Drive v3 REST API
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       RemoteStorage                          │
//! ├──────────────────────────────┬───────────────────────────────┤
//! │ find_or_create_folder(name)  │ put(folder, file, type, data) │
//! │ delete(url)                  │ get_stream(path)              │
//! ├──────────────────────────────┼───────────────────────────────┤
//! │ BucketStorage (OpenDAL)      │ DriveStorage (reqwest + JWT)  │
//! └──────────────────────────────┴───────────────────────────────┘
//! ```

mod bucket;
mod config;
mod drive;
mod error;
mod naming;
mod service;

use std::future::Future;

use bytes::Bytes;

pub use bucket::BucketStorage;
pub use config::StorageConfig;
pub use drive::DriveStorage;
pub use error::StorageError;
pub use naming::{
    ByteStream, FolderHandle, StoredObject, extension_for, sanitize_folder_name, unique_file_name,
};
pub use service::StorageService;
pub use sitesurvey_shared::config::StorageProvider;

/// Backend-agnostic remote storage.
///
/// Implementations never retry on their own; callers wrap
/// `find_or_create_folder` and `put` with [`crate::retry::execute`].
pub trait RemoteStorage: Send + Sync {
    /// Resolve a `/`-separated logical folder, creating missing levels.
    fn find_or_create_folder(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<FolderHandle, StorageError>> + Send;

    /// Store `data` as `file_name` inside `folder`. The returned URL is
    /// publicly readable.
    fn put(
        &self,
        folder: &FolderHandle,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> impl Future<Output = Result<StoredObject, StorageError>> + Send;

    /// Delete the object behind `url`. Deleting a missing object succeeds.
    fn delete(&self, url: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Stream the object at a backend-relative path.
    fn get_stream(&self, path: &str)
    -> impl Future<Output = Result<ByteStream, StorageError>> + Send;

    /// Turn a stored reference (absolute URL or relative key) into an
    /// absolute URL.
    fn resolve_url(&self, stored: &str) -> String;
}
