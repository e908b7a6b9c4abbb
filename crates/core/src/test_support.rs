//! Test doubles shared by the service tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, RgbImage};

use crate::storage::{
    ByteStream, FolderHandle, RemoteStorage, StorageError, StoredObject, sanitize_folder_name,
};

/// In-memory storage that can be told to fail.
#[derive(Default)]
pub struct MockStorage {
    pub objects: Mutex<HashMap<String, Bytes>>,
    pub content_types: Mutex<HashMap<String, String>>,
    pub folders: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub put_calls: AtomicUsize,
    /// Number of leading `put` calls that fail.
    pub failing_puts: AtomicUsize,
    pub fail_all_puts: bool,
    pub fail_deletes: bool,
}

impl MockStorage {
    pub fn failing_first(n: usize) -> Self {
        let storage = Self::default();
        storage.failing_puts.store(n, Ordering::SeqCst);
        storage
    }

    pub fn always_failing() -> Self {
        Self {
            fail_all_puts: true,
            ..Self::default()
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().expect("lock").len()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.objects.lock().expect("lock").contains_key(url)
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().expect("lock").clone()
    }
}

impl RemoteStorage for MockStorage {
    async fn find_or_create_folder(&self, name: &str) -> Result<FolderHandle, StorageError> {
        self.folders.lock().expect("lock").push(name.to_string());
        Ok(FolderHandle::prefix(sanitize_folder_name(name)))
    }

    async fn put(
        &self,
        folder: &FolderHandle,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredObject, StorageError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_all_puts {
            return Err(StorageError::operation("bucket unreachable"));
        }
        let remaining = self.failing_puts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_puts.store(remaining - 1, Ordering::SeqCst);
            return Err(StorageError::operation("transient"));
        }

        let key = format!("{}/{file_name}", folder.path);
        let url = format!("mock://bucket/{key}");
        self.objects.lock().expect("lock").insert(url.clone(), data);
        self.content_types
            .lock()
            .expect("lock")
            .insert(url.clone(), content_type.to_string());
        Ok(StoredObject { url, key })
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        if self.fail_deletes {
            return Err(StorageError::operation("delete refused"));
        }
        self.deleted.lock().expect("lock").push(url.to_string());
        self.objects.lock().expect("lock").remove(url);
        Ok(())
    }

    async fn get_stream(&self, path: &str) -> Result<ByteStream, StorageError> {
        Err(StorageError::not_found(path))
    }

    fn resolve_url(&self, stored: &str) -> String {
        if stored.contains("://") {
            stored.to_string()
        } else {
            format!("mock://bucket/{stored}")
        }
    }
}

/// A black PNG of the given size.
pub fn png(width: u32, height: u32) -> Bytes {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut buf, ImageFormat::Png)
        .expect("encode png");
    Bytes::from(buf.into_inner())
}
