//! Folder and object naming shared by every backend.

use std::io;

use bytes::Bytes;
use futures::stream::BoxStream;
use uuid::Uuid;

/// Streamed object body.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// A resolved remote folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    /// Sanitized logical path, e.g. `dealers/acme-01`.
    pub path: String,
    /// Backend id of the folder (Drive only; buckets use plain prefixes).
    pub remote_id: Option<String>,
}

impl FolderHandle {
    /// A prefix-only folder.
    #[must_use]
    pub fn prefix(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            remote_id: None,
        }
    }
}

/// Result of a successful `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Publicly readable URL.
    pub url: String,
    /// Backend key (object key or Drive file id).
    pub key: String,
}

/// Sanitize one folder name segment: every run of non-alphanumeric
/// characters becomes a single `-`, edges are trimmed and the result is
/// lowercased.
#[must_use]
pub fn sanitize_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut pending_dash = false;

    for c in segment.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    out
}

/// Sanitize a `/`-separated logical folder name segment by segment.
/// Segments that sanitize to nothing are dropped.
#[must_use]
pub fn sanitize_folder_name(name: &str) -> String {
    name.split('/')
        .map(sanitize_segment)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Collision-free object name: `<unix-millis>-<uuid>.<ext>`.
#[must_use]
pub fn unique_file_name(extension: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let ext = sanitize_segment(extension);
    if ext.is_empty() {
        format!("{millis}-{}", Uuid::new_v4())
    } else {
        format!("{millis}-{}.{ext}", Uuid::new_v4())
    }
}

/// Pick a file extension for a stored object.
///
/// The original extension is kept when it is registered for the content
/// type. Otherwise the content type decides, then the original name, then
/// `bin`.
#[must_use]
pub fn extension_for(content_type: &str, file_name: &str) -> String {
    let original = file_name
        .rsplit_once('.')
        .map(|(_, ext)| sanitize_segment(ext))
        .filter(|ext| !ext.is_empty());

    let parsed = content_type.parse::<mime::Mime>().ok();
    let known = parsed
        .as_ref()
        .and_then(|m| mime_guess::get_mime_extensions_str(&m.essence_str().to_ascii_lowercase()))
        .unwrap_or_default();

    if let Some(ext) = original.as_deref().filter(|ext| known.iter().any(|k| k == ext)) {
        return ext.to_string();
    }

    let subtype = parsed.map(|m| m.subtype().as_str().to_ascii_lowercase());
    let from_mime = subtype
        .as_deref()
        .and_then(|sub| known.iter().find(|ext| **ext == sub))
        .or_else(|| known.first());

    from_mime
        .map(|ext| (*ext).to_string())
        .or(original)
        .unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Acme Solar", "acme-solar")]
    #[case("  --Acme   Solar!!  ", "acme-solar")]
    #[case("ACME_01", "acme-01")]
    #[case("日本語", "")]
    #[case("", "")]
    fn test_sanitize_segment(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_segment(input), expected);
    }

    #[test]
    fn test_sanitize_folder_name_keeps_hierarchy() {
        assert_eq!(sanitize_folder_name("surveys/ACME 01/42"), "surveys/acme-01/42");
        assert_eq!(sanitize_folder_name("/dealers//Acme/"), "dealers/acme");
    }

    #[test]
    fn test_unique_file_name_format() {
        let name = unique_file_name("jpg");
        let (stem, ext) = name.rsplit_once('.').expect("has extension");
        assert_eq!(ext, "jpg");

        let (millis, uuid) = stem.split_once('-').expect("has separator");
        assert!(millis.parse::<i64>().is_ok());
        assert!(Uuid::parse_str(uuid).is_ok());
    }

    #[test]
    fn test_unique_file_names_differ() {
        assert_ne!(unique_file_name("png"), unique_file_name("png"));
    }

    #[rstest]
    #[case("image/jpeg", "photo.jpg", "jpg")]
    #[case("image/jpeg", "photo.png", "jpeg")]
    #[case("image/png", "photo", "png")]
    #[case("IMAGE/PNG", "logo.PNG", "png")]
    #[case("image/gif; name=a", "a.jpg", "gif")]
    #[case("image/webp", "a", "webp")]
    #[case("application/x-unknown-thing", "scan.TIFF", "tiff")]
    #[case("not a mime", "noext", "bin")]
    fn test_extension_for(#[case] mime: &str, #[case] name: &str, #[case] expected: &str) {
        assert_eq!(extension_for(mime, name), expected);
    }
}
