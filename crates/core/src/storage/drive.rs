//! Google Drive folder backend (Drive v3 REST API).
//!
//! Authenticates as a service account: an RS256-signed JWT assertion is
//! exchanged for an access token, which is cached until shortly before it
//! expires. Every folder and file created here is shared `anyone`/`reader`
//! so the returned links work without a Google login.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::RemoteStorage;
use super::config::StorageConfig;
use super::error::StorageError;
use super::naming::{ByteStream, FolderHandle, StoredObject, sanitize_folder_name};
use crate::retry::{self, RetryPolicy};
use sitesurvey_shared::config::StorageProvider;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const SCOPE: &str = "https://www.googleapis.com/auth/drive.file";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const BOUNDARY: &str = "sitesurvey-upload-boundary";

/// Lifetime requested for the JWT assertion, in seconds.
const ASSERTION_TTL_SECS: i64 = 3600;
/// Tokens are dropped from the cache before Google expires them.
const TOKEN_CACHE_TTL: Duration = Duration::from_secs(50 * 60);
const TOKEN_CACHE_KEY: &str = "access_token";

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileRef {
    id: String,
    #[serde(default)]
    web_view_link: Option<String>,
    #[serde(default)]
    web_content_link: Option<String>,
}

/// Drive-backed storage rooted at one folder.
#[derive(Clone)]
pub struct DriveStorage {
    client: reqwest::Client,
    client_email: String,
    signing_key: EncodingKey,
    root_folder_id: String,
    tokens: Cache<&'static str, String>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for DriveStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveStorage")
            .field("client_email", &self.client_email)
            .field("root_folder_id", &self.root_folder_id)
            .finish_non_exhaustive()
    }
}

impl DriveStorage {
    /// Create the backend from a Drive provider.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for other providers, a missing root
    /// folder or an unparsable private key.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let StorageProvider::GoogleDrive {
            client_email,
            private_key,
            root_folder_id,
        } = &config.provider
        else {
            return Err(StorageError::configuration("provider is not google_drive"));
        };

        if root_folder_id.trim().is_empty() {
            return Err(StorageError::configuration("root_folder_id is not configured"));
        }

        // Keys pasted into env files usually carry literal `\n`
        let pem = private_key.replace("\\n", "\n");
        let signing_key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| StorageError::configuration(format!("invalid private key: {e}")))?;

        info!(client_email = %client_email, root_folder_id = %root_folder_id, "Drive storage configured");

        Ok(Self {
            client: reqwest::Client::new(),
            client_email: client_email.clone(),
            signing_key,
            root_folder_id: root_folder_id.clone(),
            tokens: Cache::builder()
                .max_capacity(1)
                .time_to_live(TOKEN_CACHE_TTL)
                .build(),
            retry: config.retry,
        })
    }

    async fn access_token(&self) -> Result<String, StorageError> {
        self.tokens
            .try_get_with(TOKEN_CACHE_KEY, self.fetch_token())
            .await
            .map_err(|e| StorageError::auth(e.to_string()))
    }

    async fn fetch_token(&self) -> Result<String, StorageError> {
        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SCOPE,
            aud: TOKEN_URL,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };
        let assertion =
            jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
                .map_err(|e| StorageError::auth(e.to_string()))?;

        let response: TokenResponse = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| StorageError::auth(e.to_string()))?
            .json()
            .await
            .map_err(|e| StorageError::auth(e.to_string()))?;

        debug!("Obtained Drive access token");
        Ok(response.access_token)
    }

    async fn find_child_folder(
        &self,
        token: &str,
        parent_id: &str,
        name: &str,
    ) -> Result<Option<String>, StorageError> {
        let list: FileList = self
            .client
            .get(FILES_URL)
            .bearer_auth(token)
            .query(&[
                ("q", folder_query(parent_id, name).as_str()),
                ("fields", "files(id)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_folder(
        &self,
        token: &str,
        parent_id: &str,
        name: &str,
    ) -> Result<String, StorageError> {
        let created: FileRef = self
            .client
            .post(FILES_URL)
            .bearer_auth(token)
            .query(&[("fields", "id"), ("supportsAllDrives", "true")])
            .json(&json!({
                "name": name,
                "mimeType": FOLDER_MIME,
                "parents": [parent_id],
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        publish(
            &self.retry,
            &created.id,
            || self.share_publicly(token, &created.id),
            || self.delete_file(token, &created.id),
        )
        .await?;
        info!(folder_id = %created.id, name = %name, "Created Drive folder");

        Ok(created.id)
    }

    async fn share_publicly(&self, token: &str, file_id: &str) -> Result<(), StorageError> {
        self.client
            .post(format!("{FILES_URL}/{file_id}/permissions"))
            .bearer_auth(token)
            .query(&[("supportsAllDrives", "true")])
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn delete_file(&self, token: &str, file_id: &str) -> Result<(), StorageError> {
        let response = self
            .client
            .delete(format!("{FILES_URL}/{file_id}"))
            .bearer_auth(token)
            .query(&[("supportsAllDrives", "true")])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        response.error_for_status()?;

        Ok(())
    }
}

/// Share a just-created file, retrying only the permission call.
///
/// When sharing keeps failing the file is removed, so a retried upload
/// starts clean instead of leaving an unshared copy behind.
async fn publish<S, SFut, C, CFut>(
    policy: &RetryPolicy,
    file_id: &str,
    share: S,
    cleanup: C,
) -> Result<(), StorageError>
where
    S: FnMut() -> SFut,
    SFut: Future<Output = Result<(), StorageError>>,
    C: FnOnce() -> CFut,
    CFut: Future<Output = Result<(), StorageError>>,
{
    let shared = retry::execute(policy, share, |e, attempt| {
        warn!(file_id = %file_id, attempt, error = %e, "Retrying Drive share");
    })
    .await;

    if let Err(e) = &shared {
        warn!(file_id = %file_id, error = %e, "Removing Drive file that could not be shared");
        if let Err(cleanup_err) = cleanup().await {
            warn!(file_id = %file_id, error = %cleanup_err, "Failed to remove unshared Drive file");
        }
    }

    shared
}

impl RemoteStorage for DriveStorage {
    async fn find_or_create_folder(&self, name: &str) -> Result<FolderHandle, StorageError> {
        let path = sanitize_folder_name(name);
        let token = self.access_token().await?;

        let mut parent_id = self.root_folder_id.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            parent_id = match self.find_child_folder(&token, &parent_id, segment).await? {
                Some(id) => id,
                None => self.create_folder(&token, &parent_id, segment).await?,
            };
        }

        Ok(FolderHandle {
            path,
            remote_id: Some(parent_id),
        })
    }

    async fn put(
        &self,
        folder: &FolderHandle,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredObject, StorageError> {
        let parent_id = folder
            .remote_id
            .as_deref()
            .unwrap_or(self.root_folder_id.as_str());
        let token = self.access_token().await?;

        let metadata = json!({
            "name": file_name,
            "mimeType": content_type,
            "parents": [parent_id],
        });
        let body = multipart_related_body(&metadata, content_type, &data);

        let file: FileRef = self
            .client
            .post(UPLOAD_URL)
            .bearer_auth(&token)
            .query(&[
                ("uploadType", "multipart"),
                ("fields", "id,webViewLink,webContentLink"),
                ("supportsAllDrives", "true"),
            ])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={BOUNDARY}"),
            )
            .body(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        publish(
            &self.retry,
            &file.id,
            || self.share_publicly(&token, &file.id),
            || self.delete_file(&token, &file.id),
        )
        .await?;
        debug!(file_id = %file.id, folder = %folder.path, "Uploaded file to Drive");

        let url = file
            .web_content_link
            .or(file.web_view_link)
            .unwrap_or_else(|| direct_link(&file.id));

        Ok(StoredObject { url, key: file.id })
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let file_id =
            file_id_from_url(url).ok_or_else(|| StorageError::InvalidUrl(url.to_string()))?;
        let token = self.access_token().await?;
        self.delete_file(&token, &file_id).await
    }

    async fn get_stream(&self, path: &str) -> Result<ByteStream, StorageError> {
        let file_id = file_id_from_url(path).unwrap_or_else(|| path.trim_matches('/').to_string());
        let token = self.access_token().await?;

        let response = self
            .client
            .get(format!("{FILES_URL}/{file_id}"))
            .bearer_auth(&token)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()
            .await?
            .error_for_status()?;

        Ok(response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed())
    }

    fn resolve_url(&self, stored: &str) -> String {
        if stored.contains("://") {
            stored.to_string()
        } else {
            direct_link(stored)
        }
    }
}

fn folder_query(parent_id: &str, name: &str) -> String {
    format!(
        "name = '{}' and '{}' in parents and mimeType = '{FOLDER_MIME}' and trashed = false",
        escape_query_literal(name),
        escape_query_literal(parent_id),
    )
}

fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn direct_link(file_id: &str) -> String {
    format!("https://drive.google.com/uc?id={file_id}&export=download")
}

/// Drive file id from a `webContentLink` (`...?id=<id>&...`), a
/// `webViewLink` (`.../file/d/<id>/view`) or a bare id.
fn file_id_from_url(url: &str) -> Option<String> {
    if !url.contains("://") {
        let id = url.trim_matches('/');
        return (!id.is_empty() && !id.contains('/')).then(|| id.to_string());
    }

    if let Some((_, rest)) = url.split_once("/d/") {
        return rest
            .split(['/', '?', '#'])
            .next()
            .filter(|id| !id.is_empty())
            .map(String::from);
    }

    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("id="))
        .map(|id| id.split('#').next().unwrap_or(id))
        .filter(|id| !id.is_empty())
        .map(String::from)
}

fn multipart_related_body(metadata: &serde_json::Value, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(
        format!("--{BOUNDARY}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("--{BOUNDARY}\r\nContent-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[rstest]
    #[case("https://drive.google.com/uc?id=1AbC_d-9&export=download", Some("1AbC_d-9"))]
    #[case("https://drive.google.com/file/d/1AbC_d-9/view?usp=drivesdk", Some("1AbC_d-9"))]
    #[case("1AbC_d-9", Some("1AbC_d-9"))]
    #[case("https://example.com/no-id-here", None)]
    #[case("", None)]
    fn test_file_id_from_url(#[case] url: &str, #[case] expected: Option<&str>) {
        assert_eq!(file_id_from_url(url).as_deref(), expected);
    }

    #[test]
    fn test_folder_query() {
        assert_eq!(
            folder_query("root123", "acme-01"),
            "name = 'acme-01' and 'root123' in parents and \
             mimeType = 'application/vnd.google-apps.folder' and trashed = false"
        );
    }

    #[test]
    fn test_query_literal_escaping() {
        assert_eq!(escape_query_literal("o'brien"), "o\\'brien");
        assert_eq!(escape_query_literal("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_multipart_related_body_layout() {
        let metadata = json!({ "name": "1-x.jpg" });
        let body = multipart_related_body(&metadata, "image/jpeg", b"PIXELS");
        let text = String::from_utf8(body).expect("utf8 for ascii payload");

        assert!(text.starts_with(&format!("--{BOUNDARY}\r\nContent-Type: application/json")));
        assert!(text.contains(r#"{"name":"1-x.jpg"}"#));
        assert!(text.contains("Content-Type: image/jpeg\r\n\r\nPIXELS\r\n"));
        assert!(text.ends_with(&format!("--{BOUNDARY}--\r\n")));
    }

    #[test]
    fn test_resolve_url_builds_direct_link() {
        assert_eq!(direct_link("abc"), "https://drive.google.com/uc?id=abc&export=download");
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1), 2)
    }

    #[tokio::test]
    async fn test_publish_retries_share_without_cleanup() {
        let shares = AtomicU32::new(0);
        let cleanups = AtomicU32::new(0);

        publish(
            &fast_policy(),
            "file-1",
            || async {
                if shares.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StorageError::operation("permission rate limited"))
                } else {
                    Ok(())
                }
            },
            || async {
                cleanups.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .await
        .expect("shared on third attempt");

        assert_eq!(shares.load(Ordering::SeqCst), 3);
        assert_eq!(cleanups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_publish_removes_file_when_share_keeps_failing() {
        let shares = AtomicU32::new(0);
        let cleanups = AtomicU32::new(0);

        let err = publish(
            &fast_policy(),
            "file-1",
            || async {
                shares.fetch_add(1, Ordering::SeqCst);
                Err(StorageError::operation("permission denied"))
            },
            || async {
                cleanups.fetch_add(1, Ordering::SeqCst);
                Err(StorageError::operation("delete failed too"))
            },
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("permission denied"));
        assert_eq!(shares.load(Ordering::SeqCst), 3);
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalid_key_is_configuration_error() {
        let config = StorageConfig::new(StorageProvider::GoogleDrive {
            client_email: "svc@example.iam.gserviceaccount.com".to_string(),
            private_key: "not a pem".to_string(),
            root_folder_id: "root".to_string(),
        });
        assert!(matches!(
            DriveStorage::from_config(&config),
            Err(StorageError::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_root_folder_is_configuration_error() {
        let config = StorageConfig::new(StorageProvider::GoogleDrive {
            client_email: "svc@example.iam.gserviceaccount.com".to_string(),
            private_key: "not a pem".to_string(),
            root_folder_id: " ".to_string(),
        });
        let err = DriveStorage::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("root_folder_id"));
    }
}
