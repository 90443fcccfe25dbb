//! Google Drive v3 backend.
//!
//! Lists the files of one Drive folder and streams file contents with
//! `alt=media`. Folders are excluded by the listing query itself, so only
//! files reach the feed resolver.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{transfer_events, BackendEntry, BackendError, BoxFuture, ByteSource, StorageBackend};
use crate::identity::ArtifactId;

/// Default Google APIs endpoint.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com";

/// MIME type Drive uses for folders.
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Fields requested from the files.list endpoint.
const LIST_FIELDS: &str = "nextPageToken,files(id,name,size,mimeType)";

/// Maximum page size accepted by files.list.
const PAGE_SIZE: u32 = 1000;

/// Default timeout for listing requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection timeout for all requests in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 15;

/// Credential handed to the Drive client.
///
/// The backend attaches it to requests and never inspects or refreshes it.
#[derive(Clone, Default)]
pub enum DriveCredential {
    /// No credential; only publicly shared folders are readable.
    #[default]
    Anonymous,
    /// API key sent as the `key` query parameter.
    ApiKey(String),
    /// OAuth access token sent as a bearer token.
    BearerToken(String),
}

impl fmt::Debug for DriveCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::ApiKey(_) => write!(f, "ApiKey(<redacted>)"),
            Self::BearerToken(_) => write!(f, "BearerToken(<redacted>)"),
        }
    }
}

/// Google Drive folder backend.
#[derive(Debug, Clone)]
pub struct GoogleDriveBackend {
    client: Client,
    base_url: String,
    credential: DriveCredential,
    timeout: Duration,
}

impl GoogleDriveBackend {
    /// Create a backend against the public Drive API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(credential: DriveCredential) -> Result<Self, BackendError> {
        Self::with_timeout(credential, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a backend with a custom listing timeout.
    ///
    /// Downloads are not bounded by this timeout; large artifacts may take
    /// longer than any sensible listing deadline.
    pub fn with_timeout(credential: DriveCredential, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: DRIVE_API_BASE.to_string(),
            credential,
            timeout,
        })
    }

    /// Point the backend at a different API endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The API endpoint in use.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.base_url)
    }

    fn file_url(&self, id: &ArtifactId) -> String {
        format!("{}/drive/v3/files/{}", self.base_url, id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credential {
            DriveCredential::Anonymous => request,
            DriveCredential::ApiKey(key) => request.query(&[("key", key.as_str())]),
            DriveCredential::BearerToken(token) => request.bearer_auth(token),
        }
    }

    async fn list_page(&self, folder: &str, page_token: Option<&str>) -> Result<FileList, BackendError> {
        let query = folder_query(folder);
        let page_size = PAGE_SIZE.to_string();
        let mut params = vec![
            ("q", query.as_str()),
            ("fields", LIST_FIELDS),
            ("pageSize", page_size.as_str()),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let request = self
            .client
            .get(self.files_url())
            .query(&params)
            .timeout(self.timeout);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let response = check_status(response).await?;

        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(format!("failed to read listing: {}", e)))?;
        parse_file_list(&body)
    }

    async fn list_all(&self, folder: &str) -> Result<Vec<BackendEntry>, BackendError> {
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_page(folder, page_token.as_deref()).await?;
            debug!(
                folder = %folder,
                files = page.files.len(),
                has_more = page.next_page_token.is_some(),
                "Fetched Drive listing page"
            );
            entries.extend(page.files.into_iter().map(DriveFile::into_entry));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(entries)
    }

    async fn open_media(&self, id: &ArtifactId) -> Result<ByteSource, BackendError> {
        let request = self
            .client
            .get(self.file_url(id))
            .query(&[("alt", "media"), ("supportsAllDrives", "true")]);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let response = check_status(response).await?;

        Ok(transfer_events(response.bytes_stream()))
    }
}

impl StorageBackend for GoogleDriveBackend {
    fn name(&self) -> &str {
        "drive"
    }

    fn list_files<'a>(
        &'a self,
        container: &'a str,
    ) -> BoxFuture<'a, Result<Vec<BackendEntry>, BackendError>> {
        Box::pin(self.list_all(container))
    }

    fn open_read<'a>(&'a self, id: &'a ArtifactId) -> BoxFuture<'a, Result<ByteSource, BackendError>> {
        Box::pin(self.open_media(id))
    }
}

/// Build the files.list query selecting non-folder children of a folder.
fn folder_query(folder: &str) -> String {
    let escaped = folder.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "'{}' in parents and mimeType!='{}' and trashed=false",
        escaped, FOLDER_MIME_TYPE
    )
}

async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
    if status.as_u16() == 404 {
        return Err(BackendError::NotFound(message));
    }
    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}

/// One page of a files.list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    /// Drive encodes int64 fields as decimal strings.
    size: Option<String>,
    mime_type: Option<String>,
}

impl DriveFile {
    fn into_entry(self) -> BackendEntry {
        let size = self.size.as_deref().and_then(|s| match s.parse::<u64>() {
            Ok(size) => Some(size),
            Err(e) => {
                warn!(file = %self.name, size = %s, error = %e, "Ignoring unparsable Drive size");
                None
            }
        });
        let is_container = self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE);

        BackendEntry {
            name: self.name,
            id: ArtifactId::new(self.id),
            size,
            is_container,
        }
    }
}

fn parse_file_list(body: &str) -> Result<FileList, BackendError> {
    serde_json::from_str(body)
        .map_err(|e| BackendError::InvalidResponse(format!("malformed files.list response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TransferEvent;
    use futures::StreamExt;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer, credential: DriveCredential) -> GoogleDriveBackend {
        GoogleDriveBackend::new(credential)
            .unwrap()
            .with_base_url(server.uri())
    }

    #[test]
    fn test_folder_query() {
        assert_eq!(
            folder_query("abc123"),
            "'abc123' in parents and mimeType!='application/vnd.google-apps.folder' and trashed=false"
        );
    }

    #[test]
    fn test_folder_query_escapes_quotes() {
        assert!(folder_query("it's").starts_with("'it\\'s' in parents"));
    }

    #[test]
    fn test_parse_file_list() {
        let body = r#"{
            "nextPageToken": "tok",
            "files": [
                {"id": "f1", "name": "App-1.2.3.zip", "size": "1000", "mimeType": "application/zip"},
                {"id": "f2", "name": "Notes", "mimeType": "application/vnd.google-apps.document"},
                {"id": "d1", "name": "archive", "mimeType": "application/vnd.google-apps.folder"}
            ]
        }"#;

        let list = parse_file_list(body).unwrap();
        assert_eq!(list.next_page_token.as_deref(), Some("tok"));

        let entries: Vec<_> = list.files.into_iter().map(DriveFile::into_entry).collect();
        assert_eq!(entries[0], BackendEntry::file("App-1.2.3.zip", "f1", Some(1000)));
        assert_eq!(entries[1].size, None);
        assert!(!entries[1].is_container);
        assert!(entries[2].is_container);
    }

    #[test]
    fn test_parse_empty_listing() {
        let list = parse_file_list("{}").unwrap();
        assert!(list.files.is_empty());
        assert!(list.next_page_token.is_none());
    }

    #[test]
    fn test_unparsable_size_is_unknown() {
        let file = DriveFile {
            id: "f1".to_string(),
            name: "App-1.0.0.zip".to_string(),
            size: Some("lots".to_string()),
            mime_type: None,
        };
        assert_eq!(file.into_entry().size, None);
    }

    #[test]
    fn test_malformed_listing() {
        assert!(matches!(
            parse_file_list("not json"),
            Err(BackendError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_credential_debug_redacts() {
        let debug = format!("{:?}", DriveCredential::ApiKey("secret".to_string()));
        assert!(!debug.contains("secret"));
        let debug = format!("{:?}", DriveCredential::BearerToken("ya29.abc".to_string()));
        assert!(!debug.contains("ya29.abc"));
    }

    #[test]
    fn test_urls() {
        let backend = GoogleDriveBackend::new(DriveCredential::Anonymous)
            .unwrap()
            .with_base_url("http://localhost:8080/");
        assert_eq!(backend.base_url(), "http://localhost:8080");
        assert_eq!(backend.files_url(), "http://localhost:8080/drive/v3/files");
        assert_eq!(
            backend.file_url(&ArtifactId::new("f1")),
            "http://localhost:8080/drive/v3/files/f1"
        );
    }

    #[tokio::test]
    async fn test_listing_follows_page_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .and(query_param("q", folder_query("folder1")))
            .and(query_param("fields", LIST_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "nextPageToken": "page2",
                "files": [
                    {"id": "f1", "name": "App-1.0.0.zip", "size": "10", "mimeType": "application/zip"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .and(query_param("pageToken", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [
                    {"id": "f2", "name": "App-1.1.0.zip", "size": "20", "mimeType": "application/zip"}
                ]
            })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server, DriveCredential::Anonymous);
        let entries = backend.list_files("folder1").await.unwrap();

        assert_eq!(
            entries,
            vec![
                BackendEntry::file("App-1.0.0.zip", "f1", Some(10)),
                BackendEntry::file("App-1.1.0.zip", "f2", Some(20)),
            ]
        );
    }

    #[tokio::test]
    async fn test_api_key_sent_as_query_parameter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .and(query_param("key", "k-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": []})))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server, DriveCredential::ApiKey("k-123".to_string()));
        assert!(backend.list_files("folder1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bearer_token_sent_as_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .and(header("authorization", "Bearer ya29.token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": []})))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server, DriveCredential::BearerToken("ya29.token".to_string()));
        assert!(backend.list_files("folder1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .respond_with(ResponseTemplate::new(403).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let backend = backend_for(&server, DriveCredential::Anonymous);
        match backend.list_files("folder1").await {
            Err(BackendError::Status { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "rate limited");
            }
            other => panic!("Expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string("File not found"))
            .mount(&server)
            .await;

        let backend = backend_for(&server, DriveCredential::Anonymous);
        let result = backend.open_read(&ArtifactId::new("gone")).await;
        assert!(matches!(result, Err(BackendError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_media_download_streams_events() {
        let payload: Vec<u8> = (0..64u8).collect();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files/f1"))
            .and(query_param("alt", "media"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server, DriveCredential::Anonymous);
        let events: Vec<_> = backend
            .open_read(&ArtifactId::new("f1"))
            .await
            .unwrap()
            .collect()
            .await;

        let mut received = Vec::new();
        for event in &events[..events.len() - 1] {
            match event {
                TransferEvent::Downloading { chunk, .. } => received.extend_from_slice(chunk),
                other => panic!("Expected Downloading, got {other:?}"),
            }
        }
        assert_eq!(received, payload);
        assert!(matches!(
            events.last(),
            Some(TransferEvent::Completed { bytes_transferred: 64 })
        ));
    }
}
