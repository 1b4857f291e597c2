//! HTTP drive client
//!
//! Talks to the Drive v2 REST surface with a bearer token.
//! Metadata calls go to `api_base`, content uploads to `upload_base`
//! as `multipart/related` bodies (JSON part + media part).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::query::Query;
use super::types::{Descriptor, Media, Metadata};
use super::DriveApi;
use crate::auth::TokenSource;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v2";
pub const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v2";

/// Endpoint and timeout settings
#[derive(Debug, Clone)]
pub struct HttpDriveConfig {
    pub api_base: String,
    pub upload_base: String,
    pub timeout: Duration,
}

impl Default for HttpDriveConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            upload_base: DEFAULT_UPLOAD_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// `files.list` response page
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    items: Vec<Descriptor>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Append a page to `items` and return the token for the next request,
/// or `None` once the listing is complete or `cap` is reached
fn merge_page(items: &mut Vec<Descriptor>, page: FileList, cap: Option<u32>) -> Option<String> {
    items.extend(page.items);
    if let Some(cap) = cap.and_then(|c| usize::try_from(c).ok()) {
        if items.len() >= cap {
            items.truncate(cap);
            return None;
        }
    }
    page.next_page_token.filter(|token| !token.is_empty())
}

/// Drive client over HTTPS
pub struct HttpDriveClient {
    client: reqwest::Client,
    config: HttpDriveConfig,
    tokens: Arc<dyn TokenSource>,
}

impl HttpDriveClient {
    pub fn new(config: HttpDriveConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {e}"))?;
        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    fn files_url(&self, suffix: &str) -> String {
        format!("{}/files{suffix}", self.config.api_base.trim_end_matches('/'))
    }

    fn upload_url(&self, suffix: &str) -> String {
        format!("{}/files{suffix}", self.config.upload_base.trim_end_matches('/'))
    }

    /// Attach the bearer token, send, and fail on non-success status
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.tokens.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| anyhow!("HTTP request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let url = response.url().clone();
            let body = response.text().await.unwrap_or_default();
            bail!("HTTP {status} for {url}: {body}");
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| anyhow!("Failed to decode response: {e}"))
    }

    /// Metadata-only call, or a multipart upload when media is present
    async fn write_call(
        &self,
        method: Method,
        suffix: &str,
        metadata: &Metadata,
        media: Option<Media>,
    ) -> Result<Descriptor> {
        let request = match media {
            None => self.client.request(method, self.files_url(suffix)).json(metadata),
            Some(media) => {
                let boundary = format!("drivefs{:016x}", rand::random::<u64>());
                let body = multipart_body(&boundary, metadata, &media)?;
                self.client
                    .request(method, self.upload_url(suffix))
                    .query(&[("uploadType", "multipart")])
                    .header(
                        reqwest::header::CONTENT_TYPE,
                        format!("multipart/related; boundary={boundary}"),
                    )
                    .body(body)
            }
        };
        self.send_json(request).await
    }
}

/// Build a `multipart/related` upload body
fn multipart_body(boundary: &str, metadata: &Metadata, media: &Media) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(metadata)?;
    let mut body = Vec::with_capacity(json.len() + media.data.len() + 256);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(&json);
    body.extend_from_slice(
        format!("\r\n--{boundary}\r\nContent-Type: {}\r\n\r\n", media.mime_type).as_bytes(),
    );
    body.extend_from_slice(&media.data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    Ok(body)
}

#[async_trait]
impl DriveApi for HttpDriveClient {
    async fn list(&self, query: &Query) -> Result<Vec<Descriptor>> {
        let mut params = vec![("q", query.to_string())];
        if let Some(max) = query.max_results {
            params.push(("maxResults", max.to_string()));
        }

        let mut items = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut request = self.client.get(self.files_url("")).query(&params);
            if let Some(token) = &token {
                request = request.query(&[("pageToken", token)]);
            }
            let page: FileList = self.send_json(request).await?;
            token = merge_page(&mut items, page, query.max_results);
            if token.is_none() {
                break;
            }
            tracing::debug!(fetched = items.len(), "Fetching next listing page");
        }
        Ok(items)
    }

    async fn get(&self, id: &str) -> Result<Descriptor> {
        let request = self.client.get(self.files_url(&format!("/{id}")));
        self.send_json(request).await
    }

    async fn get_media(&self, id: &str) -> Result<Vec<u8>> {
        let request = self
            .client
            .get(self.files_url(&format!("/{id}")))
            .query(&[("alt", "media")]);
        let bytes = self
            .send(request)
            .await?
            .bytes()
            .await
            .map_err(|e| anyhow!("Failed to read response: {e}"))?;
        Ok(bytes.to_vec())
    }

    async fn insert(&self, metadata: &Metadata, media: Option<Media>) -> Result<Descriptor> {
        self.write_call(Method::POST, "", metadata, media).await
    }

    async fn update(
        &self,
        id: &str,
        metadata: &Metadata,
        media: Option<Media>,
    ) -> Result<Descriptor> {
        self.write_call(Method::PUT, &format!("/{id}"), metadata, media)
            .await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let request = self.client.delete(self.files_url(&format!("/{id}")));
        self.send(request).await?;
        Ok(())
    }

    async fn copy(&self, id: &str, metadata: &Metadata) -> Result<Descriptor> {
        let request = self
            .client
            .post(self.files_url(&format!("/{id}/copy")))
            .json(metadata);
        self.send_json(request).await
    }

    async fn touch(&self, id: &str) -> Result<Descriptor> {
        let request = self.client.post(self.files_url(&format!("/{id}/touch")));
        self.send_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;

    #[test]
    fn multipart_layout() {
        let metadata = Metadata::titled("a.txt").with_mime("text/plain");
        let media = Media::new("text/plain", "hello");
        let body = multipart_body("XYZ", &metadata, &media).unwrap();
        let body = String::from_utf8(body).unwrap();
        assert!(body.starts_with("--XYZ\r\nContent-Type: application/json"));
        assert!(body.contains(r#"{"title":"a.txt","mimeType":"text/plain"}"#));
        assert!(body.contains("\r\n--XYZ\r\nContent-Type: text/plain\r\n\r\nhello"));
        assert!(body.ends_with("\r\n--XYZ--\r\n"));
    }

    fn page(titles: &[&str], next: Option<&str>) -> FileList {
        FileList {
            items: titles
                .iter()
                .map(|title| {
                    serde_json::from_value(serde_json::json!({
                        "id": format!("id-{title}"),
                        "title": title,
                        "mimeType": "text/plain",
                        "createdDate": "2024-01-01T00:00:00Z",
                        "modifiedDate": "2024-01-01T00:00:00Z"
                    }))
                    .unwrap()
                })
                .collect(),
            next_page_token: next.map(String::from),
        }
    }

    #[test]
    fn listing_follows_page_tokens() {
        let mut items = Vec::new();
        let next = merge_page(&mut items, page(&["a", "b"], Some("p2")), None);
        assert_eq!(next.as_deref(), Some("p2"));
        let next = merge_page(&mut items, page(&["c"], None), None);
        assert!(next.is_none());
        let titles: Vec<_> = items.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn listing_stops_at_cap() {
        let mut items = Vec::new();
        let next = merge_page(&mut items, page(&["a", "b", "c"], Some("p2")), Some(2));
        assert!(next.is_none());
        assert_eq!(items.len(), 2);

        let mut items = Vec::new();
        assert!(merge_page(&mut items, page(&["a"], Some("")), None).is_none());
    }

    #[test]
    fn page_token_is_read_from_wire() {
        let list: FileList =
            serde_json::from_str(r#"{"items": [], "nextPageToken": "abc"}"#).unwrap();
        assert_eq!(list.next_page_token.as_deref(), Some("abc"));
    }

    #[test]
    fn urls_ignore_trailing_slash() {
        let config = HttpDriveConfig {
            api_base: "http://localhost:1234/drive/v2/".to_string(),
            upload_base: "http://localhost:1234/upload/drive/v2".to_string(),
            timeout: Duration::from_secs(1),
        };
        let client = HttpDriveClient::new(config, Arc::new(StaticToken::new("t"))).unwrap();
        assert_eq!(client.files_url("/abc/copy"), "http://localhost:1234/drive/v2/files/abc/copy");
        assert_eq!(client.upload_url(""), "http://localhost:1234/upload/drive/v2/files");
    }
}
