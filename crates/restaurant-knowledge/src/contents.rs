//! Client for a Git host's repository contents API.
//!
//! Files are read with `GET /repos/{owner}/{repo}/contents/{path}` and written
//! with `PUT` on the same URL. Content travels base64-encoded in both
//! directions. Every write of an existing file must carry the blob `sha` it
//! replaces; the host rejects a stale `sha` with `409 Conflict`, which is the
//! only concurrency control there is.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::error::{Error, Result};

/// Media type the contents API expects.
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

/// Where a file lives on the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Path of the file inside the repository.
    pub path: String,
}

impl FileLocation {
    /// Create a new file location.
    #[must_use]
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.owner, self.repo, self.path)
    }
}

/// A decoded remote file and the revision it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile<T> {
    /// Decoded content.
    pub content: T,
    /// Blob sha of the file; `None` when the file does not exist yet.
    pub sha: Option<String>,
}

/// Authenticated client for the contents API.
#[derive(Debug, Clone)]
pub struct ContentsClient {
    http: reqwest::Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: Option<PutContent>,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    sha: String,
}

impl ContentsClient {
    /// Create a client for the API rooted at `api_base`.
    ///
    /// `timeout` of `None` leaves requests unbounded.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));
        let mut auth = HeaderValue::from_str(&format!("token {}", token.into()))
            .map_err(|e| Error::validation(format!("invalid access token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("restaurant-knowledge/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn file_url(&self, location: &FileLocation) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base,
            location.owner,
            location.repo,
            location.path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, location: &FileLocation) -> RequestBuilder {
        self.http.request(method, self.file_url(location))
    }

    /// Read a file holding a JSON array.
    ///
    /// A missing file reads as an empty array with no sha. An empty or
    /// whitespace-only file also reads as an empty array.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, on any non-success status other
    /// than 404, or when the content cannot be decoded.
    #[instrument(skip(self), fields(file = %location))]
    pub async fn get_array<T: DeserializeOwned>(
        &self,
        location: &FileLocation,
    ) -> Result<RemoteFile<Vec<T>>> {
        let response = self.request(Method::GET, location).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!("remote file does not exist yet");
            return Ok(RemoteFile {
                content: Vec::new(),
                sha: None,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, "contents API read failed");
            return Err(Error::RemoteStatus {
                status: status.as_u16(),
                body,
            });
        }

        let file: ContentsResponse = response.json().await?;
        if file.encoding.as_deref().is_some_and(|e| e != "base64") {
            return Err(Error::internal(format!(
                "{location} is served with unsupported encoding {:?}",
                file.encoding
            )));
        }

        Ok(RemoteFile {
            content: decode_content(&file.content)?,
            sha: Some(file.sha),
        })
    }

    /// Write `items` as the new content of the file.
    ///
    /// `sha` must be the revision the caller read; `None` creates the file.
    /// Returns the sha of the written blob when the host reports it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] when the host rejects `sha` as stale, and
    /// a transport or status error for every other failure.
    #[instrument(skip(self, items), fields(file = %location, items = items.len()))]
    pub async fn put_array<T: Serialize>(
        &self,
        location: &FileLocation,
        items: &[T],
        sha: Option<&str>,
        message: &str,
    ) -> Result<Option<String>> {
        let body = PutRequest {
            message,
            content: encode_content(items)?,
            sha: sha.filter(|s| !s.is_empty()),
        };
        let creating = body.sha.is_none();
        let response = self.request(Method::PUT, location).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, "contents API write failed");
            // 422 without a sha: the file was created after we saw it missing.
            let created_meanwhile = creating && status == StatusCode::UNPROCESSABLE_ENTITY;
            if status == StatusCode::CONFLICT || created_meanwhile {
                return Err(Error::conflict(location.to_string()));
            }
            return Err(Error::RemoteStatus {
                status: status.as_u16(),
                body,
            });
        }

        let written: PutResponse = response.json().await?;
        Ok(written.content.map(|c| c.sha))
    }
}

/// Serialize `items` as pretty JSON and base64-encode the UTF-8 bytes.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_content<T: Serialize>(items: &[T]) -> Result<String> {
    let text = serde_json::to_string_pretty(items)?;
    Ok(BASE64.encode(text.as_bytes()))
}

/// Decode base64 file content into a JSON array.
///
/// Line breaks inside the base64 text are ignored. Blank content decodes to
/// an empty array.
///
/// # Errors
///
/// Returns an error on invalid base64, invalid UTF-8, or invalid JSON.
pub fn decode_content<T: DeserializeOwned>(encoded: &str) -> Result<Vec<T>> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let text = String::from_utf8(BASE64.decode(compact)?)?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&text)?)
}
