//! Resource fetching model and the network seam.
//!
//! This module defines the request/response types shared by the cache
//! engine and the `ResourceFetcher` trait that abstracts the network,
//! so strategy logic can be exercised against a scripted fetcher.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HTTP request timeout in seconds.
/// 30s allows for slow CDN responses while failing fast enough offline.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Status code used for the synthesized "request timeout" marker.
const TIMEOUT_MARKER_STATUS: u16 = 408;

// ============================================================================
// Request model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Get,
    Head,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
        }
    }
}

/// What kind of resource a request is for, as a browser would tag it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    Document,
    Script,
    Style,
    Image,
    Video,
    Font,
    Other,
}

impl Destination {
    /// Guess a destination from the path's file extension. Used by callers
    /// that have no browser to tag requests for them.
    pub fn guess(path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path);
        let ext = match name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return Destination::Document,
        };
        match ext.as_str() {
            "html" | "htm" => Destination::Document,
            "js" | "mjs" => Destination::Script,
            "css" => Destination::Style,
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "ico" => Destination::Image,
            "mp4" | "webm" | "mov" => Destination::Video,
            "woff" | "woff2" | "ttf" | "otf" => Destination::Font,
            _ => Destination::Other,
        }
    }

    pub fn is_navigation(&self) -> bool {
        matches!(self, Destination::Document)
    }
}

/// Request mode. `NoCors` accepts cross-origin responses without content
/// inspection and yields opaque results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchMode {
    Cors,
    NoCors,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub url: String,
    pub method: Method,
    pub destination: Destination,
    pub mode: FetchMode,
}

impl ResourceRequest {
    pub fn get(url: impl Into<String>, destination: Destination) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            destination,
            mode: FetchMode::Cors,
        }
    }

    /// A top-level document (navigation) request.
    pub fn navigation(url: impl Into<String>) -> Self {
        Self::get(url, Destination::Document)
    }

    pub fn with_mode(mut self, mode: FetchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Normalized cache key: method plus URL with the fragment stripped.
    /// Query strings are significant; fragments never reach the server.
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method.as_str(), strip_fragment(&self.url))
    }

    pub fn path(&self) -> &str {
        url_path(&self.url)
    }

    pub fn origin(&self) -> &str {
        url_origin(&self.url)
    }
}

// ============================================================================
// Response model
// ============================================================================

/// How a response body relates to its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
    /// Same-origin response with inspectable status and headers.
    Basic,
    /// Cross-origin no-cors result: status reads as 0, headers are hidden,
    /// the body is cached as an undifferentiated blob.
    Opaque,
    /// Generated locally, never touched the network.
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    pub kind: ResponseKind,
}

impl FetchedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The explicit "request timeout" failure marker returned instead of an
    /// error when neither network nor cache can satisfy a request.
    pub fn timeout_marker() -> Self {
        Self {
            status: TIMEOUT_MARKER_STATUS,
            headers: BTreeMap::new(),
            body: Vec::new(),
            kind: ResponseKind::Synthetic,
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("resource unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// Fetcher seam
// ============================================================================

/// Network abstraction the cache strategies run against.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, request: &ResourceRequest) -> Result<FetchedResponse, FetchError>;
}

/// Reqwest-backed fetcher.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, request: &ResourceRequest) -> Result<FetchedResponse, FetchError> {
        let url = strip_fragment(&request.url);
        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Head => self.client.head(url),
            Method::Post => self.client.post(url),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();

        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }

        let body = response.bytes().await?.to_vec();

        // No-cors results are opaque: status and headers are not observable,
        // only the body blob is retained for the cache.
        if request.mode == FetchMode::NoCors {
            return Ok(FetchedResponse {
                status: 0,
                headers: BTreeMap::new(),
                body,
                kind: ResponseKind::Opaque,
            });
        }

        Ok(FetchedResponse {
            status,
            headers,
            body,
            kind: ResponseKind::Basic,
        })
    }
}

// ============================================================================
// URL helpers
// ============================================================================

/// URL with any fragment removed.
pub fn strip_fragment(url: &str) -> &str {
    match url.find('#') {
        Some(idx) => &url[..idx],
        None => url,
    }
}

/// The scheme://host[:port] prefix of an absolute URL.
pub fn url_origin(url: &str) -> &str {
    let url = strip_fragment(url);
    let after_scheme = match url.find("://") {
        Some(idx) => idx + 3,
        None => return url,
    };
    match url[after_scheme..].find('/') {
        Some(idx) => &url[..after_scheme + idx],
        None => url,
    }
}

/// The path component of an absolute URL, without query or fragment.
pub fn url_path(url: &str) -> &str {
    let url = strip_fragment(url);
    let url = match url.find('?') {
        Some(idx) => &url[..idx],
        None => url,
    };
    let after_scheme = match url.find("://") {
        Some(idx) => idx + 3,
        None => return url,
    };
    match url[after_scheme..].find('/') {
        Some(idx) => &url[after_scheme + idx..],
        None => "/",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_strips_fragment() {
        let request = ResourceRequest::get("https://app.example/page#section", Destination::Other);
        assert_eq!(request.cache_key(), "GET https://app.example/page");
    }

    #[test]
    fn test_cache_key_distinguishes_method() {
        let get = ResourceRequest::get("https://app.example/api/items", Destination::Other);
        let mut head = get.clone();
        head.method = Method::Head;
        assert_ne!(get.cache_key(), head.cache_key());
    }

    #[test]
    fn test_url_origin() {
        assert_eq!(
            url_origin("https://cdn.jsdelivr.net/gh/lib/build/lib.js"),
            "https://cdn.jsdelivr.net"
        );
        assert_eq!(url_origin("https://app.example"), "https://app.example");
        assert_eq!(url_origin("https://app.example:8443/x"), "https://app.example:8443");
    }

    #[test]
    fn test_url_path() {
        assert_eq!(url_path("https://app.example/api/points?limit=5"), "/api/points");
        assert_eq!(url_path("https://app.example"), "/");
        assert_eq!(url_path("https://app.example/js/app.js#x"), "/js/app.js");
    }

    #[test]
    fn test_destination_guess() {
        assert_eq!(Destination::guess("/index.html"), Destination::Document);
        assert_eq!(Destination::guess("/"), Destination::Document);
        assert_eq!(Destination::guess("/js/app.js"), Destination::Script);
        assert_eq!(Destination::guess("/css/styles.css"), Destination::Style);
        assert_eq!(Destination::guess("/icons/icon-192x192.png"), Destination::Image);
        assert_eq!(Destination::guess("/media/intro.mp4"), Destination::Video);
        assert_eq!(Destination::guess("/fonts/inter.woff2"), Destination::Font);
        assert_eq!(Destination::guess("/manifest.json"), Destination::Other);
    }

    #[test]
    fn test_timeout_marker_is_synthetic() {
        let marker = FetchedResponse::timeout_marker();
        assert_eq!(marker.status, 408);
        assert_eq!(marker.kind, ResponseKind::Synthetic);
        assert!(!marker.is_success());
        assert!(marker.body.is_empty());
    }
}
