//! HTTP request/response types and the client seam providers talk through.
//!
//! Providers never own a client. The caller injects one per update, which
//! keeps timeouts, TLS and connection pooling a deployment concern and
//! lets tests substitute a recording double.

mod client;

pub use client::ReqwestClient;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for HTTP transport failures.
///
/// Describes what went wrong without dictating recovery strategy.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network connection failed (DNS resolution, refused, reset, TLS).
    #[error("connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server did not respond within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The request could not be constructed from the given URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// An HTTP request to be sent.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: http::Method,
    /// Target URL
    pub url: url::Url,
    /// HTTP headers to send
    pub headers: http::HeaderMap,
    /// Optional request body
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request with no headers and no body.
    #[must_use]
    pub fn new(method: http::Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: http::HeaderMap::new(),
            body: None,
        }
    }

    /// Creates a GET request to the given URL.
    #[must_use]
    pub fn get(url: url::Url) -> Self {
        Self::new(http::Method::GET, url)
    }

    /// Creates a POST request to the given URL.
    #[must_use]
    pub fn post(url: url::Url) -> Self {
        Self::new(http::Method::POST, url)
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets a header, replacing any previous value under the same name.
    #[must_use]
    pub fn with_header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns the decoded value of a query parameter, if present.
    ///
    /// Request-inspection helper for clients and test doubles that need to
    /// look at what a provider is about to send; providers build their URLs
    /// with `url::Url::query_pairs_mut` and never read them back.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// An HTTP response with a fully buffered body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: http::StatusCode,
    /// Response headers
    pub headers: http::HeaderMap,
    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a new HTTP response.
    #[must_use]
    pub const fn new(status: http::StatusCode, headers: http::HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Creates a response with no headers.
    #[must_use]
    pub fn with_status(status: http::StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self::new(status, http::HeaderMap::new(), body.into())
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Trait for making HTTP requests.
///
/// Implementations must be cancellation-safe: dropping the returned future
/// abandons the request.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends an HTTP request and returns the response.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] when the request never produced a response.
    async fn request(&self, req: HttpRequest) -> Result<HttpResponse, HttpError>;
}
