//! Network fetch seam.
//!
//! The agent never talks to the network directly. Everything upstream goes
//! through the [`Fetch`] trait so tests can swap in [`mock::MockFetcher`]
//! and production uses [`HttpFetcher`] backed by reqwest.

pub mod mock;

use async_trait::async_trait;
use reqwest::Method;
use thiserror::Error;
use url::Url;

use crate::response::CachedResponse;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("reading response body from {url} failed: {source}")]
    Body {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("no route to {url}")]
    Unreachable { url: Url },
}

/// An intercepted request, reduced to the parts that matter for caching:
/// the absolute URL and the method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
}

impl FetchRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url }
    }

    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
        }
    }
}

/// Trait for issuing upstream requests and capturing the full response.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Perform the request, buffering the complete response.
    ///
    /// An HTTP error status is a successful fetch; only transport-level
    /// failures (unreachable host, reset connection, aborted body) are errors.
    async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse, FetchError>;
}

/// Production fetcher backed by a reqwest client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse, FetchError> {
        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: request.url.clone(),
                source,
            })?;

        let status = response.status().as_u16();
        let mut headers = Vec::with_capacity(response.headers().len());
        for (name, value) in response.headers() {
            // Header values that are not valid UTF-8 are dropped
            if let Ok(value) = value.to_str() {
                headers.push((name.as_str().to_string(), value.to_string()));
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Body {
                url: request.url.clone(),
                source,
            })?
            .to_vec();

        Ok(CachedResponse::captured(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_constructor_uses_get_method() {
        let request = FetchRequest::get(Url::parse("https://example.com/").unwrap());
        assert_eq!(request.method, Method::GET);
    }

    #[test]
    fn test_fetch_error_messages_name_the_url() {
        let error = FetchError::Unreachable {
            url: Url::parse("https://example.com/feed").unwrap(),
        };
        assert_eq!(error.to_string(), "no route to https://example.com/feed");
    }
}
