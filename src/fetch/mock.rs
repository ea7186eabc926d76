//! Mock fetcher for deterministic testing
//!
//! Implements the Fetch trait over an in-memory route table instead of a
//! real network. Every request is captured for later verification, routes
//! can be changed mid-test to simulate a changing upstream, and individual
//! URLs can be marked as failing to simulate an unreachable network.
//!
//! # Example
//! ```no_run
//! use larder::fetch::mock::MockFetcher;
//! use larder::response::CachedResponse;
//! use url::Url;
//!
//! let url = Url::parse("https://example.com/index.html").unwrap();
//! let fetcher = MockFetcher::new()
//!     .with_route(url, CachedResponse::new(200, vec![], b"<html>".to_vec()));
//!
//! // Use fetcher in tests...
//! ```

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use crate::fetch::{Fetch, FetchError, FetchRequest};
use crate::response::CachedResponse;

/// Mock fetcher for testing
///
/// Answers requests from a fixed route table and never touches the network.
/// All requests are captured for later assertions.
#[derive(Default)]
pub struct MockFetcher {
    /// URL to canned response
    routes: Mutex<HashMap<Url, CachedResponse>>,
    /// URLs that fail with a transport error
    failing: Mutex<HashSet<Url>>,
    /// Captured requests for verification
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a canned response for a URL (builder style)
    pub fn with_route(self, url: Url, response: CachedResponse) -> Self {
        self.routes.lock().insert(url, response);
        self
    }

    /// Mark a URL as failing with a transport error (builder style)
    pub fn with_failure(self, url: Url) -> Self {
        self.failing.lock().insert(url);
        self
    }

    /// Add or replace a canned response after construction.
    /// Clears any injected failure for the URL.
    pub fn route(&self, url: Url, response: CachedResponse) {
        self.failing.lock().remove(&url);
        self.routes.lock().insert(url, response);
    }

    /// Mark a URL as failing after construction
    pub fn fail(&self, url: Url) {
        self.failing.lock().insert(url);
    }

    /// Get all captured requests for assertions
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().clone()
    }

    /// Total number of requests issued
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of requests issued for one URL
    pub fn requests_for(&self, url: &Url) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| &request.url == url)
            .count()
    }

    /// Reset captured requests
    pub fn reset(&self) {
        self.requests.lock().clear();
    }
}

#[async_trait]
impl Fetch for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse, FetchError> {
        // Capture the request for later assertions
        self.requests.lock().push(request.clone());

        if self.failing.lock().contains(&request.url) {
            return Err(FetchError::Unreachable {
                url: request.url.clone(),
            });
        }

        match self.routes.lock().get(&request.url) {
            Some(response) => Ok(response.clone()),
            None => Err(FetchError::Unreachable {
                url: request.url.clone(),
            }),
        }
    }
}
