//! Error types for agent lifecycle and interception

use thiserror::Error;
use url::Url;

use crate::cache::CacheError;
use crate::fetch::FetchError;

#[derive(Error, Debug)]
pub enum AgentError {
    /// A manifest URL answered with a non-success status during install.
    /// Error pages never become part of the shell; the install fails instead.
    #[error("precache fetch for {url} returned status {status}")]
    Precache { url: Url, status: u16 },

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("cache store failure: {0}")]
    Cache(#[from] CacheError),
}
