//! Precache manifest: the ordered list of URLs fetched at install time.

use url::Url;

/// The app shell: every URL the agent fetches and stores during install.
///
/// Entries are absolute URLs. Built from a compiled-in list of references
/// resolved against the deployment origin, so same-origin paths and full
/// cross-origin URLs mix freely in one manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecacheManifest {
    urls: Vec<Url>,
}

impl PrecacheManifest {
    /// Resolve a list of URL references against the origin.
    ///
    /// Relative references ("/", "/css/app.css") resolve to the origin;
    /// absolute references (a fonts CDN) pass through unchanged.
    pub fn resolve(origin: &Url, entries: &[&str]) -> Result<Self, url::ParseError> {
        let urls = entries
            .iter()
            .map(|entry| origin.join(entry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { urls })
    }

    /// Build a manifest from already-absolute URLs.
    pub fn from_urls(urls: Vec<Url>) -> Self {
        Self { urls }
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
