//! The offline-caching agent: lifecycle signals and cache-first interception.
//!
//! An [`Agent`] is one immutable deployment of the caching policy. It reacts
//! to three signals delivered by the hosting harness:
//!
//! - [`Signal::Install`]: fetch every manifest URL and store the responses in
//!   this version's static store. All-or-nothing: any failure fails the install.
//! - [`Signal::Activate`]: delete every store that does not belong to this
//!   version, then make sure this version's stores exist.
//! - [`Signal::Fetch`]: answer from cache when any store holds the URL,
//!   otherwise fetch upstream, return the response, and file a copy in the
//!   dynamic store.
//!
//! The agent keeps no mutable state of its own. Everything lives in the cache
//! database, so a new version is deployed by constructing a new agent and
//! running its lifecycle against the same [`CacheManager`].

mod config;
mod error;
mod manifest;

pub use config::AgentConfig;
pub use error::AgentError;
pub use manifest::PrecacheManifest;

use std::sync::Arc;

use futures::future::try_join_all;

use crate::cache::CacheManager;
use crate::fetch::{Fetch, FetchRequest};
use crate::response::CachedResponse;

/// Signals delivered to the agent by its host.
#[derive(Debug)]
pub enum Signal {
    /// A new agent version has been registered; populate the static store.
    Install,
    /// This version is taking control; sweep stores of other versions.
    Activate,
    /// A client request was intercepted.
    Fetch(FetchRequest),
}

/// What handling a signal produced.
#[derive(Debug)]
pub enum SignalOutcome {
    Installed,
    Activated(ActivationReport),
    Response(CachedResponse),
}

/// Names of the stale stores removed during activation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    pub removed: Vec<String>,
}

/// One deployed version of the caching agent.
pub struct Agent {
    config: AgentConfig,
    caches: CacheManager,
    fetcher: Arc<dyn Fetch>,
}

impl Agent {
    pub fn new(config: AgentConfig, caches: CacheManager, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            config,
            caches,
            fetcher,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Dispatch table: route a signal to its handler and await completion.
    ///
    /// The returned future is the signal's whole extent. A lifecycle
    /// transition has not happened until the future resolves, and the host
    /// must not consider the agent installed or active before then.
    pub async fn handle(&self, signal: Signal) -> Result<SignalOutcome, AgentError> {
        match signal {
            Signal::Install => {
                self.install().await?;
                Ok(SignalOutcome::Installed)
            }
            Signal::Activate => Ok(SignalOutcome::Activated(self.activate().await?)),
            Signal::Fetch(request) => {
                Ok(SignalOutcome::Response(self.intercept(&request).await?))
            }
        }
    }

    /// Fetch every manifest URL and store the responses in the static store.
    ///
    /// The fetches run concurrently and the first transport error or
    /// non-success status fails the install as a whole. Entries stored before
    /// the failure remain; a later successful install overwrites them key by
    /// key, so a failed attempt never leaves mixed-version state behind.
    pub async fn install(&self) -> Result<(), AgentError> {
        tracing::info!(
            store = %self.config.static_store,
            urls = self.config.precache.len(),
            "Installing: precaching app shell"
        );

        let store = self.caches.open_store(&self.config.static_store).await?;

        let precache = self.config.precache.urls().iter().map(|url| {
            let store = store.clone();
            async move {
                let request = FetchRequest::get(url.clone());
                let response = self.fetcher.fetch(&request).await?;
                if !response.is_success() {
                    return Err(AgentError::Precache {
                        url: url.clone(),
                        status: response.status,
                    });
                }
                store.put(url, &response).await?;
                Ok::<(), AgentError>(())
            }
        });
        try_join_all(precache).await?;

        tracing::info!(store = %self.config.static_store, "Install complete");
        Ok(())
    }

    /// Sweep stores of other versions, then ensure this version's stores exist.
    ///
    /// Enumeration completes before any deletion starts, so stores created
    /// concurrently with the sweep are not considered. A store that fails to
    /// delete is logged and left for the next activation; the transition
    /// itself still succeeds.
    pub async fn activate(&self) -> Result<ActivationReport, AgentError> {
        let names = self.caches.store_names().await?;
        tracing::info!(stores = names.len(), "Activating: sweeping stale cache stores");

        let mut report = ActivationReport::default();
        for name in names {
            if self.config.is_current(&name) {
                continue;
            }
            match self.caches.delete_store(&name).await {
                Ok(true) => {
                    tracing::info!(store = %name, "Removed stale cache store");
                    report.removed.push(name);
                }
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!(
                        store = %name,
                        error = %error,
                        "Failed to remove stale cache store"
                    );
                }
            }
        }

        // First open creates them; install normally created the static store already
        self.caches.open_store(&self.config.static_store).await?;
        self.caches.open_store(&self.config.dynamic_store).await?;

        Ok(report)
    }

    /// Answer an intercepted request: cache first, then network.
    ///
    /// On a miss the upstream response goes back to the caller and a copy is
    /// filed in the dynamic store under the request URL. Responses are stored
    /// as received, error statuses included. A failed write to the dynamic
    /// store never fails the request itself.
    pub async fn intercept(&self, request: &FetchRequest) -> Result<CachedResponse, AgentError> {
        match self.caches.match_url(&request.url).await {
            Ok(Some(response)) => {
                tracing::debug!(url = %request.url, "Cache hit");
                return Ok(response);
            }
            Ok(None) => {}
            // A failed lookup counts as a miss; the request still goes upstream
            Err(error) => {
                tracing::warn!(url = %request.url, error = %error, "Cache lookup failed");
            }
        }

        tracing::debug!(url = %request.url, "Cache miss, fetching upstream");
        let response = self.fetcher.fetch(request).await?;
        self.populate_dynamic(request, response.clone()).await;
        Ok(response)
    }

    async fn populate_dynamic(&self, request: &FetchRequest, response: CachedResponse) {
        let stored = async {
            let store = self.caches.open_store(&self.config.dynamic_store).await?;
            store.put(&request.url, &response).await
        }
        .await;

        if let Err(error) = stored {
            tracing::warn!(
                url = %request.url,
                error = %error,
                "Failed to store response copy in dynamic store"
            );
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("static_store", &self.config.static_store)
            .field("dynamic_store", &self.config.dynamic_store)
            .finish()
    }
}
