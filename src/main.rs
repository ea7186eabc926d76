use std::sync::Arc;

use anyhow::Result;
use larder::{
    host, util, Agent, AgentConfig, CacheManager, Fetch, HostConfig, HostState, HttpFetcher,
    PrecacheManifest,
};
use url::Url;

/// Cache version. Bumping this renames both stores, which makes every store
/// of the previous version stale and swept at the next activation.
const CACHE_VERSION: u32 = 3;

/// Prefix for the version-tagged store names.
const CACHE_NAME: &str = "larder";

/// Origin the host fronts. Intercepted paths resolve against this.
const UPSTREAM_ORIGIN: &str = "http://127.0.0.1:8000/";

/// The app shell: everything precached at install. Entries are resolved
/// against the upstream origin, so same-origin paths and full cross-origin
/// URLs can be listed side by side.
const APP_SHELL: &[&str] = &[
    "/",
    "/index.html",
    "/js/app.js",
    "/js/feed.js",
    "/css/app.css",
    "/css/feed.css",
    "/images/splash.jpg",
    "https://fonts.googleapis.com/css?family=Roboto:400,700",
    "https://fonts.googleapis.com/icon?family=Material+Icons",
];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    util::init_data_dir(None);

    let origin = Url::parse(UPSTREAM_ORIGIN)?;
    let manifest = PrecacheManifest::resolve(&origin, APP_SHELL)?;
    let config = AgentConfig::versioned(CACHE_NAME, CACHE_VERSION, manifest);

    let caches = CacheManager::open_default()?;
    let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new());
    let state = HostState::new(origin, fetcher.clone());

    let agent = Agent::new(config, caches, fetcher);
    match state.deploy(agent).await {
        Ok(report) => {
            tracing::info!(
                version = CACHE_VERSION,
                removed = report.removed.len(),
                "Agent deployed"
            );
        }
        Err(error) => {
            // The host keeps serving passthrough; a restart retries the deploy
            tracing::error!(error = %error, "Deploy failed, serving without interception");
        }
    }

    host::run_server(state, HostConfig::default()).await
}
