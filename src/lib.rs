pub mod agent;
pub mod cache;
pub mod fetch;
pub mod host;
pub mod response;
pub mod util;

pub use agent::{
    ActivationReport, Agent, AgentConfig, AgentError, PrecacheManifest, Signal, SignalOutcome,
};
pub use cache::{CacheError, CacheManager, CacheStore};
pub use fetch::{Fetch, FetchError, FetchRequest, HttpFetcher};
pub use host::{HostConfig, HostError, HostState};
pub use response::CachedResponse;
