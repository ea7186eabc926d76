//! Hosting harness: the stand-in for the platform that owns the agent.
//!
//! The host registers agent versions, drives their lifecycle, and delivers
//! intercepted client requests to whichever version is in control.

mod error;
mod server;

pub use error::HostError;
pub use server::{run_server, HostConfig, HostState};
