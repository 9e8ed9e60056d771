//! Cluster-aware cache client with configuration-endpoint auto-discovery.
//!
//! Applications address a distributed cache cluster through one stable
//! configuration endpoint instead of tracking node addresses themselves.
//! This crate provides:
//! - discovery of the current node set over the endpoint's text command
//!   channel;
//! - a lazily populated membership cache and a cached backend handle built
//!   from it;
//! - self-healing: any operation failure invalidates both caches together so
//!   the next operation re-discovers instead of targeting stale nodes.
//!
//! # Module Structure
//!
//! - [`types`]: endpoint/node representations and the client options block
//! - [`discovery`]: wire-protocol discovery client
//! - [`membership`]: membership cache
//! - [`backend`]: seam over the underlying key-value client library
//! - [`client`]: the self-healing [`ClusterClient`]
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use autodisco_cache::{ClientOptions, ClusterClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     autodisco_cache::init_logging();
//!
//!     let options = ClientOptions::new().with_behavior("tcp_nodelay", "true");
//!     let client = ClusterClient::new(
//!         &["cfg.example.com:11211"],
//!         options,
//!         Arc::new(MyBackendFactory::default()),
//!     )?;
//!
//!     client.set("greeting", b"hello", None).await?;
//!     let value = client.get("greeting").await?;
//!     println!("greeting = {:?}", value);
//!     Ok(())
//! }
//! ```
//!
//! No operation is retried inside a failing call; the caller sees the
//! original error and the *next* call self-heals against fresh membership.

pub mod backend;
pub mod client;
pub mod discovery;
mod error;
mod logging;
pub mod membership;
pub mod types;

pub use backend::{BackendFactory, CacheBackend};
pub use client::ClusterClient;
pub use discovery::{ConfigEndpointDiscovery, Discovery};
pub use error::{Error, Result};
pub use membership::MembershipCache;
pub use types::{
    CacheNode, ClientOptions, ConfigEndpoint, CONFIG_COMMAND_MIN_VERSION,
    DEFAULT_DISCOVERY_TIMEOUT, LEGACY_CONFIG_KEY,
};

pub fn init_logging() {
    logging::ensure_initialized();
}
