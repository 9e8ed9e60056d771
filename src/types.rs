//! Common types for the auto-discovery cache client.
//!
//! This module contains the configuration endpoint and node representations
//! plus the client options block shared across the crate.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default bound on the discovery network exchange.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// First engine version that serves `config get cluster` directly.
/// Older engines publish the same payload under [`LEGACY_CONFIG_KEY`].
pub const CONFIG_COMMAND_MIN_VERSION: (u64, u64, u64) = (1, 4, 14);

/// Well-known pseudo-key holding the cluster configuration on engines that
/// predate the dedicated config command.
pub const LEGACY_CONFIG_KEY: &str = "AmazonElastiCache:cluster";

/// The single stable entry point of the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEndpoint {
    pub host: String,
    pub port: u16,
}

impl ConfigEndpoint {
    /// Parse a `host:port` string.
    pub fn parse(server: &str) -> Result<Self> {
        let server = server.trim();
        let parts: Vec<&str> = server.split(':').collect();
        if parts.len() != 2 || parts[0].is_empty() {
            return Err(Error::Config(format!(
                "configuration endpoint must be in host:port form, got {server:?}"
            )));
        }
        let port = parts[1].parse::<u16>().map_err(|_| {
            Error::Config(format!(
                "configuration endpoint has an invalid port: {server:?}"
            ))
        })?;
        Ok(Self {
            host: parts[0].to_string(),
            port,
        })
    }

    /// Validate a server list from the host framework. The cluster exposes
    /// exactly one configuration endpoint, so any other count is rejected.
    pub fn from_servers<S: AsRef<str>>(servers: &[S]) -> Result<Self> {
        match servers {
            [server] => Self::parse(server.as_ref()),
            _ => Err(Error::Config(format!(
                "exactly one configuration endpoint must be given, got {}",
                servers.len()
            ))),
        }
    }

    /// The `host:port` address of this endpoint.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ConfigEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One live cache node as reported by the configuration endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNode {
    pub host: String,
    pub port: u16,
}

impl CacheNode {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The `host:port` address of this node.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for CacheNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Options accepted from the host framework at construction time.
///
/// `behaviors` is one canonical flat map of tuning keys forwarded verbatim to
/// the backend factory; the host-framework adapter is expected to normalize
/// any nested shapes before handing it over.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Bound on the discovery exchange. `None` uses
    /// [`DEFAULT_DISCOVERY_TIMEOUT`].
    pub discovery_timeout: Option<Duration>,
    /// Tolerate discovery failures by degrading to the configuration
    /// endpoint itself as the only node.
    pub ignore_cluster_errors: bool,
    /// Opaque tuning options applied once at backend construction.
    pub behaviors: HashMap<String, String>,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the discovery timeout.
    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = Some(timeout);
        self
    }

    /// Tolerate discovery failures instead of propagating them.
    pub fn ignore_cluster_errors(mut self) -> Self {
        self.ignore_cluster_errors = true;
        self
    }

    /// Add one backend tuning option.
    pub fn with_behavior(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.behaviors.insert(key.into(), value.into());
        self
    }
}
