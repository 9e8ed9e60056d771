//! Lazily populated cache of the discovered cluster membership.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::Mutex;

use crate::discovery::Discovery;
use crate::error::{Error, Result};
use crate::types::{CacheNode, ConfigEndpoint};

/// Holds the most recently discovered node list.
///
/// Empty at startup, populated on first demand, cleared only by explicit
/// invalidation. There is no TTL; a snapshot stays current until an operation
/// failure invalidates it. The mutex is held across the discovery await so at
/// most one discovery is in flight per invalidation epoch and readers never
/// observe a partially written list.
pub struct MembershipCache {
    endpoint: ConfigEndpoint,
    discovery_timeout: Option<Duration>,
    ignore_cluster_errors: bool,
    discovery: Arc<dyn Discovery>,
    nodes: Mutex<Option<Arc<Vec<CacheNode>>>>,
}

impl MembershipCache {
    pub fn new(
        endpoint: ConfigEndpoint,
        discovery_timeout: Option<Duration>,
        ignore_cluster_errors: bool,
        discovery: Arc<dyn Discovery>,
    ) -> Self {
        Self {
            endpoint,
            discovery_timeout,
            ignore_cluster_errors,
            discovery,
            nodes: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &ConfigEndpoint {
        &self.endpoint
    }

    /// Return the cached node list, discovering it first if absent.
    ///
    /// A discovery failure is wrapped into [`Error::ClusterUnreachable`] and
    /// nothing is cached: the next call probes the endpoint again.
    pub async fn nodes(&self) -> Result<Arc<Vec<CacheNode>>> {
        let mut slot = self.nodes.lock().await;
        if let Some(nodes) = slot.as_ref() {
            return Ok(Arc::clone(nodes));
        }

        let discovered = self
            .discovery
            .discover(
                &self.endpoint,
                self.discovery_timeout,
                self.ignore_cluster_errors,
            )
            .await
            .map_err(|source| Error::ClusterUnreachable {
                endpoint: self.endpoint.address(),
                source: Box::new(source),
            })?;

        info!(
            "discovered {} cache node(s) via {}",
            discovered.len(),
            self.endpoint
        );
        let nodes = Arc::new(discovered);
        *slot = Some(Arc::clone(&nodes));
        Ok(nodes)
    }

    /// Drop the cached node list. Idempotent.
    pub async fn invalidate(&self) {
        let mut slot = self.nodes.lock().await;
        if slot.take().is_some() {
            debug!("membership cache for {} invalidated", self.endpoint);
        }
    }

    /// Whether a node list is currently cached.
    pub async fn is_warm(&self) -> bool {
        self.nodes.lock().await.is_some()
    }
}
