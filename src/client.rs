//! Self-healing cluster client and the cached backend handle it runs on.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::Mutex;

use crate::backend::{BackendFactory, CacheBackend};
use crate::discovery::{ConfigEndpointDiscovery, Discovery};
use crate::error::Result;
use crate::membership::MembershipCache;
use crate::types::{ClientOptions, ConfigEndpoint};

/// Cache for the constructed backend handle.
///
/// The handle is bound to the node list it was built from, so it must be
/// discarded whenever that list is superseded. Invalidation only drops the
/// `Arc`; connection teardown is the backend pool's concern and in-flight
/// operations holding a clone are not disrupted.
struct BackendSlot {
    factory: Arc<dyn BackendFactory>,
    behaviors: HashMap<String, String>,
    slot: Mutex<Option<Arc<dyn CacheBackend>>>,
}

impl BackendSlot {
    fn new(factory: Arc<dyn BackendFactory>, behaviors: HashMap<String, String>) -> Self {
        Self {
            factory,
            behaviors,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached handle, building one from the current membership if
    /// absent. The mutex is held across the build so redundant constructions
    /// cannot race.
    async fn backend(&self, membership: &MembershipCache) -> Result<Arc<dyn CacheBackend>> {
        let mut slot = self.slot.lock().await;
        if let Some(backend) = slot.as_ref() {
            return Ok(Arc::clone(backend));
        }

        let nodes = membership.nodes().await?;
        let backend = self.factory.build(&nodes, &self.behaviors)?;
        debug!("constructed backend handle for {} node(s)", nodes.len());
        *slot = Some(Arc::clone(&backend));
        Ok(backend)
    }

    async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        if slot.take().is_some() {
            debug!("backend handle dropped");
        }
    }

    async fn is_warm(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

/// Cluster-aware cache client with auto-discovery and self-healing.
///
/// Operations run against a backend handle built from the membership learned
/// via the configuration endpoint. On any operation error both the membership
/// cache and the backend handle are invalidated together before the error is
/// propagated unchanged; the failing call itself is never retried, the *next*
/// call re-discovers transparently.
///
/// Clones share the caches, so an invalidation triggered through one clone is
/// immediately visible to all of them.
#[derive(Clone)]
pub struct ClusterClient {
    membership: Arc<MembershipCache>,
    backends: Arc<BackendSlot>,
}

impl ClusterClient {
    /// Build a client against a server list from the host framework.
    ///
    /// Fails with [`crate::Error::Config`] before any network call when the
    /// list does not hold exactly one `host:port` entry.
    pub fn new<S: AsRef<str>>(
        servers: &[S],
        options: ClientOptions,
        factory: Arc<dyn BackendFactory>,
    ) -> Result<Self> {
        Self::with_discovery(servers, options, factory, Arc::new(ConfigEndpointDiscovery))
    }

    /// Like [`ClusterClient::new`] with an injected discovery implementation.
    pub fn with_discovery<S: AsRef<str>>(
        servers: &[S],
        options: ClientOptions,
        factory: Arc<dyn BackendFactory>,
        discovery: Arc<dyn Discovery>,
    ) -> Result<Self> {
        let endpoint = ConfigEndpoint::from_servers(servers)?;
        let membership = Arc::new(MembershipCache::new(
            endpoint,
            options.discovery_timeout,
            options.ignore_cluster_errors,
            discovery,
        ));
        let backends = Arc::new(BackendSlot::new(factory, options.behaviors));
        Ok(Self {
            membership,
            backends,
        })
    }

    /// The configured configuration endpoint.
    pub fn endpoint(&self) -> &ConfigEndpoint {
        self.membership.endpoint()
    }

    /// Whether both the membership cache and the backend handle are
    /// currently populated.
    pub async fn is_warm(&self) -> bool {
        self.membership.is_warm().await && self.backends.is_warm().await
    }

    /// Run one cache operation with failure interception.
    ///
    /// Backend acquisition (discovery plus construction) is inside the guarded
    /// section: any error on the way invalidates both caches jointly, then
    /// surfaces unchanged. A stale handle must never survive alongside fresh
    /// membership or vice versa.
    async fn run_with_healing<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce(Arc<dyn CacheBackend>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let result = async {
            let backend = self.backends.backend(&self.membership).await?;
            op(backend).await
        }
        .await;

        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                self.membership.invalidate().await;
                self.backends.invalidate().await;
                warn!(
                    "cache operation against {} failed, caches invalidated for re-discovery: {err}",
                    self.membership.endpoint()
                );
                Err(err)
            }
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.run_with_healing(|backend| async move { backend.get(key).await })
            .await
    }

    pub async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        self.run_with_healing(|backend| async move { backend.get_many(keys).await })
            .await
    }

    pub async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        self.run_with_healing(|backend| async move { backend.set(key, value, ttl).await })
            .await
    }

    pub async fn set_many(
        &self,
        entries: &HashMap<String, Vec<u8>>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.run_with_healing(|backend| async move { backend.set_many(entries, ttl).await })
            .await
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.run_with_healing(|backend| async move { backend.delete(key).await })
            .await
    }
}
