//! Common test doubles for the integration tests.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use autodisco_cache::{
    BackendFactory, CacheBackend, CacheNode, ConfigEndpoint, Discovery, Error, Result,
};

/// A scripted discovery outcome: a node list or a connectivity failure message.
pub type DiscoveryStep = std::result::Result<Vec<CacheNode>, String>;

/// Discovery double that pops pre-scripted outcomes and counts invocations.
pub struct ScriptedDiscovery {
    script: Mutex<VecDeque<DiscoveryStep>>,
    calls: AtomicUsize,
}

impl ScriptedDiscovery {
    pub fn new(script: Vec<DiscoveryStep>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Discovery for ScriptedDiscovery {
    async fn discover(
        &self,
        endpoint: &ConfigEndpoint,
        _timeout: Option<Duration>,
        ignore_errors: bool,
    ) -> Result<Vec<CacheNode>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("discovery script exhausted");
        match step {
            Ok(nodes) => Ok(nodes),
            // Mirrors the production degrade policy under ignore-cluster-errors.
            Err(_) if ignore_errors => {
                Ok(vec![CacheNode::new(endpoint.host.clone(), endpoint.port)])
            }
            Err(message) => Err(Error::Connectivity {
                endpoint: endpoint.address(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, message),
            }),
        }
    }
}

/// In-memory backend recording every operation; a scripted failure can be
/// armed for the next operation.
pub struct MockBackend {
    store: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_next: Arc<Mutex<Option<String>>>,
    ops: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    fn check_failure(&self, op: &str) -> Result<()> {
        self.ops.lock().unwrap().push(op.to_string());
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(Error::Backend(message));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for MockBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check_failure("get")?;
        Ok(self.store.lock().unwrap().get(key).cloned())
    }

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        self.check_failure("get_many")?;
        let store = self.store.lock().unwrap();
        Ok(keys
            .iter()
            .filter_map(|key| store.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }

    async fn set(&self, key: &str, value: &[u8], _ttl: Option<Duration>) -> Result<()> {
        self.check_failure("set")?;
        self.store
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn set_many(
        &self,
        entries: &HashMap<String, Vec<u8>>,
        _ttl: Option<Duration>,
    ) -> Result<()> {
        self.check_failure("set_many")?;
        let mut store = self.store.lock().unwrap();
        for (key, value) in entries {
            store.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.check_failure("delete")?;
        Ok(self.store.lock().unwrap().remove(key).is_some())
    }
}

/// Factory recording construction counts, the node lists handles were bound
/// to, and the behaviors it was given. All handles share one store so data
/// survives a rebuild, like nodes that stayed in the cluster.
pub struct MockFactory {
    store: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_next: Arc<Mutex<Option<String>>>,
    ops: Arc<Mutex<Vec<String>>>,
    builds: AtomicUsize,
    node_lists: Mutex<Vec<Vec<CacheNode>>>,
    behaviors_seen: Mutex<Vec<HashMap<String, String>>>,
}

impl MockFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            store: Arc::new(Mutex::new(HashMap::new())),
            fail_next: Arc::new(Mutex::new(None)),
            ops: Arc::new(Mutex::new(Vec::new())),
            builds: AtomicUsize::new(0),
            node_lists: Mutex::new(Vec::new()),
            behaviors_seen: Mutex::new(Vec::new()),
        })
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn node_lists(&self) -> Vec<Vec<CacheNode>> {
        self.node_lists.lock().unwrap().clone()
    }

    pub fn behaviors_seen(&self) -> Vec<HashMap<String, String>> {
        self.behaviors_seen.lock().unwrap().clone()
    }

    /// Arm a failure for the next backend operation.
    pub fn fail_next_op(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    pub fn op_log(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }
}

impl BackendFactory for MockFactory {
    fn build(
        &self,
        nodes: &[CacheNode],
        behaviors: &HashMap<String, String>,
    ) -> Result<Arc<dyn CacheBackend>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.node_lists.lock().unwrap().push(nodes.to_vec());
        self.behaviors_seen.lock().unwrap().push(behaviors.clone());
        Ok(Arc::new(MockBackend {
            store: Arc::clone(&self.store),
            fail_next: Arc::clone(&self.fail_next),
            ops: Arc::clone(&self.ops),
        }))
    }
}
