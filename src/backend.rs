//! Seam over the underlying key-value client library.
//!
//! The core never opens data-path sockets itself: it builds a backend handle
//! from the discovered node list through a [`BackendFactory`] and routes the
//! five cache operations through [`CacheBackend`]. Backend errors are opaque
//! to the core; they are propagated unchanged and only trigger cache
//! invalidation as a side effect.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::CacheNode;

/// A client handle bound to a fixed node set.
///
/// Handles are expected to pool their connections internally; the core drops
/// its reference on invalidation rather than hard-closing, so clones held by
/// in-flight operations keep working.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>>;

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    async fn set_many(
        &self,
        entries: &HashMap<String, Vec<u8>>,
        ttl: Option<Duration>,
    ) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<bool>;
}

/// Builds backend handles. Behavior options are applied exactly once here;
/// a handle's tuning is immutable for its lifetime.
pub trait BackendFactory: Send + Sync {
    fn build(
        &self,
        nodes: &[CacheNode],
        behaviors: &HashMap<String, String>,
    ) -> Result<Arc<dyn CacheBackend>>;
}
