//! Store backed by the in-process expiring cache

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::cache::{spawn_janitor, ExpiringCache, Janitor};
use crate::error::StoreResult;
use crate::store::Store;
use crate::value::{Scalar, Value, ValueMap};

/// Options for the memory backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryOptions {
  /// Lifetime of every written entry (zero = no expiry)
  pub expiration: Duration,

  /// How often expired entries are purged (zero = only on access). Outside a
  /// Tokio runtime the purge runs on a background thread.
  pub cleanup_interval: Duration,
}

/// In-memory store.
///
/// Values are kept as written, without serialization. Reading a map or a list
/// from a key that holds another shape is a programming error and panics.
pub struct MemoryStore {
  cache: Arc<ExpiringCache>,
  expiration: Duration,
  janitor: Option<Janitor>,
}

impl MemoryStore {
  pub fn new(options: MemoryOptions) -> Self {
    let cache = Arc::new(ExpiringCache::new());
    let janitor = spawn_janitor(&cache, options.cleanup_interval);
    Self {
      cache,
      expiration: options.expiration,
      janitor,
    }
  }

  pub fn expiration(&self) -> Duration {
    self.expiration
  }

  /// The underlying cache
  pub fn cache(&self) -> &Arc<ExpiringCache> {
    &self.cache
  }
}

impl Drop for MemoryStore {
  fn drop(&mut self) {
    if let Some(janitor) = self.janitor.take() {
      janitor.stop();
    }
  }
}

impl std::fmt::Debug for MemoryStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MemoryStore")
      .field("entries", &self.cache.len())
      .field("expiration", &self.expiration)
      .finish()
  }
}

#[async_trait]
impl Store for MemoryStore {
  fn name(&self) -> &'static str {
    "memory"
  }

  async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
    Ok(self.cache.get(key))
  }

  async fn set(&self, key: &str, value: Scalar) -> StoreResult<()> {
    self.cache.set(key, Value::Scalar(value), self.expiration);
    Ok(())
  }

  async fn get_map(&self, key: &str) -> StoreResult<Option<ValueMap>> {
    match self.cache.get(key) {
      None => Ok(None),
      Some(Value::Map(map)) if map.is_empty() => Ok(None),
      Some(Value::Map(map)) => Ok(Some(map)),
      Some(other) => panic!("key {:?} holds a {}, not a map", key, other.kind()),
    }
  }

  async fn set_map(&self, key: &str, value: ValueMap) -> StoreResult<()> {
    self.cache.set(key, Value::Map(value), self.expiration);
    Ok(())
  }

  async fn get_slice(&self, key: &str) -> StoreResult<Option<Vec<Scalar>>> {
    match self.cache.get(key) {
      None => Ok(None),
      Some(Value::List(list)) if list.is_empty() => Ok(None),
      Some(Value::List(list)) => Ok(Some(list)),
      Some(other) => panic!("key {:?} holds a {}, not a list", key, other.kind()),
    }
  }

  async fn set_slice(&self, key: &str, values: Vec<Scalar>) -> StoreResult<()> {
    self.cache.set(key, Value::List(values), self.expiration);
    Ok(())
  }

  /// Read, extend and replace without locking across the steps: concurrent
  /// appends to one key may lose updates. Fails with `KeyNotFound` if the key
  /// is gone by the time the list is written back.
  async fn append_slice(&self, key: &str, values: Vec<Scalar>) -> StoreResult<()> {
    let mut items = self.get_slice(key).await?.unwrap_or_default();
    items.extend(values);
    self.cache.replace(key, Value::List(items), self.expiration)
  }

  async fn exists(&self, key: &str) -> StoreResult<bool> {
    Ok(self.cache.entry(key).is_some())
  }

  async fn delete(&self, key: &str) -> StoreResult<()> {
    self.cache.delete(key);
    Ok(())
  }

  async fn flush(&self) -> StoreResult<()> {
    self.cache.flush();
    tracing::debug!("Memory store flushed");
    Ok(())
  }

  async fn close(&self) -> StoreResult<()> {
    Ok(())
  }
}
