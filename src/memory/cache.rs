//! In-process expiring map

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{mpsc, Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::error::{StoreError, StoreResult};
use crate::value::Value;

/// A cached value with its expiry deadline
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub value: Value,
  pub expires_at: Option<Instant>,
}

impl CacheEntry {
  /// A zero `ttl` never expires
  pub fn new(value: Value, ttl: Duration) -> Self {
    let expires_at = if ttl.is_zero() {
      None
    } else {
      Some(Instant::now() + ttl)
    };
    Self { value, expires_at }
  }

  pub fn is_expired(&self) -> bool {
    self
      .expires_at
      .map(|exp| Instant::now() > exp)
      .unwrap_or(false)
  }

  pub fn ttl_remaining(&self) -> Option<Duration> {
    self
      .expires_at
      .map(|exp| exp.saturating_duration_since(Instant::now()))
  }
}

/// Thread-safe map whose entries expire individually.
///
/// Expired entries are never returned; they are dropped on access or by
/// [`ExpiringCache::evict_expired`].
#[derive(Debug, Default)]
pub struct ExpiringCache {
  data: RwLock<HashMap<String, CacheEntry>>,
}

impl ExpiringCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<Value> {
    {
      let data = self.data.read();
      match data.get(key) {
        Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
        Some(_) => {}
        None => return None,
      }
    }

    // Expired: drop it unless someone rewrote it meanwhile
    let mut data = self.data.write();
    if data.get(key).is_some_and(CacheEntry::is_expired) {
      data.remove(key);
    }
    None
  }

  pub fn entry(&self, key: &str) -> Option<CacheEntry> {
    let data = self.data.read();
    data.get(key).filter(|e| !e.is_expired()).cloned()
  }

  pub fn set(&self, key: &str, value: Value, ttl: Duration) {
    let mut data = self.data.write();
    data.insert(key.to_string(), CacheEntry::new(value, ttl));
  }

  /// Overwrites an existing, unexpired entry
  pub fn replace(&self, key: &str, value: Value, ttl: Duration) -> StoreResult<()> {
    let mut data = self.data.write();
    match data.get_mut(key) {
      Some(entry) if !entry.is_expired() => {
        *entry = CacheEntry::new(value, ttl);
        Ok(())
      }
      _ => Err(StoreError::KeyNotFound(key.to_string())),
    }
  }

  pub fn delete(&self, key: &str) -> bool {
    self.data.write().remove(key).is_some()
  }

  pub fn flush(&self) {
    self.data.write().clear();
  }

  /// Removes expired entries, returning how many were dropped
  pub fn evict_expired(&self) -> usize {
    let mut data = self.data.write();
    let before = data.len();
    data.retain(|_, entry| !entry.is_expired());
    before - data.len()
  }

  /// Number of live entries
  pub fn len(&self) -> usize {
    let data = self.data.read();
    data.values().filter(|e| !e.is_expired()).count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Handle to the background expiration loop
#[derive(Debug)]
pub enum Janitor {
  /// Tokio task, used when the cache is created inside a runtime
  Task(JoinHandle<()>),
  /// Plain thread; it exits once the sender is dropped
  Thread(mpsc::Sender<()>),
}

impl Janitor {
  pub fn stop(self) {
    match self {
      Janitor::Task(handle) => handle.abort(),
      Janitor::Thread(stop) => drop(stop),
    }
  }
}

/// Starts the periodic expiration loop.
///
/// Runs as a Tokio task when a runtime is available and on a background thread
/// otherwise. Returns `None` only when `interval` is zero. The loop exits on
/// its own once the cache has been dropped.
pub fn spawn_janitor(cache: &Arc<ExpiringCache>, interval: Duration) -> Option<Janitor> {
  if interval.is_zero() {
    return None;
  }
  let cache: Weak<ExpiringCache> = Arc::downgrade(cache);

  match tokio::runtime::Handle::try_current() {
    Ok(handle) => Some(Janitor::Task(handle.spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      // First tick completes immediately
      ticker.tick().await;
      loop {
        ticker.tick().await;
        if !purge(&cache) {
          break;
        }
      }
    }))),
    Err(_) => spawn_thread_janitor(cache, interval),
  }
}

fn spawn_thread_janitor(cache: Weak<ExpiringCache>, interval: Duration) -> Option<Janitor> {
  let (stop, stopped) = mpsc::channel::<()>();
  let spawned = std::thread::Builder::new()
    .name("kvstores-janitor".to_string())
    .spawn(move || {
      while let Err(mpsc::RecvTimeoutError::Timeout) = stopped.recv_timeout(interval) {
        if !purge(&cache) {
          break;
        }
      }
    });

  match spawned {
    Ok(_) => Some(Janitor::Thread(stop)),
    Err(e) => {
      tracing::warn!("Failed to start cache janitor thread: {}", e);
      None
    }
  }
}

/// Evicts expired entries; false once the cache is gone
fn purge(cache: &Weak<ExpiringCache>) -> bool {
  let Some(cache) = cache.upgrade() else {
    return false;
  };
  let expired = cache.evict_expired();
  if expired > 0 {
    tracing::debug!("Evicted {} expired keys", expired);
  }
  true
}
