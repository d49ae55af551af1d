//! In-memory stand-in for a Redis server

#![allow(dead_code)]

use async_trait::async_trait;
use kvstores::BackendClient;
use parking_lot::Mutex;
use redis::{Cmd, ErrorKind, RedisError, RedisResult};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Stored {
  Text(String),
  Hash(HashMap<String, String>),
  Set(BTreeSet<String>),
}

/// Fake backend keeping Redis strings, hashes and sets in a map
#[derive(Default)]
pub struct FakeBackend {
  pub data: Mutex<HashMap<String, Stored>>,
  /// Last expiration applied per key
  pub expirations: Mutex<HashMap<String, Duration>>,
  /// Number of `SADD` calls allowed before they start failing
  pub fail_sadd_after: Mutex<Option<usize>>,
  pub ping_fails: bool,
  /// Report itself as a cluster connection
  pub cluster: bool,
  sadd_calls: AtomicUsize,
  closed: AtomicBool,
}

impl FakeBackend {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn unreachable() -> Self {
    Self {
      ping_fails: true,
      ..Self::default()
    }
  }

  pub fn cluster() -> Self {
    Self {
      cluster: true,
      ..Self::default()
    }
  }

  pub fn stored(&self, key: &str) -> Option<Stored> {
    self.data.lock().get(key).cloned()
  }

  pub fn expiration(&self, key: &str) -> Option<Duration> {
    self.expirations.lock().get(key).copied()
  }

  fn check_open(&self) -> RedisResult<()> {
    if self.closed.load(Ordering::SeqCst) {
      Err(RedisError::from((ErrorKind::IoError, "connection closed")))
    } else {
      Ok(())
    }
  }
}

fn wrong_type() -> RedisError {
  RedisError::from((
    ErrorKind::TypeError,
    "WRONGTYPE Operation against a key holding the wrong kind of value",
  ))
}

#[async_trait]
impl BackendClient for FakeBackend {
  fn name(&self) -> &'static str {
    if self.cluster {
      "redis-cluster"
    } else {
      "redis"
    }
  }

  async fn ping(&self) -> RedisResult<()> {
    self.check_open()?;
    if self.ping_fails {
      return Err(RedisError::from((ErrorKind::IoError, "connection refused")));
    }
    Ok(())
  }

  async fn exists(&self, key: &str) -> RedisResult<bool> {
    self.check_open()?;
    Ok(self.data.lock().contains_key(key))
  }

  async fn del(&self, keys: &[String]) -> RedisResult<i64> {
    self.check_open()?;
    let mut data = self.data.lock();
    let mut removed = 0;
    for key in keys {
      if data.remove(key).is_some() {
        removed += 1;
      }
      self.expirations.lock().remove(key);
    }
    Ok(removed)
  }

  async fn flush_db(&self) -> RedisResult<()> {
    self.check_open()?;
    self.data.lock().clear();
    self.expirations.lock().clear();
    Ok(())
  }

  async fn close(&self) -> RedisResult<()> {
    self.closed.store(true, Ordering::SeqCst);
    Ok(())
  }

  async fn process(&self, cmd: &Cmd) -> RedisResult<redis::Value> {
    self.check_open()?;
    let args: Vec<Vec<u8>> = cmd
      .args_iter()
      .filter_map(|arg| match arg {
        redis::Arg::Simple(bytes) => Some(bytes.to_vec()),
        redis::Arg::Cursor => None,
      })
      .collect();

    match args.as_slice() {
      [name, key] if name.eq_ignore_ascii_case(b"GET") => {
        let key = String::from_utf8_lossy(key);
        match self.data.lock().get(key.as_ref()) {
          None => Ok(redis::Value::Nil),
          Some(Stored::Text(s)) => Ok(redis::Value::BulkString(s.clone().into_bytes())),
          Some(_) => Err(wrong_type()),
        }
      }
      _ => Err(RedisError::from((ErrorKind::ResponseError, "unknown command"))),
    }
  }

  async fn get(&self, key: &str) -> RedisResult<Option<String>> {
    self.check_open()?;
    match self.data.lock().get(key) {
      None => Ok(None),
      Some(Stored::Text(s)) => Ok(Some(s.clone())),
      Some(_) => Err(wrong_type()),
    }
  }

  async fn set(&self, key: &str, value: String, expiration: Duration) -> RedisResult<()> {
    self.check_open()?;
    self.data.lock().insert(key.to_string(), Stored::Text(value));
    let mut expirations = self.expirations.lock();
    if expiration.is_zero() {
      expirations.remove(key);
    } else {
      expirations.insert(key.to_string(), expiration);
    }
    Ok(())
  }

  async fn hgetall(&self, key: &str) -> RedisResult<HashMap<String, String>> {
    self.check_open()?;
    match self.data.lock().get(key) {
      None => Ok(HashMap::new()),
      Some(Stored::Hash(h)) => Ok(h.clone()),
      Some(_) => Err(wrong_type()),
    }
  }

  async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> RedisResult<()> {
    self.check_open()?;
    let mut data = self.data.lock();
    let entry = data
      .entry(key.to_string())
      .or_insert_with(|| Stored::Hash(HashMap::new()));
    match entry {
      Stored::Hash(h) => {
        h.extend(fields.iter().cloned());
        Ok(())
      }
      _ => Err(wrong_type()),
    }
  }

  async fn smembers(&self, key: &str) -> RedisResult<Vec<String>> {
    self.check_open()?;
    match self.data.lock().get(key) {
      None => Ok(Vec::new()),
      Some(Stored::Set(s)) => Ok(s.iter().cloned().collect()),
      Some(_) => Err(wrong_type()),
    }
  }

  async fn sadd(&self, key: &str, members: &[String]) -> RedisResult<i64> {
    self.check_open()?;
    let calls = self.sadd_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(limit) = *self.fail_sadd_after.lock() {
      if calls >= limit {
        return Err(RedisError::from((ErrorKind::IoError, "broken pipe")));
      }
    }

    let mut data = self.data.lock();
    let entry = data
      .entry(key.to_string())
      .or_insert_with(|| Stored::Set(BTreeSet::new()));
    match entry {
      Stored::Set(s) => Ok(members.iter().filter(|m| s.insert((*m).clone())).count() as i64),
      _ => Err(wrong_type()),
    }
  }

  async fn expire(&self, key: &str, expiration: Duration) -> RedisResult<bool> {
    self.check_open()?;
    if !self.data.lock().contains_key(key) {
      return Ok(false);
    }
    self
      .expirations
      .lock()
      .insert(key.to_string(), expiration);
    Ok(true)
  }
}
