//! Store backed by Redis strings, hashes and sets

use async_trait::async_trait;
use redis::{ErrorKind, RedisError, RedisResult};
use std::time::Duration;

use super::client::{BackendClient, ClusterClient, SingleNodeClient};
use super::options::{RedisClientOptions, RedisClusterOptions};
use crate::error::StoreResult;
use crate::store::Store;
use crate::value::{Scalar, Value, ValueMap};

/// Redis store.
///
/// Maps are written as hashes and lists as sets, so the server's own
/// per-field and per-member commands apply to them. Everything is stored as
/// text: map values come back as strings, and lists come back deduplicated in
/// server order.
pub struct RedisStore<C = SingleNodeClient> {
  client: C,
  expiration: Duration,
}

impl RedisStore<SingleNodeClient> {
  /// Connect to a single server and check it answers `PING`
  pub async fn connect(options: &RedisClientOptions, expiration: Duration) -> StoreResult<Self> {
    let client = SingleNodeClient::connect(options).await?;
    let store = Self::with_client(client, expiration).await?;
    tracing::info!("Connected to Redis at {}", store.client.target());
    Ok(store)
  }
}

impl RedisStore<ClusterClient> {
  /// Connect to a cluster and check it answers `PING`
  pub async fn connect_cluster(
    options: &RedisClusterOptions,
    expiration: Duration,
  ) -> StoreResult<Self> {
    let client = ClusterClient::connect(options).await?;
    let store = Self::with_client(client, expiration).await?;
    tracing::info!("Connected to Redis cluster at {}", store.client.target());
    Ok(store)
  }
}

impl<C: BackendClient> RedisStore<C> {
  /// Wrap an already connected client without probing it
  pub fn new(client: C, expiration: Duration) -> Self {
    Self { client, expiration }
  }

  /// Wrap a client after checking it answers `PING`
  pub async fn with_client(client: C, expiration: Duration) -> StoreResult<Self> {
    client.ping().await?;
    Ok(Self::new(client, expiration))
  }

  pub fn client(&self) -> &C {
    &self.client
  }

  pub fn expiration(&self) -> Duration {
    self.expiration
  }

  /// Add non-null members one by one. The first failure is returned as is;
  /// members already added stay in the set.
  async fn add_members(&self, key: &str, values: &[Scalar]) -> StoreResult<()> {
    let mut written = 0usize;
    for value in values.iter().filter(|v| !v.is_null()) {
      if let Err(e) = self.client.sadd(key, &[value.to_text()]).await {
        if written > 0 {
          tracing::warn!(
            "Set {} left partially written after {} members: {}",
            key,
            written,
            e
          );
        }
        return Err(e.into());
      }
      written += 1;
    }

    if written > 0 && !self.expiration.is_zero() {
      self.client.expire(key, self.expiration).await?;
    }
    Ok(())
  }

  /// Convert a raw `GET` reply
  fn parse_value(value: redis::Value) -> RedisResult<Option<Scalar>> {
    match value {
      redis::Value::Nil => Ok(None),
      redis::Value::Int(i) => Ok(Some(Scalar::Integer(i))),
      redis::Value::Double(f) => Ok(Some(Scalar::Float(f))),
      redis::Value::Boolean(b) => Ok(Some(Scalar::Bool(b))),
      redis::Value::BulkString(bytes) => match String::from_utf8(bytes) {
        Ok(s) => Ok(Some(Scalar::String(s))),
        Err(e) => Err(RedisError::from((
          ErrorKind::TypeError,
          "value is not valid UTF-8",
          e.to_string(),
        ))),
      },
      redis::Value::SimpleString(s) => Ok(Some(Scalar::String(s))),
      redis::Value::VerbatimString { text, .. } => Ok(Some(Scalar::String(text))),
      redis::Value::Okay => Ok(Some(Scalar::String("OK".to_string()))),
      other => Err(RedisError::from((
        ErrorKind::TypeError,
        "unexpected reply to GET",
        format!("{:?}", other),
      ))),
    }
  }
}

#[async_trait]
impl<C: BackendClient> Store for RedisStore<C> {
  fn name(&self) -> &'static str {
    self.client.name()
  }

  async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
    let cmd = redis::cmd("GET").arg(key).clone();
    let reply = self.client.process(&cmd).await?;
    Ok(Self::parse_value(reply)?.map(Value::Scalar))
  }

  async fn set(&self, key: &str, value: Scalar) -> StoreResult<()> {
    self
      .client
      .set(key, value.to_text(), self.expiration)
      .await?;
    Ok(())
  }

  async fn get_map(&self, key: &str) -> StoreResult<Option<ValueMap>> {
    let values = self.client.hgetall(key).await?;
    if values.is_empty() {
      return Ok(None);
    }

    Ok(Some(
      values
        .into_iter()
        .map(|(k, v)| (k, Scalar::String(v)))
        .collect(),
    ))
  }

  /// Delete, then `HSET` every field in one command, then `PEXPIRE`. The three
  /// steps are not atomic.
  async fn set_map(&self, key: &str, value: ValueMap) -> StoreResult<()> {
    self.client.del(&[key.to_string()]).await?;
    if value.is_empty() {
      return Ok(());
    }

    let fields: Vec<(String, String)> = value
      .into_iter()
      .map(|(k, v)| (k, v.to_text()))
      .collect();
    self.client.hset_multiple(key, &fields).await?;

    if !self.expiration.is_zero() {
      self.client.expire(key, self.expiration).await?;
    }
    Ok(())
  }

  async fn get_slice(&self, key: &str) -> StoreResult<Option<Vec<Scalar>>> {
    let members = self.client.smembers(key).await?;
    if members.is_empty() {
      return Ok(None);
    }
    Ok(Some(members.into_iter().map(Scalar::String).collect()))
  }

  async fn set_slice(&self, key: &str, values: Vec<Scalar>) -> StoreResult<()> {
    self.add_members(key, &values).await
  }

  /// Same as `set_slice`: adding an existing member is a no-op for a set
  async fn append_slice(&self, key: &str, values: Vec<Scalar>) -> StoreResult<()> {
    self.add_members(key, &values).await
  }

  async fn exists(&self, key: &str) -> StoreResult<bool> {
    Ok(self.client.exists(key).await?)
  }

  async fn delete(&self, key: &str) -> StoreResult<()> {
    self.client.del(&[key.to_string()]).await?;
    Ok(())
  }

  async fn flush(&self) -> StoreResult<()> {
    self.client.flush_db().await?;
    tracing::debug!("Redis database flushed");
    Ok(())
  }

  async fn close(&self) -> StoreResult<()> {
    Ok(self.client.close().await?)
  }
}
