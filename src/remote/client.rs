//! Redis client adapter for single servers and clusters

use async_trait::async_trait;
use parking_lot::RwLock;
use redis::aio::{ConnectionLike, ConnectionManager, ConnectionManagerConfig};
use redis::cluster::ClusterClientBuilder;
use redis::cluster_async::ClusterConnection;
use redis::{AsyncCommands, Client, Cmd, ErrorKind, RedisError, RedisResult};
use std::collections::HashMap;
use std::time::Duration;

use super::options::{non_empty, RedisClientOptions, RedisClusterOptions};
use crate::error::StoreResult;

/// The Redis commands a [`RedisStore`](super::RedisStore) relies on.
///
/// Implemented by [`SingleNodeClient`] and [`ClusterClient`]; tests provide
/// their own in-memory implementation.
#[async_trait]
pub trait BackendClient: Send + Sync {
  /// Backend name reported by the store
  fn name(&self) -> &'static str {
    "redis"
  }

  async fn ping(&self) -> RedisResult<()>;

  async fn exists(&self, key: &str) -> RedisResult<bool>;

  /// Returns the number of keys removed
  async fn del(&self, keys: &[String]) -> RedisResult<i64>;

  async fn flush_db(&self) -> RedisResult<()>;

  async fn close(&self) -> RedisResult<()>;

  /// Runs an arbitrary command and returns the raw reply
  async fn process(&self, cmd: &Cmd) -> RedisResult<redis::Value>;

  async fn get(&self, key: &str) -> RedisResult<Option<String>>;

  /// A zero `expiration` stores the key without a TTL
  async fn set(&self, key: &str, value: String, expiration: Duration) -> RedisResult<()>;

  async fn hgetall(&self, key: &str) -> RedisResult<HashMap<String, String>>;

  async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> RedisResult<()>;

  async fn smembers(&self, key: &str) -> RedisResult<Vec<String>>;

  /// Returns the number of members that were not already present
  async fn sadd(&self, key: &str, members: &[String]) -> RedisResult<i64>;

  async fn expire(&self, key: &str, expiration: Duration) -> RedisResult<bool>;
}

/// Client for a single Redis server
pub type SingleNodeClient = RedisConnection<ConnectionManager>;

/// Client for a Redis cluster
pub type ClusterClient = RedisConnection<ClusterConnection>;

/// Closable handle around a multiplexed async connection
pub struct RedisConnection<C> {
  connection: RwLock<Option<C>>,
  target: String,
  name: &'static str,
}

impl<C> RedisConnection<C>
where
  C: ConnectionLike + Clone + Send + Sync + 'static,
{
  pub fn new(connection: C, target: impl Into<String>) -> Self {
    Self {
      connection: RwLock::new(Some(connection)),
      target: target.into(),
      name: "redis",
    }
  }

  pub fn with_name(mut self, name: &'static str) -> Self {
    self.name = name;
    self
  }

  /// Description of what this client is connected to
  pub fn target(&self) -> &str {
    &self.target
  }

  /// Cheap clone of the shared connection, or an error once closed
  fn connection(&self) -> RedisResult<C> {
    self
      .connection
      .read()
      .clone()
      .ok_or_else(|| RedisError::from((ErrorKind::IoError, "connection closed")))
  }
}

impl SingleNodeClient {
  /// Connect to a single server. Fails if the server cannot be reached.
  pub async fn connect(options: &RedisClientOptions) -> StoreResult<Self> {
    let client = Client::open(options.connection_info()?)?;

    let mut config = ConnectionManagerConfig::new().set_number_of_retries(options.max_retries);
    if !options.dial_timeout.is_zero() {
      config = config.set_connection_timeout(options.dial_timeout);
    }
    let response_timeout = options.response_timeout();
    if !response_timeout.is_zero() {
      config = config.set_response_timeout(response_timeout);
    }

    let connection = ConnectionManager::new_with_config(client, config).await?;
    Ok(Self::new(
      connection,
      format!("{}/{}", options.addr, options.db),
    ))
  }
}

impl ClusterClient {
  /// Connect to a cluster through its seed nodes
  pub async fn connect(options: &RedisClusterOptions) -> StoreResult<Self> {
    let mut builder = ClusterClientBuilder::new(options.connection_infos()?)
      .retries(options.max_redirects);

    if let Some(username) = non_empty(&options.username) {
      builder = builder.username(username);
    }
    if let Some(password) = non_empty(&options.password) {
      builder = builder.password(password);
    }
    if options.read_only {
      builder = builder.read_from_replicas();
    }
    if !options.dial_timeout.is_zero() {
      builder = builder.connection_timeout(options.dial_timeout);
    }
    let response_timeout = options.response_timeout();
    if !response_timeout.is_zero() {
      builder = builder.response_timeout(response_timeout);
    }

    let connection = builder.build()?.get_async_connection().await?;
    Ok(Self::new(connection, options.addrs.join(",")).with_name("redis-cluster"))
  }
}

#[async_trait]
impl<C> BackendClient for RedisConnection<C>
where
  C: ConnectionLike + Clone + Send + Sync + 'static,
{
  fn name(&self) -> &'static str {
    self.name
  }

  async fn ping(&self) -> RedisResult<()> {
    let mut conn = self.connection()?;
    redis::cmd("PING").query_async::<()>(&mut conn).await
  }

  async fn exists(&self, key: &str) -> RedisResult<bool> {
    let mut conn = self.connection()?;
    conn.exists(key).await
  }

  async fn del(&self, keys: &[String]) -> RedisResult<i64> {
    let mut conn = self.connection()?;
    conn.del(keys).await
  }

  async fn flush_db(&self) -> RedisResult<()> {
    let mut conn = self.connection()?;
    redis::cmd("FLUSHDB").query_async::<()>(&mut conn).await
  }

  async fn close(&self) -> RedisResult<()> {
    // Dropping the last clone shuts the multiplexed connection down
    if self.connection.write().take().is_some() {
      tracing::info!("Redis connection to {} closed", self.target);
    }
    Ok(())
  }

  async fn process(&self, cmd: &Cmd) -> RedisResult<redis::Value> {
    let mut conn = self.connection()?;
    cmd.query_async(&mut conn).await
  }

  async fn get(&self, key: &str) -> RedisResult<Option<String>> {
    let mut conn = self.connection()?;
    conn.get(key).await
  }

  async fn set(&self, key: &str, value: String, expiration: Duration) -> RedisResult<()> {
    let mut conn = self.connection()?;
    if expiration.is_zero() {
      conn.set(key, value).await
    } else {
      conn.pset_ex(key, value, expiration_millis(expiration)).await
    }
  }

  async fn hgetall(&self, key: &str) -> RedisResult<HashMap<String, String>> {
    let mut conn = self.connection()?;
    conn.hgetall(key).await
  }

  async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> RedisResult<()> {
    let mut conn = self.connection()?;
    conn.hset_multiple(key, fields).await
  }

  async fn smembers(&self, key: &str) -> RedisResult<Vec<String>> {
    let mut conn = self.connection()?;
    conn.smembers(key).await
  }

  async fn sadd(&self, key: &str, members: &[String]) -> RedisResult<i64> {
    let mut conn = self.connection()?;
    conn.sadd(key, members).await
  }

  async fn expire(&self, key: &str, expiration: Duration) -> RedisResult<bool> {
    let mut conn = self.connection()?;
    let millis = i64::try_from(expiration_millis(expiration)).unwrap_or(i64::MAX);
    conn.pexpire(key, millis).await
  }
}

/// Whole milliseconds, at least 1 so a sub-millisecond TTL still expires
fn expiration_millis(expiration: Duration) -> u64 {
  u64::try_from(expiration.as_millis())
    .unwrap_or(u64::MAX)
    .max(1)
}
