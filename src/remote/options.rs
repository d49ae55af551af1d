//! Redis connection options

use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::millis;
use crate::error::{StoreError, StoreResult};

/// Options for a single Redis server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisClientOptions {
  /// "tcp" or "unix"
  #[serde(default = "default_network")]
  pub network: String,

  /// `host:port` for tcp, socket path for unix
  #[serde(default = "default_addr")]
  pub addr: String,

  #[serde(default)]
  pub username: Option<String>,

  #[serde(default)]
  pub password: Option<String>,

  /// Database index
  #[serde(default)]
  pub db: i64,

  /// Reconnection attempts before a command fails
  #[serde(default = "default_max_retries")]
  pub max_retries: usize,

  #[serde(default, rename = "dial_timeout_ms", with = "millis")]
  pub dial_timeout: Duration,

  #[serde(default, rename = "read_timeout_ms", with = "millis")]
  pub read_timeout: Duration,

  #[serde(default, rename = "write_timeout_ms", with = "millis")]
  pub write_timeout: Duration,
}

/// Options for a Redis cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisClusterOptions {
  /// Seed nodes as `host:port`
  #[serde(default = "default_cluster_addrs")]
  pub addrs: Vec<String>,

  /// Retries on MOVED/ASK redirects and transient errors
  #[serde(default = "default_max_redirects")]
  pub max_redirects: u32,

  /// Send read commands to replicas
  #[serde(default)]
  pub read_only: bool,

  #[serde(default)]
  pub username: Option<String>,

  #[serde(default)]
  pub password: Option<String>,

  #[serde(default, rename = "dial_timeout_ms", with = "millis")]
  pub dial_timeout: Duration,

  #[serde(default, rename = "read_timeout_ms", with = "millis")]
  pub read_timeout: Duration,

  #[serde(default, rename = "write_timeout_ms", with = "millis")]
  pub write_timeout: Duration,
}

fn default_network() -> String {
  "tcp".to_string()
}

fn default_addr() -> String {
  "localhost:6379".to_string()
}

fn default_max_retries() -> usize {
  3
}

fn default_cluster_addrs() -> Vec<String> {
  vec![default_addr()]
}

fn default_max_redirects() -> u32 {
  8
}

impl Default for RedisClientOptions {
  fn default() -> Self {
    Self {
      network: default_network(),
      addr: default_addr(),
      username: None,
      password: None,
      db: 0,
      max_retries: default_max_retries(),
      dial_timeout: Duration::ZERO,
      read_timeout: Duration::ZERO,
      write_timeout: Duration::ZERO,
    }
  }
}

impl Default for RedisClusterOptions {
  fn default() -> Self {
    Self {
      addrs: default_cluster_addrs(),
      max_redirects: default_max_redirects(),
      read_only: false,
      username: None,
      password: None,
      dial_timeout: Duration::ZERO,
      read_timeout: Duration::ZERO,
      write_timeout: Duration::ZERO,
    }
  }
}

impl RedisClientOptions {
  /// Options for a tcp server at `addr`
  pub fn new(addr: impl Into<String>) -> Self {
    Self {
      addr: addr.into(),
      ..Self::default()
    }
  }

  /// Connection target for the redis client
  pub fn connection_info(&self) -> StoreResult<ConnectionInfo> {
    let addr = match self.network.to_lowercase().as_str() {
      "tcp" | "" => tcp_addr(&self.addr)?,
      #[cfg(unix)]
      "unix" => ConnectionAddr::Unix(self.addr.clone().into()),
      other => {
        return Err(StoreError::Config(format!(
          "unsupported network: {}",
          other
        )))
      }
    };

    Ok(ConnectionInfo {
      addr,
      redis: RedisConnectionInfo {
        db: self.db,
        username: non_empty(&self.username),
        password: non_empty(&self.password),
        ..Default::default()
      },
    })
  }

  /// Longer of the read and write timeouts, zero when neither is set
  pub fn response_timeout(&self) -> Duration {
    self.read_timeout.max(self.write_timeout)
  }
}

impl RedisClusterOptions {
  pub fn new<I, S>(addrs: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      addrs: addrs.into_iter().map(Into::into).collect(),
      ..Self::default()
    }
  }

  /// Connection targets for the seed nodes
  pub fn connection_infos(&self) -> StoreResult<Vec<ConnectionInfo>> {
    if self.addrs.is_empty() {
      return Err(StoreError::Config(
        "cluster needs at least one address".to_string(),
      ));
    }

    self
      .addrs
      .iter()
      .map(|addr| {
        Ok(ConnectionInfo {
          addr: tcp_addr(addr)?,
          redis: RedisConnectionInfo::default(),
        })
      })
      .collect()
  }

  pub fn response_timeout(&self) -> Duration {
    self.read_timeout.max(self.write_timeout)
  }
}

/// Unset environment variables expand to "", which means no credential
pub(crate) fn non_empty(value: &Option<String>) -> Option<String> {
  value.clone().filter(|v| !v.is_empty())
}

/// Split `host:port`, defaulting the port to 6379
fn tcp_addr(addr: &str) -> StoreResult<ConnectionAddr> {
  let addr = addr.trim();
  if addr.is_empty() {
    return Err(StoreError::Config("empty redis address".to_string()));
  }

  match addr.rsplit_once(':') {
    Some((host, port)) => {
      let port = port
        .parse::<u16>()
        .map_err(|_| StoreError::Config(format!("invalid port in address: {}", addr)))?;
      let host = host.trim_start_matches('[').trim_end_matches(']');
      Ok(ConnectionAddr::Tcp(host.to_string(), port))
    }
    None => Ok(ConnectionAddr::Tcp(addr.to_string(), 6379)),
  }
}
