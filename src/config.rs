//! Store configuration and construction

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::StoreResult;
use crate::memory::{MemoryOptions, MemoryStore};
use crate::store::Store;

#[cfg(feature = "remote")]
use crate::remote::{RedisClientOptions, RedisClusterOptions, RedisStore};

/// Which backend a [`StoreConfig`] opens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreMode {
  /// Process-local cache (default)
  #[default]
  Memory,
  /// Single Redis server
  Redis,
  /// Redis cluster
  RedisCluster,
}

impl std::fmt::Display for StoreMode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      StoreMode::Memory => write!(f, "memory"),
      StoreMode::Redis => write!(f, "redis"),
      StoreMode::RedisCluster => write!(f, "redis-cluster"),
    }
  }
}

impl std::str::FromStr for StoreMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "memory" | "inmemory" | "local" => Ok(StoreMode::Memory),
      "redis" | "single" => Ok(StoreMode::Redis),
      "redis-cluster" | "redis_cluster" | "cluster" => Ok(StoreMode::RedisCluster),
      _ => Err(format!("Unknown store mode: {}", s)),
    }
  }
}

/// Store configuration, usually read from `kvstores.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
  #[serde(default)]
  pub mode: StoreMode,

  /// Lifetime applied to every write (zero = no expiry)
  #[serde(default, rename = "expiration_ms", with = "millis")]
  pub expiration: Duration,

  /// Purge interval for the memory backend (zero = purge on access only)
  #[serde(
    default = "default_cleanup_interval",
    rename = "cleanup_interval_ms",
    with = "millis"
  )]
  pub cleanup_interval: Duration,

  #[cfg(feature = "remote")]
  #[serde(default)]
  pub redis: RedisClientOptions,

  #[cfg(feature = "remote")]
  #[serde(default)]
  pub cluster: RedisClusterOptions,

  #[serde(default)]
  pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
  #[serde(default = "default_level")]
  pub level: String,
}

fn default_cleanup_interval() -> Duration {
  Duration::from_secs(60)
}

fn default_level() -> String {
  "info".into()
}

impl Default for LoggingSection {
  fn default() -> Self {
    Self {
      level: default_level(),
    }
  }
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      mode: StoreMode::default(),
      expiration: Duration::ZERO,
      cleanup_interval: default_cleanup_interval(),
      #[cfg(feature = "remote")]
      redis: RedisClientOptions::default(),
      #[cfg(feature = "remote")]
      cluster: RedisClusterOptions::default(),
      logging: LoggingSection::default(),
    }
  }
}

impl StoreConfig {
  /// Load a YAML file, expanding `$VAR` and `${VAR}` first
  pub fn from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
    let content = std::fs::read_to_string(&path)?;
    Self::from_yaml(&content)
  }

  pub fn from_yaml(content: &str) -> StoreResult<Self> {
    let expanded = expand_env_vars(content);
    Ok(serde_yaml::from_str(&expanded)?)
  }

  /// Look for `kvstores.yaml` or `kvstores.yml` in the working directory
  pub fn find_and_load() -> StoreResult<Option<Self>> {
    for p in ["kvstores.yaml", "kvstores.yml"] {
      if Path::new(p).exists() {
        tracing::info!("Loading config from {}", p);
        return Ok(Some(Self::from_file(p)?));
      }
    }
    Ok(None)
  }

  pub fn memory_options(&self) -> MemoryOptions {
    MemoryOptions {
      expiration: self.expiration,
      cleanup_interval: self.cleanup_interval,
    }
  }

  /// Build the configured store. Redis modes fail if the server is unreachable.
  pub async fn open(&self) -> StoreResult<Box<dyn Store>> {
    open_store(self).await
  }
}

/// Build the store selected by `config.mode`
pub async fn open_store(config: &StoreConfig) -> StoreResult<Box<dyn Store>> {
  tracing::debug!("Opening {} store", config.mode);

  match config.mode {
    StoreMode::Memory => Ok(Box::new(MemoryStore::new(config.memory_options()))),
    #[cfg(feature = "remote")]
    StoreMode::Redis => Ok(Box::new(
      RedisStore::connect(&config.redis, config.expiration).await?,
    )),
    #[cfg(feature = "remote")]
    StoreMode::RedisCluster => Ok(Box::new(
      RedisStore::connect_cluster(&config.cluster, config.expiration).await?,
    )),
    #[cfg(not(feature = "remote"))]
    mode => Err(crate::error::StoreError::Config(format!(
      "{} mode requires the `remote` feature",
      mode
    ))),
  }
}

/// Replace `${VAR}` and `$VAR` with environment values (empty when unset)
fn expand_env_vars(input: &str) -> String {
  let mut result = String::with_capacity(input.len());
  let mut rest = input;

  while let Some(pos) = rest.find('$') {
    result.push_str(&rest[..pos]);
    let after = &rest[pos + 1..];

    if let Some(braced) = after.strip_prefix('{') {
      match braced.find('}') {
        Some(end) => {
          result.push_str(&std::env::var(&braced[..end]).unwrap_or_default());
          rest = &braced[end + 1..];
        }
        None => {
          result.push_str(&rest[pos..]);
          rest = "";
        }
      }
      continue;
    }

    let name_len = after
      .chars()
      .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
      .count();
    if name_len == 0 {
      result.push('$');
    } else {
      result.push_str(&std::env::var(&after[..name_len]).unwrap_or_default());
    }
    rest = &after[name_len..];
  }

  result.push_str(rest);
  result
}

/// Serde adapter storing a `Duration` as integer milliseconds
pub(crate) mod millis {
  use serde::{Deserialize, Deserializer, Serializer};
  use std::time::Duration;

  pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
  }
}
