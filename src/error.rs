//! Store error types

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation error
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// Connection or command failure reported by Redis, passed through unchanged
  #[cfg(feature = "remote")]
  #[error(transparent)]
  Redis(#[from] redis::RedisError),

  /// A replace targeted a key that is absent or already expired
  #[error("key not found: {0}")]
  KeyNotFound(String),

  #[error("invalid configuration: {0}")]
  Config(String),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("YAML error: {0}")]
  Yaml(#[from] serde_yaml::Error),
}

impl StoreError {
  pub fn is_key_not_found(&self) -> bool {
    matches!(self, StoreError::KeyNotFound(_))
  }
}
