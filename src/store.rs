//! Store contract shared by the memory and Redis backends

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::value::{Scalar, Value, ValueMap};

/// Uniform key-value store.
///
/// Every write in the `set` family uses the expiration fixed when the store was
/// built. Absent keys are reported as `Ok(None)` / `Ok(false)`, never as errors.
///
/// Backends differ in how faithfully they keep values:
/// - the memory store keeps values exactly as written, lists stay ordered;
/// - the Redis store keeps maps as hashes and lists as sets, so map values come
///   back as strings and lists come back deduplicated in arbitrary order.
#[async_trait]
pub trait Store: Send + Sync {
  /// Backend name, for logs
  fn name(&self) -> &'static str;

  async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

  async fn set(&self, key: &str, value: Scalar) -> StoreResult<()>;

  /// Returns `None` when the key is absent or holds an empty map
  async fn get_map(&self, key: &str) -> StoreResult<Option<ValueMap>>;

  /// Replaces whatever was stored at `key`
  async fn set_map(&self, key: &str, value: ValueMap) -> StoreResult<()>;

  /// Returns `None` when the key is absent or holds an empty list
  async fn get_slice(&self, key: &str) -> StoreResult<Option<Vec<Scalar>>>;

  async fn set_slice(&self, key: &str, values: Vec<Scalar>) -> StoreResult<()>;

  /// Adds `values` to the list stored at `key`
  async fn append_slice(&self, key: &str, values: Vec<Scalar>) -> StoreResult<()>;

  async fn exists(&self, key: &str) -> StoreResult<bool>;

  /// Succeeds whether or not the key existed
  async fn delete(&self, key: &str) -> StoreResult<()>;

  /// Removes every key in the current database
  async fn flush(&self) -> StoreResult<()>;

  /// Releases backend resources. The store should not be used afterwards.
  async fn close(&self) -> StoreResult<()>;
}
