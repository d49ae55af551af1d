//! Uniform key-value store with an in-memory and a Redis backend
//!
//! Calling code talks to a [`Store`] and does not need to know which backend is
//! behind it:
//! - [`MemoryStore`]: process-local expiring cache, values kept as written
//! - [`RedisStore`]: single Redis server or cluster, maps as hashes and lists as
//!   sets

pub mod config;
pub mod error;
pub mod memory;
#[cfg(feature = "remote")]
pub mod remote;
pub mod store;
pub mod value;

pub use config::{open_store, StoreConfig, StoreMode};
pub use error::{StoreError, StoreResult};
pub use memory::{MemoryOptions, MemoryStore};
#[cfg(feature = "remote")]
pub use remote::{
  BackendClient, ClusterClient, RedisClientOptions, RedisClusterOptions, RedisStore,
  SingleNodeClient,
};
pub use store::Store;
pub use value::{Scalar, Value, ValueMap};
