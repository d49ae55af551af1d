//! Redis store backend, single server or cluster

mod client;
mod options;
mod store;

pub use client::{BackendClient, ClusterClient, RedisConnection, SingleNodeClient};
pub use options::{RedisClientOptions, RedisClusterOptions};
pub use store::RedisStore;
