//! Process-local store backend

mod cache;
mod store;

pub use cache::{spawn_janitor, CacheEntry, ExpiringCache, Janitor};
pub use store::{MemoryOptions, MemoryStore};
