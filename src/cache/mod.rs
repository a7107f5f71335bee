//! Cache-aside layer for book reads.
//!
//! Entries are JSON copies of records keyed by [`CacheKey`]. The store behind
//! them is either in-process ([`MemoryStore`]) or Redis ([`RedisStore`]), and
//! nothing is ever written with an expiry.

mod accessor;
mod config;
mod keys;
mod redis;
mod store;

pub use accessor::{
    AccessError, CacheAccessor, METRIC_CACHE_ERROR, METRIC_CACHE_HIT,
    METRIC_CACHE_INVALIDATED_KEYS, METRIC_CACHE_MISS, METRIC_CACHE_POPULATE_FAILED,
};
pub use config::CacheConfig;
pub use keys::{BOOK_KEY_PREFIX, BOOKS_PAGE_KEY_PREFIX, BOOKS_PAGE_PATTERN, CacheKey};
pub use redis::RedisStore;
pub use store::{KvStore, MemoryStore, StoreError, key_matcher};
