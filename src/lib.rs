//! An in-process object cache with configurable tracking, expiration,
//! usage counting, and policy-driven eviction, paired with the extended
//! operation framework used to schedule evictions.
//!
//! The two halves of the crate:
//!
//! - [`cache::DatabaseCache`] (component C9): a thread-safe keyed object
//!   store mixing *tracked* and *untracked* entries.
//! - [`operation`] (components C4-C7): a conditional, observable,
//!   delegating execution unit with an explicit state machine, used to
//!   host eviction cycles as a dependency chain of operations.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use objectcache::cache::DatabaseCache;
//! use objectcache::config::CacheConfigBuilder;
//! use objectcache::expr::{ConstBucket, NowPlusOffset};
//! use objectcache::mergeable::{MergeOp, Mergeable};
//!
//! #[derive(Debug, Clone, PartialEq, Eq)]
//! struct Widget(u32);
//!
//! impl Mergeable for Widget {
//!     type Field = u32;
//!     fn mergeable_keys(&self) -> Vec<String> { Vec::new() }
//!     fn merge_field(&self, _key: &str) -> MergeOp<u32> { MergeOp::Remove }
//!     fn apply_merge(&mut self, _key: &str, _op: MergeOp<u32>) {}
//! }
//!
//! let mut timing_map = std::collections::HashMap::new();
//! timing_map.insert(
//!     "default".to_string(),
//!     Arc::new(NowPlusOffset(Duration::from_secs(60))) as _,
//! );
//! let config = CacheConfigBuilder::new()
//!     .expires_objects(true)
//!     .expiration_timing_key(Arc::new(ConstBucket("default".to_string())))
//!     .expiration_timing_map(timing_map)
//!     .build()
//!     .unwrap();
//!
//! let cache = DatabaseCache::new(config, "Widget");
//! cache.set("w1".to_string(), Widget(1), true).unwrap();
//! assert_eq!(cache.get(&"w1".to_string()), Some(Widget(1)));
//! ```

pub mod cache;
pub mod config;
pub mod delegate;
pub mod entry;
pub mod error;
mod eviction;
pub mod expr;
mod hash;
pub mod mergeable;
pub mod operation;

pub use cache::DatabaseCache;
pub use config::{CacheConfig, CacheConfigBuilder, ConfigValue, EvictionPolicy};
pub use delegate::{CacheDelegate, EvictionCycle, PermissiveCacheDelegate};
pub use entry::Expirable;
pub use error::{CacheError, CacheErrorKind, CacheResult};
pub use mergeable::{MergeOp, Mergeable};
