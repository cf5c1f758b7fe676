//! The cache's delegate protocol (spec §6, "Delegate protocol"): the
//! hook surface an eviction cycle calls back through.
//!
//! Per the design note on weak delegate references, the cache never owns
//! its delegate — callers register a `Weak<dyn CacheDelegate<K, V>>` and
//! are responsible for keeping a strong reference alive elsewhere. A
//! delegate that has been dropped is treated as "no delegate" rather than
//! an error.

use std::fmt;

/// Identifies which eviction cycle a delegate callback pertains to
/// (spec §6, "Eviction cycle identifiers").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionCycle {
    Expiration,
    Fifo,
    Lifo,
    Usage,
    /// Used by the single-key `evict` entry point, which reuses the full
    /// batch envelope for one entry (spec §C.1 / `VDSDatabaseCache.h`).
    Unknown,
}

impl fmt::Display for EvictionCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EvictionCycle::Expiration => "Expiration",
            EvictionCycle::Fifo => "FIFO",
            EvictionCycle::Lifo => "LIFO",
            EvictionCycle::Usage => "Usage",
            EvictionCycle::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// The cache's delegate: consulted before, during, and after each
/// eviction cycle. All methods are optional; default implementations
/// preserve the "no delegate installed" behavior (proceed, evict
/// everything the cycle selects).
pub trait CacheDelegate<K, V>: Send + Sync {
    /// Gate on the whole chain. Returning `false` aborts `process_evictions`
    /// cleanly before any cycle begins (spec §4.8, "Delegate envelope").
    fn should_begin_eviction_cycle(&self) -> bool {
        true
    }

    fn will_begin_eviction_cycle(&self, _cycle: EvictionCycle) {}

    fn did_complete_eviction_cycle(&self, _cycle: EvictionCycle) {}

    /// Per-entry gate, consulted before an entry is added to a cycle's
    /// removal batch.
    fn should_evict_object(&self, _object: &V, _key: &K, _cycle: EvictionCycle) -> bool {
        true
    }

    fn will_evict_objects(&self, _objects: &[&V], _keys: &[&K], _cycle: EvictionCycle) {}

    fn did_evict_objects(&self, _objects: &[V], _keys: &[K], _cycle: EvictionCycle) {}
}

/// A delegate that accepts every cycle and vetoes nothing, for callers
/// that don't need the hooks.
pub struct PermissiveCacheDelegate;

impl<K, V> CacheDelegate<K, V> for PermissiveCacheDelegate {}
