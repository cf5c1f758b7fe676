//! Eviction operation (C8): the concrete [`OperationBody`] wiring one
//! cycle of the chain `Expiration -> Size(policy) -> Usage` into the
//! extended-operation framework, per spec §4.8.
//!
//! The actual per-cycle algorithms (selection, delegate gating, index
//! mutation) live on [`DatabaseCache`] itself, since they need the
//! cache's locks and indices; this module only adapts those algorithms to
//! the `OperationBody` extension point and names each cycle for logging.

use std::sync::Arc;

use crate::cache::DatabaseCache;
use crate::mergeable::Mergeable;
use crate::operation::{Operation, OperationBody, OperationHandle};

/// Which leg of the eviction chain a given [`Operation`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EvictionKind {
    Expiration,
    Size,
    Usage,
}

impl EvictionKind {
    fn leg_name(self) -> &'static str {
        match self {
            EvictionKind::Expiration => "Expiration",
            EvictionKind::Size => "Size",
            EvictionKind::Usage => "Usage",
        }
    }

    /// Builds this leg's operation name from the configured eviction
    /// operation class name (`CacheConfig::eviction_operation_class_name`,
    /// `EvictionOperationClassName` in the config-map form), so a caller
    /// who names a custom identifier there sees it reflected in operation
    /// names, logs, and dependency-chain introspection. Rust has no
    /// runtime class lookup by string the way the identifier's originating
    /// API does, so this is the identifier's only observable effect here.
    fn operation_name(self, class_name: &str) -> String {
        format!("{class_name}({})", self.leg_name())
    }
}

struct EvictionBody<K, V> {
    cache: Arc<DatabaseCache<K, V>>,
    kind: EvictionKind,
}

impl<K, V> OperationBody for EvictionBody<K, V>
where
    K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
    V: Mergeable + Clone + Send + Sync + 'static,
{
    /// Runs the cycle's algorithm, polling `handle.is_cancelled()` between
    /// entries (spec §4.8, "Cancellation"). A cycle that cannot reach its
    /// target (`ObjectInUse`) records the error on the operation rather
    /// than panicking; the chain still finishes normally.
    fn execute(&mut self, handle: &OperationHandle) {
        let is_cancelled = || handle.is_cancelled();
        let result = match self.kind {
            EvictionKind::Expiration => self.cache.run_expiration_cycle(&is_cancelled),
            EvictionKind::Size => self.cache.run_size_cycle(&is_cancelled),
            EvictionKind::Usage => self.cache.run_usage_cycle(&is_cancelled),
        };
        if let Err(error) = result {
            handle.add_error(error);
        }
    }
}

/// Builds one leg of the chain as a bare [`Operation`], ready to have
/// dependencies installed and be submitted to a queue.
pub(crate) fn spawn<K, V>(cache: Arc<DatabaseCache<K, V>>, kind: EvictionKind) -> Arc<Operation>
where
    K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
    V: Mergeable + Clone + Send + Sync + 'static,
{
    let name = kind.operation_name(&cache.config().eviction_operation_class_name);
    Operation::new(name, EvictionBody { cache, kind })
}
