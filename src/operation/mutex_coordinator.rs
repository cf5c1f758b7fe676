//! Mutual-exclusion coordinator (C6): a process-wide serializer for
//! operations tagged with exclusivity categories, per spec §4.6.
//!
//! Modeled per the design note "process-wide singleton... lazily
//! initialized shared resource behind an interior lock; injection for
//! testability" — the process-wide instance lives behind
//! [`MutexCoordinator::global`], but nothing prevents constructing a
//! private instance for a test.

use std::sync::{Arc, Weak};

use log::trace;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::core::Operation;

static GLOBAL: Lazy<MutexCoordinator> = Lazy::new(MutexCoordinator::new);

/// Serializes operations within each named category. Every queue (C5)
/// shares the same coordinator instance via [`MutexCoordinator::global`].
pub struct MutexCoordinator {
    categories: Mutex<std::collections::HashMap<&'static str, Vec<Weak<Operation>>>>,
}

impl MutexCoordinator {
    pub fn new() -> Self {
        MutexCoordinator {
            categories: Mutex::new(std::collections::HashMap::new()),
        }
    }

    pub fn global() -> &'static MutexCoordinator {
        &GLOBAL
    }

    /// Appends `op` to each category's wait list and, for every category
    /// where `op` is not the sole (head) entry, installs a dependency
    /// edge from `op` to that category's current tail — guaranteeing
    /// categories serialize in arrival order.
    pub fn add_operation(&self, op: &Arc<Operation>, categories: &[&'static str]) {
        if categories.is_empty() {
            return;
        }
        let mut table = self.categories.lock();
        for category in categories {
            let list = table.entry(category).or_default();
            list.retain(|w| w.upgrade().is_some());
            if let Some(tail) = list.last().and_then(Weak::upgrade) {
                trace!(target: "objectcache::operation", "{} waits on {} in category {}", op.name(), tail.name(), category);
                op.add_dependency(tail);
            }
            list.push(Arc::downgrade(op));
        }
    }

    /// Removes `op` from each listed category's wait list.
    pub fn remove_operation(&self, op: &Arc<Operation>, categories: &[&'static str]) {
        if categories.is_empty() {
            return;
        }
        let mut table = self.categories.lock();
        for category in categories {
            if let Some(list) = table.get_mut(category) {
                list.retain(|w| match w.upgrade() {
                    Some(existing) => !Arc::ptr_eq(&existing, op),
                    None => false,
                });
            }
        }
    }
}

impl Default for MutexCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
