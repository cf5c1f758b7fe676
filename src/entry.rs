//! Expirable entry (C1): binds a value to an expiration instant.
//!
//! Mirrors the pattern in the teacher's `ExpiringValueCache`/`CanExpire`
//! (`stores/expiring_value_cache.rs`), except here expiration is computed by
//! the cache at insertion time via the timing expression evaluator rather
//! than carried by the value itself — so the binding is a wrapper, not a
//! trait the value implements.

use std::hash::{Hash, Hasher};
use std::time::Instant;

/// A value paired with the instant at which it becomes expired.
///
/// Equality and hashing delegate entirely to the wrapped value so that an
/// `Expirable<V>` and a bare `V` hash and compare identically — the
/// expiration instant is metadata, not identity.
#[derive(Debug, Clone)]
pub struct Expirable<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Expirable<V> {
    pub fn new(value: V, expires_at: Instant) -> Self {
        Expirable { value, expires_at }
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    /// True once the current instant has reached or passed `expires_at`.
    /// Monotonic: once true for a given `Expirable`, it stays true, since
    /// `Instant::now()` never moves backwards.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

impl<V: PartialEq> PartialEq for Expirable<V> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<V: Eq> Eq for Expirable<V> {}

impl<V: Hash> Hash for Expirable<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}
