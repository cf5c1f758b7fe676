//! Timing expressions: the opaque capability the cache uses to compute an
//! expiration instant for a newly-inserted tracked entry (spec §4.9,
//! "Expiration computation").
//!
//! The expressions are deliberately not a general expression language —
//! per the design notes, a minimal evaluator (constant, key-lookup,
//! now-plus-offset) is sufficient, and callers needing more can supply
//! their own [`Expression`] impl.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{CacheError, CacheErrorKind, CacheResult};

/// The snapshot an expression is evaluated against, built from the entry
/// keys listed in spec §6 ("Entry snapshot keys"): `EntryTimestamp`,
/// `EntryUUID`, `EntryEntityName`, `EntrySnapshot`.
pub struct EntrySnapshot<'a, V> {
    pub timestamp: Instant,
    pub uuid: String,
    pub entity_name: &'static str,
    pub value: &'a V,
}

/// What evaluating an expression yields: either a bucket identifier (for
/// `expiration_timing_key`) or an instant (for entries of
/// `expiration_timing_map`).
#[derive(Debug, Clone)]
pub enum ExprValue {
    Bucket(String),
    Instant(Instant),
}

impl ExprValue {
    pub fn into_bucket(self, call_site: &'static str) -> CacheResult<String> {
        match self {
            ExprValue::Bucket(b) => Ok(b),
            ExprValue::Instant(_) => Err(CacheError::new(
                call_site,
                CacheErrorKind::ExpirationEvaluationFailed,
                "expression yielded an instant where a bucket identifier was expected",
            )),
        }
    }

    pub fn into_instant(self, call_site: &'static str) -> CacheResult<Instant> {
        match self {
            ExprValue::Instant(i) => Ok(i),
            ExprValue::Bucket(_) => Err(CacheError::new(
                call_site,
                CacheErrorKind::ExpirationEvaluationFailed,
                "expression yielded a bucket identifier where an instant was expected",
            )),
        }
    }
}

/// An expression evaluated against an [`EntrySnapshot`]. Implementations
/// must not block indefinitely — they run under the cache's write path.
pub trait Expression<V>: Send + Sync {
    fn evaluate(&self, snapshot: &EntrySnapshot<'_, V>) -> CacheResult<ExprValue>;
}

pub type BoxedExpression<V> = Arc<dyn Expression<V>>;

/// Always yields the same bucket identifier.
pub struct ConstBucket(pub String);

impl<V> Expression<V> for ConstBucket {
    fn evaluate(&self, _snapshot: &EntrySnapshot<'_, V>) -> CacheResult<ExprValue> {
        Ok(ExprValue::Bucket(self.0.clone()))
    }
}

/// Always yields `now + offset`.
pub struct NowPlusOffset(pub Duration);

impl<V> Expression<V> for NowPlusOffset {
    fn evaluate(&self, _snapshot: &EntrySnapshot<'_, V>) -> CacheResult<ExprValue> {
        Ok(ExprValue::Instant(Instant::now() + self.0))
    }
}

/// Looks a bucket identifier up from the snapshot via a caller-supplied
/// projection — the "key-lookup" primitive from the design notes. Typical
/// use: bucket by `entity_name` or by a prefix of `uuid`.
pub struct KeyLookup<F> {
    f: F,
}

impl<F> KeyLookup<F> {
    pub fn new(f: F) -> Self {
        KeyLookup { f }
    }
}

impl<V, F> Expression<V> for KeyLookup<F>
where
    F: Fn(&EntrySnapshot<'_, V>) -> String + Send + Sync,
{
    fn evaluate(&self, snapshot: &EntrySnapshot<'_, V>) -> CacheResult<ExprValue> {
        Ok(ExprValue::Bucket((self.f)(snapshot)))
    }
}

impl<V> fmt::Debug for dyn Expression<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Expression")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_bucket_is_stable() {
        let expr = ConstBucket("default".to_string());
        let snap = EntrySnapshot {
            timestamp: Instant::now(),
            uuid: "k1".into(),
            entity_name: "T",
            value: &42,
        };
        let bucket = expr.evaluate(&snap).unwrap().into_bucket("test").unwrap();
        assert_eq!(bucket, "default");
    }

    #[test]
    fn now_plus_offset_is_in_the_future() {
        let expr = NowPlusOffset(Duration::from_millis(100));
        let snap = EntrySnapshot {
            timestamp: Instant::now(),
            uuid: "k1".into(),
            entity_name: "T",
            value: &42,
        };
        let instant = expr.evaluate(&snap).unwrap().into_instant("test").unwrap();
        assert!(instant > Instant::now());
    }

    #[test]
    fn key_lookup_uses_projection() {
        let expr: KeyLookup<_> = KeyLookup::new(|s: &EntrySnapshot<'_, i32>| s.entity_name.to_string());
        let snap = EntrySnapshot {
            timestamp: Instant::now(),
            uuid: "k1".into(),
            entity_name: "widget",
            value: &42,
        };
        let bucket = expr.evaluate(&snap).unwrap().into_bucket("test").unwrap();
        assert_eq!(bucket, "widget");
    }
}
