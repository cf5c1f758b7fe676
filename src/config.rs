//! Cache configuration (C3): a mutable builder that seals into an
//! immutable configuration the cache treats as read-only for its whole
//! lifetime, per spec §3 ("Configuration (all immutable once the cache is
//! constructed)") and §4.1.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{CacheError, CacheErrorKind, CacheResult};
use crate::expr::BoxedExpression;

const CALL_SITE_BUILD: &str = "CacheConfigBuilder::build";
const CALL_SITE_FROM_MAP: &str = "CacheConfig::from_map";

/// FIFO or LIFO ordering for size-driven eviction (spec §3, `eviction_policy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EvictionPolicy {
    Fifo,
    Lifo,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        EvictionPolicy::Fifo
    }
}

const DEFAULT_EVICTION_INTERVAL_SECS: u64 = 300;

/// One value from the construct-from-mapping path (spec §6, configuration
/// option identifiers). Unknown identifiers are ignored by
/// [`CacheConfig::from_map`]; missing ones take the documented defaults.
pub enum ConfigValue<V> {
    Bool(bool),
    Int(i64),
    Str(String),
    Expression(BoxedExpression<V>),
    ExpressionMap(HashMap<String, BoxedExpression<V>>),
}

/// Immutable, read-only-from-the-cache's-perspective configuration.
/// Built by [`CacheConfigBuilder`] and cloned (cheaply — the expression
/// slots are `Arc`s) into the cache at construction time.
#[derive(Clone)]
pub struct CacheConfig<V> {
    pub expires_objects: bool,
    pub preferred_max_object_count: i64,
    pub eviction_policy: EvictionPolicy,
    pub evicts_on_low_memory: bool,
    pub tracks_object_usage: bool,
    pub evicts_objects_in_use: bool,
    pub replaces_objects_on_update: bool,
    pub eviction_interval: Duration,
    pub archives_untracked_objects: bool,
    pub expiration_timing_key: Option<BoxedExpression<V>>,
    pub expiration_timing_map: HashMap<String, BoxedExpression<V>>,
    pub eviction_operation_class_name: String,
}

impl<V> CacheConfig<V> {
    /// `preferred_max_object_count < 0`: evict aggressively.
    pub fn is_aggressive(&self) -> bool {
        self.preferred_max_object_count < 0
    }

    /// `preferred_max_object_count == 0`: no size-driven eviction.
    pub fn is_unbounded(&self) -> bool {
        self.preferred_max_object_count == 0
    }

    pub fn builder() -> CacheConfigBuilder<V> {
        CacheConfigBuilder::new()
    }

    /// Construct from a mapping of option identifiers to values (spec §6).
    pub fn from_map(map: HashMap<&'static str, ConfigValue<V>>) -> CacheResult<CacheConfig<V>> {
        let mut builder = CacheConfigBuilder::new();
        for (key, value) in map {
            match (key, value) {
                ("ExpiresObjects", ConfigValue::Bool(b)) => {
                    builder = builder.expires_objects(b);
                }
                ("PreferredMaxObjectCount", ConfigValue::Int(n)) => {
                    builder = builder.preferred_max_object_count(n);
                }
                ("EvictionPolicy", ConfigValue::Int(0)) => {
                    builder = builder.eviction_policy(EvictionPolicy::Fifo);
                }
                ("EvictionPolicy", ConfigValue::Int(1)) => {
                    builder = builder.eviction_policy(EvictionPolicy::Lifo);
                }
                ("EvictsOnLowMemory", ConfigValue::Bool(b)) => {
                    builder = builder.evicts_on_low_memory(b);
                }
                ("TracksObjectUsage", ConfigValue::Bool(b)) => {
                    builder = builder.tracks_object_usage(b);
                }
                ("EvictsObjectsInUse", ConfigValue::Bool(b)) => {
                    builder = builder.evicts_objects_in_use(b);
                }
                ("ReplacesObjectsOnUpdate", ConfigValue::Bool(b)) => {
                    builder = builder.replaces_objects_on_update(b);
                }
                ("EvictionInterval", ConfigValue::Int(secs)) => {
                    builder = builder.eviction_interval(Duration::from_secs(secs.max(0) as u64));
                }
                ("ArchivesUntrackedObjects", ConfigValue::Bool(b)) => {
                    builder = builder.archives_untracked_objects(b);
                }
                ("ExpirationTimingMapKey", ConfigValue::Expression(expr)) => {
                    builder = builder.expiration_timing_key(expr);
                }
                ("ExpirationTimingMap", ConfigValue::ExpressionMap(map)) => {
                    builder = builder.expiration_timing_map(map);
                }
                ("EvictionOperationClassName", ConfigValue::Str(s)) => {
                    builder = builder.eviction_operation_class_name(s);
                }
                // Unknown identifier, or a value of the wrong shape for a
                // known one: spec says unknown identifiers are ignored.
                // A known identifier paired with the wrong `ConfigValue`
                // variant is caller error; surface it rather than silently
                // dropping a mistyped option.
                (known, _)
                    if matches!(
                        known,
                        "ExpiresObjects"
                            | "PreferredMaxObjectCount"
                            | "EvictionPolicy"
                            | "EvictsOnLowMemory"
                            | "TracksObjectUsage"
                            | "EvictsObjectsInUse"
                            | "ReplacesObjectsOnUpdate"
                            | "EvictionInterval"
                            | "ArchivesUntrackedObjects"
                            | "ExpirationTimingMapKey"
                            | "ExpirationTimingMap"
                            | "EvictionOperationClassName"
                    ) =>
                {
                    return Err(CacheError::new(
                        CALL_SITE_FROM_MAP,
                        CacheErrorKind::UnexpectedArgumentType,
                        format!("option '{known}' was given a value of the wrong type"),
                    )
                    .with_argument("value"));
                }
                _ => { /* unknown identifier: ignored */ }
            }
        }
        builder.build()
    }
}

/// Mutable variant: set fields one at a time, then [`CacheConfigBuilder::build`]
/// to seal into an immutable [`CacheConfig`].
pub struct CacheConfigBuilder<V> {
    expires_objects: Option<bool>,
    preferred_max_object_count: i64,
    eviction_policy: EvictionPolicy,
    evicts_on_low_memory: bool,
    tracks_object_usage: Option<bool>,
    evicts_objects_in_use: bool,
    replaces_objects_on_update: bool,
    eviction_interval: Duration,
    archives_untracked_objects: bool,
    expiration_timing_key: Option<BoxedExpression<V>>,
    expiration_timing_map: HashMap<String, BoxedExpression<V>>,
    eviction_operation_class_name: String,
}

impl<V> Default for CacheConfigBuilder<V> {
    fn default() -> Self {
        CacheConfigBuilder {
            expires_objects: None,
            preferred_max_object_count: 0,
            eviction_policy: EvictionPolicy::default(),
            evicts_on_low_memory: false,
            tracks_object_usage: None,
            evicts_objects_in_use: true,
            replaces_objects_on_update: true,
            eviction_interval: Duration::from_secs(DEFAULT_EVICTION_INTERVAL_SECS),
            archives_untracked_objects: false,
            expiration_timing_key: None,
            expiration_timing_map: HashMap::new(),
            eviction_operation_class_name: "EvictionOperation".to_string(),
        }
    }
}

impl<V> CacheConfigBuilder<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expires_objects(mut self, value: bool) -> Self {
        self.expires_objects = Some(value);
        self
    }

    pub fn preferred_max_object_count(mut self, value: i64) -> Self {
        self.preferred_max_object_count = value;
        self
    }

    pub fn eviction_policy(mut self, value: EvictionPolicy) -> Self {
        self.eviction_policy = value;
        self
    }

    pub fn evicts_on_low_memory(mut self, value: bool) -> Self {
        self.evicts_on_low_memory = value;
        self
    }

    pub fn tracks_object_usage(mut self, value: bool) -> Self {
        self.tracks_object_usage = Some(value);
        self
    }

    pub fn evicts_objects_in_use(mut self, value: bool) -> Self {
        self.evicts_objects_in_use = value;
        self
    }

    pub fn replaces_objects_on_update(mut self, value: bool) -> Self {
        self.replaces_objects_on_update = value;
        self
    }

    pub fn eviction_interval(mut self, value: Duration) -> Self {
        self.eviction_interval = value;
        self
    }

    pub fn archives_untracked_objects(mut self, value: bool) -> Self {
        self.archives_untracked_objects = value;
        self
    }

    pub fn expiration_timing_key(mut self, expr: BoxedExpression<V>) -> Self {
        self.expiration_timing_key = Some(expr);
        self
    }

    pub fn expiration_timing_map(mut self, map: HashMap<String, BoxedExpression<V>>) -> Self {
        self.expiration_timing_map = map;
        self
    }

    pub fn insert_expiration_timing(mut self, bucket: impl Into<String>, expr: BoxedExpression<V>) -> Self {
        self.expiration_timing_map.insert(bucket.into(), expr);
        self
    }

    pub fn eviction_operation_class_name(mut self, value: impl Into<String>) -> Self {
        self.eviction_operation_class_name = value.into();
        self
    }

    /// Seal into an immutable [`CacheConfig`], validating the interactions
    /// spec §4.1 calls out:
    ///
    /// - `expires_objects` set without both a timing-key expression and a
    ///   non-empty timing map.
    /// - `preferred_max_object_count < 0` while `expires_objects` and/or
    ///   `tracks_object_usage` were *explicitly* set to `false` (aggressive
    ///   mode implies both; if the caller never touched them they are
    ///   auto-enabled instead of rejected).
    pub fn build(self) -> CacheResult<CacheConfig<V>> {
        let aggressive = self.preferred_max_object_count < 0;

        let expires_objects = match (aggressive, self.expires_objects) {
            (true, Some(false)) => {
                return Err(CacheError::new(
                    CALL_SITE_BUILD,
                    CacheErrorKind::InvalidConfig,
                    "preferred_max_object_count < 0 requires expires_objects, \
                     but it was explicitly disabled",
                ));
            }
            (true, _) => true,
            (false, explicit) => explicit.unwrap_or(false),
        };

        let tracks_object_usage = match (aggressive, self.tracks_object_usage) {
            (true, Some(false)) => {
                return Err(CacheError::new(
                    CALL_SITE_BUILD,
                    CacheErrorKind::InvalidConfig,
                    "preferred_max_object_count < 0 requires tracks_object_usage, \
                     but it was explicitly disabled",
                ));
            }
            (true, _) => true,
            (false, explicit) => explicit.unwrap_or(false),
        };

        if expires_objects
            && (self.expiration_timing_key.is_none() || self.expiration_timing_map.is_empty())
        {
            return Err(CacheError::new(
                CALL_SITE_BUILD,
                CacheErrorKind::InvalidConfig,
                "expires_objects requires both a timing-key expression and a \
                 non-empty timing map",
            ));
        }

        Ok(CacheConfig {
            expires_objects,
            preferred_max_object_count: self.preferred_max_object_count,
            eviction_policy: self.eviction_policy,
            evicts_on_low_memory: self.evicts_on_low_memory,
            tracks_object_usage,
            evicts_objects_in_use: self.evicts_objects_in_use,
            replaces_objects_on_update: self.replaces_objects_on_update,
            eviction_interval: self.eviction_interval,
            archives_untracked_objects: self.archives_untracked_objects,
            expiration_timing_key: self.expiration_timing_key,
            expiration_timing_map: self.expiration_timing_map,
            eviction_operation_class_name: self.eviction_operation_class_name,
        })
    }
}
