//! Keyed hash table aliases. Defaults to `ahash` (teacher's own default
//! feature); falls back to std's `RandomState` when the `ahash` feature is
//! disabled, since `hashbrown` without its `default` feature has no
//! built-in default hasher.

#[cfg(feature = "ahash")]
pub type Map<K, V> = hashbrown::HashMap<K, V>;
#[cfg(not(feature = "ahash"))]
pub type Map<K, V> = hashbrown::HashMap<K, V, std::collections::hash_map::RandomState>;

#[cfg(feature = "ahash")]
pub type Set<K> = hashbrown::HashSet<K>;
#[cfg(not(feature = "ahash"))]
pub type Set<K> = hashbrown::HashSet<K, std::collections::hash_map::RandomState>;
