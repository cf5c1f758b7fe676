//! Database cache (C9): storage, the three parallel indices, the public
//! API, eviction scheduling, and delegate callbacks, per spec §4.9.
//!
//! A single coordinator lock ([`DatabaseCache::state`]) guards storage and
//! all three indices. Per the design note on reentrant locking, this crate
//! takes the "structured re-read snapshot" option rather than a reentrant
//! mutex: every path that invokes a delegate callback releases the lock
//! first and re-acquires it only to perform the resulting mutation, so a
//! delegate reading the cache from inside a `should_evict_object` callback
//! never deadlocks against the write path that invoked it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use parking_lot::{Mutex, RwLock};

use crate::config::{CacheConfig, EvictionPolicy};
use crate::delegate::{CacheDelegate, EvictionCycle};
use crate::error::{CacheError, CacheErrorKind, CacheResult};
use crate::eviction::{self, EvictionKind};
use crate::expr::EntrySnapshot;
use crate::hash::{Map, Set};
use crate::mergeable::Mergeable;
use crate::operation::{Operation, OperationQueue};

/// Storage plus the three parallel indices from spec §3.
struct CacheState<K, V> {
    storage: Map<K, V>,
    tracked: Set<K>,
    /// Sorted ascending by `(instant, seq)`; `seq` is a monotonic counter
    /// assigned when the record is (re)created, giving a stable tiebreak
    /// by insertion/update order for equal instants.
    expiration_index: Vec<(Instant, u64, K)>,
    usage_index: Map<K, u64>,
    insertion_order: VecDeque<K>,
    seq_counter: u64,
}

impl<K, V> CacheState<K, V>
where
    K: std::hash::Hash + Eq,
{
    fn new() -> Self {
        CacheState {
            storage: Map::default(),
            tracked: Set::default(),
            expiration_index: Vec::new(),
            usage_index: Map::default(),
            insertion_order: VecDeque::new(),
            seq_counter: 0,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq_counter += 1;
        self.seq_counter
    }
}

fn insert_expiration_sorted<K>(index: &mut Vec<(Instant, u64, K)>, instant: Instant, seq: u64, key: K) {
    let pos = index.partition_point(|(i, s, _)| (*i, *s) <= (instant, seq));
    index.insert(pos, (instant, seq, key));
}

/// A thread-safe, tracked/untracked keyed object store with policy-driven
/// eviction (spec §§1–2, component C9).
pub struct DatabaseCache<K, V> {
    config: CacheConfig<V>,
    entity_name: &'static str,
    state: Mutex<CacheState<K, V>>,
    delegate: RwLock<Option<Weak<dyn CacheDelegate<K, V>>>>,
    eviction_queue: OperationQueue,
    pending_eviction_ops: Mutex<Vec<Weak<Operation>>>,
    poisoned: AtomicBool,
    timer_stop: Arc<AtomicBool>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> DatabaseCache<K, V>
where
    K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
    V: Mergeable + Clone + Send + Sync + 'static,
{
    /// Builds indices implied by `config` and, per spec §4.9, starts the
    /// eviction timer whenever expiration, a size bound, or usage tracking
    /// is active. `entity_name` labels entries in expression snapshots
    /// (spec §6, "Entry snapshot keys" — `EntryEntityName`).
    pub fn new(config: CacheConfig<V>, entity_name: &'static str) -> Arc<Self> {
        let needs_timer = config.expires_objects || !config.is_unbounded() || config.tracks_object_usage;
        let interval = config.eviction_interval;
        let cache = Arc::new(DatabaseCache {
            config,
            entity_name,
            state: Mutex::new(CacheState::new()),
            delegate: RwLock::new(None),
            eviction_queue: OperationQueue::with_default_delegate("eviction-queue", 1),
            pending_eviction_ops: Mutex::new(Vec::new()),
            poisoned: AtomicBool::new(false),
            timer_stop: Arc::new(AtomicBool::new(false)),
            timer: Mutex::new(None),
        });
        if needs_timer {
            let weak = Arc::downgrade(&cache);
            let stop = cache.timer_stop.clone();
            let handle = spawn_timer(weak, interval, stop);
            *cache.timer.lock() = Some(handle);
        }
        cache
    }

    pub fn config(&self) -> &CacheConfig<V> {
        &self.config
    }

    pub fn set_delegate(&self, delegate: Weak<dyn CacheDelegate<K, V>>) {
        *self.delegate.write() = Some(delegate);
    }

    pub(crate) fn delegate(&self) -> Option<Arc<dyn CacheDelegate<K, V>>> {
        self.delegate.read().as_ref().and_then(Weak::upgrade)
    }

    fn check_not_poisoned(&self, call_site: &'static str) -> CacheResult<()> {
        if self.poisoned.load(Ordering::SeqCst) {
            return Err(CacheError::invalid_state(
                call_site,
                "cache is poisoned after an index-consistency violation",
            ));
        }
        Ok(())
    }

    /// Spec §7, "Fatal conditions": detect index corruption and, if found,
    /// poison the cache so every subsequent write fails with `InvalidState`.
    fn verify_invariants(&self, state: &CacheState<K, V>) -> CacheResult<()> {
        for key in state.tracked.iter() {
            if !state.insertion_order.contains(key) {
                self.poisoned.store(true, Ordering::SeqCst);
                warn!(target: "objectcache::cache", "poisoning cache: tracked key missing from insertion-order index");
                return Err(CacheError::invalid_state(
                    "DatabaseCache::verify_invariants",
                    "tracked key missing from insertion-order index",
                ));
            }
        }
        Ok(())
    }

    fn compute_expiration(&self, seq: u64, value: &V) -> CacheResult<Instant> {
        const CALL_SITE: &str = "DatabaseCache::compute_expiration";
        let timing_key = self.config.expiration_timing_key.as_ref().ok_or_else(|| {
            CacheError::new(
                CALL_SITE,
                CacheErrorKind::ExpirationEvaluationFailed,
                "expires_objects is enabled without a timing-key expression",
            )
        })?;
        let snapshot = EntrySnapshot {
            timestamp: Instant::now(),
            uuid: format!("{}-{seq}", self.entity_name),
            entity_name: self.entity_name,
            value,
        };
        let bucket = timing_key.evaluate(&snapshot)?.into_bucket(CALL_SITE)?;
        let expr = self.config.expiration_timing_map.get(&bucket).ok_or_else(|| {
            CacheError::new(
                CALL_SITE,
                CacheErrorKind::ExpirationEvaluationFailed,
                format!("no expiration timing expression registered for bucket '{bucket}'"),
            )
        })?;
        expr.evaluate(&snapshot)?.into_instant(CALL_SITE)
    }

    fn merge_or_replace(&self, existing: &V, incoming: V) -> V {
        if self.config.replaces_objects_on_update {
            return incoming;
        }
        let keys = incoming.mergeable_keys();
        if keys.is_empty() {
            return incoming;
        }
        let mut merged = existing.clone();
        for key in keys {
            let op = incoming.merge_field(&key);
            merged.apply_merge(&key, op);
        }
        merged
    }

    /// Insert or update `key`. New tracked entries start with no
    /// usage-index record (absence means count 0, per the usage-index
    /// invariant — spec §8 scenario 2 requires a freshly-inserted entry to
    /// be evictable until something actually checks it out) and get an
    /// expiration index record (if `expires_objects`); updates refresh
    /// expiration and insertion order but never reset usage (spec §4.9,
    /// `set`). There is no runtime nil check on `key`/`value` here: `K`
    /// and `V` are ordinary owned Rust values with no nullable
    /// representation, so `CacheError::NilKey`/`NilValue` can never arise
    /// from this call; see [`crate::error::CacheError::nil_key`] for where
    /// that error kind is meant to be raised instead.
    pub fn set(&self, key: K, value: V, tracked: bool) -> CacheResult<()> {
        self.check_not_poisoned("DatabaseCache::set")?;
        let mut state = self.state.lock();

        if state.tracked.contains(&key) {
            let existing = state
                .storage
                .get(&key)
                .expect("tracked key missing from storage");
            let candidate = self.merge_or_replace(existing, value);

            let new_record = if self.config.expires_objects {
                let seq = state.seq_counter + 1;
                Some((self.compute_expiration(seq, &candidate)?, seq))
            } else {
                None
            };

            state.storage.insert(key.clone(), candidate);
            if let Some((instant, seq)) = new_record {
                state.seq_counter = seq;
                state.expiration_index.retain(|(_, _, k)| k != &key);
                insert_expiration_sorted(&mut state.expiration_index, instant, seq, key.clone());
            }
            if let Some(pos) = state.insertion_order.iter().position(|k| k == &key) {
                state.insertion_order.remove(pos);
            }
            state.insertion_order.push_back(key.clone());
            return self.verify_invariants(&state);
        }

        if state.storage.contains_key(&key) {
            // Present but untracked: plain overwrite, membership unchanged.
            state.storage.insert(key, value);
            return Ok(());
        }

        if tracked {
            let new_record = if self.config.expires_objects {
                let seq = state.seq_counter + 1;
                Some((self.compute_expiration(seq, &value)?, seq))
            } else {
                None
            };
            state.storage.insert(key.clone(), value);
            state.tracked.insert(key.clone());
            if let Some((instant, seq)) = new_record {
                state.seq_counter = seq;
                insert_expiration_sorted(&mut state.expiration_index, instant, seq, key.clone());
            }
            state.insertion_order.push_back(key);
        } else {
            state.storage.insert(key, value);
        }
        self.verify_invariants(&state)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.state.lock().storage.get(key).cloned()
    }

    fn remove_locked(&self, state: &mut CacheState<K, V>, key: &K) {
        state.storage.remove(key);
        state.tracked.remove(key);
        state.usage_index.remove(key);
        state.expiration_index.retain(|(_, _, k)| k != key);
        if let Some(pos) = state.insertion_order.iter().position(|k| k == key) {
            state.insertion_order.remove(pos);
        }
    }

    pub fn remove(&self, key: &K) -> CacheResult<()> {
        self.check_not_poisoned("DatabaseCache::remove")?;
        let mut state = self.state.lock();
        self.remove_locked(&mut state, key);
        Ok(())
    }

    pub fn clear(&self) -> CacheResult<()> {
        self.check_not_poisoned("DatabaseCache::clear")?;
        *self.state.lock() = CacheState::new();
        Ok(())
    }

    pub fn increment_usage(&self, key: &K) -> CacheResult<()> {
        self.check_not_poisoned("DatabaseCache::increment_usage")?;
        if !self.config.tracks_object_usage {
            return Err(CacheError::not_tracked("DatabaseCache::increment_usage"));
        }
        let mut state = self.state.lock();
        if !state.tracked.contains(key) {
            return Err(CacheError::not_tracked("DatabaseCache::increment_usage"));
        }
        let count = state.usage_index.get(key).copied().unwrap_or(0);
        state.usage_index.insert(key.clone(), count + 1);
        Ok(())
    }

    /// Decrementing to 0 removes the usage-index record (absence means
    /// zero, per spec §3's usage-index invariant) without evicting the
    /// entry synchronously.
    pub fn decrement_usage(&self, key: &K) -> CacheResult<()> {
        self.check_not_poisoned("DatabaseCache::decrement_usage")?;
        if !self.config.tracks_object_usage {
            return Err(CacheError::not_tracked("DatabaseCache::decrement_usage"));
        }
        let mut state = self.state.lock();
        if !state.tracked.contains(key) {
            return Err(CacheError::not_tracked("DatabaseCache::decrement_usage"));
        }
        let count = state.usage_index.get(key).copied().unwrap_or(0);
        if count <= 1 {
            state.usage_index.remove(key);
        } else {
            state.usage_index.insert(key.clone(), count - 1);
        }
        Ok(())
    }

    pub fn usage_count(&self, key: &K) -> u64 {
        self.state.lock().usage_index.get(key).copied().unwrap_or(0)
    }

    pub fn all_keys(&self) -> Vec<K> {
        self.state.lock().storage.keys().cloned().collect()
    }

    pub fn tracked_keys(&self) -> Vec<K> {
        self.state.lock().tracked.iter().cloned().collect()
    }

    pub fn untracked_keys(&self) -> Vec<K> {
        let state = self.state.lock();
        state
            .storage
            .keys()
            .filter(|k| !state.tracked.contains(*k))
            .cloned()
            .collect()
    }

    pub fn all_objects(&self) -> Vec<V> {
        self.state.lock().storage.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Single-key eviction (spec §C.1): reuses the full batch delegate
    /// envelope for a one-entry batch tagged [`EvictionCycle::Unknown`].
    pub fn evict(&self, key: &K) -> CacheResult<()> {
        self.check_not_poisoned("DatabaseCache::evict")?;
        let delegate = self.delegate();

        if let Some(d) = &delegate {
            if !d.should_begin_eviction_cycle() {
                return Ok(());
            }
            d.will_begin_eviction_cycle(EvictionCycle::Unknown);
        }

        let snapshot = {
            let state = self.state.lock();
            if !state.tracked.contains(key) {
                None
            } else {
                let usage = state.usage_index.get(key).copied().unwrap_or(0);
                state.storage.get(key).cloned().map(|value| (value, usage))
            }
        };

        let Some((value, usage)) = snapshot else {
            if let Some(d) = &delegate {
                d.did_complete_eviction_cycle(EvictionCycle::Unknown);
            }
            return Err(CacheError::entry_not_found("DatabaseCache::evict"));
        };

        if usage > 0 && !self.config.evicts_objects_in_use {
            if let Some(d) = &delegate {
                d.did_complete_eviction_cycle(EvictionCycle::Unknown);
            }
            return Err(CacheError::object_in_use("DatabaseCache::evict"));
        }

        let should = delegate
            .as_ref()
            .map(|d| d.should_evict_object(&value, key, EvictionCycle::Unknown))
            .unwrap_or(true);
        if !should {
            if let Some(d) = &delegate {
                d.did_complete_eviction_cycle(EvictionCycle::Unknown);
            }
            return Ok(());
        }

        if let Some(d) = &delegate {
            d.will_evict_objects(&[&value], &[key], EvictionCycle::Unknown);
        }
        {
            let mut state = self.state.lock();
            self.remove_locked(&mut state, key);
        }
        if let Some(d) = &delegate {
            d.did_evict_objects(&[value], &[key.clone()], EvictionCycle::Unknown);
            d.did_complete_eviction_cycle(EvictionCycle::Unknown);
        }
        Ok(())
    }

    /// Submits the `Expiration -> Size(policy) -> Usage` cycle chain to
    /// the internal eviction queue. Returns once the chain is accepted,
    /// not once it completes (spec §4.9, `process_evictions`).
    pub fn process_evictions(self: &Arc<Self>) -> CacheResult<()> {
        self.check_not_poisoned("DatabaseCache::process_evictions")?;
        if let Some(delegate) = self.delegate() {
            if !delegate.should_begin_eviction_cycle() {
                debug!(target: "objectcache::cache", "eviction chain vetoed by delegate");
                return Ok(());
            }
        }

        let expiration_op = eviction::spawn(self.clone(), EvictionKind::Expiration);
        let size_op = eviction::spawn(self.clone(), EvictionKind::Size);
        let usage_op = eviction::spawn(self.clone(), EvictionKind::Usage);
        size_op.add_dependency(expiration_op.clone());
        usage_op.add_dependency(size_op.clone());

        {
            let mut pending = self.pending_eviction_ops.lock();
            pending.push(Arc::downgrade(&expiration_op));
            pending.push(Arc::downgrade(&size_op));
            pending.push(Arc::downgrade(&usage_op));
        }

        self.eviction_queue
            .add_operations(vec![expiration_op, size_op, usage_op])
    }

    /// Sets the cancellation flag on every eviction operation submitted
    /// so far that hasn't already finished (spec §5, "Cancelling the
    /// eviction queue").
    pub fn cancel_evictions(&self) {
        for op in self.pending_eviction_ops.lock().drain(..) {
            if let Some(op) = op.upgrade() {
                op.cancel(None);
            }
        }
    }

    /// Submits `process_evictions` immediately, independent of the timer
    /// (spec §4.9, "Low-memory hook").
    pub fn notify_low_memory(self: &Arc<Self>) -> CacheResult<()> {
        if !self.config.evicts_on_low_memory {
            return Ok(());
        }
        self.process_evictions()
    }

    pub(crate) fn run_expiration_cycle(&self, is_cancelled: &dyn Fn() -> bool) -> CacheResult<()> {
        if !self.config.expires_objects {
            return Ok(());
        }
        let delegate = self.delegate();
        if let Some(d) = &delegate {
            d.will_begin_eviction_cycle(EvictionCycle::Expiration);
        }

        let now = Instant::now();
        let candidates: Vec<K> = {
            let state = self.state.lock();
            state
                .expiration_index
                .iter()
                .take_while(|(instant, _, _)| *instant <= now)
                .map(|(_, _, k)| k.clone())
                .collect()
        };

        let mut batch_keys = Vec::new();
        let mut batch_values = Vec::new();
        let mut stale_index_entries = Vec::new();

        for key in candidates {
            if is_cancelled() {
                break;
            }
            let Some(value) = self.state.lock().storage.get(&key).cloned() else {
                continue;
            };
            let should = delegate
                .as_ref()
                .map(|d| d.should_evict_object(&value, &key, EvictionCycle::Expiration))
                .unwrap_or(true);
            if !should {
                continue;
            }

            let remove_entirely = if self.config.tracks_object_usage {
                let mut state = self.state.lock();
                let count = state.usage_index.get(&key).copied().unwrap_or(0);
                if count <= 1 {
                    state.usage_index.remove(&key);
                } else {
                    state.usage_index.insert(key.clone(), count - 1);
                }
                count <= 1 || self.config.evicts_objects_in_use
            } else {
                true
            };

            if remove_entirely {
                batch_keys.push(key);
                batch_values.push(value);
            } else {
                stale_index_entries.push(key);
            }
        }

        if !batch_keys.is_empty() {
            if let Some(d) = &delegate {
                let value_refs: Vec<&V> = batch_values.iter().collect();
                let key_refs: Vec<&K> = batch_keys.iter().collect();
                d.will_evict_objects(&value_refs, &key_refs, EvictionCycle::Expiration);
            }
        }

        {
            let mut state = self.state.lock();
            for key in &batch_keys {
                self.remove_locked(&mut state, key);
            }
            for key in &stale_index_entries {
                state.expiration_index.retain(|(_, _, k)| k != key);
            }
        }

        if !batch_keys.is_empty() {
            if let Some(d) = &delegate {
                d.did_evict_objects(&batch_values, &batch_keys, EvictionCycle::Expiration);
            }
        }
        if let Some(d) = &delegate {
            d.did_complete_eviction_cycle(EvictionCycle::Expiration);
        }
        trace!(target: "objectcache::eviction", "expiration cycle evicted {} entries", batch_keys.len());
        Ok(())
    }

    pub(crate) fn run_size_cycle(&self, is_cancelled: &dyn Fn() -> bool) -> CacheResult<()> {
        let target = self.config.preferred_max_object_count;
        if target == 0 {
            return Ok(());
        }
        let policy = self.config.eviction_policy;
        let cycle_id = match policy {
            EvictionPolicy::Fifo => EvictionCycle::Fifo,
            EvictionPolicy::Lifo => EvictionCycle::Lifo,
        };
        let delegate = self.delegate();
        if let Some(d) = &delegate {
            d.will_begin_eviction_cycle(cycle_id);
        }

        let (ordered, usage_snapshot, storage_snapshot, mut virtual_size) = {
            let state = self.state.lock();
            let ordered: Vec<K> = match policy {
                EvictionPolicy::Fifo => state.insertion_order.iter().cloned().collect(),
                EvictionPolicy::Lifo => state.insertion_order.iter().rev().cloned().collect(),
            };
            (
                ordered,
                state.usage_index.clone(),
                state.storage.clone(),
                state.tracked.len() as i64,
            )
        };

        let aggressive = target < 0;
        let mut batch_keys = Vec::new();
        let mut batch_values = Vec::new();

        for key in ordered {
            if is_cancelled() {
                break;
            }
            let above_target = if aggressive { virtual_size > 0 } else { virtual_size > target };
            if !above_target {
                break;
            }
            let usage = usage_snapshot.get(&key).copied().unwrap_or(0);
            if usage > 0 && !self.config.evicts_objects_in_use {
                continue;
            }
            let Some(value) = storage_snapshot.get(&key).cloned() else {
                continue;
            };
            let should = delegate
                .as_ref()
                .map(|d| d.should_evict_object(&value, &key, cycle_id))
                .unwrap_or(true);
            if !should {
                continue;
            }
            batch_keys.push(key);
            batch_values.push(value);
            virtual_size -= 1;
        }

        let still_above = if aggressive { virtual_size > 0 } else { virtual_size > target };

        if !batch_keys.is_empty() {
            if let Some(d) = &delegate {
                let value_refs: Vec<&V> = batch_values.iter().collect();
                let key_refs: Vec<&K> = batch_keys.iter().collect();
                d.will_evict_objects(&value_refs, &key_refs, cycle_id);
            }
            let mut state = self.state.lock();
            for key in &batch_keys {
                // Re-check liveness: concurrent activity may have already
                // removed this key between the snapshot and now.
                if state.tracked.contains(key) {
                    self.remove_locked(&mut state, key);
                }
            }
            drop(state);
            if let Some(d) = &delegate {
                d.did_evict_objects(&batch_values, &batch_keys, cycle_id);
            }
        }
        if let Some(d) = &delegate {
            d.did_complete_eviction_cycle(cycle_id);
        }
        trace!(target: "objectcache::eviction", "size cycle ({cycle_id}) evicted {} entries", batch_keys.len());

        if still_above {
            return Err(CacheError::object_in_use("DatabaseCache::process_evictions"));
        }
        Ok(())
    }

    pub(crate) fn run_usage_cycle(&self, is_cancelled: &dyn Fn() -> bool) -> CacheResult<()> {
        if !self.config.tracks_object_usage {
            return Ok(());
        }
        let delegate = self.delegate();
        if let Some(d) = &delegate {
            d.will_begin_eviction_cycle(EvictionCycle::Usage);
        }

        let (candidates, storage_snapshot) = {
            let state = self.state.lock();
            let candidates: Vec<K> = state
                .tracked
                .iter()
                .filter(|k| !state.usage_index.contains_key(*k))
                .cloned()
                .collect();
            (candidates, state.storage.clone())
        };

        let mut batch_keys = Vec::new();
        let mut batch_values = Vec::new();
        for key in candidates {
            if is_cancelled() {
                break;
            }
            let Some(value) = storage_snapshot.get(&key).cloned() else {
                continue;
            };
            let should = delegate
                .as_ref()
                .map(|d| d.should_evict_object(&value, &key, EvictionCycle::Usage))
                .unwrap_or(true);
            if should {
                batch_keys.push(key);
                batch_values.push(value);
            }
        }

        if !batch_keys.is_empty() {
            if let Some(d) = &delegate {
                let value_refs: Vec<&V> = batch_values.iter().collect();
                let key_refs: Vec<&K> = batch_keys.iter().collect();
                d.will_evict_objects(&value_refs, &key_refs, EvictionCycle::Usage);
            }
            let mut state = self.state.lock();
            for key in &batch_keys {
                if !state.usage_index.contains_key(key) {
                    self.remove_locked(&mut state, key);
                }
            }
            drop(state);
            if let Some(d) = &delegate {
                d.did_evict_objects(&batch_values, &batch_keys, EvictionCycle::Usage);
            }
        }
        if let Some(d) = &delegate {
            d.did_complete_eviction_cycle(EvictionCycle::Usage);
        }
        trace!(target: "objectcache::eviction", "usage cycle evicted {} entries", batch_keys.len());
        Ok(())
    }
}

impl<K, V> Drop for DatabaseCache<K, V> {
    fn drop(&mut self) {
        self.timer_stop.store(true, Ordering::SeqCst);
    }
}

fn spawn_timer<K, V>(cache: Weak<DatabaseCache<K, V>>, interval: Duration, stop: Arc<AtomicBool>) -> JoinHandle<()>
where
    K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
    V: Mergeable + Clone + Send + Sync + 'static,
{
    std::thread::Builder::new()
        .name("objectcache-eviction-timer".to_string())
        .spawn(move || {
            let poll = Duration::from_millis(20).min(interval);
            loop {
                let mut waited = Duration::ZERO;
                while waited < interval {
                    if stop.load(Ordering::SeqCst) {
                        return;
                    }
                    std::thread::sleep(poll);
                    waited += poll;
                }
                let Some(cache) = cache.upgrade() else {
                    return;
                };
                if let Err(error) = cache.process_evictions() {
                    warn!(target: "objectcache::cache", "scheduled eviction failed to enqueue: {error}");
                }
            }
        })
        .expect("failed to spawn eviction timer thread")
}
