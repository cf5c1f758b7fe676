//! Operation queue (C5): accepts operations, installs condition
//! dependencies, enforces cross-queue mutual exclusion via C6, and
//! notifies its delegate, per spec §4.5.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Sender};
use log::{debug, warn};

use crate::error::{CacheError, CacheErrorKind};

use super::core::{NoOpBody, Operation};
use super::mutex_coordinator::MutexCoordinator;

/// Receives the four queue-level notifications from spec §6's
/// "Operation-queue delegate".
pub trait OperationQueueDelegate: Send + Sync {
    fn should_add_operation(&self, _op: &Operation) -> bool {
        true
    }
    fn will_add_operation(&self, _op: &Operation) {}
    fn did_add_operation(&self, _op: &Operation) {}
    fn operation_did_finish(&self, _op: &Operation) {}
}

/// A no-op delegate for queues that don't need gating.
pub struct PermissiveDelegate;

impl OperationQueueDelegate for PermissiveDelegate {}

/// A cooperative executor of operations on a fixed-size worker pool,
/// backed by `crossbeam-channel`.
pub struct OperationQueue {
    name: &'static str,
    sender: Sender<Arc<Operation>>,
    workers: Vec<JoinHandle<()>>,
    delegate: Arc<dyn OperationQueueDelegate>,
}

impl OperationQueue {
    pub fn new(name: &'static str, worker_count: usize, delegate: Arc<dyn OperationQueueDelegate>) -> Self {
        let (sender, receiver) = bounded::<Arc<Operation>>(1024);
        let workers = (0..worker_count.max(1))
            .map(|i| {
                let receiver = receiver.clone();
                std::thread::Builder::new()
                    .name(format!("{name}-worker-{i}"))
                    .spawn(move || {
                        while let Ok(op) = receiver.recv() {
                            op.run();
                        }
                    })
                    .expect("failed to spawn operation queue worker thread")
            })
            .collect();
        OperationQueue {
            name,
            sender,
            workers,
            delegate,
        }
    }

    pub fn with_default_delegate(name: &'static str, worker_count: usize) -> Self {
        Self::new(name, worker_count, Arc::new(PermissiveDelegate))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the six-step enqueue algorithm from spec §4.5 on a single
    /// operation. Recursively enqueues any dependency producers surfaced
    /// by the operation's conditions.
    pub fn add_operation(&self, op: Arc<Operation>) -> Result<(), CacheError> {
        // Step 1: notify the operation it is about to be enqueued.
        op.mark_enqueued()?;

        // Step 2: install condition dependency producers, recursively
        // enqueuing each dependency that isn't already enqueued.
        let conditions_snapshot: Vec<_> = {
            // `conditions()` only exposes names; re-derive dependency
            // producers by iterating the underlying list directly.
            op.dependency_operations()
        };
        for dependency in conditions_snapshot {
            op.add_dependency(dependency.clone());
            if !dependency.is_enqueued() {
                self.add_operation(dependency)?;
            }
        }

        // Step 3: register with the mutex coordinator for each
        // mutually-exclusive condition category.
        let categories = op.exclusivity_categories();
        if !categories.is_empty() {
            MutexCoordinator::global().add_operation(&op, &categories);
        }

        // Step 4: attach the finalizer: on Finished, notify the queue
        // delegate and unregister from C6.
        let delegate = self.delegate.clone();
        let categories_for_hook = categories.clone();
        let op_for_hook = op.clone();
        op.on_finished(move |finished| {
            debug!(target: "objectcache::operation", "{} finished on queue", finished.name());
            MutexCoordinator::global().remove_operation(&op_for_hook, &categories_for_hook);
            delegate.operation_did_finish(finished);
        });

        // Step 5: ask the delegate whether to accept the operation.
        if !self.delegate.should_add_operation(&op) {
            return Err(CacheError::new(
                "OperationQueue::add_operation",
                CacheErrorKind::OperationEnqueueFailed,
                "queue delegate refused to add operation",
            ));
        }

        // Step 6: will_add_operation, then submit.
        self.delegate.will_add_operation(&op);
        self.sender.send(op.clone()).map_err(|_| {
            CacheError::new(
                "OperationQueue::add_operation",
                CacheErrorKind::OperationEnqueueFailed,
                "operation queue worker channel is closed",
            )
        })?;
        self.delegate.did_add_operation(&op);
        Ok(())
    }

    /// Adds several operations. On partial failure, attempts to cancel
    /// the operations already accepted and aggregates every error seen.
    pub fn add_operations(&self, ops: Vec<Arc<Operation>>) -> Result<(), CacheError> {
        let mut accepted = Vec::with_capacity(ops.len());
        let mut failures = Vec::new();
        for op in ops {
            match self.add_operation(op.clone()) {
                Ok(()) => accepted.push(op),
                Err(error) => failures.push(error),
            }
        }
        if failures.is_empty() {
            return Ok(());
        }
        for op in &accepted {
            op.cancel(None);
        }
        Err(CacheError::aggregate(failures).expect("non-empty failures always aggregate to Some"))
    }

    /// Convenience: submit a bare closure as a minimal operation with no
    /// conditions, observers, or delegate (spec §4.5, "non-C4 operations").
    pub fn add_block(&self, name: &'static str, body: impl FnOnce() + Send + 'static) -> Result<(), CacheError> {
        struct ClosureBody<F: FnOnce() + Send> {
            body: Option<F>,
        }
        impl<F: FnOnce() + Send> super::core::OperationBody for ClosureBody<F> {
            fn execute(&mut self, _handle: &super::core::OperationHandle) {
                if let Some(body) = self.body.take() {
                    body();
                }
            }
        }
        let op = Operation::new(name, ClosureBody { body: Some(body) });
        self.add_operation(op)
    }

    /// The queue does not retain finished operations, so chain-wide
    /// cancellation is the caller's responsibility: hold the `Arc<Operation>`
    /// handles and call `cancel` directly, as the eviction chain (C8) does.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for OperationQueue {
    fn drop(&mut self) {
        // Dropping `sender` closes the channel; workers exit their recv
        // loop and we join them so the queue shuts down cleanly.
        let (replacement, _unused) = bounded::<Arc<Operation>>(1);
        let old_sender = std::mem::replace(&mut self.sender, replacement);
        drop(old_sender);
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// A trivial no-op operation, used by [`super::group::GroupOperation`] for
/// its start/finish sentinels.
pub fn sentinel(name: &'static str) -> Arc<Operation> {
    Operation::new(name, NoOpBody)
}
