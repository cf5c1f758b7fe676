//! Operation state machine (C4): the seven-state lifecycle with guarded
//! transitions, conditions, observers, a single delegate, and an error
//! list, per spec §4.4.
//!
//! Mirrors the "inheritance becomes traits + variants" design note: one
//! [`OperationBody`] trait supplies the `execute`/`finishing` extension
//! points for the concrete operation kinds (block, group, eviction), and
//! `Operation` itself supplies the shared lifecycle every kind needs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use log::{debug, trace};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::error::{CacheError, CacheErrorKind};

use super::condition::{evaluate_all, OperationCondition};
use super::state::OperationState;

/// Primary override point for a concrete operation kind. Mirrors
/// `VDSOperation.h`'s `execute`/`finishing` pair.
pub trait OperationBody: Send {
    /// The operation's main work. Runs with state `Executing`. Skipped
    /// entirely if the operation was cancelled before reaching this
    /// point — implementations do not need to re-check cancellation
    /// themselves for the "don't do the work" case, but long-running
    /// bodies iterating multiple entries should still poll
    /// [`OperationHandle::is_cancelled`] between entries to exit early.
    fn execute(&mut self, handle: &OperationHandle);

    /// Extra behavior during the finishing transition. Runs with state
    /// `Finishing`, after errors collected during `execute` are already
    /// visible via [`OperationHandle::errors`]. Default: nothing.
    fn finishing(&mut self, _handle: &OperationHandle) {}
}

/// A no-op body, used for group operation start/finish sentinels and for
/// plain "run this closure" operations.
pub struct NoOpBody;

impl OperationBody for NoOpBody {
    fn execute(&mut self, _handle: &OperationHandle) {}
}

/// Receives the two notifications every operation can broadcast.
pub trait OperationObserver: Send + Sync {
    fn did_start(&self, _op_name: &str) {}
    fn did_finish(&self, _op_name: &str, _errors: &[CacheError]) {}
}

/// A single optional delegate per operation. `will_start` may cancel the
/// operation; the execution path observes that before running the main
/// work (spec §4.4, "Delegate").
pub trait OperationDelegate: Send + Sync {
    fn will_start(&self, _op: &OperationHandle) {}
    fn did_start(&self, _op_name: &str) {}
    fn will_finish(&self, _op_name: &str) {}
    fn did_finish(&self, _op_name: &str, _errors: &[CacheError]) {}
}

/// A reference to the running operation passed into [`OperationBody`]
/// methods, giving access to cancellation, the error list, and `finish`.
pub struct OperationHandle<'a> {
    op: &'a Operation,
}

impl<'a> OperationHandle<'a> {
    pub fn is_cancelled(&self) -> bool {
        self.op.is_cancelled()
    }

    pub fn add_error(&self, error: CacheError) {
        self.op.add_error(error);
    }

    pub fn name(&self) -> &str {
        &self.op.name
    }
}

/// An operation: conditional, observable, delegating, with an explicit
/// seven-state lifecycle (spec §4.4).
pub struct Operation {
    name: String,
    state: Mutex<OperationState>,
    finished: Condvar,
    cancelled: AtomicBool,
    enqueued: AtomicBool,
    conditions: Mutex<Vec<OperationCondition>>,
    observers: Mutex<Vec<Arc<dyn OperationObserver>>>,
    errors: Mutex<Vec<CacheError>>,
    delegate: RwLock<Option<Weak<dyn OperationDelegate>>>,
    dependencies: Mutex<Vec<Arc<Operation>>>,
    finish_hooks: Mutex<Vec<Box<dyn Fn(&Operation) + Send + Sync>>>,
    body: Mutex<Box<dyn OperationBody>>,
}

impl Operation {
    pub fn new(name: impl Into<String>, body: impl OperationBody + 'static) -> Arc<Operation> {
        Arc::new(Operation {
            name: name.into(),
            state: Mutex::new(OperationState::Initialized),
            finished: Condvar::new(),
            cancelled: AtomicBool::new(false),
            enqueued: AtomicBool::new(false),
            conditions: Mutex::new(Vec::new()),
            observers: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            delegate: RwLock::new(None),
            dependencies: Mutex::new(Vec::new()),
            finish_hooks: Mutex::new(Vec::new()),
            body: Mutex::new(Box::new(body)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> OperationState {
        *self.state.lock()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_enqueued(&self) -> bool {
        self.enqueued.load(Ordering::SeqCst)
    }

    pub fn errors(&self) -> Vec<CacheError> {
        // Errors carry no Clone impl cheap enough to copy on every read in
        // the hot path, but the error list is only ever read at
        // finish-notification time, so rebuild the CacheError::Multiple
        // shape lazily here instead of cloning CacheError (it isn't Clone).
        std::mem::take(&mut self.errors.lock())
    }

    pub fn add_error(&self, error: CacheError) {
        self.errors.lock().push(error);
    }

    /// Cancels the operation and records `error` if given. Orthogonal to
    /// state: callable at any point, but only observed once the operation
    /// reaches `Executing`.
    pub fn cancel(&self, error: Option<CacheError>) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(error) = error {
            self.add_error(error);
        }
    }

    pub fn set_delegate(&self, delegate: Weak<dyn OperationDelegate>) {
        *self.delegate.write() = Some(delegate);
    }

    /// Adds a condition. Only legal while `Initialized` — adding after
    /// enqueue is a misuse error (spec §4.4, "Observers").
    pub fn add_condition(&self, condition: OperationCondition) -> Result<(), CacheError> {
        self.guard_pre_enqueue_mutation("Operation::add_condition")?;
        self.conditions.lock().push(condition);
        Ok(())
    }

    pub fn add_observer(&self, observer: Arc<dyn OperationObserver>) -> Result<(), CacheError> {
        self.guard_pre_enqueue_mutation("Operation::add_observer")?;
        self.observers.lock().push(observer);
        Ok(())
    }

    fn guard_pre_enqueue_mutation(&self, call_site: &'static str) -> Result<(), CacheError> {
        if self.enqueued.load(Ordering::SeqCst) {
            return Err(CacheError::new(
                call_site,
                CacheErrorKind::OperationModificationFailed,
                "cannot modify conditions or observers after the operation was enqueued",
            ));
        }
        Ok(())
    }

    /// Adds a prerequisite: `self` will not leave `Ready` until `dependency`
    /// reaches `Finished`. Installed by the queue while processing
    /// condition dependency producers (spec §4.5 step 2) and by the group
    /// operation when wiring children to its start/finish sentinels.
    pub fn add_dependency(&self, dependency: Arc<Operation>) {
        self.dependencies.lock().push(dependency);
    }

    pub fn dependencies(&self) -> Vec<Arc<Operation>> {
        self.dependencies.lock().clone()
    }

    pub fn conditions(&self) -> Vec<&'static str> {
        self.conditions.lock().iter().map(|c| c.name).collect()
    }

    /// Dependency operations surfaced by this operation's conditions
    /// (spec §4.5 step 2). Queried once, at enqueue time, by the queue.
    pub fn dependency_operations(&self) -> Vec<Arc<Operation>> {
        self.conditions
            .lock()
            .iter()
            .filter_map(OperationCondition::dependency_operation)
            .collect()
    }

    pub fn exclusivity_categories(&self) -> Vec<&'static str> {
        self.conditions
            .lock()
            .iter()
            .filter_map(|c| c.exclusivity_category)
            .collect()
    }

    /// Registers a hook invoked once, synchronously, the instant the
    /// operation reaches `Finished`. Used by the queue to notify its
    /// delegate and unregister from the mutex coordinator (spec §4.5
    /// step 4).
    pub fn on_finished(&self, hook: impl Fn(&Operation) + Send + Sync + 'static) {
        self.finish_hooks.lock().push(Box::new(hook));
    }

    fn transition(&self, next: OperationState) -> Result<(), CacheError> {
        let mut state = self.state.lock();
        if !state.can_transition_to(next) {
            return Err(CacheError::new(
                "Operation::transition",
                CacheErrorKind::OperationInvalidState,
                format!("illegal transition from {state} to {next}"),
            ));
        }
        trace!(target: "objectcache::operation", "{} {} -> {}", self.name, *state, next);
        *state = next;
        if next == OperationState::Finished {
            self.finished.notify_all();
        }
        Ok(())
    }

    /// Notifies the operation it is about to be enqueued: `Initialized ->
    /// Pending`, and from this point on conditions/observers are frozen.
    pub fn mark_enqueued(&self) -> Result<(), CacheError> {
        self.enqueued.store(true, Ordering::SeqCst);
        self.transition(OperationState::Pending)
    }

    /// Blocks the calling thread until the operation reaches `Finished`.
    pub fn wait_until_finished(&self) {
        let mut state = self.state.lock();
        while !state.is_terminal() {
            self.finished.wait(&mut state);
        }
    }

    fn wait_for_dependencies(&self) {
        for dependency in self.dependencies() {
            dependency.wait_until_finished();
        }
    }

    /// Drives the operation from `Pending` through to `Finished`. Called
    /// by the operation queue's worker once the operation has been
    /// dequeued; blocks the calling (worker) thread on dependencies and
    /// on the body's own execution, but never on unrelated operations.
    pub fn run(self: &Arc<Self>) {
        self.wait_for_dependencies();

        if self.transition(OperationState::Evaluating).is_err() {
            return;
        }

        let condition_result = {
            let conditions = self.conditions.lock();
            evaluate_all(&conditions, "Operation::run")
        };

        if let Err(error) = condition_result {
            self.add_error(error);
            let _ = self.transition(OperationState::Finishing);
            self.run_finishing();
            return;
        }

        if self.transition(OperationState::Ready).is_err() {
            return;
        }

        if let Some(delegate) = self.delegate.read().as_ref().and_then(Weak::upgrade) {
            delegate.will_start(&OperationHandle { op: self });
        }

        if self.transition(OperationState::Executing).is_err() {
            return;
        }

        if let Some(delegate) = self.delegate.read().as_ref().and_then(Weak::upgrade) {
            delegate.did_start(&self.name);
        }
        for observer in self.observers.lock().iter() {
            observer.did_start(&self.name);
        }

        if !self.is_cancelled() {
            let handle = OperationHandle { op: self };
            self.body.lock().execute(&handle);
        } else {
            debug!(target: "objectcache::operation", "{} skipped execute: cancelled", self.name);
        }

        let _ = self.transition(OperationState::Finishing);
        self.run_finishing();
    }

    fn run_finishing(&self) {
        if let Some(delegate) = self.delegate.read().as_ref().and_then(Weak::upgrade) {
            delegate.will_finish(&self.name);
        }

        {
            let handle = OperationHandle { op: self };
            self.body.lock().finishing(&handle);
        }

        let _ = self.transition(OperationState::Finished);

        let errors = self.errors.lock();
        if let Some(delegate) = self.delegate.read().as_ref().and_then(Weak::upgrade) {
            delegate.did_finish(&self.name, &errors);
        }
        for observer in self.observers.lock().iter() {
            observer.did_finish(&self.name, &errors);
        }
        drop(errors);

        for hook in self.finish_hooks.lock().iter() {
            hook(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingBody {
        ran: Arc<AtomicUsize>,
    }

    impl OperationBody for CountingBody {
        fn execute(&mut self, _handle: &OperationHandle) {
            self.ran.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn full_lifecycle_reaches_finished() {
        let ran = Arc::new(AtomicUsize::new(0));
        let op = Operation::new("t", CountingBody { ran: ran.clone() });
        op.mark_enqueued().unwrap();
        op.run();
        assert_eq!(op.state(), OperationState::Finished);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn condition_failure_skips_execute_and_records_error() {
        let ran = Arc::new(AtomicUsize::new(0));
        let op = Operation::new("t", CountingBody { ran: ran.clone() });
        op.add_condition(OperationCondition::new("always-fails", || {
            Err(CacheError::new(
                "t",
                CacheErrorKind::OperationConditionFailed,
                "nope",
            ))
        }))
        .unwrap();
        op.mark_enqueued().unwrap();
        op.run();
        assert_eq!(op.state(), OperationState::Finished);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancelled_operation_skips_execute_but_still_finishes() {
        let ran = Arc::new(AtomicUsize::new(0));
        let op = Operation::new("t", CountingBody { ran: ran.clone() });
        op.mark_enqueued().unwrap();
        op.cancel(None);
        op.run();
        assert_eq!(op.state(), OperationState::Finished);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn modifying_after_enqueue_is_rejected() {
        let op = Operation::new("t", NoOpBody);
        op.mark_enqueued().unwrap();
        let err = op
            .add_condition(OperationCondition::new("late", || Ok(())))
            .unwrap_err();
        assert_eq!(err.kind(), Some(CacheErrorKind::OperationModificationFailed));
    }

    #[test]
    fn dependency_must_finish_before_dependent_runs() {
        let order = Arc::new(Mutex::new(Vec::new()));
        struct RecordingBody {
            order: Arc<Mutex<Vec<&'static str>>>,
            label: &'static str,
        }
        impl OperationBody for RecordingBody {
            fn execute(&mut self, _handle: &OperationHandle) {
                self.order.lock().push(self.label);
            }
        }

        let dependency = Operation::new(
            "dep",
            RecordingBody {
                order: order.clone(),
                label: "dep",
            },
        );
        let dependent = Operation::new(
            "dependent",
            RecordingBody {
                order: order.clone(),
                label: "dependent",
            },
        );
        dependent.add_dependency(dependency.clone());

        dependency.mark_enqueued().unwrap();
        dependent.mark_enqueued().unwrap();

        let dep_clone = dependency.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            dep_clone.run();
        });
        dependent.run();
        handle.join().unwrap();

        assert_eq!(*order.lock(), vec!["dep", "dependent"]);
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let op = Operation::new("t", NoOpBody);
        let err = op.transition(OperationState::Ready).unwrap_err();
        assert_eq!(err.kind(), Some(CacheErrorKind::OperationInvalidState));
    }
}
