//! Group operation (C7): a composite operation backed by an internal
//! queue, presented to the outside world as a single operation with
//! start/finish sentinels, per spec §4.7.

use std::sync::Arc;

use crate::error::CacheError;

use super::core::{Operation, OperationBody, OperationHandle};
use super::queue::{sentinel, OperationQueue};

/// The body installed on the group's own `Operation`: its `execute` just
/// enqueues the start sentinel and blocks until the finish sentinel
/// completes, so the group's own lifecycle tracks its children's.
struct GroupBody {
    queue: Arc<OperationQueue>,
    start: Arc<Operation>,
    finish: Arc<Operation>,
}

impl OperationBody for GroupBody {
    fn execute(&mut self, _handle: &OperationHandle) {
        if self.queue.add_operation(self.start.clone()).is_err() {
            return;
        }
        self.finish.wait_until_finished();
    }
}

/// A group of operations, every one of which is wired with a prerequisite
/// on `start` and installed as a dependency of `finish`, so the group's
/// own `Operation` cannot leave `Executing` until every child reaches
/// `Finished` (spec §4.7).
pub struct GroupOperation {
    queue: Arc<OperationQueue>,
    start: Arc<Operation>,
    finish: Arc<Operation>,
    outer: Arc<Operation>,
}

impl GroupOperation {
    pub fn new(name: &'static str) -> Self {
        let queue = Arc::new(OperationQueue::with_default_delegate(name, 2));
        let start = sentinel("group-start");
        let finish = sentinel("group-finish");
        let outer = Operation::new(
            name,
            GroupBody {
                queue: queue.clone(),
                start: start.clone(),
                finish: finish.clone(),
            },
        );
        GroupOperation {
            queue,
            start,
            finish,
            outer,
        }
    }

    /// Adds a child operation: depends on `start`, and `finish` depends
    /// on it, so `finish` cannot complete before every child does.
    pub fn add_operation(&self, op: Arc<Operation>) -> Result<(), CacheError> {
        op.add_dependency(self.start.clone());
        self.finish.add_dependency(op.clone());
        self.queue.add_operation(op)
    }

    /// The group as a single `Operation`, enqueueable on any other queue.
    pub fn as_operation(&self) -> Arc<Operation> {
        self.outer.clone()
    }

    /// Finalizes the group: once every child has been added, call this
    /// so the finish sentinel is itself enqueued and can complete once
    /// its dependencies (the children) all finish.
    pub fn seal(&self) -> Result<(), CacheError> {
        self.queue.add_operation(self.finish.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::core::NoOpBody;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn group_finishes_only_after_all_children() {
        let group = GroupOperation::new("g");
        let count = Arc::new(AtomicUsize::new(0));

        for i in 0..3 {
            let count = count.clone();
            struct CountingBody {
                count: Arc<AtomicUsize>,
            }
            impl OperationBody for CountingBody {
                fn execute(&mut self, _handle: &OperationHandle) {
                    std::thread::sleep(Duration::from_millis(10));
                    self.count.fetch_add(1, Ordering::SeqCst);
                }
            }
            let child = Operation::new("child", CountingBody { count });
            group.add_operation(child).unwrap();
            let _ = i;
        }
        group.seal().unwrap();

        let outer = group.as_operation();
        let mutex_queue = crate::operation::queue::OperationQueue::with_default_delegate("outer", 1);
        mutex_queue.add_operation(outer.clone()).unwrap();
        outer.wait_until_finished();

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn empty_group_finishes_immediately() {
        let group = GroupOperation::new("g");
        group.seal().unwrap();
        let outer = group.as_operation();
        let queue = OperationQueue::with_default_delegate("outer", 1);
        queue.add_operation(outer.clone()).unwrap();
        outer.wait_until_finished();
        let _ = NoOpBody;
    }
}
