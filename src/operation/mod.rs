//! The extended-operation framework (C4–C7): a conditional, observable,
//! delegating execution unit used to host eviction cycles, per spec §2.

pub mod condition;
pub mod core;
pub mod group;
pub mod mutex_coordinator;
pub mod queue;
pub mod state;

pub use condition::{always, evaluate_all, OperationCondition};
pub use core::{NoOpBody, Operation, OperationBody, OperationDelegate, OperationHandle, OperationObserver};
pub use group::GroupOperation;
pub use mutex_coordinator::MutexCoordinator;
pub use queue::{sentinel, OperationQueue, OperationQueueDelegate, PermissiveDelegate};
pub use state::OperationState;
