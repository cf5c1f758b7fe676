//! Operation conditions (spec §4.4, "Conditions"): a precondition an
//! operation must satisfy before it executes, which can also contribute a
//! dependency operation and mutual exclusion.
//!
//! Per `SPEC_FULL.md` §C.2, mutual exclusion is folded into the condition
//! itself (`exclusivity_category`) rather than tracked on the side, mirroring
//! `VDSMutexCondition.h` treating the mutex category as a first-class
//! condition.

use std::sync::Arc;

use crate::error::{CacheError, CacheErrorKind};

use super::core::Operation;

/// A named precondition on an operation.
pub struct OperationCondition {
    pub name: &'static str,
    /// When set, the operation is serialized against every other pending
    /// operation carrying the same category name via the mutex
    /// coordinator (C6).
    pub exclusivity_category: Option<&'static str>,
    dependency: Option<Box<dyn Fn() -> Option<Arc<Operation>> + Send + Sync>>,
    evaluator: Box<dyn Fn() -> Result<(), CacheError> + Send + Sync>,
}

impl OperationCondition {
    pub fn new(
        name: &'static str,
        evaluator: impl Fn() -> Result<(), CacheError> + Send + Sync + 'static,
    ) -> Self {
        OperationCondition {
            name,
            exclusivity_category: None,
            dependency: None,
            evaluator: Box::new(evaluator),
        }
    }

    #[must_use]
    pub fn mutually_exclusive(mut self, category: &'static str) -> Self {
        self.exclusivity_category = Some(category);
        self
    }

    #[must_use]
    pub fn with_dependency(
        mut self,
        dependency: impl Fn() -> Option<Arc<Operation>> + Send + Sync + 'static,
    ) -> Self {
        self.dependency = Some(Box::new(dependency));
        self
    }

    pub fn is_mutually_exclusive(&self) -> bool {
        self.exclusivity_category.is_some()
    }

    pub fn dependency_operation(&self) -> Option<Arc<Operation>> {
        self.dependency.as_ref().and_then(|f| f())
    }

    pub fn evaluate(&self) -> Result<(), CacheError> {
        (self.evaluator)()
    }
}

/// Always succeeds — a condition whose only purpose is to carry an
/// exclusivity category or a dependency edge.
pub fn always(name: &'static str) -> OperationCondition {
    OperationCondition::new(name, || Ok(()))
}

/// Runs every condition's evaluator. Fails iff any member fails; on
/// failure the returned error is a single [`CacheError`] of kind
/// `OperationConditionFailed` whose source chain contains every
/// underlying failure (spec §4.4: "a single aggregate error whose chain
/// contains each underlying failure").
pub fn evaluate_all(conditions: &[OperationCondition], call_site: &'static str) -> Result<(), CacheError> {
    let mut failures = Vec::new();
    for condition in conditions {
        if let Err(error) = condition.evaluate() {
            failures.push(error);
        }
    }
    if failures.is_empty() {
        return Ok(());
    }
    let aggregate =
        CacheError::aggregate(failures).expect("non-empty failures always aggregate to Some");
    Err(CacheError::new(
        call_site,
        CacheErrorKind::OperationConditionFailed,
        "one or more operation conditions failed",
    )
    .with_source(aggregate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pass_is_ok() {
        let conditions = vec![always("a"), always("b")];
        assert!(evaluate_all(&conditions, "test").is_ok());
    }

    #[test]
    fn one_failure_surfaces_as_aggregate() {
        let failing = OperationCondition::new("bad", || {
            Err(CacheError::new(
                "bad",
                CacheErrorKind::OperationConditionFailed,
                "nope",
            ))
        });
        let conditions = vec![always("a"), failing];
        let err = evaluate_all(&conditions, "test").unwrap_err();
        assert_eq!(err.kind(), Some(CacheErrorKind::OperationConditionFailed));
    }
}
