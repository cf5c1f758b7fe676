//! Error taxonomy for the cache and its operation framework.
//!
//! Public cache operations never panic on caller misuse or policy
//! conflicts; they return `Result<_, CacheError>`. Every variant carries the
//! symbolic call site it originated from so that a caller debugging a
//! `CacheError` printed out of context can still tell which API surface
//! raised it.

use std::fmt;

use thiserror::Error;

/// The kind of failure, independent of call site or message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CacheErrorKind {
    NilKey,
    NilValue,
    NilArgument,
    UnexpectedArgumentType,
    EntryNotFound,
    UnableToRemove,
    ObjectInUse,
    ExpirationEvaluationFailed,
    InvalidConfig,
    NotTracked,
    InvalidState,
    OperationConditionFailed,
    OperationExecutionFailed,
    OperationEnqueueFailed,
    OperationModificationFailed,
    OperationInvalidState,
}

impl fmt::Display for CacheErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CacheErrorKind::NilKey => "NilKey",
            CacheErrorKind::NilValue => "NilValue",
            CacheErrorKind::NilArgument => "NilArgument",
            CacheErrorKind::UnexpectedArgumentType => "UnexpectedArgumentType",
            CacheErrorKind::EntryNotFound => "EntryNotFound",
            CacheErrorKind::UnableToRemove => "UnableToRemove",
            CacheErrorKind::ObjectInUse => "ObjectInUse",
            CacheErrorKind::ExpirationEvaluationFailed => "ExpirationEvaluationFailed",
            CacheErrorKind::InvalidConfig => "InvalidConfig",
            CacheErrorKind::NotTracked => "NotTracked",
            CacheErrorKind::InvalidState => "InvalidState",
            CacheErrorKind::OperationConditionFailed => "OperationConditionFailed",
            CacheErrorKind::OperationExecutionFailed => "OperationExecutionFailed",
            CacheErrorKind::OperationEnqueueFailed => "OperationEnqueueFailed",
            CacheErrorKind::OperationModificationFailed => "OperationModificationFailed",
            CacheErrorKind::OperationInvalidState => "OperationInvalidState",
        };
        f.write_str(s)
    }
}

/// An error raised by the cache or its operation framework.
///
/// Carries the originating call site (a symbolic, `&'static str` name —
/// not a stack trace), an ordered list of the argument names involved, the
/// error kind, a human-readable description, and an optional chained
/// source error. Aggregated failures use [`CacheError::Multiple`] rather
/// than nesting under a single source slot, so every constituent stays
/// visible.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("{call_site}: {kind} ({description})")]
    Single {
        call_site: &'static str,
        kind: CacheErrorKind,
        arguments: Vec<&'static str>,
        description: String,
        #[source]
        source: Option<Box<CacheError>>,
    },
    #[error("{0} aggregated error(s): {1:?}", .0 = .0.len())]
    Multiple(Vec<CacheError>),
}

impl CacheError {
    pub fn new(
        call_site: &'static str,
        kind: CacheErrorKind,
        description: impl Into<String>,
    ) -> Self {
        CacheError::Single {
            call_site,
            kind,
            arguments: Vec::new(),
            description: description.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_argument(mut self, argument: &'static str) -> Self {
        if let CacheError::Single { arguments, .. } = &mut self {
            arguments.push(argument);
        }
        self
    }

    #[must_use]
    pub fn with_source(mut self, cause: CacheError) -> Self {
        if let CacheError::Single { source, .. } = &mut self {
            *source = Some(Box::new(cause));
        }
        self
    }

    /// The error kind, or `None` for an aggregate.
    pub fn kind(&self) -> Option<CacheErrorKind> {
        match self {
            CacheError::Single { kind, .. } => Some(*kind),
            CacheError::Multiple(_) => None,
        }
    }

    /// Combine independently-collected errors into one `Multiple`,
    /// flattening nested aggregates so the chain never nests aggregates
    /// under aggregates.
    pub fn aggregate(errors: Vec<CacheError>) -> Option<CacheError> {
        if errors.is_empty() {
            return None;
        }
        if errors.len() == 1 {
            return errors.into_iter().next();
        }
        let mut flat = Vec::with_capacity(errors.len());
        for error in errors {
            match error {
                CacheError::Multiple(inner) => flat.extend(inner),
                single => flat.push(single),
            }
        }
        Some(CacheError::Multiple(flat))
    }

    /// Built for a nil/empty key a caller observed before it ever reached
    /// the cache (e.g. decoding a key out of a wire format or FFI value
    /// where `K` itself has no non-nullable guarantee). `DatabaseCache`'s
    /// own generic `K` is never nil by construction, so nothing inside
    /// this crate raises `NilKey` itself; this constructor exists for
    /// callers that need to report the same error kind from their own
    /// boundary.
    pub fn nil_key(call_site: &'static str) -> Self {
        CacheError::new(call_site, CacheErrorKind::NilKey, "key must not be nil")
            .with_argument("key")
    }

    /// See [`CacheError::nil_key`]; the `NilValue` counterpart for a value
    /// a caller observed as nil before constructing `V`.
    pub fn nil_value(call_site: &'static str) -> Self {
        CacheError::new(call_site, CacheErrorKind::NilValue, "value must not be nil")
            .with_argument("value")
    }

    pub fn not_tracked(call_site: &'static str) -> Self {
        CacheError::new(
            call_site,
            CacheErrorKind::NotTracked,
            "key is absent or usage tracking is disabled",
        )
    }

    pub fn entry_not_found(call_site: &'static str) -> Self {
        CacheError::new(call_site, CacheErrorKind::EntryNotFound, "no entry for key")
    }

    pub fn invalid_state(call_site: &'static str, description: impl Into<String>) -> Self {
        CacheError::new(call_site, CacheErrorKind::InvalidState, description)
    }

    pub fn object_in_use(call_site: &'static str) -> Self {
        CacheError::new(
            call_site,
            CacheErrorKind::ObjectInUse,
            "all eviction candidates are in use",
        )
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
