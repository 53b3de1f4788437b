//! Error types for the guard

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error returned by caller-supplied role predicates
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Guard errors
#[derive(Debug, Error)]
pub enum GuardError {
    /// Invalid permission table or permissions document
    #[error("Invalid permissions: {0}")]
    Configuration(String),

    /// The resolved roles grant nothing for the action
    #[error("Not permitted: {action}")]
    NotPermitted {
        /// Action that was denied
        action: String,
    },

    /// A role predicate failed while resolving roles
    #[error(transparent)]
    Predicate(#[from] PredicateFailure),

    /// I/O error while loading permissions
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed permissions document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GuardError {
    pub(crate) fn not_permitted(action: impl Into<String>) -> Self {
        Self::NotPermitted {
            action: action.into(),
        }
    }

    /// True for an authorization denial, false for any fault
    pub fn is_not_permitted(&self) -> bool {
        matches!(self, Self::NotPermitted { .. })
    }

    /// The predicate failure behind this error, if any
    pub fn as_predicate_failure(&self) -> Option<&PredicateFailure> {
        match self {
            Self::Predicate(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Failure raised by a role predicate.
///
/// The predicate's own error is kept behind an `Arc` so every session
/// operation waiting on the same resolution observes the very same value.
/// `Display` and `source()` are those of the inner error.
#[derive(Clone)]
pub struct PredicateFailure {
    role: String,
    error: Arc<dyn StdError + Send + Sync + 'static>,
}

impl PredicateFailure {
    pub(crate) fn new(role: impl Into<String>, error: BoxError) -> Self {
        Self {
            role: role.into(),
            error: Arc::from(error),
        }
    }

    /// Role whose predicate failed
    pub fn role(&self) -> &str {
        &self.role
    }

    /// The error exactly as the predicate returned it
    pub fn error(&self) -> &Arc<dyn StdError + Send + Sync + 'static> {
        &self.error
    }

    /// Recover the predicate's concrete error type
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.error.downcast_ref::<E>()
    }

    /// Whether two failures carry the same underlying error value
    pub fn same_failure(&self, other: &PredicateFailure) -> bool {
        Arc::ptr_eq(&self.error, &other.error)
    }
}

impl fmt::Debug for PredicateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateFailure")
            .field("role", &self.role)
            .field("error", &self.error)
            .finish()
    }
}

impl fmt::Display for PredicateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl StdError for PredicateFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.error.source()
    }
}

/// Result type for guard operations
pub type Result<T> = std::result::Result<T, GuardError>;
