//! Error types for the service container.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::parameters::ParameterError;
use crate::reference::Reference;

/// Shared, clonable error produced by providers and collaborators.
pub type BoxError = Arc<dyn StdError + Send + Sync + 'static>;

/// Coarse classification of a [`DiError`] that callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ServiceNotFound,
    ProviderMissing,
    ProviderNotAFunction,
    ArgCountMismatch,
    ArgTypeMismatch,
    TooManyReturnValues,
    ProviderFailed,
    MethodNotFound,
    ServiceTypeMismatch,
    ParameterProviderError,
    CircularDependency,
    DepthExceeded,
    ArgumentVetoed,
    ContextMissing,
    ContainerBuildError,
}

/// Service container errors
///
/// Every failure carries enough context (reference, argument position,
/// expected and actual type) to be understood from its message alone.
///
/// # Examples
///
/// ```rust
/// use ref_di::{Container, DiError, ErrorKind};
///
/// let container = Container::new();
/// match container.get("mailer") {
///     Err(err @ DiError::ServiceNotFound(_)) => {
///         assert_eq!(err.kind(), ErrorKind::ServiceNotFound);
///         assert_eq!(err.to_string(), "service mailer not found");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// No definition registered under the reference
    #[error("service {0} not found")]
    ServiceNotFound(Reference),

    /// Definition has neither a provider nor a preset instance
    #[error("no provider function set for service {0}")]
    ProviderMissing(Reference),

    /// Provider slot holds a value that cannot be invoked
    #[error("provider defined for service {reference} is not a function (got {actual})")]
    ProviderNotAFunction {
        reference: Reference,
        actual: &'static str,
    },

    /// Evaluated argument count differs from the provider's parameter count
    #[error("expected {expected} arguments for {reference} provider, got {actual}")]
    ArgCountMismatch {
        reference: Reference,
        expected: usize,
        actual: usize,
    },

    /// Evaluated argument does not fit the declared parameter type
    #[error(
        "provider argument of {reference} at position {position} should be type of or implementing {expected}, got {actual}"
    )]
    ArgTypeMismatch {
        reference: Reference,
        position: usize,
        expected: &'static str,
        actual: &'static str,
    },

    /// Provider returned neither `(value)` nor `(value, error)`
    #[error("provider of {reference} returned {count} values, expected 1 or 2")]
    TooManyReturnValues { reference: Reference, count: usize },

    /// Provider returned an error alongside its value
    #[error("provider of {reference} failed: {source}")]
    ProviderFailed {
        reference: Reference,
        #[source]
        source: BoxError,
    },

    /// `MethodCall` names a method the target definition does not declare
    #[error("service {reference} has no method named {method}")]
    MethodNotFound { reference: Reference, method: String },

    /// Typed access to an instance of another type
    #[error("service {reference} is a {actual}, not a {expected}")]
    ServiceTypeMismatch {
        reference: Reference,
        expected: &'static str,
        actual: &'static str,
    },

    /// Parameter provider failure for the given path
    #[error("parameter {path}: {source}")]
    Parameter {
        path: String,
        #[source]
        source: ParameterError,
    },

    /// Argument evaluation failed while building a definition
    #[error("failed to evaluate argument {position} of {reference}: {source}")]
    Argument {
        reference: Reference,
        position: usize,
        #[source]
        source: Box<DiError>,
    },

    /// Circular dependency detected (includes path)
    #[error("circular dependency: {}", join_path(.0))]
    Circular(Vec<Reference>),

    /// Maximum resolution depth exceeded
    #[error("max resolution depth {0} exceeded")]
    DepthExceeded(usize),

    /// Argument middleware refused an evaluated value
    #[error("argument {position} of {reference} vetoed: {reason}")]
    Vetoed {
        reference: Reference,
        position: usize,
        reason: String,
    },

    /// Context carries no container
    #[error("could not get container instance from context")]
    ContextMissing,

    /// One or more eager builds failed
    #[error("container build failed with {} error(s): {}", .0.len(), join_errors(.0))]
    Build(Vec<DiError>),
}

fn join_path(path: &[Reference]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn join_errors(errors: &[DiError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl DiError {
    /// Classification of this error, without looking through wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiError::ServiceNotFound(_) => ErrorKind::ServiceNotFound,
            DiError::ProviderMissing(_) => ErrorKind::ProviderMissing,
            DiError::ProviderNotAFunction { .. } => ErrorKind::ProviderNotAFunction,
            DiError::ArgCountMismatch { .. } => ErrorKind::ArgCountMismatch,
            DiError::ArgTypeMismatch { .. } => ErrorKind::ArgTypeMismatch,
            DiError::TooManyReturnValues { .. } => ErrorKind::TooManyReturnValues,
            DiError::ProviderFailed { .. } => ErrorKind::ProviderFailed,
            DiError::MethodNotFound { .. } => ErrorKind::MethodNotFound,
            DiError::ServiceTypeMismatch { .. } => ErrorKind::ServiceTypeMismatch,
            DiError::Parameter { .. } => ErrorKind::ParameterProviderError,
            DiError::Argument { source, .. } => source.kind(),
            DiError::Circular(_) => ErrorKind::CircularDependency,
            DiError::DepthExceeded(_) => ErrorKind::DepthExceeded,
            DiError::Vetoed { .. } => ErrorKind::ArgumentVetoed,
            DiError::ContextMissing => ErrorKind::ContextMissing,
            DiError::Build(_) => ErrorKind::ContainerBuildError,
        }
    }

    /// Classification of the innermost cause.
    ///
    /// Argument wrappers are unwrapped, and a build failure with exactly one
    /// member reports that member's kind.
    pub fn root_kind(&self) -> ErrorKind {
        match self {
            DiError::Argument { source, .. } => source.root_kind(),
            DiError::Build(errors) if errors.len() == 1 => errors[0].root_kind(),
            other => other.kind(),
        }
    }

    /// Innermost error, looking through argument wrappers.
    pub fn root(&self) -> &DiError {
        match self {
            DiError::Argument { source, .. } => source.root(),
            other => other,
        }
    }

    /// Per-definition failures when this is an aggregate build error.
    pub fn build_errors(&self) -> &[DiError] {
        match self {
            DiError::Build(errors) => errors,
            _ => &[],
        }
    }
}

/// Result type for container operations
pub type DiResult<T> = Result<T, DiError>;
