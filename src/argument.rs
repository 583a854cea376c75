//! Declarative provider arguments.

use std::fmt;

use crate::reference::{Reference, Tag};
use crate::value::Value;

/// How to obtain one provider input at resolution time.
///
/// Arguments are evaluated in declaration order against the container that
/// builds the definition. Each produces exactly one [`Value`] or fails.
///
/// # Examples
///
/// ```rust
/// use ref_di::{Argument, ArgumentKind};
///
/// let args = vec![
///     Argument::literal(true),
///     Argument::service("db"),
///     Argument::param("http.port"),
///     Argument::Context,
///     Argument::method_call("clock", "now", vec![]),
/// ];
///
/// let kinds: Vec<_> = args.iter().map(Argument::kind).collect();
/// assert_eq!(kinds[1], ArgumentKind::Service);
/// assert_eq!(kinds[4], ArgumentKind::MethodCall);
/// ```
#[derive(Clone)]
pub enum Argument {
    /// Passed through unchanged
    Literal(Value),
    /// Another service, resolved through `Container::get`
    Service(Reference),
    /// All instances whose definition carries every tag, as a `Vec<Value>`
    Tagged(Vec<Tag>),
    /// A value from the parameter provider, addressed by dot path
    Param(String),
    /// The container's execution context
    Context,
    /// The container itself
    Container,
    /// The container's parameter provider, as `Arc<dyn ParameterProvider>`
    ParameterProvider,
    /// The container's logger, as `Arc<dyn Logger>`
    Logger,
    /// Result of invoking a named method on another service
    MethodCall {
        service: Reference,
        method: String,
        args: Vec<Argument>,
    },
}

/// Payload-free discriminant of an [`Argument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentKind {
    Literal,
    Service,
    Tagged,
    Param,
    Context,
    Container,
    ParameterProvider,
    Logger,
    MethodCall,
}

impl Argument {
    pub fn literal<T: Send + Sync + 'static>(value: T) -> Self {
        Argument::Literal(Value::new(value))
    }

    /// Typed absent value for an `Option<T>` parameter.
    pub fn none<T: Send + Sync + 'static>() -> Self {
        Argument::Literal(Value::none::<T>())
    }

    pub fn service(reference: impl Into<Reference>) -> Self {
        Argument::Service(reference.into())
    }

    pub fn tagged<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        Argument::Tagged(tags.into_iter().map(Into::into).collect())
    }

    pub fn param(path: impl Into<String>) -> Self {
        Argument::Param(path.into())
    }

    pub fn method_call(
        service: impl Into<Reference>,
        method: impl Into<String>,
        args: Vec<Argument>,
    ) -> Self {
        Argument::MethodCall {
            service: service.into(),
            method: method.into(),
            args,
        }
    }

    pub fn kind(&self) -> ArgumentKind {
        match self {
            Argument::Literal(_) => ArgumentKind::Literal,
            Argument::Service(_) => ArgumentKind::Service,
            Argument::Tagged(_) => ArgumentKind::Tagged,
            Argument::Param(_) => ArgumentKind::Param,
            Argument::Context => ArgumentKind::Context,
            Argument::Container => ArgumentKind::Container,
            Argument::ParameterProvider => ArgumentKind::ParameterProvider,
            Argument::Logger => ArgumentKind::Logger,
            Argument::MethodCall { .. } => ArgumentKind::MethodCall,
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Literal(value) => write!(f, "Literal({})", value.type_name()),
            Argument::Service(reference) => write!(f, "Service({reference})"),
            Argument::Tagged(tags) => write!(f, "Tagged({tags:?})"),
            Argument::Param(path) => write!(f, "Param({path})"),
            Argument::Context => f.write_str("Context"),
            Argument::Container => f.write_str("Container"),
            Argument::ParameterProvider => f.write_str("ParameterProvider"),
            Argument::Logger => f.write_str("Logger"),
            Argument::MethodCall { service, method, args } => {
                write!(f, "MethodCall({service}.{method}, {args:?})")
            }
        }
    }
}
