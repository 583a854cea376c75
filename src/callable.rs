//! Typed callables standing in for runtime reflection.
//!
//! Providers and service methods are ordinary Rust closures. An arity adapter
//! (implemented for closures of up to eight parameters) records the declared
//! parameter types and pulls correctly typed arguments out of [`Value`]s, so
//! the build engine can check argument counts and types before invoking.
//!
//! Closures returning `Result` are registered with [`Provider::fallible`],
//! which maps them onto the `(value, error)` return contract. Callables that
//! need full control over their return list use [`Provider::dynamic`].

use std::any::{type_name, TypeId};
use std::error::Error as StdError;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::BoxError;
use crate::value::Value;

/// Declared type of one callable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamSpec {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl ParamSpec {
    pub fn of<T: 'static>() -> Self {
        ParamSpec {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// True when `value` can be passed for this parameter.
    pub fn accepts(&self, value: &Value) -> bool {
        value.fits(self.type_id)
    }
}

/// Argument that could not be converted to its declared parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub position: usize,
    pub expected: &'static str,
    pub actual: &'static str,
}

/// Error slot payload in a callable's return list.
///
/// A two-value return `[instance, error]` carries either [`Value::nil`] or a
/// `Failure` in its second position.
#[derive(Clone)]
pub struct Failure(pub BoxError);

impl Failure {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Failure(Arc::from(err.into()))
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failure({})", self.0)
    }
}

/// Object-safe invocation interface shared by providers and methods.
pub trait Callable: Send + Sync {
    /// Declared parameter types, in positional order.
    fn params(&self) -> &[ParamSpec];

    /// Invokes with already validated arguments and returns the raw return list.
    fn call(&self, args: &[Value]) -> Result<Vec<Value>, Mismatch>;
}

/// Closure adapter for one parameter tuple.
///
/// Implemented for every `Fn(A, B, ..) -> R` whose parameters are
/// `Clone + Send + Sync + 'static`.
pub trait Factory<Args>: Send + Sync + 'static {
    type Output;

    fn param_specs() -> Vec<ParamSpec>;

    fn invoke(&self, args: &[Value]) -> Result<Self::Output, Mismatch>;
}

fn extract<T: Clone + 'static>(args: &[Value], position: usize) -> Result<T, Mismatch> {
    let value = args.get(position).ok_or(Mismatch {
        position,
        expected: type_name::<T>(),
        actual: "nothing",
    })?;
    value.extract::<T>().ok_or_else(|| Mismatch {
        position,
        expected: type_name::<T>(),
        actual: value.type_name(),
    })
}

macro_rules! factory_tuple ({ $($param:ident $idx:tt)* } => {
    impl<Func, Ret, $($param,)*> Factory<($($param,)*)> for Func
    where
        Func: Fn($($param),*) -> Ret + Send + Sync + 'static,
        $($param: Clone + Send + Sync + 'static,)*
    {
        type Output = Ret;

        fn param_specs() -> Vec<ParamSpec> {
            vec![$(ParamSpec::of::<$param>()),*]
        }

        #[inline]
        #[allow(non_snake_case, unused_variables)]
        fn invoke(&self, args: &[Value]) -> Result<Ret, Mismatch> {
            $(let $param = extract::<$param>(args, $idx)?;)*
            Ok((self)($($param),*))
        }
    }
});

factory_tuple! {}
factory_tuple! { A 0 }
factory_tuple! { A 0 B 1 }
factory_tuple! { A 0 B 1 C 2 }
factory_tuple! { A 0 B 1 C 2 D 3 }
factory_tuple! { A 0 B 1 C 2 D 3 E 4 }
factory_tuple! { A 0 B 1 C 2 D 3 E 4 F 5 }
factory_tuple! { A 0 B 1 C 2 D 3 E 4 F 5 G 6 }
factory_tuple! { A 0 B 1 C 2 D 3 E 4 F 5 G 6 H 7 }

struct Infallible<F, Args> {
    f: F,
    params: Vec<ParamSpec>,
    _args: PhantomData<fn(Args)>,
}

impl<F, Args> Callable for Infallible<F, Args>
where
    F: Factory<Args>,
    F::Output: Send + Sync + 'static,
{
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    fn call(&self, args: &[Value]) -> Result<Vec<Value>, Mismatch> {
        Ok(vec![Value::new(self.f.invoke(args)?)])
    }
}

struct Fallible<F, Args> {
    f: F,
    params: Vec<ParamSpec>,
    _args: PhantomData<fn(Args)>,
}

impl<F, Args, T, E> Callable for Fallible<F, Args>
where
    F: Factory<Args, Output = Result<T, E>>,
    T: Send + Sync + 'static,
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    fn call(&self, args: &[Value]) -> Result<Vec<Value>, Mismatch> {
        Ok(match self.f.invoke(args)? {
            Ok(value) => vec![Value::new(value), Value::nil()],
            Err(err) => vec![Value::nil(), Value::new(Failure::new(err))],
        })
    }
}

type DynamicFn = dyn Fn(&[Value]) -> Vec<Value> + Send + Sync;

struct Dynamic {
    params: Vec<ParamSpec>,
    f: Box<DynamicFn>,
}

impl Callable for Dynamic {
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    fn call(&self, args: &[Value]) -> Result<Vec<Value>, Mismatch> {
        Ok((self.f)(args))
    }
}

/// A shared, invocable recipe producing a service instance or method result.
///
/// # Examples
///
/// ```rust
/// use ref_di::{Provider, Value};
///
/// let greet = Provider::new(|salutation: String, name: String| format!("{salutation} {name}"));
/// assert_eq!(greet.params().len(), 2);
///
/// let out = greet
///     .call(&[Value::new("Hello".to_string()), Value::new("Ada".to_string())])
///     .unwrap();
/// assert_eq!(out[0].get::<String>().as_deref(), Some("Hello Ada"));
/// ```
#[derive(Clone)]
pub struct Provider(Arc<dyn Callable>);

impl Provider {
    /// Wraps a closure returning the instance directly.
    pub fn new<Args, F>(f: F) -> Self
    where
        Args: 'static,
        F: Factory<Args>,
        F::Output: Send + Sync + 'static,
    {
        Provider(Arc::new(Infallible {
            f,
            params: F::param_specs(),
            _args: PhantomData,
        }))
    }

    /// Wraps a closure returning `Result<instance, error>`.
    pub fn fallible<Args, F, T, E>(f: F) -> Self
    where
        Args: 'static,
        F: Factory<Args, Output = Result<T, E>>,
        T: Send + Sync + 'static,
        E: Into<Box<dyn StdError + Send + Sync>> + 'static,
    {
        Provider(Arc::new(Fallible {
            f,
            params: F::param_specs(),
            _args: PhantomData,
        }))
    }

    /// Wraps a closure over raw values with explicitly declared parameters.
    ///
    /// The returned list must hold one value, or two where the second is
    /// [`Value::nil`] or a [`Failure`].
    pub fn dynamic<F>(params: Vec<ParamSpec>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Vec<Value> + Send + Sync + 'static,
    {
        Provider(Arc::new(Dynamic {
            params,
            f: Box::new(f),
        }))
    }

    pub fn from_callable(callable: Arc<dyn Callable>) -> Self {
        Provider(callable)
    }

    pub fn params(&self) -> &[ParamSpec] {
        self.0.params()
    }

    pub fn call(&self, args: &[Value]) -> Result<Vec<Value>, Mismatch> {
        self.0.call(args)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Provider")
            .field(&self.params().iter().map(|p| p.type_name).collect::<Vec<_>>())
            .finish()
    }
}
