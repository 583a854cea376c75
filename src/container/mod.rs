//! The service container.

mod builder;
mod engine;

use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::argument::ArgumentKind;
use crate::context::Context;
use crate::definition::{Definition, ServiceDef};
use crate::descriptors::DefinitionInfo;
use crate::error::{DiError, DiResult};
use crate::events::{ArgumentEvent, ArgumentMiddleware, Observers};
use crate::internal::{ResolutionFrame, WaitGraph};
use crate::logging::Logger;
use crate::parameters::ParameterProvider;
use crate::reference::Reference;
use crate::registry::Registry;
use crate::value::Value;

pub use builder::ContainerBuilder;
use engine::Engine;

/// Context key under which [`Container::attach_to`] stores the container.
pub const CONTAINER_KEY: &str = "di.container";

/// Registry of service definitions and their instances.
///
/// Cloning a container is cheap and yields another handle to the same
/// registry. All operations are synchronous and safe to call from any
/// thread.
///
/// # Examples
///
/// ```rust
/// use ref_di::{Argument, Container, Provider, ServiceDef};
/// use std::sync::Arc;
///
/// struct Database { dsn: String }
/// struct Users { db: Arc<Database> }
///
/// let container = Container::new();
/// container.register([
///     ServiceDef::new("db")
///         .provider(Provider::new(|dsn: String| Arc::new(Database { dsn })))
///         .arg(Argument::literal("postgres://localhost".to_string())),
///     ServiceDef::new("users")
///         .provider(Provider::new(|db: Arc<Database>| Arc::new(Users { db })))
///         .arg(Argument::service("db")),
/// ]);
///
/// container.build().unwrap();
///
/// let users: Arc<Users> = container.get_as("users").unwrap();
/// assert_eq!(users.db.dsn, "postgres://localhost");
///
/// // Built once, shared afterwards
/// let again: Arc<Users> = container.get_as("users").unwrap();
/// assert!(Arc::ptr_eq(&users, &again));
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    registry: Registry,
    parameters: RwLock<Arc<dyn ParameterProvider>>,
    logger: Arc<dyn Logger>,
    context: Context,
    observers: Observers,
    middleware: Vec<Arc<dyn ArgumentMiddleware>>,
    waits: WaitGraph,
}

impl Container {
    /// Container with no parameters, no logging and a background context.
    pub fn new() -> Self {
        ContainerBuilder::new().build()
    }

    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Stores definitions under their references. Later definitions replace
    /// earlier ones with the same reference.
    pub fn register<I>(&self, definitions: I) -> &Self
    where
        I: IntoIterator<Item = ServiceDef>,
    {
        for definition in definitions {
            let stored = self.inner.registry.store(Definition::new(definition));
            self.inner.logger.debug(
                "registered service definition",
                &[("service", stored.reference())],
            );
        }
        self
    }

    /// Stores a ready-made instance under `reference`.
    ///
    /// No provider is involved; `get` returns `value` as is.
    pub fn set(&self, reference: impl Into<Reference>, value: Value) -> &Self {
        let reference = reference.into();
        self.inner.logger.debug(
            "added a new service via set()",
            &[("service", &reference)],
        );
        self.inner
            .registry
            .store(Definition::preset(reference, value));
        self
    }

    /// Returns the instance for `reference`, building it if needed.
    pub fn get(&self, reference: impl Into<Reference>) -> DiResult<Value> {
        let reference = reference.into();
        match self.inner.registry.load(&reference) {
            Some(definition) => self.resolve(&definition),
            None => Err(self.log_error(DiError::ServiceNotFound(reference))),
        }
    }

    /// Like [`Container::get`] but panics on failure.
    ///
    /// # Panics
    ///
    /// When the service is unknown or its build fails.
    pub fn must_get(&self, reference: impl Into<Reference>) -> Value {
        match self.get(reference) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Returns the instance for `reference` as a `T`.
    ///
    /// Capability views registered with [`ServiceDef::implements`] are
    /// considered as well.
    pub fn get_as<T>(&self, reference: impl Into<Reference>) -> DiResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let reference = reference.into();
        let value = self.get(reference.clone())?;
        value.extract::<T>().ok_or_else(|| DiError::ServiceTypeMismatch {
            reference,
            expected: type_name::<T>(),
            actual: value.type_name(),
        })
    }

    /// # Panics
    ///
    /// When the service is unknown, fails to build or is not a `T`.
    pub fn must_get_as<T>(&self, reference: impl Into<Reference>) -> T
    where
        T: Clone + Send + Sync + 'static,
    {
        match self.get_as::<T>(reference) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Instances of every definition carrying `tag`, in registration order.
    pub fn find_by_tag(&self, tag: &str) -> DiResult<Vec<Value>> {
        self.find_by_tags(&[tag])
    }

    /// Instances of every definition carrying all of `tags`, in registration
    /// order. An empty tag list matches every definition.
    ///
    /// The first failing build fails the whole lookup.
    pub fn find_by_tags<T: AsRef<str>>(&self, tags: &[T]) -> DiResult<Vec<Value>> {
        self.inner
            .registry
            .snapshot()
            .iter()
            .filter(|definition| definition.has_tags(tags))
            .map(|definition| self.resolve(definition))
            .collect::<DiResult<Vec<_>>>()
            .map_err(|err| self.log_error(err))
    }

    /// Builds every definition that is neither lazy nor always rebuilt.
    ///
    /// All eager definitions are attempted. Failures are collected into one
    /// [`DiError::Build`]. On success every observer receives
    /// `container_ready`.
    pub fn build(&self) -> DiResult<()> {
        let logger = &self.inner.logger;
        logger.debug("starting container build", &[]);

        let result = self.inner.registry.range(|reference, definition| {
            if !definition.options().is_eager() {
                logger.debug(
                    "skipping lazy or always rebuilt service",
                    &[("service", reference)],
                );
                return Ok(());
            }

            logger.debug("building service", &[("service", reference)]);
            self.resolve(definition).map(|_| ()).map_err(|err| {
                logger.error(
                    "creation of service failed",
                    &[("service", reference), ("error", &err)],
                );
                err
            })
        });

        match result {
            Ok(()) => {
                logger.info(
                    "container built successfully",
                    &[("services", &self.inner.registry.count())],
                );
                self.inner.observers.container_ready(self);
                Ok(())
            }
            Err(err) => {
                logger.error("container build failed", &[("error", &err)]);
                Err(err)
            }
        }
    }

    /// True when a definition is registered under `reference`.
    pub fn has(&self, reference: impl Into<Reference>) -> bool {
        self.inner.registry.contains(&reference.into())
    }

    /// Removes a definition together with its cached instance.
    pub fn remove(&self, reference: impl Into<Reference>) -> bool {
        self.inner.registry.delete(&reference.into()).is_some()
    }

    /// Removes every definition and cached instance.
    pub fn clear(&self) {
        self.inner.registry.clear();
        self.inner.logger.debug("container cleared", &[]);
    }

    pub fn len(&self) -> usize {
        self.inner.registry.count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }

    /// Registered references in registration order.
    pub fn references(&self) -> Vec<Reference> {
        self.inner.registry.references()
    }

    /// Descriptors of every registered definition, in registration order.
    pub fn definitions(&self) -> Vec<DefinitionInfo> {
        self.inner
            .registry
            .snapshot()
            .iter()
            .map(|definition| DefinitionInfo::from(definition.as_ref()))
            .collect()
    }

    /// The container's execution context, handed to `Argument::Context`.
    pub fn context(&self) -> &Context {
        &self.inner.context
    }

    /// Cancels the container's context. Providers that observe it should
    /// stop their work.
    pub fn cancel(&self) {
        self.inner.context.cancel();
    }

    pub fn parameter_provider(&self) -> Arc<dyn ParameterProvider> {
        self.inner.parameters.read().clone()
    }

    /// Replaces the parameter provider used for subsequent builds.
    pub fn set_parameter_provider(&self, provider: Arc<dyn ParameterProvider>) -> &Self {
        *self.inner.parameters.write() = provider;
        self
    }

    pub fn logger(&self) -> Arc<dyn Logger> {
        self.inner.logger.clone()
    }

    /// Derives a context from `ctx` that carries this container.
    ///
    /// Recover it with [`container_from_context`].
    pub fn attach_to(&self, ctx: &Context) -> Context {
        ctx.with_value(CONTAINER_KEY, Value::new(self.clone()))
    }

    /// True when both handles share one registry.
    pub fn ptr_eq(a: &Container, b: &Container) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    fn resolve(&self, definition: &Arc<Definition>) -> DiResult<Value> {
        let rebuild = definition.options().always_rebuild;
        if !rebuild {
            if let Some(instance) = definition.instance() {
                return Ok(instance);
            }
        }

        // Entered before locking so that re-entry fails instead of deadlocking
        let _frame = ResolutionFrame::enter(definition.reference())?;
        let _build = self.inner.waits.acquire(definition)?;

        if !rebuild {
            if let Some(instance) = definition.instance() {
                return Ok(instance);
            }
        }

        let instance = self.build_definition(definition)?;
        definition.store_instance(instance.clone());
        Ok(instance)
    }

    fn build_definition(&self, definition: &Definition) -> DiResult<Value> {
        let reference = definition.reference();
        let observers = &self.inner.observers;

        if !observers.has_observers() {
            return Engine::new(self)
                .instantiate(definition)
                .map(|instance| definition.apply_casts(instance));
        }

        let start = Instant::now();
        observers.resolving(reference);
        match Engine::new(self).instantiate(definition) {
            Ok(instance) => {
                observers.resolved(reference, start.elapsed());
                Ok(definition.apply_casts(instance))
            }
            Err(err) => {
                observers.failed(reference, &err);
                Err(err)
            }
        }
    }

    /// Runs an evaluated argument through the middleware chain.
    pub(crate) fn filter_argument(
        &self,
        reference: &Reference,
        position: usize,
        kind: ArgumentKind,
        value: Value,
    ) -> DiResult<Value> {
        if self.inner.middleware.is_empty() {
            return Ok(value);
        }

        let event = ArgumentEvent {
            reference: reference.clone(),
            position,
            kind,
        };
        self.inner
            .middleware
            .iter()
            .try_fold(value, |value, middleware| middleware.on_argument(&event, value))
            .map_err(|reason| DiError::Vetoed {
                reference: reference.clone(),
                position,
                reason,
            })
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    fn log_error(&self, err: DiError) -> DiError {
        self.inner.logger.error("container error", &[("error", &err)]);
        err
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.inner.registry.count())
            .finish()
    }
}

/// Recovers the container stored by [`Container::attach_to`].
///
/// # Examples
///
/// ```rust
/// use ref_di::{container_from_context, Container, Context, ErrorKind};
///
/// let container = Container::new();
/// let ctx = container.attach_to(&Context::background());
///
/// let found = container_from_context(&ctx).unwrap();
/// assert!(Container::ptr_eq(&found, &container));
///
/// let err = container_from_context(&Context::background()).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::ContextMissing);
/// ```
pub fn container_from_context(ctx: &Context) -> DiResult<Container> {
    ctx.value(CONTAINER_KEY)
        .and_then(|value| value.get::<Container>())
        .ok_or(DiError::ContextMissing)
}
