//! Fluent container construction.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::Context;
use crate::events::{ArgumentMiddleware, ContainerObserver, Observers};
use crate::internal::WaitGraph;
use crate::logging::{Logger, NoopLogger};
use crate::parameters::{NoParameterProvider, ParameterProvider};
use crate::registry::Registry;

use super::{Container, ContainerInner};

/// Configures the collaborators of a [`Container`].
///
/// Every setting is optional. Defaults are a background context,
/// [`NoParameterProvider`], [`NoopLogger`], no observers and no middleware.
///
/// # Examples
///
/// ```rust
/// use ref_di::{Argument, Container, Context, Provider, ServiceDef, TracingLogger, Value};
/// use std::time::Duration;
///
/// let container = Container::builder()
///     .context(Context::background().with_timeout(Duration::from_secs(30)))
///     .logger(TracingLogger)
///     .middleware(|event: &ref_di::ArgumentEvent, value: Value| {
///         if event.position > 3 {
///             Err("too many arguments".to_string())
///         } else {
///             Ok(value)
///         }
///     })
///     .build();
///
/// container.register([ServiceDef::new("ctx.deadline")
///     .provider(Provider::new(|ctx: Context| ctx.deadline().is_some()))
///     .arg(Argument::Context)]);
///
/// assert!(container.must_get_as::<bool>("ctx.deadline"));
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    context: Option<Context>,
    parameters: Option<Arc<dyn ParameterProvider>>,
    logger: Option<Arc<dyn Logger>>,
    observers: Observers,
    middleware: Vec<Arc<dyn ArgumentMiddleware>>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parent context. The container works on a child of it, so cancelling
    /// the container never cancels `context`.
    pub fn context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    pub fn parameter_provider(mut self, provider: Arc<dyn ParameterProvider>) -> Self {
        self.parameters = Some(provider);
        self
    }

    pub fn logger<L: Logger + 'static>(mut self, logger: L) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    pub fn shared_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ContainerObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    /// Appends an argument middleware. Middleware runs in the order added.
    pub fn middleware<M: ArgumentMiddleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn build(self) -> Container {
        let parent = self.context.unwrap_or_default();
        Container {
            inner: Arc::new(ContainerInner {
                registry: Registry::new(),
                parameters: RwLock::new(
                    self.parameters
                        .unwrap_or_else(|| Arc::new(NoParameterProvider)),
                ),
                logger: self.logger.unwrap_or_else(|| Arc::new(NoopLogger)),
                context: parent.child(),
                observers: self.observers,
                middleware: self.middleware,
                waits: WaitGraph::new(),
            }),
        }
    }
}
