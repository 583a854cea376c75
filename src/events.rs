//! Container lifecycle hooks.
//!
//! Two extension points are offered:
//!
//! * [`ContainerObserver`]: notified when the container finished an eager
//!   build and around every service build, for tracing and metrics.
//! * [`ArgumentMiddleware`]: sees every evaluated provider argument and may
//!   replace or veto it before the provider is invoked.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::argument::ArgumentKind;
use crate::container::Container;
use crate::error::DiError;
use crate::reference::Reference;
use crate::value::Value;

/// Observer of container lifecycle events.
///
/// Calls are made synchronously on the resolving thread. Keep
/// implementations lightweight.
///
/// # Examples
///
/// ```rust
/// use ref_di::{Container, ContainerObserver, Provider, ServiceDef};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Ready(AtomicBool);
///
/// impl ContainerObserver for Ready {
///     fn container_ready(&self, _container: &Container) {
///         self.0.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let ready = Arc::new(Ready::default());
/// let container = Container::builder().observer(ready.clone()).build();
/// container.register([ServiceDef::new("answer").provider(Provider::new(|| 42u32))]);
///
/// container.build().unwrap();
/// assert!(ready.0.load(Ordering::SeqCst));
/// ```
pub trait ContainerObserver: Send + Sync {
    /// Every eager definition was built successfully.
    fn container_ready(&self, _container: &Container) {}

    /// A build of `reference` is starting.
    fn resolving(&self, _reference: &Reference) {}

    /// A build of `reference` finished successfully.
    fn resolved(&self, _reference: &Reference, _duration: Duration) {}

    /// A build of `reference` failed.
    fn failed(&self, _reference: &Reference, _error: &DiError) {}
}

#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ContainerObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn ContainerObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn container_ready(&self, container: &Container) {
        for observer in &self.observers {
            observer.container_ready(container);
        }
    }

    #[inline]
    pub(crate) fn resolving(&self, reference: &Reference) {
        for observer in &self.observers {
            observer.resolving(reference);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, reference: &Reference, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(reference, duration);
        }
    }

    pub(crate) fn failed(&self, reference: &Reference, error: &DiError) {
        for observer in &self.observers {
            observer.failed(reference, error);
        }
    }
}

/// Build counters collected from observer callbacks.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    builds: AtomicU64,
    failures: AtomicU64,
    total_build_nanos: AtomicU64,
    ready: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Number of successful `Container::build()` calls observed.
    pub fn ready_count(&self) -> u64 {
        self.ready.load(Ordering::Relaxed)
    }

    pub fn total_build_time(&self) -> Duration {
        Duration::from_nanos(self.total_build_nanos.load(Ordering::Relaxed))
    }

    pub fn average_build_time(&self) -> Option<Duration> {
        match self.build_count() {
            0 => None,
            count => Some(Duration::from_nanos(
                self.total_build_nanos.load(Ordering::Relaxed) / count,
            )),
        }
    }

    pub fn reset(&self) {
        self.builds.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.total_build_nanos.store(0, Ordering::Relaxed);
        self.ready.store(0, Ordering::Relaxed);
    }
}

impl ContainerObserver for MetricsObserver {
    fn container_ready(&self, _container: &Container) {
        self.ready.fetch_add(1, Ordering::Relaxed);
    }

    fn resolved(&self, _reference: &Reference, duration: Duration) {
        self.builds.fetch_add(1, Ordering::Relaxed);
        self.total_build_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    fn failed(&self, _reference: &Reference, _error: &DiError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }
}

/// An evaluated provider argument, as seen by [`ArgumentMiddleware`].
#[derive(Debug, Clone)]
pub struct ArgumentEvent {
    /// Definition (or method call target) whose argument was evaluated
    pub reference: Reference,
    /// Index into the callable's parameters; for method calls the receiver
    /// is position 0 and the first declared argument is position 1
    pub position: usize,
    pub kind: ArgumentKind,
}

/// Hook run on every evaluated argument, in registration order.
///
/// Returning `Ok` passes the (possibly replaced) value on to the next
/// middleware and finally to the provider. Returning `Err` vetoes the build
/// with [`DiError::Vetoed`].
///
/// Closures of the shape `Fn(&ArgumentEvent, Value) -> Result<Value, String>`
/// implement this trait.
pub trait ArgumentMiddleware: Send + Sync {
    fn on_argument(&self, event: &ArgumentEvent, value: Value) -> Result<Value, String>;
}

impl<F> ArgumentMiddleware for F
where
    F: Fn(&ArgumentEvent, Value) -> Result<Value, String> + Send + Sync,
{
    fn on_argument(&self, event: &ArgumentEvent, value: Value) -> Result<Value, String> {
        self(event, value)
    }
}
