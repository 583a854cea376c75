//! Service definitions: how a service is built and how it is cached.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::argument::Argument;
use crate::callable::Provider;
use crate::reference::{Reference, Tag};
use crate::value::Value;

/// Lifecycle options of a definition.
///
/// With both flags unset the service is built once, during
/// `Container::build()` or on its first request, and cached afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Skip the eager build pass; build on the first `get`.
    pub build_on_first_request: bool,
    /// Build a fresh instance on every `get`.
    pub always_rebuild: bool,
}

impl ServiceOptions {
    /// True when `Container::build()` should construct the service.
    pub fn is_eager(&self) -> bool {
        !self.build_on_first_request && !self.always_rebuild
    }
}

/// What sits in a definition's provider slot.
#[derive(Clone, Debug)]
pub(crate) enum ProviderSlot {
    Callable(Provider),
    /// Arbitrary value; invocable only if it holds a [`Provider`].
    Value(Value),
}

type Cast = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Recipe for one service: provider, arguments, options, tags and methods.
///
/// # Examples
///
/// ```rust
/// use ref_di::{Argument, Container, Provider, ServiceDef};
/// use std::sync::Arc;
///
/// struct Greeter { salutation: String }
///
/// let container = Container::new();
/// container.register([
///     ServiceDef::new("greeter.morning")
///         .provider(Provider::new(|s: String| Arc::new(Greeter { salutation: s })))
///         .arg(Argument::literal("Good morning,".to_string()))
///         .tag("greeter"),
///     ServiceDef::new("greeter.evening")
///         .provider(Provider::new(|s: String| Arc::new(Greeter { salutation: s })))
///         .arg(Argument::literal("Good evening,".to_string()))
///         .tag("greeter")
///         .build_on_first_request(),
/// ]);
///
/// container.build().unwrap();
/// let evening: Arc<Greeter> = container.get_as("greeter.evening").unwrap();
/// assert_eq!(evening.salutation, "Good evening,");
/// ```
#[derive(Clone)]
pub struct ServiceDef {
    pub(crate) reference: Reference,
    pub(crate) provider: Option<ProviderSlot>,
    pub(crate) args: Vec<Argument>,
    pub(crate) options: ServiceOptions,
    pub(crate) tags: Vec<Tag>,
    pub(crate) methods: HashMap<String, Provider>,
    pub(crate) casts: Vec<Cast>,
}

impl ServiceDef {
    pub fn new(reference: impl Into<Reference>) -> Self {
        ServiceDef {
            reference: reference.into(),
            provider: None,
            args: Vec::new(),
            options: ServiceOptions::default(),
            tags: Vec::new(),
            methods: HashMap::new(),
            casts: Vec::new(),
        }
    }

    pub fn provider(mut self, provider: Provider) -> Self {
        self.provider = Some(ProviderSlot::Callable(provider));
        self
    }

    /// Uses a runtime value as provider.
    ///
    /// Building fails with `ProviderNotAFunction` unless the value holds a
    /// [`Provider`].
    pub fn provider_value(mut self, value: Value) -> Self {
        self.provider = Some(ProviderSlot::Value(value));
        self
    }

    pub fn arg(mut self, arg: Argument) -> Self {
        self.args.push(arg);
        self
    }

    /// Appends provider arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = Argument>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn opts(mut self, options: ServiceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build_on_first_request(mut self) -> Self {
        self.options.build_on_first_request = true;
        self
    }

    pub fn always_rebuild(mut self) -> Self {
        self.options.always_rebuild = true;
        self
    }

    pub fn tag(mut self, tag: impl Into<Tag>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    pub fn tags<I, T>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        tags.into_iter().fold(self, |def, tag| def.tag(tag))
    }

    /// Declares a method callable through `Argument::MethodCall`.
    ///
    /// The callable receives the service instance as its first parameter,
    /// followed by the call's own arguments.
    pub fn method(mut self, name: impl Into<String>, callable: Provider) -> Self {
        self.methods.insert(name.into(), callable);
        self
    }

    /// Exposes the built instance as another type as well.
    ///
    /// Typically used to hand an `Arc<Concrete>` instance to parameters
    /// declared as `Arc<dyn Trait>`.
    pub fn implements<T, U>(mut self, cast: fn(T) -> U) -> Self
    where
        T: Clone + Send + Sync + 'static,
        U: Send + Sync + 'static,
    {
        self.casts
            .push(Arc::new(move |value: &Value| value.get::<T>().map(|t| Value::new(cast(t)))));
        self
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn options(&self) -> ServiceOptions {
        self.options
    }

    pub fn tag_list(&self) -> &[Tag] {
        &self.tags
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.args
    }
}

impl fmt::Debug for ServiceDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDef")
            .field("reference", &self.reference)
            .field("provider", &self.provider)
            .field("args", &self.args)
            .field("options", &self.options)
            .field("tags", &self.tags)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A registered definition together with its cached instance.
pub struct Definition {
    spec: ServiceDef,
    instance: RwLock<Option<Value>>,
    // Held for the duration of a build so concurrent getters share one result.
    build_lock: Mutex<()>,
    // Thread holding `build_lock`, if any
    builder: Mutex<Option<ThreadId>>,
}

impl Definition {
    pub(crate) fn new(spec: ServiceDef) -> Self {
        Definition {
            spec,
            instance: RwLock::new(None),
            build_lock: Mutex::new(()),
            builder: Mutex::new(None),
        }
    }

    /// Provider-less definition holding a preset instance.
    pub(crate) fn preset(reference: Reference, instance: Value) -> Self {
        Definition {
            spec: ServiceDef::new(reference),
            instance: RwLock::new(Some(instance)),
            build_lock: Mutex::new(()),
            builder: Mutex::new(None),
        }
    }

    pub fn reference(&self) -> &Reference {
        &self.spec.reference
    }

    pub fn spec(&self) -> &ServiceDef {
        &self.spec
    }

    pub fn options(&self) -> ServiceOptions {
        self.spec.options
    }

    pub fn tags(&self) -> &[Tag] {
        &self.spec.tags
    }

    /// True when the definition carries every tag in `tags`.
    pub fn has_tags<T: AsRef<str>>(&self, tags: &[T]) -> bool {
        tags.iter()
            .all(|wanted| self.spec.tags.iter().any(|t| t.as_ref() == wanted.as_ref()))
    }

    pub fn has_provider(&self) -> bool {
        self.spec.provider.is_some()
    }

    /// Currently cached instance, if any.
    pub fn instance(&self) -> Option<Value> {
        self.instance.read().clone()
    }

    pub fn is_built(&self) -> bool {
        self.instance.read().is_some()
    }

    pub(crate) fn store_instance(&self, instance: Value) {
        *self.instance.write() = Some(instance);
    }

    /// Takes the build lock if it is free.
    pub(crate) fn try_begin_build(&self) -> Option<BuildGuard<'_>> {
        self.build_lock.try_lock().map(|lock| self.claim(lock))
    }

    /// Waits up to `timeout` for the build lock.
    pub(crate) fn begin_build_within(&self, timeout: Duration) -> Option<BuildGuard<'_>> {
        self.build_lock.try_lock_for(timeout).map(|lock| self.claim(lock))
    }

    fn claim<'d>(&'d self, lock: MutexGuard<'d, ()>) -> BuildGuard<'d> {
        *self.builder.lock() = Some(thread::current().id());
        BuildGuard {
            definition: self,
            _lock: lock,
        }
    }

    /// Thread currently building this definition.
    pub(crate) fn builder_thread(&self) -> Option<ThreadId> {
        *self.builder.lock()
    }

    pub(crate) fn provider_slot(&self) -> Option<&ProviderSlot> {
        self.spec.provider.as_ref()
    }

    pub(crate) fn method(&self, name: &str) -> Option<&Provider> {
        self.spec.methods.get(name)
    }

    /// Attaches every registered capability view to a fresh instance.
    pub(crate) fn apply_casts(&self, instance: Value) -> Value {
        self.spec.casts.iter().fold(instance, |acc, cast| match cast(&acc) {
            Some(view) => acc.with_view(view),
            None => acc,
        })
    }
}

/// Exclusive right to build a definition, released on drop.
pub(crate) struct BuildGuard<'d> {
    definition: &'d Definition,
    _lock: MutexGuard<'d, ()>,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        // Cleared before the lock field is released
        *self.definition.builder.lock() = None;
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("spec", &self.spec)
            .field("built", &self.is_built())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_eager() {
        assert!(ServiceOptions::default().is_eager());
        let lazy = ServiceDef::new("a").build_on_first_request();
        assert!(!lazy.options().is_eager());
        let rebuild = ServiceDef::new("a").always_rebuild();
        assert!(!rebuild.options().is_eager());
    }

    #[test]
    fn tags_are_deduplicated_and_matched_as_a_set() {
        let def = Definition::new(ServiceDef::new("a").tags(["t1", "t2", "t1"]));
        assert_eq!(def.tags().len(), 2);
        assert!(def.has_tags(&["t1"]));
        assert!(def.has_tags(&["t2", "t1"]));
        assert!(!def.has_tags(&["t1", "t3"]));
        assert!(def.has_tags::<&str>(&[]));
    }

    #[test]
    fn preset_definition_is_built_without_provider() {
        let def = Definition::preset(Reference::from("x"), Value::new(1u8));
        assert!(def.is_built());
        assert!(!def.has_provider());
    }

    #[test]
    fn build_guard_records_owner_until_dropped() {
        let def = Definition::new(ServiceDef::new("a"));
        assert_eq!(def.builder_thread(), None);

        let guard = def.try_begin_build().unwrap();
        assert_eq!(def.builder_thread(), Some(thread::current().id()));
        assert!(def.try_begin_build().is_none());

        drop(guard);
        assert_eq!(def.builder_thread(), None);
        assert!(def.begin_build_within(Duration::from_millis(1)).is_some());
    }
}
