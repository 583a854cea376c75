//! # ref-di
//!
//! A reference-keyed service container with declarative provider arguments.
//!
//! ## Features
//!
//! - **Any key type**: services are addressed by [`Reference`]s wrapping
//!   strings, enums or any other `Eq + Hash + Display` value
//! - **Declarative arguments**: literals, other services, tagged groups,
//!   configuration parameters, the context, the container itself or the
//!   result of a method call on another service
//! - **Checked invocation**: argument counts and types are verified against
//!   the provider's declared parameters before it runs
//! - **Lifecycles**: eager (built by [`Container::build`]), lazy
//!   (`build_on_first_request`) or rebuilt on every request
//! - **Thread-safe**: one build per definition at a time, shared results,
//!   cycle detection instead of deadlocks
//!
//! ## Quick Start
//!
//! ```rust
//! use ref_di::{Argument, Container, Provider, ServiceDef};
//! use std::sync::Arc;
//!
//! struct Mailer { sender: String }
//!
//! struct Signup { mailer: Arc<Mailer>, welcome: bool }
//!
//! let container = Container::new();
//! container.register([
//!     ServiceDef::new("mailer")
//!         .provider(Provider::new(|sender: String| Arc::new(Mailer { sender })))
//!         .arg(Argument::literal("noreply@example.com".to_string())),
//!     ServiceDef::new("signup")
//!         .provider(Provider::new(|mailer: Arc<Mailer>, welcome: bool| {
//!             Arc::new(Signup { mailer, welcome })
//!         }))
//!         .args([Argument::service("mailer"), Argument::literal(true)]),
//! ]);
//!
//! container.build().unwrap();
//!
//! let signup: Arc<Signup> = container.get_as("signup").unwrap();
//! assert!(signup.welcome);
//! assert_eq!(signup.mailer.sender, "noreply@example.com");
//! ```
//!
//! ## Fallible Providers
//!
//! ```rust
//! use ref_di::{Argument, Container, ErrorKind, Provider, ServiceDef};
//!
//! let container = Container::new();
//! container.register([ServiceDef::new("port")
//!     .provider(Provider::fallible(|raw: String| raw.parse::<u16>()))
//!     .arg(Argument::literal("http".to_string()))]);
//!
//! let err = container.get("port").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::ProviderFailed);
//! ```
//!
//! ## Trait Objects
//!
//! A definition can expose its instance under additional types, so providers
//! may declare trait-object parameters:
//!
//! ```rust
//! use ref_di::{Argument, Container, Provider, ServiceDef};
//! use std::sync::Arc;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct Fixed(u64);
//! impl Clock for Fixed {
//!     fn now(&self) -> u64 { self.0 }
//! }
//!
//! let container = Container::new();
//! container.register([
//!     ServiceDef::new("clock")
//!         .provider(Provider::new(|| Arc::new(Fixed(42))))
//!         .implements(|c: Arc<Fixed>| c as Arc<dyn Clock>),
//!     ServiceDef::new("stamp")
//!         .provider(Provider::new(|clock: Arc<dyn Clock>| clock.now()))
//!         .arg(Argument::service("clock")),
//! ]);
//!
//! assert_eq!(container.must_get_as::<u64>("stamp"), 42);
//! ```

pub mod argument;
pub mod callable;
pub mod container;
pub mod context;
pub mod definition;
pub mod descriptors;
pub mod error;
pub mod events;
pub mod logging;
pub mod parameters;
pub mod reference;
pub mod value;

#[cfg(feature = "global")]
pub mod global;

// Internal modules
mod internal;
mod registry;

pub use argument::{Argument, ArgumentKind};
pub use callable::{Callable, Factory, Failure, Mismatch, ParamSpec, Provider};
pub use container::{container_from_context, Container, ContainerBuilder, CONTAINER_KEY};
pub use context::{CancellationError, CancellationToken, Context};
pub use definition::{Definition, ServiceDef, ServiceOptions};
pub use descriptors::DefinitionInfo;
pub use error::{BoxError, DiError, DiResult, ErrorKind};
pub use events::{ArgumentEvent, ArgumentMiddleware, ContainerObserver, MetricsObserver};
pub use logging::{Fields, Logger, NoopLogger, TracingLogger};
pub use parameters::{NoParameterProvider, ParameterError, ParameterProvider};
pub use reference::{Reference, Tag};
pub use value::{Nil, Value};

#[cfg(feature = "config")]
pub use parameters::JsonParameterProvider;

#[cfg(feature = "global")]
pub use global::{default_container, reset_default_container};
