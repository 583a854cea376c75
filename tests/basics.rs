use ref_di::{Argument, Container, DiError, ErrorKind, Provider, Reference, ServiceDef, Value};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Config {
    port: u16,
}

#[derive(Debug)]
struct Server {
    config: Arc<Config>,
    name: String,
}

fn counting_provider(counter: Arc<AtomicUsize>) -> Provider {
    Provider::new(move || counter.fetch_add(1, Ordering::SeqCst) + 1)
}

#[test]
fn test_unregistered_reference_is_not_found() {
    let container = Container::new();
    let err = container.get("missing").unwrap_err();

    assert!(matches!(&err, DiError::ServiceNotFound(r) if r == &Reference::from("missing")));
    assert_eq!(err.to_string(), "service missing not found");
}

#[test]
fn test_provider_with_service_dependency() {
    let container = Container::new();
    container.register([
        ServiceDef::new("config").provider(Provider::new(|| Arc::new(Config { port: 8080 }))),
        ServiceDef::new("server")
            .provider(Provider::new(|config: Arc<Config>, name: String| {
                Arc::new(Server { config, name })
            }))
            .arg(Argument::service("config"))
            .arg(Argument::literal("MyServer".to_string())),
    ]);

    let server: Arc<Server> = container.get_as("server").unwrap();
    assert_eq!(server.config.port, 8080);
    assert_eq!(server.name, "MyServer");
}

#[test]
fn test_cached_instance_is_shared() {
    let counter = Arc::new(AtomicUsize::new(0));
    let container = Container::new();
    container.register([ServiceDef::new("n").provider(counting_provider(counter.clone()))]);

    let a = container.get("n").unwrap();
    let b = container.get("n").unwrap();
    let c = container.get("n").unwrap();

    assert!(Value::ptr_eq(&a, &b));
    assert!(Value::ptr_eq(&b, &c));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_always_rebuild_runs_provider_on_every_get() {
    let counter = Arc::new(AtomicUsize::new(0));
    let container = Container::new();
    container.register([ServiceDef::new("n")
        .provider(counting_provider(counter.clone()))
        .always_rebuild()]);

    let a: usize = container.get_as("n").unwrap();
    let b: usize = container.get_as("n").unwrap();
    let c: usize = container.get_as("n").unwrap();

    assert_eq!((a, b, c), (1, 2, 3));
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[test]
fn test_set_returns_value_without_provider() {
    let container = Container::new();
    let shared = Arc::new(Config { port: 1 });

    container
        .set("config", Value::from_arc(shared.clone()))
        .set("name", Value::new("svc"));

    let config = container.get("config").unwrap();
    let back = config.downcast_arc::<Config>().unwrap();
    assert!(Arc::ptr_eq(&back, &shared));
    assert_eq!(container.must_get_as::<&'static str>("name"), "svc");
}

#[test]
fn test_set_overrides_registered_definition() {
    let container = Container::new();
    container.register([ServiceDef::new("port").provider(Provider::new(|| 1u16))]);
    container.set("port", Value::new(2u16));

    assert_eq!(container.len(), 1);
    assert_eq!(container.must_get_as::<u16>("port"), 2);
}

#[test]
fn test_register_last_write_wins() {
    let container = Container::new();
    container.register([
        ServiceDef::new("greeting").provider(Provider::new(|| "hello")),
        ServiceDef::new("greeting").provider(Provider::new(|| "bonjour")),
    ]);

    assert_eq!(container.len(), 1);
    assert_eq!(container.must_get_as::<&'static str>("greeting"), "bonjour");
}

#[test]
fn test_get_as_wrong_type() {
    let container = Container::new();
    container.set("n", Value::new(5u32));

    let err = container.get_as::<String>("n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServiceTypeMismatch);
    assert_eq!(err.to_string(), "service n is a u32, not a alloc::string::String");
}

#[test]
#[should_panic(expected = "service nope not found")]
fn test_must_get_panics_with_message() {
    Container::new().must_get("nope");
}

#[test]
fn test_non_string_references() {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Svc {
        Db,
        Cache,
    }

    impl fmt::Display for Svc {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Svc::Db => f.write_str("svc.db"),
                Svc::Cache => f.write_str("svc.cache"),
            }
        }
    }

    let container = Container::new();
    container.register([
        ServiceDef::new(Reference::new(Svc::Db)).provider(Provider::new(|| "db")),
        ServiceDef::new(Reference::new(Svc::Cache))
            .provider(Provider::new(|db: &'static str| format!("cache over {db}")))
            .arg(Argument::service(Reference::new(Svc::Db))),
    ]);

    assert_eq!(
        container.must_get_as::<String>(Reference::new(Svc::Cache)),
        "cache over db"
    );
    // Same display form, different key type
    assert!(container.get("svc.db").is_err());
}

#[test]
fn test_failed_build_leaves_previous_instance() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in = calls.clone();
    let container = Container::new();
    container.register([ServiceDef::new("flaky")
        .provider(Provider::fallible(move || {
            match calls_in.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(10u32),
                _ => Err("second build fails"),
            }
        }))
        .always_rebuild()]);

    assert_eq!(container.must_get_as::<u32>("flaky"), 10);
    assert!(container.get("flaky").is_err());

    let info = container.definitions().remove(0);
    assert!(info.built);
    assert_eq!(info.instance_type, Some("u32"));
}

#[test]
fn test_remove_and_introspection() {
    let container = Container::new();
    container.register([
        ServiceDef::new("a").provider(Provider::new(|| 1u8)),
        ServiceDef::new("b").provider(Provider::new(|| 2u8)).tag("x"),
    ]);

    assert!(container.has("a"));
    assert_eq!(
        container.references().iter().map(ToString::to_string).collect::<Vec<_>>(),
        ["a", "b"]
    );

    assert!(container.remove("a"));
    assert!(!container.remove("a"));
    assert!(!container.has("a"));
    assert_eq!(container.len(), 1);
    assert!(!container.is_empty());
}

#[test]
fn test_clear_drops_definitions_and_instances() {
    let container = Container::new();
    container.register([ServiceDef::new("a").provider(Provider::new(|| 1u8))]);
    container.set("b", Value::new(2u8));
    container.build().unwrap();

    container.clear();
    assert!(container.is_empty());
    assert_eq!(container.get("a").unwrap_err().kind(), ErrorKind::ServiceNotFound);

    // Registration works again afterwards
    container.register([ServiceDef::new("a").provider(Provider::new(|| 3u8))]);
    assert_eq!(container.must_get_as::<u8>("a"), 3);
}

#[test]
fn test_clones_share_registry() {
    let container = Container::new();
    let other = container.clone();
    other.set("k", Value::new(1i32));

    assert!(Container::ptr_eq(&container, &other));
    assert_eq!(container.must_get_as::<i32>("k"), 1);
}
