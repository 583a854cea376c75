use ref_di::{
    Argument, Container, DiError, ErrorKind, ParameterError, ParameterProvider, Provider,
    ServiceDef, Value,
};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

fn path_of(err: &DiError) -> Vec<String> {
    match err.root() {
        DiError::Circular(path) => path.iter().map(ToString::to_string).collect(),
        other => panic!("expected a cycle, got {other}"),
    }
}

#[test]
fn test_self_dependency() {
    let container = Container::new();
    container.register([ServiceDef::new("a")
        .provider(Provider::new(|a: u8| a))
        .arg(Argument::service("a"))]);

    let err = container.get("a").unwrap_err();
    assert_eq!(err.root_kind(), ErrorKind::CircularDependency);
    assert_eq!(path_of(&err), ["a", "a"]);
}

#[test]
fn test_three_way_cycle_reports_path() {
    let container = Container::new();
    container.register([
        ServiceDef::new("a")
            .provider(Provider::new(|b: u8| b))
            .arg(Argument::service("b")),
        ServiceDef::new("b")
            .provider(Provider::new(|c: u8| c))
            .arg(Argument::service("c")),
        ServiceDef::new("c")
            .provider(Provider::new(|a: u8| a))
            .arg(Argument::service("a")),
    ]);

    let err = container.get("a").unwrap_err();
    assert_eq!(path_of(&err), ["a", "b", "c", "a"]);

    // Entering from another node reports the cycle from there
    let err = container.get("b").unwrap_err();
    assert_eq!(path_of(&err), ["b", "c", "a", "b"]);
}

#[test]
fn test_cycle_through_tagged_lookup() {
    let container = Container::new();
    container.register([ServiceDef::new("aggregator")
        .provider(Provider::new(|all: Vec<ref_di::Value>| all.len()))
        .arg(Argument::tagged(["plugin"]))
        .tag("plugin")]);

    let err = container.get("aggregator").unwrap_err();
    assert_eq!(err.root_kind(), ErrorKind::CircularDependency);
}

#[test]
fn test_cycle_through_method_call() {
    let container = Container::new();
    container.register([ServiceDef::new("clock")
        .provider(Provider::new(|now: u64| now))
        .arg(Argument::method_call("clock", "now", vec![]))
        .method("now", Provider::new(|_c: u64| 0u64))]);

    let err = container.get("clock").unwrap_err();
    assert_eq!(err.root_kind(), ErrorKind::CircularDependency);
}

#[test]
fn test_container_recovers_after_cycle() {
    let container = Container::new();
    container.register([
        ServiceDef::new("a")
            .provider(Provider::new(|b: u8| b))
            .arg(Argument::service("b")),
        ServiceDef::new("b")
            .provider(Provider::new(|a: u8| a))
            .arg(Argument::service("a")),
    ]);

    assert!(container.get("a").is_err());

    // Breaking the cycle makes both resolvable on the same thread
    container.register([ServiceDef::new("b").provider(Provider::new(|| 5u8))]);
    assert_eq!(container.must_get_as::<u8>("a"), 5);
}

#[test]
fn test_diamond_is_not_a_cycle() {
    let container = Container::new();
    container.register([
        ServiceDef::new("base").provider(Provider::new(|| 1u32)),
        ServiceDef::new("left")
            .provider(Provider::new(|b: u32| b + 1))
            .arg(Argument::service("base")),
        ServiceDef::new("right")
            .provider(Provider::new(|b: u32| b + 2))
            .arg(Argument::service("base")),
        ServiceDef::new("top")
            .provider(Provider::new(|l: u32, r: u32| l + r))
            .args([Argument::service("left"), Argument::service("right")]),
    ]);

    assert_eq!(container.must_get_as::<u32>("top"), 5);
}

#[test]
fn test_deep_chain_exceeds_depth() {
    let container = Container::new();
    let depth = 1100u32;
    container.register((0..depth).map(|i| {
        let def = ServiceDef::new(format!("s{i}"));
        if i + 1 == depth {
            def.provider(Provider::new(|| 0u32))
        } else {
            def.provider(Provider::new(|n: u32| n + 1))
                .arg(Argument::service(format!("s{}", i + 1)))
        }
    }));

    // Deep recursion needs more stack than the default test thread has
    let handle = std::thread::Builder::new()
        .stack_size(256 * 1024 * 1024)
        .spawn(move || container.get("s0").map(|_| ()))
        .unwrap();
    let err = handle.join().unwrap().unwrap_err();
    assert_eq!(err.root_kind(), ErrorKind::DepthExceeded);
}

/// Holds every caller long enough for concurrent builds to overlap.
struct SlowParams;

impl ParameterProvider for SlowParams {
    fn get(&self, _path: &str) -> Result<Value, ParameterError> {
        std::thread::sleep(Duration::from_millis(200));
        Ok(Value::new(1u8))
    }

    fn set(&self, _path: &str, _value: Value) -> Result<(), ParameterError> {
        Ok(())
    }
}

#[test]
fn test_cycle_across_threads_fails_instead_of_hanging() {
    let container = Container::builder()
        .parameter_provider(Arc::new(SlowParams))
        .build();
    container.register([
        ServiceDef::new("a")
            .provider(Provider::new(|p: u8, b: u8| p + b))
            .args([Argument::param("delay"), Argument::service("b")])
            .build_on_first_request(),
        ServiceDef::new("b")
            .provider(Provider::new(|p: u8, a: u8| p + a))
            .args([Argument::param("delay"), Argument::service("a")])
            .build_on_first_request(),
    ]);

    let (tx, rx) = mpsc::channel();
    for name in ["a", "b"] {
        let (container, tx) = (container.clone(), tx.clone());
        std::thread::spawn(move || {
            let _ = tx.send(container.get(name).map(|_| ()));
        });
    }

    for _ in 0..2 {
        let result = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("both callers return");
        let err = result.unwrap_err();
        assert_eq!(err.root_kind(), ErrorKind::CircularDependency);
    }
    assert!(!container.definitions().iter().any(|info| info.built));
}
