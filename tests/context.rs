use ref_di::{
    container_from_context, Argument, CancellationError, Container, Context, ErrorKind, Provider,
    ServiceDef, Value,
};
use std::time::{Duration, Instant};

#[test]
fn test_container_round_trips_through_context() {
    let container = Container::new();
    container.set("answer", Value::new(42u8));

    let ctx = container.attach_to(&Context::background());
    let found = container_from_context(&ctx).unwrap();

    assert!(Container::ptr_eq(&found, &container));
    assert_eq!(found.must_get_as::<u8>("answer"), 42);
}

#[test]
fn test_context_without_container() {
    let ctx = Context::background().with_value("other", Value::new(1u8));
    let err = container_from_context(&ctx).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContextMissing);
    assert_eq!(err.to_string(), "could not get container instance from context");
}

#[test]
fn test_providers_receive_the_container_context() {
    let parent = Context::background().with_value("tenant", Value::new("acme"));
    let container = Container::builder().context(parent).build();
    container.register([ServiceDef::new("tenant")
        .provider(Provider::new(|ctx: Context| {
            ctx.value("tenant").and_then(|v| v.get::<&'static str>())
        }))
        .arg(Argument::Context)]);

    assert_eq!(container.must_get_as::<Option<&'static str>>("tenant"), Some("acme"));
}

#[test]
fn test_cancelling_parent_cancels_container_context() {
    let parent = Context::background();
    let container = Container::builder().context(parent.clone()).build();
    assert!(!container.context().is_cancelled());

    parent.cancel();
    assert!(container.context().is_cancelled());
    assert_eq!(container.context().err(), Some(CancellationError::Cancelled));
}

#[test]
fn test_cancelling_container_leaves_parent_alone() {
    let parent = Context::background();
    let container = Container::builder().context(parent.clone()).build();

    container.cancel();
    assert!(container.context().is_cancelled());
    assert!(!parent.is_cancelled());
}

#[test]
fn test_deadline_is_inherited() {
    let parent = Context::background().with_timeout(Duration::from_millis(10));
    let container = Container::builder().context(parent.clone()).build();

    assert_eq!(container.context().deadline(), parent.deadline());
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(container.context().err(), Some(CancellationError::DeadlineExceeded));
}

#[test]
fn test_child_deadline_never_outlives_parent() {
    let soon = Instant::now() + Duration::from_secs(1);
    let parent = Context::background().with_deadline(soon);
    let child = parent.with_timeout(Duration::from_secs(60));
    assert_eq!(child.deadline(), Some(soon));
}

#[test]
fn test_providers_can_resolve_through_injected_container() {
    let container = Container::new();
    container.register([
        ServiceDef::new("greeting").provider(Provider::new(|| "hello")),
        ServiceDef::new("loud")
            .provider(Provider::fallible(|c: Container| {
                c.get_as::<&'static str>("greeting").map(str::to_uppercase)
            }))
            .arg(Argument::Container),
    ]);

    assert_eq!(container.must_get_as::<String>("loud"), "HELLO");
}
