use ferrous_tree_di::{
    to_factory, Binding, BindingKind, Construct, Definition, Inject, Injectable, Instance, Provider, Registry,
    Resolution, ResolveContext, Resolver, Token,
};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

struct A {
    b: Option<Instance>,
}
struct B {
    a: Option<Resolution>,
}
ferrous_tree_di::injectable!(A, B);

fn cyclic_provider() -> Provider {
    Provider::with(
        "Cycle",
        [
            ("a", to_factory(|ctx| A { b: ctx.get_instance(&Token::name("b")) })),
            ("b", to_factory(|ctx| B { a: ctx.resolve(&Token::name("a")) })),
        ],
    )
}

#[test]
fn test_reentrant_request_gets_pending_placeholder() {
    let registry = Registry::new();
    let root = cyclic_provider().create_root(&registry);

    let a = root.get_instance(&Token::name("a")).unwrap();
    let b = a.downcast::<A>().unwrap().b.clone().unwrap().downcast::<B>().unwrap();

    match b.a.as_ref().unwrap() {
        Resolution::Pending(pending) => {
            assert_eq!(pending.token(), &Token::name("a"));
            // Settled once the outer construction finished
            assert!(pending.try_get().unwrap().ptr_eq(&a));
        }
        Resolution::Ready(_) => panic!("expected a placeholder"),
    }
}

#[tokio::test]
async fn test_pending_placeholder_can_be_awaited() {
    let registry = Registry::new();
    let root = cyclic_provider().create_root(&registry);

    let a = root.get_instance(&Token::name("a")).unwrap();
    let b = root.get::<B>(&Token::name("b")).unwrap();

    let settled = b.a.clone().unwrap().settled().await.unwrap();
    assert!(settled.ptr_eq(&a));
}

#[test]
fn test_reading_placeholder_during_construction_yields_none() {
    let observed = Arc::new(AtomicBool::new(true));
    let seen = observed.clone();
    let registry = Registry::new();
    let root = Provider::with(
        "Cycle",
        [
            ("a", to_factory(|ctx| A { b: ctx.get_instance(&Token::name("b")) })),
            (
                "b",
                to_factory(move |ctx| {
                    // Typed access to an unsettled placeholder degrades to None
                    seen.store(ctx.get::<A>(&Token::name("a")).is_some(), Ordering::SeqCst);
                    B { a: None }
                }),
            ),
        ],
    )
    .create_root(&registry);

    root.get_instance(&Token::name("a")).unwrap();
    assert!(!observed.load(Ordering::SeqCst));
}

#[test]
fn test_failed_construction_can_be_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let registry = Registry::new();
    let root = Provider::with(
        "Flaky",
        [(
            "svc",
            to_factory(move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("first attempt fails");
                }
                "ok"
            }),
        )],
    )
    .create_root(&registry);

    let first = catch_unwind(AssertUnwindSafe(|| root.resolve(&Token::name("svc"))));
    assert!(first.is_err());
    assert!(!root.has_instance(&Token::name("svc")));

    assert_eq!(*root.get::<&str>(&Token::name("svc")).unwrap(), "ok");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_binding_producing_nothing_caches_nothing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let binding = Binding::from_fn(BindingKind::Factory, "nothing", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        None
    });
    let registry = Registry::new();
    let root = Provider::with("Root", [("svc", ferrous_tree_di::to_value(1u8))]).create_root(&registry);
    let child = Provider::with("Child", [("svc", binding)]).create_child(&root);

    // A non-auto binding that produces nothing ends the walk here
    assert!(child.resolve(&Token::name("svc")).is_none());
    assert!(child.resolve(&Token::name("svc")).is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!child.has_instance(&Token::name("svc")));
}

struct Parent {
    child: Inject<Child>,
}
struct Child {
    parent: Inject<Parent>,
}
impl Injectable for Parent {}
impl Injectable for Child {}

impl Construct for Parent {
    fn construct(ctx: &ResolveContext<'_>) -> Self {
        Parent {
            child: Inject::of(ctx),
        }
    }
}

impl Construct for Child {
    fn construct(ctx: &ResolveContext<'_>) -> Self {
        Child {
            parent: Inject::of(ctx),
        }
    }
}

#[test]
fn test_lazy_fields_break_construction_cycles() {
    let registry = Registry::new();
    let root = Provider::with("App", [Definition::class::<Parent>(), Definition::class::<Child>()])
        .create_root(&registry);

    let parent = root.get_of::<Parent>().unwrap();
    assert!(!parent.child.is_resolved());

    let child = parent.child.get().unwrap();
    assert!(parent.child.is_resolved());
    assert!(Arc::ptr_eq(&child.parent.get().unwrap(), &parent));
    // Stored after the first access
    assert!(Arc::ptr_eq(&parent.child.get().unwrap(), &child));
}

#[test]
fn test_lazy_field_during_cycle_reports_pending() {
    struct Outer {
        inner: Arc<Inner>,
    }
    struct Inner {
        seen_outer: bool,
    }
    impl Injectable for Outer {}
    impl Injectable for Inner {}

    impl Construct for Outer {
        fn construct(ctx: &ResolveContext<'_>) -> Self {
            Outer {
                inner: ctx.get_of::<Inner>().unwrap(),
            }
        }
    }
    impl Construct for Inner {
        fn construct(ctx: &ResolveContext<'_>) -> Self {
            let outer: Inject<Outer> = Inject::of(ctx);
            Inner {
                seen_outer: outer.get().is_some(),
            }
        }
    }

    let registry = Registry::new();
    let root = Provider::with("App", [Definition::class::<Outer>(), Definition::class::<Inner>()])
        .create_root(&registry);

    let outer = root.get_of::<Outer>().unwrap();
    assert!(!outer.inner.seen_outer);
}
