use ferrous_tree_di::{
    to_existing, to_factory, to_value, Dispose, Injectable, Instance, Provider, Registry, Resolver, Token,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Connection {
    name: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Dispose for Connection {
    fn dispose(&self) {
        self.log.lock().push(self.name);
    }
}

impl Injectable for Connection {
    fn as_dispose(&self) -> Option<&dyn Dispose> {
        Some(self)
    }
}

fn connection(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> ferrous_tree_di::Binding {
    let log = log.clone();
    to_factory(move |_| Connection { name, log: log.clone() })
}

#[test]
fn test_unmount_disposes_each_instance_once() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = Registry::new();
    let scope = Provider::with(
        "Page",
        [
            ("a", connection("a", &log)),
            ("b", connection("b", &log)),
            ("plain", to_value(5u32)),
        ],
    )
    .create_root(&registry);
    scope.mount();

    for token in ["a", "b", "plain"] {
        assert!(scope.resolve(&Token::name(token)).is_some());
    }

    assert_eq!(scope.unmount(), 2);
    let mut disposed = log.lock().clone();
    disposed.sort();
    assert_eq!(disposed, vec!["a", "b"]);

    // A second unmount does nothing
    assert_eq!(scope.unmount(), 0);
    assert_eq!(log.lock().len(), 2);
}

#[test]
fn test_unresolved_bindings_are_not_disposed() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = Registry::new();
    let scope = Provider::with("Page", [("lazy", connection("lazy", &log))]).create_root(&registry);
    scope.mount();
    scope.unmount();
    assert!(log.lock().is_empty());
}

#[test]
fn test_child_unmount_leaves_parent_instances() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = Registry::new();
    let root = Provider::with("Root", [("shared", connection("shared", &log))]).create_root(&registry);
    let child = Provider::with("Child", [("own", connection("own", &log))]).create_child(&root);

    child.resolve(&Token::name("shared")).unwrap();
    child.resolve(&Token::name("own")).unwrap();
    child.unmount();
    assert_eq!(*log.lock(), vec!["own"]);

    root.unmount();
    assert_eq!(*log.lock(), vec!["own", "shared"]);
}

#[test]
fn test_aliases_are_disposed_by_their_owner_only() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = Registry::new();
    let root = Provider::with("Root", [("db", connection("db", &log))]).create_root(&registry);
    let child = Provider::with("Child", [("database", to_existing("db"))]).create_child(&root);

    let alias = child.get_instance(&Token::name("database")).unwrap();
    let original = root.get_instance(&Token::name("db")).unwrap();
    assert!(alias.ptr_eq(&original));

    child.unmount();
    assert!(log.lock().is_empty());

    root.unmount();
    assert_eq!(*log.lock(), vec!["db"]);
}

#[test]
fn test_same_instance_under_two_tokens_disposed_once() {
    let count = Arc::new(AtomicUsize::new(0));

    struct Counted(Arc<AtomicUsize>);
    impl Dispose for Counted {
        fn dispose(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
    impl Injectable for Counted {
        fn as_dispose(&self) -> Option<&dyn Dispose> {
            Some(self)
        }
    }

    let shared = Instance::new(Counted(count.clone()));
    let registry = Registry::new();
    let scope = Provider::with(
        "Page",
        [
            ("first", ferrous_tree_di::to_instance(shared.clone())),
            ("second", ferrous_tree_di::to_instance(shared.clone())),
        ],
    )
    .create_root(&registry);

    scope.resolve(&Token::name("first")).unwrap();
    scope.resolve(&Token::name("second")).unwrap();
    assert_eq!(scope.unmount(), 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unmount_forgets_owner() {
    let registry = Registry::new();
    let scope = Provider::with("Page", [("v", to_value(String::from("x")))]).create_root(&registry);
    let instance = scope.get_instance(&Token::name("v")).unwrap();
    assert!(registry.scope_of(&instance).is_some());

    scope.unmount();
    assert!(registry.scope_of(&instance).is_none());
    assert_eq!(scope.instance_count(), 0);
}

#[test]
fn test_alias_in_same_scope_does_not_hide_owner() {
    // Cache iteration order varies between maps, so repeat with fresh scopes
    for _ in 0..50 {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = Registry::new();
        let scope = Provider::with(
            "Page",
            [("db", connection("db", &log)), ("alias", to_existing("db"))],
        )
        .create_root(&registry);

        let alias = scope.get_instance(&Token::name("alias")).unwrap();
        assert!(alias.ptr_eq(&scope.cached_instance(&Token::name("db")).unwrap()));

        assert_eq!(scope.unmount(), 1);
        assert_eq!(*log.lock(), vec!["db"]);
    }
}

#[test]
fn test_resolve_after_unmount_caches_nothing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let log = Arc::new(Mutex::new(Vec::new()));
    let counter = calls.clone();
    let sink = log.clone();
    let registry = Registry::new();
    let scope = Provider::with(
        "Page",
        [(
            "db",
            to_factory(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Connection { name: "db", log: sink.clone() }
            }),
        )],
    )
    .create_root(&registry);
    scope.mount();
    scope.unmount();

    assert!(scope.resolve(&Token::name("db")).is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(scope.instance_count(), 0);
    assert!(!scope.has_instance(&Token::name("db")));
}

#[test]
fn test_instance_finished_after_unmount_is_disposed() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let registry = Registry::new();
    let scope = Provider::with(
        "Page",
        [(
            "db",
            to_factory(move |ctx| {
                // The scope goes away while the binding is still running
                ctx.injector().unmount();
                Connection { name: "db", log: sink.clone() }
            }),
        )],
    )
    .create_root(&registry);
    scope.mount();

    assert!(scope.resolve(&Token::name("db")).is_none());
    assert_eq!(scope.instance_count(), 0);
    assert!(!scope.has_instance(&Token::name("db")));
    assert_eq!(*log.lock(), vec!["db"]);
}
