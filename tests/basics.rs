use ferrous_tree_di::{
    to_class, to_existing, to_factory, to_factory_with, to_instance, to_value, BindingKind, Construct,
    Definition, Instance, Provider, Registry, ResolveContext, Resolver, Symbol, Token,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Config {
    port: u16,
}
ferrous_tree_di::injectable!(Config);

#[derive(Debug)]
struct Server {
    config: Option<Arc<Config>>,
    name: String,
}
ferrous_tree_di::injectable!(Server);

impl Construct for Server {
    fn construct(ctx: &ResolveContext<'_>) -> Self {
        Server {
            config: ctx.get_of::<Config>(),
            name: "MyServer".to_string(),
        }
    }
}

#[test]
fn test_value_binding_returns_same_instance() {
    let registry = Registry::new();
    let root = Provider::with("App", [("answer", to_value(42usize)), ("greeting", to_value("hello".to_string()))])
        .create_root(&registry);

    let num1 = root.get::<usize>(&Token::name("answer")).unwrap();
    let num2 = root.get::<usize>(&Token::name("answer")).unwrap();
    let str1 = root.get::<String>(&Token::name("greeting")).unwrap();

    assert_eq!(*num1, 42);
    assert_eq!(*str1, "hello");
    assert!(Arc::ptr_eq(&num1, &num2)); // Same instance
}

#[test]
fn test_value_binding_keeps_supplied_instance() {
    let supplied = Instance::new(Config { port: 1 });
    let registry = Registry::new();
    let root = Provider::with("App", [(Token::of::<Config>(), to_instance(supplied.clone()))]).create_root(&registry);

    let resolved = root.get_instance(&Token::of::<Config>()).unwrap();
    assert!(resolved.ptr_eq(&supplied));
}

#[test]
fn test_class_binding_resolves_dependencies() {
    let registry = Registry::new();
    let root = Provider::with(
        "App",
        [
            Definition::new(Token::of::<Config>(), to_value(Config { port: 8080 })),
            Definition::class::<Server>(),
        ],
    )
    .create_root(&registry);

    let server = root.get_of::<Server>().unwrap();
    assert_eq!(server.config.as_ref().unwrap().port, 8080);
    assert_eq!(server.name, "MyServer");

    // Class instances remember the scope that built them
    let instance = root.get_instance(&Token::of::<Server>()).unwrap();
    assert!(registry.scope_of(&instance).unwrap().ptr_eq(&root));
}

#[test]
fn test_class_binding_under_another_token() {
    let registry = Registry::new();
    let root = Provider::with("App", [("server", to_class::<Server>())]).create_root(&registry);

    let server = root.get::<Server>(&Token::name("server")).unwrap();
    assert!(server.config.is_none());
    assert_eq!(root.provider().binding(&Token::name("server")).unwrap().kind(), BindingKind::Class);
}

#[test]
fn test_factory_called_once_per_scope() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let registry = Registry::new();
    let root = Provider::with(
        "App",
        [(
            "id",
            to_factory(move |_| counter.fetch_add(1, Ordering::SeqCst) as u64),
        )],
    )
    .create_root(&registry);

    for _ in 0..5 {
        assert_eq!(*root.get::<u64>(&Token::name("id")).unwrap(), 0);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_factory_with_declared_dependencies() {
    let registry = Registry::new();
    let root = Provider::with(
        "App",
        [
            ("host", to_value("localhost".to_string())),
            ("port", to_value(8080u16)),
            (
                "url",
                to_factory_with(["host", "port", "missing"], |deps| {
                    assert_eq!(deps.len(), 3);
                    assert!(deps.instance(2).is_none());
                    format!(
                        "http://{}:{}",
                        deps.get::<String>(0).unwrap(),
                        deps.get::<u16>(1).unwrap()
                    )
                }),
            ),
        ],
    )
    .create_root(&registry);

    assert_eq!(*root.get::<String>(&Token::name("url")).unwrap(), "http://localhost:8080");
}

#[test]
fn test_existing_binding_aliases_target() {
    let registry = Registry::new();
    let root = Provider::with(
        "App",
        [
            ("primary", to_value(Config { port: 1 })),
            ("alias", to_existing("primary")),
        ],
    )
    .create_root(&registry);

    let primary = root.get_instance(&Token::name("primary")).unwrap();
    let alias = root.get_instance(&Token::name("alias")).unwrap();
    assert!(primary.ptr_eq(&alias));
}

#[test]
fn test_existing_to_unbound_token_yields_nothing() {
    let registry = Registry::new();
    let root = Provider::with("App", [("alias", to_existing("nowhere"))]).create_root(&registry);

    assert!(root.resolve(&Token::name("alias")).is_none());
    assert!(!root.has_instance(&Token::name("alias")));
}

#[test]
fn test_symbol_tokens_compare_by_identity() {
    let first = Symbol::new("service");
    let second = Symbol::new("service");
    let registry = Registry::new();
    let root = Provider::with(
        "App",
        [
            (Token::from(first.clone()), to_value(1u8)),
            (Token::from(second.clone()), to_value(2u8)),
        ],
    )
    .create_root(&registry);

    assert_eq!(*root.get::<u8>(&first.clone().into()).unwrap(), 1);
    assert_eq!(*root.get::<u8>(&second.into()).unwrap(), 2);
}

#[test]
fn test_pre_and_post_hooks_wrap_instantiation() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let binding = to_factory({
        let log = log.clone();
        move |_| {
            log.lock().push("create".to_string());
            7u32
        }
    })
    .with_pre({
        let log = log.clone();
        move |token| log.lock().push(format!("pre {}", token))
    })
    .with_post({
        let log = log.clone();
        move |instance| log.lock().push(format!("post {}", instance.type_name()))
    });

    let registry = Registry::new();
    let root = Provider::with("App", [("seven", binding)]).create_root(&registry);
    root.get::<u32>(&Token::name("seven")).unwrap();
    root.get::<u32>(&Token::name("seven")).unwrap();

    assert_eq!(*log.lock(), vec!["pre seven", "create", "post u32"]);
}

#[test]
fn test_type_mismatch_degrades_to_none() {
    let registry = Registry::new();
    let root = Provider::with("App", [("n", to_value(1u8))]).create_root(&registry);

    assert!(root.get::<String>(&Token::name("n")).is_none());
    assert!(root.try_get::<String>(&Token::name("n")).is_err());
    // The cached instance is untouched
    assert_eq!(*root.get::<u8>(&Token::name("n")).unwrap(), 1);
}

#[test]
fn test_last_registration_wins() {
    let registry = Registry::new();
    let provider = Provider::with("App", [("mode", to_value("first"))]);
    provider.register([("mode", to_value("second"))]);
    let root = provider.create_root(&registry);

    assert_eq!(*root.get::<&str>(&Token::name("mode")).unwrap(), "second");
}

#[test]
fn test_invalid_definitions_are_skipped() {
    let provider = Provider::with(
        "App",
        [
            Definition::token("lonely"),
            Definition::new("", to_value(1u8)),
            Definition::new("ok", to_value(1u8)),
        ],
    );
    assert_eq!(provider.len(), 1);

    let registry = Registry::new();
    let root = provider.create_root(&registry);
    assert!(root.resolve(&Token::name("lonely")).is_none());
}

#[test]
fn test_anonymous_provider() {
    let registry = Registry::new();
    let root = Provider::anonymous([("inline", to_value(3i32))]).create_root(&registry);
    assert_eq!(root.name(), "ComponentWithServices");
    assert_eq!(*root.get::<i32>(&Token::name("inline")).unwrap(), 3);
}
