use ferrous_tree_di::{
    to_class, Construct, Consumer, Injectable, InjectedService, MutationPhase, Provider, RefreshHandle, Registry,
    ResolveContext, Store, Token,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Default, Debug, PartialEq)]
struct TodoState {
    items: Vec<String>,
    loading: bool,
}

#[derive(Default)]
struct TodoService {
    store: Store<TodoState>,
}

impl TodoService {
    fn add(&self, item: &str) {
        self.store.update(|s| s.items.push(item.to_string()));
    }

    fn add_many(&self, items: &[&str]) {
        self.store.action(|| {
            for item in items {
                self.add(item);
            }
        });
    }

    async fn load(&self) {
        let _guard = self.store.begin();
        self.store.update(|s| s.loading = true);
        let fetched = self
            .store
            .wait_for_async(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                vec!["remote".to_string()]
            })
            .await;
        self.store.update(|s| {
            s.items.extend(fetched);
            s.loading = false;
        });
    }
}

impl InjectedService for TodoService {
    fn init_provider(&self, refresh: RefreshHandle) {
        self.store.attach(refresh);
    }
}

impl Injectable for TodoService {
    fn as_injected_service(&self) -> Option<&dyn InjectedService> {
        Some(self)
    }
}

impl Construct for TodoService {
    fn construct(_: &ResolveContext<'_>) -> Self {
        TodoService::default()
    }
}

fn mounted_service() -> (ferrous_tree_di::Injector, Arc<TodoService>, Arc<AtomicUsize>, Consumer) {
    let registry = Registry::new();
    let scope = Provider::with("Todos", [(Token::of::<TodoService>(), to_class::<TodoService>())])
        .create_root(&registry);
    scope.mount();

    let renders = Arc::new(AtomicUsize::new(0));
    let counter = renders.clone();
    let consumer = Consumer::new(Some(&scope), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let service = consumer
        .use_instance_of::<TodoService>(&Token::of::<TodoService>())
        .unwrap();
    consumer.mount();
    (scope, service, renders, consumer)
}

#[test]
fn test_attach_publishes_initial_snapshot() {
    let (scope, service, _renders, _consumer) = mounted_service();
    // attach() refreshed once while the instance was being created
    assert_eq!(scope.version(), 1);
    assert_eq!(service.store.phase(), MutationPhase::Idle);
}

#[test]
fn test_each_update_outside_action_refreshes() {
    let (_scope, service, renders, _consumer) = mounted_service();
    service.add("a");
    service.add("b");
    assert_eq!(renders.load(Ordering::SeqCst), 2);
    assert_eq!(service.store.snapshot().items, vec!["a", "b"]);
}

#[test]
fn test_action_batches_into_one_refresh() {
    let (_scope, service, renders, _consumer) = mounted_service();
    let before = service.store.snapshot();

    service.add_many(&["a", "b", "c"]);

    assert_eq!(renders.load(Ordering::SeqCst), 1);
    assert_eq!(service.store.snapshot().items.len(), 3);
    // Old snapshots stay untouched
    assert!(before.items.is_empty());
}

#[test]
fn test_nested_actions_commit_at_outermost() {
    let (_scope, service, renders, _consumer) = mounted_service();
    service.store.action(|| {
        service.add_many(&["inner"]);
        assert_eq!(renders.load(Ordering::SeqCst), 0);
        assert_eq!(service.store.read(|s| s.items.len()), 1);
        assert!(service.store.snapshot().items.is_empty());
    });
    assert_eq!(renders.load(Ordering::SeqCst), 1);
}

#[test]
fn test_finish_without_start_keeps_state() {
    let (_scope, service, renders, _consumer) = mounted_service();
    service.add("kept");
    service.store.finish(true);
    assert_eq!(service.store.phase(), MutationPhase::Idle);
    assert_eq!(service.store.snapshot().items, vec!["kept"]);
    assert_eq!(renders.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_wait_for_async_publishes_intermediate_state() {
    let (_scope, service, renders, _consumer) = mounted_service();

    service.load().await;

    let state = service.store.snapshot();
    assert_eq!(state.items, vec!["remote"]);
    assert!(!state.loading);
    // One refresh for the checkpoint, one for the final commit
    assert_eq!(renders.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_async_action_stays_open_until_future_completes() {
    let (_scope, service, renders, _consumer) = mounted_service();
    let worker = service.clone();
    let counter = renders.clone();

    let loaded = service
        .store
        .action_async(move || async move {
            worker.add("first");
            tokio::time::sleep(Duration::from_millis(5)).await;
            // Still one open mutation: nothing committed or rendered yet
            assert_eq!(worker.store.phase(), MutationPhase::Mutating { depth: 1 });
            assert!(worker.store.snapshot().items.is_empty());
            assert_eq!(counter.load(Ordering::SeqCst), 0);
            worker.add("second");
            worker.store.read(|s| s.items.len())
        })
        .await;

    assert_eq!(loaded, 2);
    assert_eq!(service.store.phase(), MutationPhase::Idle);
    assert_eq!(service.store.snapshot().items, vec!["first", "second"]);
    assert_eq!(renders.load(Ordering::SeqCst), 1);
}

#[test]
fn test_store_without_scope_still_commits() {
    let store = Store::new(TodoState::default());
    store.update(|s| s.loading = true);
    assert!(store.snapshot().loading);
}
