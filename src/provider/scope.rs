//! Scopes mounted from providers, and their lifecycle.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::config::ContainerConfig;
use crate::diagnostics::{Diagnostics, TARGET};
use crate::event::Notifier;
use crate::instance::Instance;
use crate::pending::{PendingSlot, Resolution};
use crate::registry::Registry;
use crate::token::Token;
use crate::traits::ResolverCore;

use super::Provider;

/// Identity of a scope within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub(crate) u64);

/// Lifecycle phase of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopePhase {
    /// Created, instances may already be cached
    Created,
    /// Mounted; injected services have been initialized
    Mounted,
    /// Torn down; caches discarded, refresh requests ignored
    Unmounted,
}

/// Scope of the component tree, mounted from a [`Provider`].
///
/// Each scope keeps its own instance and pending caches and a link to its parent. Cloning
/// is cheap and yields a handle to the same scope.
///
/// # Examples
///
/// ```
/// use ferrous_tree_di::{Provider, Registry, Resolver, Token, to_factory};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let created = Arc::new(AtomicUsize::new(0));
/// let counter = created.clone();
/// let provider = Provider::with("Counter", [(
///     "count",
///     to_factory(move |_| counter.fetch_add(1, Ordering::SeqCst)),
/// )]);
///
/// let registry = Registry::new();
/// let scope = provider.create_root(&registry);
/// scope.mount();
///
/// let a = scope.get_instance(&Token::name("count")).unwrap();
/// let b = scope.get_instance(&Token::name("count")).unwrap();
/// assert!(a.ptr_eq(&b));
/// assert_eq!(created.load(Ordering::SeqCst), 1);
///
/// scope.unmount();
/// ```
#[derive(Clone)]
pub struct Injector {
    pub(crate) inner: Arc<ScopeInner>,
}

pub(crate) struct ScopeInner {
    id: ScopeId,
    provider: Provider,
    parent: Option<Weak<ScopeInner>>,
    registry: Registry,
    pub(crate) state: Mutex<ScopeState>,
    child_notifications: Notifier,
    context_changed: Notifier,
    version: AtomicU64,
}

pub(crate) struct ScopeState {
    pub(crate) instances: HashMap<Token, CachedInstance>,
    pub(crate) pending: HashMap<Token, PendingSlot>,
    pub(crate) phase: ScopePhase,
}

/// Cache entry; aliases created by existing bindings are not owned by the scope.
pub(crate) struct CachedInstance {
    pub(crate) instance: Instance,
    pub(crate) owned: bool,
}

impl ScopeState {
    pub(crate) fn lookup(&self, token: &Token) -> Option<Resolution> {
        if let Some(cached) = self.instances.get(token) {
            return Some(Resolution::Ready(cached.instance.clone()));
        }
        self.pending
            .get(token)
            .map(|slot| Resolution::Pending(slot.handle()))
    }
}

impl Injector {
    pub(crate) fn new(provider: Provider, parent: Option<&Injector>, registry: Registry) -> Self {
        let id = registry.next_scope_id();
        let scope = Self {
            inner: Arc::new(ScopeInner {
                id,
                provider,
                parent: parent.map(|p| Arc::downgrade(&p.inner)),
                registry,
                state: Mutex::new(ScopeState {
                    instances: HashMap::new(),
                    pending: HashMap::new(),
                    phase: ScopePhase::Created,
                }),
                child_notifications: Notifier::new(),
                context_changed: Notifier::new(),
                version: AtomicU64::new(0),
            }),
        };
        tracing::debug!(
            target: TARGET,
            scope = %scope.name(),
            id = scope.id().0,
            parent = ?parent.map(|p| p.id().0),
            "scope created"
        );
        scope
    }

    /// Scope identity.
    pub fn id(&self) -> ScopeId {
        self.inner.id
    }

    /// Name of the provider this scope was mounted from.
    pub fn name(&self) -> &str {
        self.inner.provider.name()
    }

    /// Provider this scope was mounted from.
    pub fn provider(&self) -> &Provider {
        &self.inner.provider
    }

    /// Registry shared by the whole tree.
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub(crate) fn diagnostics(&self) -> &Diagnostics {
        self.inner.registry.diagnostics()
    }

    /// Parent scope, if it is still alive.
    pub fn parent(&self) -> Option<Injector> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Injector { inner })
    }

    /// Ancestors, nearest first. The scope itself is not included.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors { next: self.parent() }
    }

    /// Creates a scope below this one.
    pub fn create_child(&self, provider: &Provider) -> Injector {
        provider.create_child(self)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ScopePhase {
        self.inner.state.lock().phase
    }

    /// Whether the scope is mounted.
    pub fn is_mounted(&self) -> bool {
        self.phase() == ScopePhase::Mounted
    }

    /// Number of refreshes requested so far.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Whether `token` is cached (or under construction) in this very scope.
    pub fn has_instance(&self, token: &Token) -> bool {
        let state = self.inner.state.lock();
        state.instances.contains_key(token) || state.pending.contains_key(token)
    }

    /// The instance cached for `token` in this very scope.
    pub fn cached_instance(&self, token: &Token) -> Option<Instance> {
        self.inner
            .state
            .lock()
            .instances
            .get(token)
            .map(|cached| cached.instance.clone())
    }

    /// Number of instances cached in this scope.
    pub fn instance_count(&self) -> usize {
        self.inner.state.lock().instances.len()
    }

    /// Whether this scope's provider binds `token`.
    pub fn has_binding(&self, token: &Token) -> bool {
        self.inner.provider.has_binding(token)
    }

    /// Fired whenever a service of this scope requests a refresh.
    ///
    /// Consumers in descendant scopes subscribe here for tokens they resolve from this
    /// scope.
    pub fn child_notifications(&self) -> &Notifier {
        &self.inner.child_notifications
    }

    /// Fired whenever this scope's context value changes.
    pub fn context_changed(&self) -> &Notifier {
        &self.inner.context_changed
    }

    /// Handle that services use to request a refresh of this scope.
    pub fn refresh_handle(&self) -> RefreshHandle {
        RefreshHandle {
            scope: Arc::downgrade(&self.inner),
        }
    }

    /// Non-owning handle to this scope.
    pub fn downgrade(&self) -> WeakInjector {
        WeakInjector {
            scope: Arc::downgrade(&self.inner),
        }
    }

    /// Reference equality.
    pub fn ptr_eq(&self, other: &Injector) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Marks the scope mounted and initializes every cached injected service.
    ///
    /// Instances created later are initialized as soon as they are cached. Mounting an
    /// unmounted scope has no effect.
    pub fn mount(&self) {
        let cached: Vec<Instance> = {
            let mut state = self.inner.state.lock();
            match state.phase {
                ScopePhase::Created => state.phase = ScopePhase::Mounted,
                ScopePhase::Mounted => return,
                ScopePhase::Unmounted => {
                    tracing::debug!(target: TARGET, scope = %self.name(), "mount after unmount ignored");
                    return;
                }
            }
            state.instances.values().map(|c| c.instance.clone()).collect()
        };
        for instance in &cached {
            self.init_instance(instance);
        }
        tracing::debug!(target: TARGET, scope = %self.name(), instances = cached.len(), "scope mounted");
    }

    /// Tears the scope down.
    ///
    /// Every instance this scope owns is disposed once, in creation-independent order,
    /// and the caches are discarded. Returns the number of disposed instances. Calling
    /// it again is a no-op.
    pub fn unmount(&self) -> usize {
        let (instances, pending) = {
            let mut state = self.inner.state.lock();
            if state.phase == ScopePhase::Unmounted {
                return 0;
            }
            state.phase = ScopePhase::Unmounted;
            (
                std::mem::take(&mut state.instances),
                std::mem::take(&mut state.pending),
            )
        };
        // Dropping the slots wakes anything still waiting on them
        drop(pending);

        let mut seen = HashSet::new();
        let mut disposed = 0;
        // Aliases may share an instance with an owned entry; only owned entries count
        for cached in instances.into_values().filter(|cached| cached.owned) {
            if !seen.insert(cached.instance.id()) {
                continue;
            }
            if cached.instance.dispose() {
                disposed += 1;
            }
            self.inner.registry.untag(&cached.instance, self);
        }
        tracing::debug!(target: TARGET, scope = %self.name(), disposed, "scope unmounted");
        disposed
    }

    /// Bumps the version and notifies subscribers. Ignored once unmounted.
    pub(crate) fn mark_changed(&self) {
        if self.phase() == ScopePhase::Unmounted {
            return;
        }
        let version = self.inner.version.fetch_add(1, Ordering::AcqRel) + 1;
        if self.diagnostics().tracing() {
            tracing::trace!(target: TARGET, scope = %self.name(), version, "scope refreshed");
        }
        self.inner.context_changed.trigger(&());
        self.inner.child_notifications.trigger(&());
    }

    pub(crate) fn init_instance(&self, instance: &Instance) {
        if instance.init_service(|| self.refresh_handle()) && self.diagnostics().tracing() {
            tracing::trace!(
                target: TARGET,
                scope = %self.name(),
                service = instance.type_name(),
                "injected service initialized"
            );
        }
    }
}

impl ResolverCore for Injector {
    fn resolve_token(&self, token: &Token) -> Option<Resolution> {
        self.resolve(token)
    }

    fn config(&self) -> &ContainerConfig {
        self.inner.registry.config()
    }

    fn subject(&self) -> String {
        self.name().to_string()
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("id", &self.inner.id)
            .field("provider", &self.name())
            .field("phase", &self.phase())
            .finish()
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.phase == ScopePhase::Unmounted {
            return;
        }
        if state
            .instances
            .values()
            .any(|c| c.owned && c.instance.is_disposable())
        {
            tracing::warn!(
                target: TARGET,
                scope = %self.provider.name(),
                "scope dropped with undisposed instances; call unmount() before dropping"
            );
        }
        // unmount() untags what it owned; a dropped scope leaves dead entries behind
        if !state.instances.is_empty() {
            self.registry.prune_owners();
        }
    }
}

/// Iterator over a scope's ancestors.
pub struct Ancestors {
    next: Option<Injector>,
}

impl Iterator for Ancestors {
    type Item = Injector;

    fn next(&mut self) -> Option<Injector> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}

/// Callback handed to injected services to request a refresh of their scope.
///
/// Holds the scope weakly; once the scope is gone or unmounted, refreshing does nothing.
#[derive(Clone)]
pub struct RefreshHandle {
    scope: Weak<ScopeInner>,
}

impl RefreshHandle {
    /// Marks the scope changed and notifies its subscribers.
    pub fn refresh(&self) {
        if let Some(inner) = self.scope.upgrade() {
            Injector { inner }.mark_changed();
        }
    }

    /// Whether the scope is still mounted.
    pub fn is_alive(&self) -> bool {
        self.scope
            .upgrade()
            .map_or(false, |inner| inner.state.lock().phase != ScopePhase::Unmounted)
    }
}

impl fmt::Debug for RefreshHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshHandle").field("alive", &self.is_alive()).finish()
    }
}

/// Non-owning handle to an [`Injector`].
#[derive(Clone)]
pub struct WeakInjector {
    scope: Weak<ScopeInner>,
}

impl WeakInjector {
    /// The scope, if it is still alive.
    pub fn upgrade(&self) -> Option<Injector> {
        self.scope.upgrade().map(|inner| Injector { inner })
    }
}

impl fmt::Debug for WeakInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakInjector")
    }
}
