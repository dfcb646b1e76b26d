//! Tree-wide registry: deferred registrations and instance ownership.
//!
//! Decorator-style registrations can run before any provider exists. They are queued on
//! the [`Registry`] and applied at the start of the next resolution. The registry also
//! keeps the side table mapping instances to the scope that created them.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::config::ContainerConfig;
use crate::definition::Definition;
use crate::diagnostics::{Diagnostics, TARGET};
use crate::instance::{Instance, InstanceId};
use crate::pending::Resolution;
use crate::provider::scope::ScopeInner;
use crate::provider::{Injector, Provider, ScopeId};
use crate::token::Token;

/// Registration queued until the next resolution.
pub type DeferredRegistration = Box<dyn FnOnce() + Send>;

/// Shared state for one component tree.
///
/// Cloning is cheap; clones share the queue and the ownership table.
///
/// # Examples
///
/// ```
/// use ferrous_tree_di::{Definition, Provider, Registry, Resolver, Token, to_value};
///
/// let registry = Registry::new();
/// let provider = Provider::new("App");
///
/// // Queued now, applied on the next resolve
/// let target = provider.clone();
/// registry.register_in(move || target, Definition::new("mode", to_value("dark")));
/// assert_eq!(registry.pending_registrations(), 1);
///
/// let root = provider.create_root(&registry);
/// assert_eq!(*root.get::<&str>(&Token::name("mode")).unwrap(), "dark");
/// assert_eq!(registry.pending_registrations(), 0);
/// ```
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    config: ContainerConfig,
    diagnostics: Diagnostics,
    queue: Mutex<Vec<DeferredRegistration>>,
    owners: Mutex<HashMap<InstanceId, Weak<ScopeInner>>>,
    next_scope: AtomicU64,
}

impl Registry {
    /// Registry using the process-wide configuration.
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::global().clone())
    }

    /// Registry with explicit configuration.
    pub fn with_config(config: ContainerConfig) -> Self {
        let diagnostics = Diagnostics::from_config(&config);
        Self {
            inner: Arc::new(RegistryInner {
                config,
                diagnostics,
                queue: Mutex::new(Vec::new()),
                owners: Mutex::new(HashMap::new()),
                next_scope: AtomicU64::new(0),
            }),
        }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    pub(crate) fn diagnostics(&self) -> &Diagnostics {
        &self.inner.diagnostics
    }

    pub(crate) fn next_scope_id(&self) -> ScopeId {
        ScopeId(self.inner.next_scope.fetch_add(1, Ordering::Relaxed))
    }

    /// Queues an arbitrary registration step.
    pub fn defer<F>(&self, registration: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.queue.lock().push(Box::new(registration));
    }

    /// Queues a binding for the provider returned by `get_provider`.
    ///
    /// The provider is looked up lazily so it may be defined after this call. Scopes
    /// that already resolved the token keep their cached instance.
    pub fn register_in<F>(&self, get_provider: F, definition: impl Into<Definition>)
    where
        F: FnOnce() -> Provider + Send + 'static,
    {
        let definition = definition.into();
        let diagnostics = *self.diagnostics();
        self.defer(move || get_provider().register_reporting([definition], &diagnostics));
    }

    /// Adds bindings to `provider` right away, reporting invalid definitions according
    /// to this registry's configuration.
    pub fn register<I, D>(&self, provider: &Provider, definitions: I)
    where
        I: IntoIterator<Item = D>,
        D: Into<Definition>,
    {
        provider.register_reporting(definitions, self.diagnostics());
    }

    /// Number of queued registrations.
    pub fn pending_registrations(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Applies every queued registration, including ones queued while flushing.
    ///
    /// Returns how many ran. Called automatically at the start of each resolution.
    pub fn flush(&self) -> usize {
        let mut applied = 0;
        loop {
            let batch = std::mem::take(&mut *self.inner.queue.lock());
            if batch.is_empty() {
                break;
            }
            applied += batch.len();
            for registration in batch {
                registration();
            }
        }
        if applied > 0 {
            tracing::debug!(target: TARGET, applied, "deferred registrations applied");
        }
        applied
    }

    /// Scope that created `instance`, if it is still alive.
    pub fn scope_of(&self, instance: &Instance) -> Option<Injector> {
        self.inner
            .owners
            .lock()
            .get(&instance.id())
            .and_then(Weak::upgrade)
            .map(|inner| Injector { inner })
    }

    /// Resolves `token` from the scope that created `instance`.
    ///
    /// Lets a service pull further dependencies lazily, from its own position in the
    /// tree.
    pub fn inject(&self, instance: &Instance, token: &Token) -> Option<Resolution> {
        match self.scope_of(instance) {
            Some(scope) => scope.resolve(token),
            None => {
                self.diagnostics().provider_not_found(instance.type_name());
                None
            }
        }
    }

    /// Number of instances whose creating scope is recorded.
    pub fn tracked_instances(&self) -> usize {
        self.inner.owners.lock().len()
    }

    /// Drops entries whose scope no longer exists.
    pub(crate) fn prune_owners(&self) {
        self.inner
            .owners
            .lock()
            .retain(|_, owner| owner.strong_count() > 0);
    }

    /// Records `scope` as the creator of `instance` unless one is already recorded.
    pub(crate) fn tag(&self, instance: &Instance, scope: &Injector) {
        let mut owners = self.inner.owners.lock();
        let alive = owners
            .get(&instance.id())
            .map_or(false, |owner| owner.strong_count() > 0);
        if !alive {
            owners.insert(instance.id(), Arc::downgrade(&scope.inner));
        }
    }

    /// Forgets the owner entry if it points at `scope`.
    pub(crate) fn untag(&self, instance: &Instance, scope: &Injector) {
        let mut owners = self.inner.owners.lock();
        let owned_here = owners
            .get(&instance.id())
            .map_or(false, |owner| std::ptr::eq(owner.as_ptr(), Arc::as_ptr(&scope.inner)));
        if owned_here {
            owners.remove(&instance.id());
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.inner.config)
            .field("queued", &self.pending_registrations())
            .field("owners", &self.inner.owners.lock().len())
            .finish()
    }
}
