//! Providers: binding tables that scopes are mounted from.
//!
//! A [`Provider`] owns the binding table for one kind of component. Every scope
//! ([`Injector`]) mounted from it shares that table but keeps its own instance cache.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bindings::Binding;
use crate::config::ContainerConfig;
use crate::definition::Definition;
use crate::diagnostics::Diagnostics;
use crate::registry::Registry;
use crate::token::Token;

pub mod context;
mod resolve;
pub mod scope;
mod table;

pub use context::ResolveContext;
pub use scope::{Ancestors, Injector, RefreshHandle, ScopeId, ScopePhase, WeakInjector};

use table::BindingTable;

/// Synthesizes a binding for a token the provider does not bind explicitly.
///
/// Returning `None` leaves the token to the parent scope. A synthesized binding that
/// produces nothing at resolution time also falls through to the parent.
pub type AutoFactory = Arc<dyn Fn(&Token, &Injector) -> Option<Binding> + Send + Sync>;

/// Binding table for a component kind.
///
/// Cloning is cheap; clones share the table.
///
/// # Examples
///
/// ```
/// use ferrous_tree_di::{Provider, Registry, Resolver, Token, to_value};
///
/// let registry = Registry::new();
/// let app = Provider::with("App", [("theme", to_value("dark"))]);
/// let page = Provider::with("Page", [("title", to_value("Home"))]);
///
/// let root = app.create_root(&registry);
/// let child = page.create_child(&root);
///
/// // The child sees its own bindings and its ancestors'
/// assert_eq!(*child.get::<&str>(&Token::name("theme")).unwrap(), "dark");
/// assert_eq!(*child.get::<&str>(&Token::name("title")).unwrap(), "Home");
/// ```
#[derive(Clone)]
pub struct Provider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    name: Arc<str>,
    table: RwLock<BindingTable>,
    auto_factory: Option<AutoFactory>,
}

impl Provider {
    /// Provider without bindings.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::builder(name).build()
    }

    /// Provider with an initial binding list.
    pub fn with<I, D>(name: impl Into<Arc<str>>, definitions: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Definition>,
    {
        Self::builder(name).definitions(definitions).build()
    }

    /// Provider for a component that only declares bindings inline.
    pub fn anonymous<I, D>(definitions: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Definition>,
    {
        Self::with("ComponentWithServices", definitions)
    }

    /// Starts a builder, used to attach an auto factory.
    pub fn builder(name: impl Into<Arc<str>>) -> ProviderBuilder {
        ProviderBuilder {
            name: name.into(),
            table: BindingTable::new(),
            auto_factory: None,
            diagnostics: Diagnostics::global(),
        }
    }

    /// Provider name, used in diagnostics.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Adds bindings to the shared table.
    ///
    /// Invalid definitions are reported and skipped. A token registered again replaces
    /// the previous binding for scopes resolving it later; cached instances are kept.
    ///
    /// A provider is not tied to a registry, so reports follow the process-wide
    /// [`ContainerConfig::global`]. Use [`Registry::register`] to report through a
    /// registry's own configuration.
    pub fn register<I, D>(&self, definitions: I)
    where
        I: IntoIterator<Item = D>,
        D: Into<Definition>,
    {
        self.register_reporting(definitions, &Diagnostics::global());
    }

    pub(crate) fn register_reporting<I, D>(&self, definitions: I, diagnostics: &Diagnostics)
    where
        I: IntoIterator<Item = D>,
        D: Into<Definition>,
    {
        let mut table = self.inner.table.write();
        for definition in definitions {
            if let Some((token, binding)) = definition.into().normalize(diagnostics) {
                table.insert(token, binding);
            }
        }
    }

    /// Binding for `token`, explicit or previously synthesized.
    pub fn binding(&self, token: &Token) -> Option<Binding> {
        self.inner.table.read().get(token).cloned()
    }

    /// Whether the table holds any binding for `token`.
    pub fn has_binding(&self, token: &Token) -> bool {
        self.inner.table.read().contains(token)
    }

    /// Whether the table holds a binding for `token` that was not synthesized.
    pub(crate) fn has_explicit_binding(&self, token: &Token) -> bool {
        self.inner
            .table
            .read()
            .get(token)
            .map_or(false, |binding| !binding.is_auto())
    }

    /// Tokens currently bound.
    pub fn tokens(&self) -> Vec<Token> {
        self.inner.table.read().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Number of bound tokens.
    pub fn len(&self) -> usize {
        self.inner.table.read().len()
    }

    /// Whether no token is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn auto_factory(&self) -> Option<&AutoFactory> {
        self.inner.auto_factory.as_ref()
    }

    pub(crate) fn insert_binding(&self, token: Token, binding: Binding) {
        self.inner.table.write().insert(token, binding);
    }

    /// Mounts a root scope (no parent).
    pub fn create_root(&self, registry: &Registry) -> Injector {
        Injector::new(self.clone(), None, registry.clone())
    }

    /// Mounts a scope below `parent`, sharing its registry.
    pub fn create_child(&self, parent: &Injector) -> Injector {
        Injector::new(self.clone(), Some(parent), parent.registry().clone())
    }

    /// Reference equality.
    pub fn ptr_eq(&self, other: &Provider) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.inner.name)
            .field("bindings", &self.len())
            .field("auto", &self.inner.auto_factory.is_some())
            .finish()
    }
}

/// Builder for [`Provider`].
///
/// ```
/// use ferrous_tree_di::{Provider, to_value, BindingKind};
///
/// let provider = Provider::builder("Forms")
///     .bind("form.name", to_value(String::from("signup")))
///     .auto_binding(|token, _scope| {
///         token.display_name().starts_with("field.").then(|| to_value(String::new()))
///     })
///     .build();
/// assert_eq!(provider.len(), 1);
/// assert_eq!(provider.binding(&"form.name".into()).unwrap().kind(), BindingKind::Value);
/// ```
pub struct ProviderBuilder {
    name: Arc<str>,
    table: BindingTable,
    auto_factory: Option<AutoFactory>,
    diagnostics: Diagnostics,
}

impl ProviderBuilder {
    /// Reports invalid definitions added after this call according to `config`
    /// instead of the process-wide configuration.
    pub fn config(mut self, config: &ContainerConfig) -> Self {
        self.diagnostics = Diagnostics::from_config(config);
        self
    }

    /// Adds one binding.
    pub fn bind(mut self, token: impl Into<Token>, binding: Binding) -> Self {
        if let Some((token, binding)) = Definition::new(token, binding).normalize(&self.diagnostics) {
            self.table.insert(token, binding);
        }
        self
    }

    /// Adds a binding list.
    pub fn definitions<I, D>(mut self, definitions: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Definition>,
    {
        for definition in definitions {
            if let Some((token, binding)) = definition.into().normalize(&self.diagnostics) {
                self.table.insert(token, binding);
            }
        }
        self
    }

    /// Installs the auto factory consulted for unbound tokens.
    ///
    /// The factory is skipped for tokens that an ancestor scope binds explicitly.
    pub fn auto_binding<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Token, &Injector) -> Option<Binding> + Send + Sync + 'static,
    {
        self.auto_factory = Some(Arc::new(factory));
        self
    }

    /// Finishes the provider.
    pub fn build(self) -> Provider {
        Provider {
            inner: Arc::new(ProviderInner {
                name: self.name,
                table: RwLock::new(self.table),
                auto_factory: self.auto_factory,
            }),
        }
    }
}
