//! # ferrous-tree-di
//!
//! Hierarchical dependency injection for component trees.
//!
//! Every node of a tree may mount a scope ([`Injector`]) from a [`Provider`], which
//! holds that node's binding table. Resolving a token walks from the requesting scope
//! towards the root; the first scope that has the token cached or bound answers and
//! caches the instance itself. Instances live exactly as long as their scope.
//!
//! ## Features
//!
//! - **Token kinds**: types, string names and unique symbols
//! - **Binding strategies**: class, factory, value, existing, async factory, auto bindings
//! - **Placeholders**: re-entrant requests during construction get a pending handle
//! - **Lifecycle**: injected services get a refresh callback; disposable instances are
//!   disposed when their scope unmounts
//! - **Consumers**: memoized lookups plus re-render subscriptions across scope boundaries
//! - **Stores**: snapshot state with nested, batched mutations
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_tree_di::{
//!     Construct, Definition, Injectable, Provider, Registry, ResolveContext, Resolver, Token,
//!     to_value,
//! };
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: Arc<String>,
//! }
//! impl Injectable for Database {}
//!
//! impl Construct for Database {
//!     fn construct(ctx: &ResolveContext<'_>) -> Self {
//!         let url = ctx.get::<String>(&Token::name("db.url")).unwrap_or_default();
//!         Database { url }
//!     }
//! }
//!
//! let registry = Registry::new();
//! let app = Provider::with("App", [("db.url", to_value(String::from("postgres://localhost")))]);
//! let page = Provider::with("Page", [Definition::class::<Database>()]);
//!
//! let root = app.create_root(&registry);
//! let child = page.create_child(&root);
//! child.mount();
//!
//! let db = child.get_of::<Database>().unwrap();
//! assert_eq!(db.url.as_str(), "postgres://localhost");
//!
//! // The child scope caches the database; its parent never sees it
//! assert!(child.has_instance(&Token::of::<Database>()));
//! assert!(!root.has_instance(&Token::of::<Database>()));
//! ```
//!
//! ## Prefer-ancestor bindings
//!
//! ```rust
//! use ferrous_tree_di::{Provider, Registry, Resolver, Token, to_value};
//!
//! let registry = Registry::new();
//! let root = Provider::with("Root", [("theme", to_value("dark"))]).create_root(&registry);
//! let child = Provider::with("Child", [("theme", to_value("light").prefer_ancestor())])
//!     .create_child(&root);
//!
//! assert_eq!(*child.get::<&str>(&Token::name("theme")).unwrap(), "dark");
//! assert!(root.has_instance(&Token::name("theme")));
//! assert!(!child.has_instance(&Token::name("theme")));
//! ```

// Module declarations
pub mod async_factories;
pub mod bindings;
pub mod config;
pub mod consumer;
pub mod definition;
pub mod error;
pub mod event;
pub mod inject;
pub mod instance;
pub mod pending;
pub mod provider;
pub mod registry;
pub mod store;
pub mod token;
pub mod traits;

mod diagnostics;
mod internal;

// Re-exports
pub use async_factories::{
    to_async_factory, AsyncDependencies, AsyncFactory, BoxError, Deferred, InstanceFuture,
};
pub use bindings::{
    to_class, to_existing, to_factory, to_factory_with, to_instance, to_value, Binding, BindingKind,
    Dependencies,
};
pub use config::{ContainerConfig, DiagnosticsMode};
pub use consumer::Consumer;
pub use definition::Definition;
pub use error::{DiError, DiResult};
pub use event::{Handler, HandlerId, Notifier};
pub use inject::Inject;
pub use instance::{Instance, InstanceId, IntoInstance};
pub use pending::{PendingInstance, Resolution};
pub use provider::{
    Ancestors, AutoFactory, Injector, Provider, ProviderBuilder, RefreshHandle, ResolveContext,
    ScopeId, ScopePhase, WeakInjector,
};
pub use registry::{DeferredRegistration, Registry};
pub use store::{MutationGuard, MutationPhase, Store};
pub use token::{token_of, Symbol, Token};
pub use traits::{Construct, Dispose, Injectable, InjectedService, Resolver, ResolverCore};
