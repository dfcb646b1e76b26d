//! Lazily resolved service fields.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::diagnostics::Diagnostics;
use crate::internal::resolution_path;
use crate::pending::Resolution;
use crate::provider::{Injector, ResolveContext, WeakInjector};
use crate::token::Token;

/// Dependency field resolved on first access.
///
/// Created inside a constructor, it remembers the constructing scope and looks the
/// token up only when [`get`](Inject::get) is first called. This breaks construction
/// cycles: two services can hold `Inject` fields pointing at each other.
///
/// # Examples
///
/// ```
/// use ferrous_tree_di::{Construct, Definition, Inject, Injectable, Provider, Registry,
///     ResolveContext, Resolver};
///
/// struct Parent { child: Inject<Child> }
/// struct Child { parent: Inject<Parent> }
/// impl Injectable for Parent {}
/// impl Injectable for Child {}
///
/// impl Construct for Parent {
///     fn construct(ctx: &ResolveContext<'_>) -> Self {
///         Parent { child: Inject::of(ctx) }
///     }
/// }
/// impl Construct for Child {
///     fn construct(ctx: &ResolveContext<'_>) -> Self {
///         Child { parent: Inject::of(ctx) }
///     }
/// }
///
/// let provider = Provider::with("App", [Definition::class::<Parent>(), Definition::class::<Child>()]);
/// let root = provider.create_root(&Registry::new());
///
/// let parent = root.get_of::<Parent>().unwrap();
/// let child = parent.child.get().unwrap();
/// assert!(std::sync::Arc::ptr_eq(&child.parent.get().unwrap(), &parent));
/// ```
pub struct Inject<T> {
    scope: WeakInjector,
    token: Token,
    owner: String,
    cell: OnceCell<Arc<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Inject<T> {
    /// Field for `token`, resolved from the constructing scope.
    pub fn new(ctx: &ResolveContext<'_>, token: impl Into<Token>) -> Self {
        Self::from_parts(ctx.injector(), token.into(), ctx.token().to_string())
    }

    /// Field for the type token of `T`.
    pub fn of(ctx: &ResolveContext<'_>) -> Self {
        Self::new(ctx, Token::of::<T>())
    }

    /// Field resolved from an arbitrary scope.
    pub fn from_injector(injector: &Injector, token: impl Into<Token>) -> Self {
        Self::from_parts(injector, token.into(), injector.name().to_string())
    }

    fn from_parts(injector: &Injector, token: Token, owner: String) -> Self {
        Self {
            scope: injector.downgrade(),
            token,
            owner,
            cell: OnceCell::new(),
            _marker: PhantomData,
        }
    }

    /// Token the field resolves.
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Whether a value is already stored.
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Resolves on first call, then returns the stored value.
    ///
    /// While the target is still under construction this returns `None` and warns; the
    /// next call tries again.
    pub fn get(&self) -> Option<Arc<T>> {
        if let Some(value) = self.cell.get() {
            return Some(value.clone());
        }
        let Some(scope) = self.scope.upgrade() else {
            Diagnostics::global().provider_not_found(&self.owner);
            return None;
        };
        let instance = match scope.resolve(&self.token)? {
            Resolution::Ready(instance) => instance,
            Resolution::Pending(pending) => match pending.try_get() {
                Some(instance) => instance,
                None => {
                    let subject = format!("{}.{}", self.owner, self.token);
                    scope.diagnostics().pending_access(&subject, &resolution_path());
                    return None;
                }
            },
        };
        let value = instance.downcast::<T>()?;
        Some(self.cell.get_or_init(|| value).clone())
    }

    /// Like [`get`](Inject::get), waiting for a pending target to settle.
    pub async fn get_async(&self) -> Option<Arc<T>> {
        if let Some(value) = self.cell.get() {
            return Some(value.clone());
        }
        let resolution = self.scope.upgrade()?.resolve(&self.token)?;
        let value = resolution.settled().await?.downcast::<T>()?;
        Some(self.cell.get_or_init(|| value).clone())
    }

    /// Overrides the field. Returns `false` if a value is already stored.
    pub fn set(&self, value: Arc<T>) -> bool {
        self.cell.set(value).is_ok()
    }
}

impl<T> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inject")
            .field("token", &self.token)
            .field("owner", &self.owner)
            .field("resolved", &self.cell.get().is_some())
            .finish()
    }
}
