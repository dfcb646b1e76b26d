//! Resolver traits for token resolution.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::config::ContainerConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::internal::resolution_path;
use crate::pending::Resolution;
use crate::token::Token;

/// Core resolver trait, object-safe.
///
/// Implemented by [`Injector`](crate::Injector) and by the
/// [`ResolveContext`](crate::ResolveContext) handed to bindings. Most callers use the
/// generic methods of [`Resolver`] instead.
pub trait ResolverCore {
    /// Walks the scope chain for `token`.
    ///
    /// `None` means no scope could produce an instance; the failure has already been
    /// reported through diagnostics.
    fn resolve_token(&self, token: &Token) -> Option<Resolution>;

    /// Configuration of the registry the resolver belongs to.
    fn config(&self) -> &ContainerConfig;

    /// Label used when reporting reads of unsettled placeholders.
    fn subject(&self) -> String {
        String::from("resolver")
    }
}

/// Typed resolution on top of [`ResolverCore`].
///
/// # Examples
///
/// ```
/// use ferrous_tree_di::{Provider, Registry, Resolver, Token, to_value};
///
/// let registry = Registry::new();
/// let provider = Provider::with("App", [("greeting", to_value(String::from("hello")))]);
/// let root = provider.create_root(&registry);
///
/// let greeting = root.get::<String>(&Token::name("greeting")).unwrap();
/// assert_eq!(&*greeting, "hello");
/// assert!(root.try_get::<u32>(&Token::name("greeting")).is_err());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves `token` to its instance.
    ///
    /// A placeholder that has not settled yet yields `None` and a warning naming the
    /// resolution chain.
    fn get_instance(&self, token: &Token) -> Option<Instance> {
        match self.resolve_token(token)? {
            Resolution::Ready(instance) => Some(instance),
            Resolution::Pending(pending) => {
                let settled = pending.try_get();
                if settled.is_none() {
                    let subject = format!("{}.{}", self.subject(), token);
                    Diagnostics::from_config(self.config()).pending_access(&subject, &resolution_path());
                }
                settled
            }
        }
    }

    /// Resolves `token` and downcasts the instance to `T`.
    fn get<T: Send + Sync + 'static>(&self, token: &Token) -> Option<Arc<T>> {
        let instance = self.get_instance(token)?;
        let value = instance.downcast::<T>();
        if value.is_none() {
            Diagnostics::from_config(self.config()).error(&DiError::TypeMismatch {
                token: token.to_string(),
                expected: std::any::type_name::<T>(),
                actual: instance.type_name(),
            });
        }
        value
    }

    /// Resolves the type token of `T`.
    fn get_of<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.get(&Token::of::<T>())
    }

    /// Like [`get`](Resolver::get), returning the failure instead of logging it.
    fn try_get<T: Send + Sync + 'static>(&self, token: &Token) -> DiResult<Arc<T>> {
        let instance = match self.resolve_token(token) {
            Some(Resolution::Ready(instance)) => instance,
            Some(Resolution::Pending(pending)) => pending
                .try_get()
                .ok_or_else(|| DiError::Pending(format!("{}.{}", self.subject(), token)))?,
            None => return Err(DiError::NotFound(token.to_string())),
        };
        instance.downcast::<T>().ok_or_else(|| DiError::TypeMismatch {
            token: token.to_string(),
            expected: std::any::type_name::<T>(),
            actual: instance.type_name(),
        })
    }

    /// Resolves now and waits for a placeholder to settle.
    ///
    /// The lookup itself happens before the returned future is polled.
    fn get_async<T: Send + Sync + 'static>(&self, token: &Token) -> BoxFuture<'static, Option<Arc<T>>> {
        let resolution = self.resolve_token(token);
        async move { resolution?.settled().await?.downcast::<T>() }.boxed()
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
