//! Async factory support.
//!
//! An async factory binding caches a [`Deferred`] handle immediately and builds the real
//! value in the background once its dependencies settle. Dependencies are handed over
//! as futures, so a dependency that is itself pending or asynchronous can be awaited
//! without blocking the resolving scope.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;

use crate::bindings::{Binding, BindingKind};
use crate::error::DiError;
use crate::instance::Instance;
use crate::pending::Resolution;
use crate::token::Token;
use crate::traits::{Dispose, Injectable};

/// Error type returned by async factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Future resolving to a dependency instance (`None` if it could not be produced).
pub type InstanceFuture = Shared<BoxFuture<'static, Option<Instance>>>;

/// Trait for factories that create services asynchronously.
///
/// # Examples
///
/// ```
/// use ferrous_tree_di::{AsyncDependencies, AsyncFactory, BoxError};
/// use async_trait::async_trait;
///
/// struct Pool { url: String }
/// ferrous_tree_di::injectable!(Pool);
///
/// struct PoolFactory;
///
/// #[async_trait]
/// impl AsyncFactory<Pool> for PoolFactory {
///     async fn create(&self, deps: AsyncDependencies) -> Result<Pool, BoxError> {
///         let url = deps.get::<String>(0).await.ok_or("url missing")?;
///         Ok(Pool { url: url.to_string() })
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncFactory<T: Send + Sync + 'static>: Send + Sync {
    /// Builds the value once dependencies are available.
    async fn create(&self, deps: AsyncDependencies) -> Result<T, BoxError>;
}

#[async_trait]
impl<T, F, Fut> AsyncFactory<T> for F
where
    T: Send + Sync + 'static,
    F: Fn(AsyncDependencies) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, BoxError>> + Send,
{
    async fn create(&self, deps: AsyncDependencies) -> Result<T, BoxError> {
        self(deps).await
    }
}

/// Wraps an async block as an infallible async factory closure.
///
/// ```
/// use ferrous_tree_di::{async_factory, to_async_factory, Token};
///
/// let binding = to_async_factory([Token::name("user")], async_factory!(|deps| async {
///     let user = deps.get::<String>(0).await;
///     format!("hello {}", user.map(|u| u.to_string()).unwrap_or_default())
/// }));
/// # let _ = binding;
/// ```
#[macro_export]
macro_rules! async_factory {
    (|$deps:ident| async $body:block) => {
        move |$deps: $crate::AsyncDependencies| async move {
            Ok::<_, $crate::BoxError>($body)
        }
    };
}

/// Dependencies of an async factory, in declaration order.
#[derive(Clone)]
pub struct AsyncDependencies {
    tokens: Arc<[Token]>,
    futures: Vec<Option<InstanceFuture>>,
}

impl AsyncDependencies {
    /// Waits for the dependency at `index` and downcasts it.
    pub async fn get<T: Send + Sync + 'static>(&self, index: usize) -> Option<Arc<T>> {
        self.instance(index).await?.downcast::<T>()
    }

    /// Waits for the raw dependency at `index`.
    pub async fn instance(&self, index: usize) -> Option<Instance> {
        let future = self.futures.get(index)?.clone()?;
        future.await
    }

    /// Waits for every dependency.
    pub async fn all(&self) -> Vec<Option<Instance>> {
        join_all(self.futures.iter().map(|future| {
            let future = future.clone();
            async move {
                match future {
                    Some(future) => future.await,
                    None => None,
                }
            }
        }))
        .await
    }

    /// Token declared at `index`.
    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Number of declared dependencies.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no dependencies were declared.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Debug for AsyncDependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncDependencies")
            .field("tokens", &self.tokens)
            .finish()
    }
}

/// Instance cached for an async factory binding.
///
/// Every consumer receives the same handle and awaits the same construction.
pub struct Deferred<T> {
    value: Shared<BoxFuture<'static, Option<Arc<T>>>>,
}

impl<T: Send + Sync + 'static> Deferred<T> {
    /// Waits for the value. `None` if the factory failed.
    pub async fn get(&self) -> Option<Arc<T>> {
        self.value.clone().await
    }

    /// The value, if construction already finished.
    pub fn peek(&self) -> Option<Arc<T>> {
        self.value.peek().cloned().flatten()
    }

    /// Whether construction finished (successfully or not).
    pub fn is_ready(&self) -> bool {
        self.value.peek().is_some()
    }
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("ready", &self.value.peek().is_some())
            .finish()
    }
}

impl<T: Injectable> Dispose for Deferred<T> {
    fn dispose(&self) {
        if let Some(value) = self.peek() {
            if let Some(disposable) = value.as_dispose() {
                disposable.dispose();
            }
        }
    }
}

impl<T: Injectable> Injectable for Deferred<T> {
    fn as_dispose(&self) -> Option<&dyn Dispose> {
        Some(self)
    }
}

/// Bind a token to an asynchronous factory.
///
/// The resolving scope caches a [`Deferred<T>`] right away. Each dependency token is
/// resolved synchronously from the resolving scope and handed to the factory as a
/// future, so pending dependencies are awaited rather than read early. A factory error
/// is logged and the deferred value resolves to `None`.
///
/// ```
/// use ferrous_tree_di::{to_async_factory, to_value, AsyncDependencies, BoxError, Deferred,
///     Provider, Registry, Resolver, Token};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let provider = Provider::with("App", [
///     ("name", to_value(String::from("db"))),
///     ("pool", to_async_factory(["name"], |deps: AsyncDependencies| async move {
///         let name = deps.get::<String>(0).await.ok_or("name missing")?;
///         Ok::<_, BoxError>(format!("pool:{}", name))
///     })),
/// ]);
/// let root = provider.create_root(&Registry::new());
///
/// let pool = root.get::<Deferred<String>>(&Token::name("pool")).unwrap();
/// assert_eq!(&*pool.get().await.unwrap(), "pool:db");
/// # }
/// ```
pub fn to_async_factory<I, T, F>(deps: I, factory: F) -> Binding
where
    I: IntoIterator,
    I::Item: Into<Token>,
    T: Injectable,
    F: AsyncFactory<T> + 'static,
{
    let tokens: Arc<[Token]> = deps.into_iter().map(Into::into).collect();
    let factory: Arc<dyn AsyncFactory<T>> = Arc::new(factory);
    let label = std::any::type_name::<Deferred<T>>();

    Binding::from_fn(BindingKind::AsyncFactory, label, move |ctx| {
        let futures = tokens
            .iter()
            .map(|token| ctx.resolve(token).map(into_future))
            .collect();
        let deps = AsyncDependencies {
            tokens: tokens.clone(),
            futures,
        };
        let factory = factory.clone();
        let token = ctx.token().clone();
        let diagnostics = *ctx.injector().diagnostics();
        let value = async move {
            match factory.create(deps).await {
                Ok(value) => Some(Arc::new(value)),
                Err(err) => {
                    diagnostics.error(&DiError::AsyncFactory {
                        token: token.to_string(),
                        message: err.to_string(),
                    });
                    None
                }
            }
        }
        .boxed()
        .shared();
        Some(Instance::new(Deferred { value }))
    })
}

fn into_future(resolution: Resolution) -> InstanceFuture {
    resolution.settled().boxed().shared()
}
