//! Capability traits implemented by injectable services.

use std::any::Any;

use crate::provider::{RefreshHandle, ResolveContext};
use crate::traits::Dispose;

/// A value that can be bound to a token and cached in a scope.
///
/// Both capability accessors default to `None`; override them to let the container
/// discover the capability on a type-erased instance.
///
/// # Examples
///
/// ```
/// use ferrous_tree_di::{Injectable, InjectedService, RefreshHandle};
/// use parking_lot::Mutex;
///
/// #[derive(Default)]
/// struct Session {
///     refresh: Mutex<Option<RefreshHandle>>,
/// }
///
/// impl InjectedService for Session {
///     fn init_provider(&self, refresh: RefreshHandle) {
///         *self.refresh.lock() = Some(refresh);
///     }
/// }
///
/// impl Injectable for Session {
///     fn as_injected_service(&self) -> Option<&dyn InjectedService> {
///         Some(self)
///     }
/// }
/// ```
pub trait Injectable: Any + Send + Sync {
    /// Disposal capability, called when the owning scope unmounts.
    fn as_dispose(&self) -> Option<&dyn Dispose> {
        None
    }

    /// Injected-service capability, initialized once after creation.
    fn as_injected_service(&self) -> Option<&dyn InjectedService> {
        None
    }
}

/// Service that wants to trigger re-renders of its scope's consumers.
pub trait InjectedService: Send + Sync {
    /// Called once, right after the instance is cached in its scope.
    ///
    /// Calling [`RefreshHandle::refresh`] marks the scope changed and notifies consumers
    /// that subscribed to it across scope boundaries.
    fn init_provider(&self, refresh: RefreshHandle);
}

/// Constructor used by class bindings.
///
/// The context gives access to the resolving scope so the constructor can resolve its own
/// dependencies explicitly.
///
/// ```
/// use ferrous_tree_di::{Construct, Injectable, ResolveContext, Resolver};
/// use std::sync::Arc;
///
/// struct Config { debug: bool }
/// impl Injectable for Config {}
///
/// struct Logger { config: Option<Arc<Config>> }
/// impl Injectable for Logger {}
///
/// impl Construct for Logger {
///     fn construct(ctx: &ResolveContext<'_>) -> Self {
///         Logger { config: ctx.get_of::<Config>() }
///     }
/// }
/// ```
pub trait Construct: Injectable + Sized {
    /// Builds the instance for the scope described by `ctx`.
    fn construct(ctx: &ResolveContext<'_>) -> Self;
}

/// Implements [`Injectable`] without capabilities for the listed types.
///
/// ```
/// use ferrous_tree_di::injectable;
///
/// struct Theme(&'static str);
/// struct Locale(&'static str);
///
/// injectable!(Theme, Locale);
/// ```
#[macro_export]
macro_rules! injectable {
    ($($ty:ty),+ $(,)?) => {
        $(impl $crate::Injectable for $ty {})+
    };
}

injectable!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String, &'static str
);

impl<T: Send + Sync + 'static> Injectable for Vec<T> {}
impl<T: Send + Sync + 'static> Injectable for Option<T> {}
impl<K, V> Injectable for std::collections::HashMap<K, V>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
}
