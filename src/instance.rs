//! Type-erased instance handles.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::provider::RefreshHandle;
use crate::traits::Injectable;

// Type-erased Arc for downcasting
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// Identity of an [`Instance`], stable for as long as the instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(usize);

/// Resolved value cached in a scope.
///
/// Cloning is cheap and preserves identity: clones compare equal with
/// [`Instance::ptr_eq`] and share the one-time initialization flag.
///
/// # Examples
///
/// ```
/// use ferrous_tree_di::Instance;
/// use std::sync::Arc;
///
/// let instance = Instance::new(String::from("hello"));
/// let value: Arc<String> = instance.downcast().unwrap();
/// assert_eq!(&*value, "hello");
/// assert!(instance.ptr_eq(&instance.clone()));
/// ```
#[derive(Clone)]
pub struct Instance {
    inner: Arc<InstanceInner>,
}

struct InstanceInner {
    value: AnyArc,
    service: Arc<dyn Injectable>,
    type_name: &'static str,
    initialized: AtomicBool,
}

impl Instance {
    /// Wraps an owned value.
    pub fn new<T: Injectable>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an already shared value; the `Arc` is kept, not cloned into a new allocation.
    pub fn from_arc<T: Injectable>(value: Arc<T>) -> Self {
        let service: Arc<dyn Injectable> = value.clone();
        Self {
            inner: Arc::new(InstanceInner {
                value,
                service,
                type_name: std::any::type_name::<T>(),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    /// Downcasts to the concrete service type.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner.value.clone().downcast::<T>().ok()
    }

    /// Whether the stored value is a `T`.
    pub fn is<T: Send + Sync + 'static>(&self) -> bool {
        self.inner.value.is::<T>()
    }

    /// Type name of the stored value.
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name
    }

    /// Identity of this instance.
    pub fn id(&self) -> InstanceId {
        InstanceId(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    /// Reference equality.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether the value exposes a disposal capability.
    pub fn is_disposable(&self) -> bool {
        self.inner.service.as_dispose().is_some()
    }

    /// Whether the injected-service initialization already ran.
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    /// Disposes the value if it exposes the capability. Returns whether it did.
    pub(crate) fn dispose(&self) -> bool {
        match self.inner.service.as_dispose() {
            Some(disposable) => {
                disposable.dispose();
                true
            }
            None => false,
        }
    }

    /// Runs `init_provider` the first time this is called for an injected service.
    pub(crate) fn init_service(&self, refresh: impl FnOnce() -> RefreshHandle) -> bool {
        let Some(service) = self.inner.service.as_injected_service() else {
            return false;
        };
        if self.inner.initialized.swap(true, Ordering::AcqRel) {
            return false;
        }
        service.init_provider(refresh());
        true
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.inner.type_name)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Conversion into an [`Instance`], used by factory bindings.
pub trait IntoInstance {
    /// Performs the conversion.
    fn into_instance(self) -> Instance;
}

impl<T: Injectable> IntoInstance for T {
    fn into_instance(self) -> Instance {
        Instance::new(self)
    }
}

impl IntoInstance for Instance {
    fn into_instance(self) -> Instance {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Dispose;
    use std::sync::atomic::AtomicUsize;

    struct Counted(Arc<AtomicUsize>);

    impl Dispose for Counted {
        fn dispose(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Injectable for Counted {
        fn as_dispose(&self) -> Option<&dyn Dispose> {
            Some(self)
        }
    }

    #[test]
    fn downcast_and_identity() {
        let a = Instance::new(42u32);
        let b = Instance::new(42u32);
        assert_eq!(*a.downcast::<u32>().unwrap(), 42);
        assert!(a.downcast::<u64>().is_none());
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.id(), a.clone().id());
        assert_eq!(a.type_name(), "u32");
    }

    #[test]
    fn from_arc_keeps_allocation() {
        let shared = Arc::new(String::from("config"));
        let instance = Instance::from_arc(shared.clone());
        assert!(Arc::ptr_eq(&shared, &instance.downcast::<String>().unwrap()));
    }

    #[test]
    fn dispose_only_with_capability() {
        let count = Arc::new(AtomicUsize::new(0));
        let disposable = Instance::new(Counted(count.clone()));
        let plain = Instance::new(String::new());

        assert!(disposable.is_disposable());
        assert!(disposable.dispose());
        assert!(!plain.dispose());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
