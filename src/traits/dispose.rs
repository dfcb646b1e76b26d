//! Disposal trait for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Implement this trait for services that need structured teardown (e.g., flushing caches,
/// closing connections) and expose it through [`Injectable::as_dispose`]. The scope that
/// created the instance calls `dispose` exactly once when it unmounts. Instances that do
/// not expose it are left untouched.
///
/// [`Injectable::as_dispose`]: crate::Injectable::as_dispose
///
/// # Examples
///
/// ```
/// use ferrous_tree_di::{Dispose, Injectable};
///
/// struct Cache {
///     name: String,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         println!("Flushing cache: {}", self.name);
///     }
/// }
///
/// impl Injectable for Cache {
///     fn as_dispose(&self) -> Option<&dyn Dispose> {
///         Some(self)
///     }
/// }
/// ```
pub trait Dispose: Send + Sync {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
