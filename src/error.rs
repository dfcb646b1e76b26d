//! Error types for the dependency injection container.

use thiserror::Error;

/// Dependency injection errors
///
/// Resolution never aborts the caller: the container reports these values through the
/// diagnostic channel and degrades to a missing value. [`Resolver::try_get`] is the one
/// place they surface as `Err` for callers that want to branch on them.
///
/// [`Resolver::try_get`]: crate::Resolver::try_get
///
/// # Examples
///
/// ```rust
/// use ferrous_tree_di::DiError;
///
/// let not_found = DiError::NotFound("app::Logger".to_string());
/// assert!(not_found.to_string().contains("app::Logger"));
///
/// let unbalanced = DiError::UnbalancedMutation;
/// println!("Error: {}", unbalanced);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiError {
    /// Token not bound anywhere in the scope chain
    #[error("Dependency {0} is not found. Please register {0} in some Provider")]
    NotFound(String),
    /// Definition without a usable binding
    #[error("Binding [{token}, {binding}] is incorrect")]
    IncorrectBinding {
        /// Debug name of the token
        token: String,
        /// Debug name of the binding (or `<missing>`)
        binding: String,
    },
    /// Token that cannot act as a map key (e.g. an empty name)
    #[error("Token {0} is not a valid dependency injection token")]
    InvalidToken(String),
    /// Consumer or injection target without an enclosing scope
    #[error("Provider is not found for {0}. Please mount it under some Provider")]
    ProviderNotFound(String),
    /// Placeholder accessed before its instance settled
    #[error("Possible problem - trying to access an incompletely initialized {0} - probably a circular reference")]
    Pending(String),
    /// Resolved instance is not of the requested type
    #[error("Dependency {token} resolved to {actual}, expected {expected}")]
    TypeMismatch {
        /// Debug name of the token
        token: String,
        /// Type requested by the caller
        expected: &'static str,
        /// Type actually stored for the token
        actual: &'static str,
    },
    /// Value binding with nothing to bind
    #[error("Please specify some value for {0}")]
    MissingValue(String),
    /// Asynchronous factory reported a failure
    #[error("Async factory for {token} failed: {message}")]
    AsyncFactory {
        /// Debug name of the bound token
        token: String,
        /// Error returned by the factory
        message: String,
    },
    /// Instance produced for a scope that was unmounted
    #[error("Scope {scope} is unmounted; {token} was not cached")]
    ScopeUnmounted {
        /// Provider name of the scope
        scope: String,
        /// Debug name of the token
        token: String,
    },
    /// `finish` without a matching `start`
    #[error("the finish method must be called after corresponding start method")]
    UnbalancedMutation,
    /// Configuration could not be loaded
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;
