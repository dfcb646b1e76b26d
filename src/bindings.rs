//! Binding strategies.
//!
//! A [`Binding`] tells a scope how to produce the instance for a token. The constructors
//! in this module are side-effect free until the resolution engine invokes them; their
//! inputs are validated only when diagnostics are enabled.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::diagnostics::Diagnostics;
use crate::error::DiError;
use crate::instance::{Instance, IntoInstance};
use crate::pending::Resolution;
use crate::provider::ResolveContext;
use crate::token::Token;
use crate::traits::{Construct, Injectable};

pub(crate) type BindingFn = Arc<dyn Fn(&ResolveContext<'_>) -> Option<Instance> + Send + Sync>;
pub(crate) type PreHook = Arc<dyn Fn(&Token) + Send + Sync>;
pub(crate) type PostHook = Arc<dyn Fn(&Instance) + Send + Sync>;

/// Strategy family of a [`Binding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Instantiates a [`Construct`] type
    Class,
    /// Calls a user factory
    Factory,
    /// Returns a constant
    Value,
    /// Delegates to another token
    Existing,
    /// Builds the instance asynchronously behind a [`Deferred`](crate::Deferred)
    AsyncFactory,
    /// Synthesized by a provider's auto factory; may decline to answer
    Auto,
}

/// Resolution strategy for one token.
///
/// # Examples
///
/// ```
/// use ferrous_tree_di::{to_factory, to_value, Token, Resolver};
///
/// let config = to_value(String::from("debug"));
/// let greeting = to_factory(|ctx| {
///     let config = ctx.get::<String>(&Token::name("config"));
///     format!("hello ({})", config.map(|c| c.to_string()).unwrap_or_default())
/// })
/// .with_post(|instance| println!("created {}", instance.type_name()));
/// # let _ = (config, greeting);
/// ```
#[derive(Clone)]
pub struct Binding {
    kind: BindingKind,
    produce: BindingFn,
    prefer_ancestor: bool,
    pre: Option<PreHook>,
    post: Option<PostHook>,
    label: &'static str,
}

impl Binding {
    /// Custom binding from a raw producer.
    ///
    /// Returning `None` means "no instance": nothing is cached and the lookup ends (or,
    /// for auto bindings, continues in the parent scope).
    pub fn from_fn<F>(kind: BindingKind, label: &'static str, produce: F) -> Self
    where
        F: Fn(&ResolveContext<'_>) -> Option<Instance> + Send + Sync + 'static,
    {
        Self {
            kind,
            produce: Arc::new(produce),
            prefer_ancestor: false,
            pre: None,
            post: None,
            label,
        }
    }

    /// Defer to an ancestor scope that also binds this token.
    ///
    /// When no ancestor binds the token, the binding runs normally in its own scope.
    pub fn prefer_ancestor(mut self) -> Self {
        self.prefer_ancestor = true;
        self
    }

    /// Callback invoked immediately before instantiation.
    pub fn with_pre<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Token) + Send + Sync + 'static,
    {
        self.pre = Some(Arc::new(hook));
        self
    }

    /// Callback invoked immediately after instantiation and caching.
    pub fn with_post<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Instance) + Send + Sync + 'static,
    {
        self.post = Some(Arc::new(hook));
        self
    }

    /// Strategy family.
    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    /// Whether this binding defers to ancestor bindings of the same token.
    pub fn prefers_ancestor(&self) -> bool {
        self.prefer_ancestor
    }

    /// Debug label (usually the produced type name).
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Whether the binding was synthesized by an auto factory.
    pub fn is_auto(&self) -> bool {
        self.kind == BindingKind::Auto
    }

    pub(crate) fn into_auto(mut self) -> Self {
        self.kind = BindingKind::Auto;
        self
    }

    pub(crate) fn run_pre(&self, token: &Token) {
        if let Some(pre) = &self.pre {
            pre(token);
        }
    }

    pub(crate) fn run_post(&self, instance: &Instance) {
        if let Some(post) = &self.post {
            post(instance);
        }
    }

    pub(crate) fn produce(&self, ctx: &ResolveContext<'_>) -> Option<Instance> {
        (self.produce)(ctx)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("prefer_ancestor", &self.prefer_ancestor)
            .finish()
    }
}

/// Bind a token to a class constructor.
///
/// The instance is tagged with the resolving scope so it can later be found through
/// [`Registry::scope_of`](crate::Registry::scope_of).
pub fn to_class<T: Construct>() -> Binding {
    Binding::from_fn(BindingKind::Class, std::any::type_name::<T>(), |ctx| {
        let instance = Instance::new(T::construct(ctx));
        ctx.adopt(&instance);
        Some(instance)
    })
}

/// Bind a token to a factory function.
///
/// The factory receives the [`ResolveContext`] and can resolve dependencies ad hoc.
pub fn to_factory<R, F>(factory: F) -> Binding
where
    R: IntoInstance,
    F: Fn(&ResolveContext<'_>) -> R + Send + Sync + 'static,
{
    Binding::from_fn(BindingKind::Factory, std::any::type_name::<R>(), move |ctx| {
        Some(factory(ctx).into_instance())
    })
}

/// Bind a token to a factory receiving declared dependencies.
///
/// Each dependency token is resolved from the resolving scope before the factory runs.
///
/// ```
/// use ferrous_tree_di::{to_factory_with, Token};
///
/// struct Greeter(String);
/// ferrous_tree_di::injectable!(Greeter);
///
/// let binding = to_factory_with([Token::name("user")], |deps| {
///     let user = deps.get::<String>(0).map(|u| u.to_string()).unwrap_or_default();
///     Greeter(format!("hello {}", user))
/// });
/// # let _ = binding;
/// ```
pub fn to_factory_with<I, R, F>(deps: I, factory: F) -> Binding
where
    I: IntoIterator,
    I::Item: Into<Token>,
    R: IntoInstance,
    F: Fn(Dependencies) -> R + Send + Sync + 'static,
{
    let tokens: Arc<[Token]> = deps.into_iter().map(Into::into).collect();
    let diagnostics = Diagnostics::global();
    if diagnostics.enabled() {
        for token in tokens.iter().filter(|t| !t.is_valid()) {
            diagnostics.error(&DiError::InvalidToken(token.to_string()));
        }
    }
    Binding::from_fn(BindingKind::Factory, std::any::type_name::<R>(), move |ctx| {
        let resolved = tokens
            .iter()
            .map(|token| ctx.resolve(token).and_then(|r| r.instance()))
            .collect();
        Some(factory(Dependencies { tokens: tokens.clone(), resolved }).into_instance())
    })
}

/// Bind a token to a constant.
///
/// Every resolution returns the very same instance that was supplied here.
pub fn to_value<T: Injectable>(value: T) -> Binding {
    if TypeId::of::<T>() == TypeId::of::<()>() {
        let diagnostics = Diagnostics::global();
        diagnostics.error(&DiError::MissingValue(std::any::type_name::<T>().to_string()));
    }
    to_instance(Instance::new(value))
}

/// Bind a token to an existing [`Instance`].
pub fn to_instance(instance: Instance) -> Binding {
    let label = instance.type_name();
    Binding::from_fn(BindingKind::Value, label, move |ctx| {
        ctx.adopt(&instance);
        Some(instance.clone())
    })
}

/// Bind a token to whatever another token resolves to.
///
/// The target is resolved from the resolving scope. A target still under construction
/// cannot be cached under a second token; that case yields nothing and logs a warning.
pub fn to_existing(token: impl Into<Token>) -> Binding {
    let target = token.into();
    let diagnostics = Diagnostics::global();
    if diagnostics.enabled() && !target.is_valid() {
        diagnostics.error(&DiError::InvalidToken(target.to_string()));
    }
    Binding::from_fn(BindingKind::Existing, "existing", move |ctx| {
        match ctx.resolve(&target)? {
            Resolution::Ready(instance) => Some(instance),
            Resolution::Pending(pending) => {
                let settled = pending.try_get();
                if settled.is_none() {
                    ctx.report_pending(&target);
                }
                settled
            }
        }
    })
}

/// Dependencies resolved for [`to_factory_with`], in declaration order.
pub struct Dependencies {
    tokens: Arc<[Token]>,
    resolved: Vec<Option<Instance>>,
}

impl Dependencies {
    /// Instance at `index`, downcast to `T`.
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> Option<Arc<T>> {
        self.instance(index)?.downcast::<T>()
    }

    /// Raw instance at `index`.
    pub fn instance(&self, index: usize) -> Option<&Instance> {
        self.resolved.get(index)?.as_ref()
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

    /// All resolved instances.
    pub fn into_vec(self) -> Vec<Option<Instance>> {
        self.resolved
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependencies")
            .field("tokens", &self.tokens)
            .field("resolved", &self.resolved)
            .finish()
    }
}
