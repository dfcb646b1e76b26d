//! Consumption side: components that read instances from their nearest scope.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::diagnostics::{Diagnostics, TARGET};
use crate::event::HandlerId;
use crate::pending::Resolution;
use crate::provider::{Injector, WeakInjector};
use crate::token::Token;

type Rerender = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Channel {
    ContextChanged,
    ChildNotifications,
}

struct Subscription {
    scope: WeakInjector,
    channel: Channel,
    id: HandlerId,
}

/// A component consuming instances from the nearest enclosing scope.
///
/// Lookups are memoized for the consumer's lifetime: the same token always yields the
/// same result once it resolved. [`mount`](Consumer::mount) subscribes the re-render
/// callback to the consumer's own scope and to every ancestor scope that supplied one
/// of its tokens, so a refresh requested by a service anywhere up the chain re-renders
/// the component.
///
/// # Examples
///
/// ```
/// use ferrous_tree_di::{Consumer, Provider, Registry, Token, to_value};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let registry = Registry::new();
/// let root = Provider::with("App", [("user", to_value(String::from("ada")))]).create_root(&registry);
/// let page = Provider::new("Page").create_child(&root);
///
/// let renders = Arc::new(AtomicUsize::new(0));
/// let counter = renders.clone();
/// let consumer = Consumer::new(Some(&page), move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// let user = consumer.use_instance_of::<String>(&Token::name("user")).unwrap();
/// assert_eq!(&*user, "ada");
/// consumer.mount();
///
/// root.refresh_handle().refresh();
/// assert_eq!(renders.load(Ordering::SeqCst), 1);
/// ```
pub struct Consumer {
    injector: Option<Injector>,
    label: String,
    rerender: Rerender,
    active: Arc<AtomicBool>,
    memo: Mutex<HashMap<Token, Resolution>>,
    memo_many: Mutex<Option<(Vec<Token>, Vec<Option<Resolution>>)>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Consumer {
    /// Consumer attached to `injector`; `None` models a component outside any provider.
    pub fn new<F>(injector: Option<&Injector>, rerender: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            injector: injector.cloned(),
            label: String::from("consumer"),
            rerender: Arc::new(rerender),
            active: Arc::new(AtomicBool::new(false)),
            memo: Mutex::new(HashMap::new()),
            memo_many: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Names the consumer in diagnostics.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Scope the consumer reads from.
    pub fn injector(&self) -> Option<&Injector> {
        self.injector.as_ref()
    }

    fn diagnostics(&self) -> Diagnostics {
        match &self.injector {
            Some(injector) => *injector.diagnostics(),
            None => Diagnostics::global(),
        }
    }

    /// Resolves `token`, memoized after the first successful lookup.
    pub fn use_instance(&self, token: &Token) -> Option<Resolution> {
        if let Some(found) = self.memo.lock().get(token) {
            return Some(found.clone());
        }
        let Some(injector) = &self.injector else {
            self.diagnostics().provider_not_found(&self.label);
            return None;
        };
        let found = injector.resolve(token)?;
        self.memo.lock().insert(token.clone(), found.clone());
        Some(found)
    }

    /// Resolves `token` and downcasts the instance.
    pub fn use_instance_of<T: Send + Sync + 'static>(&self, token: &Token) -> Option<Arc<T>> {
        let found = self.use_instance(token)?;
        let instance = found.instance();
        if instance.is_none() {
            self.diagnostics()
                .pending_access(&format!("{}.{}", self.label, token), &[]);
        }
        instance?.downcast::<T>()
    }

    /// Resolves several tokens at once, in order.
    ///
    /// The whole list is memoized on first call; later calls return it unchanged.
    pub fn use_instances(&self, tokens: &[Token]) -> Vec<Option<Resolution>> {
        if let Some((_, found)) = &*self.memo_many.lock() {
            return found.clone();
        }
        let Some(injector) = &self.injector else {
            self.diagnostics().provider_not_found(&self.label);
            return tokens.iter().map(|_| None).collect();
        };
        let found: Vec<Option<Resolution>> = tokens.iter().map(|t| injector.resolve(t)).collect();
        *self.memo_many.lock() = Some((tokens.to_vec(), found.clone()));
        found
    }

    /// Subscribes the re-render callback. Calling it twice has no extra effect.
    pub fn mount(&self) {
        let Some(injector) = &self.injector else {
            return;
        };
        if self.active.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut subscriptions = self.subscriptions.lock();
        subscriptions.push(self.subscribe(injector, Channel::ContextChanged));

        let mut tokens: Vec<Token> = self.memo.lock().keys().cloned().collect();
        if let Some((many, _)) = &*self.memo_many.lock() {
            tokens.extend(many.iter().cloned());
        }

        let mut watched: Vec<Injector> = Vec::new();
        for token in &tokens {
            if injector.has_instance(token) {
                continue;
            }
            let source = injector
                .ancestors()
                .find(|scope| scope.has_instance(token) || scope.has_binding(token));
            if let Some(scope) = source {
                if !watched.iter().any(|w| w.ptr_eq(&scope)) {
                    subscriptions.push(self.subscribe(&scope, Channel::ChildNotifications));
                    watched.push(scope);
                }
            }
        }
        tracing::debug!(
            target: TARGET,
            consumer = %self.label,
            scope = %injector.name(),
            subscriptions = subscriptions.len(),
            "consumer mounted"
        );
    }

    fn subscribe(&self, scope: &Injector, channel: Channel) -> Subscription {
        let active = self.active.clone();
        let rerender = self.rerender.clone();
        let handler = move |_: &()| {
            if active.load(Ordering::Acquire) {
                rerender();
            }
        };
        let id = match channel {
            Channel::ContextChanged => scope.context_changed().on(handler),
            Channel::ChildNotifications => scope.child_notifications().on(handler),
        };
        Subscription {
            scope: scope.downgrade(),
            channel,
            id,
        }
    }

    /// Removes every subscription; later refreshes no longer re-render.
    pub fn unmount(&self) {
        self.active.store(false, Ordering::Release);
        for subscription in self.subscriptions.lock().drain(..) {
            if let Some(scope) = subscription.scope.upgrade() {
                match subscription.channel {
                    Channel::ContextChanged => scope.context_changed().off(subscription.id),
                    Channel::ChildNotifications => scope.child_notifications().off(subscription.id),
                };
            }
        }
    }

    /// Whether the consumer is subscribed.
    pub fn is_mounted(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("label", &self.label)
            .field("injector", &self.injector)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}
