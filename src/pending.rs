//! Resolution results and pending placeholders.
//!
//! While a binding runs, its token is parked in the scope's pending cache. Re-entrant
//! requests for the same token in the same scope receive [`Resolution::Pending`] instead
//! of recursing, and can await the placeholder once the outer construction finishes.

use std::fmt;

use tokio::sync::watch;

use crate::instance::Instance;
use crate::token::Token;

/// Outcome of a successful lookup.
#[derive(Clone, Debug)]
pub enum Resolution {
    /// The canonical instance for the token
    Ready(Instance),
    /// The token is under construction in the answering scope
    Pending(PendingInstance),
}

impl Resolution {
    /// The instance if it is already available, settled placeholders included.
    pub fn instance(&self) -> Option<Instance> {
        match self {
            Resolution::Ready(instance) => Some(instance.clone()),
            Resolution::Pending(pending) => pending.try_get(),
        }
    }

    /// Consumes the resolution, returning only a `Ready` instance.
    pub fn ready(self) -> Option<Instance> {
        match self {
            Resolution::Ready(instance) => Some(instance),
            Resolution::Pending(_) => None,
        }
    }

    /// Whether this is an unsettled placeholder.
    pub fn is_pending(&self) -> bool {
        match self {
            Resolution::Ready(_) => false,
            Resolution::Pending(pending) => !pending.is_settled(),
        }
    }

    /// Waits for the final instance.
    ///
    /// Resolves to `None` when the construction behind a placeholder failed.
    pub async fn settled(self) -> Option<Instance> {
        match self {
            Resolution::Ready(instance) => Some(instance),
            Resolution::Pending(pending) => pending.settled().await,
        }
    }
}

/// Handle to an instance that is still being constructed.
#[derive(Clone)]
pub struct PendingInstance {
    token: Token,
    rx: watch::Receiver<Option<Instance>>,
}

impl PendingInstance {
    /// Token under construction.
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// The instance, if construction already finished.
    pub fn try_get(&self) -> Option<Instance> {
        self.rx.borrow().clone()
    }

    /// Whether construction finished successfully.
    pub fn is_settled(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Waits for construction to finish.
    ///
    /// Returns `None` if the binding failed or produced nothing.
    pub async fn settled(&self) -> Option<Instance> {
        let mut rx = self.rx.clone();
        let settled = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        settled
    }
}

impl fmt::Debug for PendingInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingInstance")
            .field("token", &self.token)
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Pending-cache entry owned by a scope; settling it wakes every waiter.
pub(crate) struct PendingSlot {
    tx: watch::Sender<Option<Instance>>,
    handle: PendingInstance,
}

impl PendingSlot {
    pub(crate) fn new(token: Token) -> Self {
        let (tx, rx) = watch::channel(None);
        Self {
            tx,
            handle: PendingInstance { token, rx },
        }
    }

    pub(crate) fn handle(&self) -> PendingInstance {
        self.handle.clone()
    }

    pub(crate) fn settle(self, instance: Instance) {
        self.tx.send_replace(Some(instance));
    }
}
