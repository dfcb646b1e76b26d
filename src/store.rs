//! Mutable state owned by injected services.
//!
//! A [`Store`] keeps a committed snapshot plus, while a mutation is open, a draft copy.
//! Mutations nest: only closing the outermost one commits the draft and asks the owning
//! scope to refresh.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::diagnostics::Diagnostics;
use crate::error::DiError;
use crate::provider::RefreshHandle;

/// Observable phase of a [`Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    /// No open mutation; reads see the committed snapshot
    Idle,
    /// `depth` nested mutations are open; reads see the draft
    Mutating {
        /// Number of unmatched `start` calls
        depth: usize,
    },
}

struct Mutation<S> {
    depth: usize,
    draft: Option<S>,
}

/// Snapshot state with nested, batched mutations.
///
/// # Examples
///
/// ```
/// use ferrous_tree_di::{MutationPhase, Store};
///
/// #[derive(Clone, Default)]
/// struct Todos { items: Vec<String> }
///
/// let store = Store::new(Todos::default());
/// store.action(|| {
///     store.update(|s| s.items.push("write docs".into()));
///     store.update(|s| s.items.push("ship".into()));
///     // Not committed until the outermost mutation closes
///     assert!(store.snapshot().items.is_empty());
///     assert_eq!(store.phase(), MutationPhase::Mutating { depth: 1 });
/// });
/// assert_eq!(store.snapshot().items.len(), 2);
/// ```
pub struct Store<S> {
    committed: RwLock<Arc<S>>,
    mutation: Mutex<Mutation<S>>,
    refresh: Mutex<Option<RefreshHandle>>,
}

impl<S: Clone + Send + Sync + 'static> Store<S> {
    /// Store holding `initial` as its first snapshot.
    pub fn new(initial: S) -> Self {
        Self {
            committed: RwLock::new(Arc::new(initial)),
            mutation: Mutex::new(Mutation {
                depth: 0,
                draft: None,
            }),
            refresh: Mutex::new(None),
        }
    }

    /// Connects the store to its scope and publishes the initial snapshot.
    ///
    /// Meant to be called from [`InjectedService::init_provider`](crate::InjectedService::init_provider).
    pub fn attach(&self, refresh: RefreshHandle) {
        *self.refresh.lock() = Some(refresh);
        self.start();
        self.finish(true);
    }

    /// Last committed snapshot.
    pub fn snapshot(&self) -> Arc<S> {
        self.committed.read().clone()
    }

    /// Current phase.
    pub fn phase(&self) -> MutationPhase {
        match self.mutation.lock().depth {
            0 => MutationPhase::Idle,
            depth => MutationPhase::Mutating { depth },
        }
    }

    /// Whether a mutation is open.
    pub fn is_mutating(&self) -> bool {
        self.mutation.lock().depth > 0
    }

    /// Opens a (possibly nested) mutation. The outermost one copies the snapshot.
    pub fn start(&self) {
        let mut mutation = self.mutation.lock();
        if mutation.depth == 0 {
            mutation.draft = Some((**self.committed.read()).clone());
        }
        mutation.depth += 1;
    }

    /// Closes a mutation.
    ///
    /// Closing the outermost one commits the draft and, if `refresh` is set, notifies
    /// the owning scope. Without an open mutation this only logs a warning.
    pub fn finish(&self, refresh: bool) {
        let committed = {
            let mut mutation = self.mutation.lock();
            match mutation.depth {
                0 => {
                    Diagnostics::global().warn(&DiError::UnbalancedMutation);
                    return;
                }
                1 => {
                    mutation.depth = 0;
                    if let Some(draft) = mutation.draft.take() {
                        *self.committed.write() = Arc::new(draft);
                    }
                    true
                }
                _ => {
                    mutation.depth -= 1;
                    false
                }
            }
        };
        if committed && refresh {
            self.notify();
        }
    }

    /// Opens a mutation closed (with refresh) when the guard drops.
    pub fn begin(&self) -> MutationGuard<'_, S> {
        self.start();
        MutationGuard { store: self }
    }

    /// Applies `f` to the draft, opening and committing a mutation if none is open.
    ///
    /// `f` runs with the store locked and must not call back into the store.
    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let (result, committed) = {
            let mut mutation = self.mutation.lock();
            let implicit = mutation.depth == 0;
            let committed = &self.committed;
            let draft = mutation
                .draft
                .get_or_insert_with(|| (**committed.read()).clone());
            let result = f(draft);
            if implicit {
                if let Some(draft) = mutation.draft.take() {
                    *self.committed.write() = Arc::new(draft);
                }
            }
            (result, implicit)
        };
        if committed {
            self.notify();
        }
        result
    }

    /// Runs `f` inside one mutation; everything it updates commits together.
    pub fn action<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.begin();
        f()
    }

    /// Async counterpart of [`action`](Store::action).
    ///
    /// The mutation stays open until the future returned by `f` completes, so updates
    /// made before and after its awaits commit together, with one refresh.
    pub async fn action_async<F: Future>(&self, f: impl FnOnce() -> F) -> F::Output {
        let _guard = self.begin();
        f().await
    }

    /// Reads the draft while mutating, the snapshot otherwise.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let mutation = self.mutation.lock();
        if let Some(draft) = &mutation.draft {
            return f(draft);
        }
        let snapshot = self.snapshot();
        drop(mutation);
        f(&snapshot)
    }

    /// Commits the current draft (keeping the mutation open) and refreshes.
    pub fn checkpoint(&self) {
        let committed = {
            let mutation = self.mutation.lock();
            match &mutation.draft {
                Some(draft) => {
                    *self.committed.write() = Arc::new(draft.clone());
                    true
                }
                None => false,
            }
        };
        if committed {
            self.notify();
        }
    }

    /// Publishes intermediate state, then awaits `future`.
    ///
    /// Inside an action this makes the changes so far visible before suspending.
    pub async fn wait_for_async<F: Future>(&self, future: F) -> F::Output {
        self.checkpoint();
        future.await
    }

    fn notify(&self) {
        let handle = self.refresh.lock().clone();
        if let Some(handle) = handle {
            handle.refresh();
        }
    }
}

impl<S: Clone + Send + Sync + Default + 'static> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("depth", &self.mutation.lock().depth)
            .finish()
    }
}

/// Open mutation on a [`Store`]; dropping it finishes the mutation with a refresh.
pub struct MutationGuard<'a, S: Clone + Send + Sync + 'static> {
    store: &'a Store<S>,
}

impl<S: Clone + Send + Sync + 'static> Drop for MutationGuard<'_, S> {
    fn drop(&mut self) {
        self.store.finish(true);
    }
}
