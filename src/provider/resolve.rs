//! Resolution engine: cache lookup, binding selection and instantiation.

use crate::bindings::{Binding, BindingKind};
use crate::diagnostics::TARGET;
use crate::instance::Instance;
use crate::internal::ResolutionFrame;
use crate::pending::{PendingSlot, Resolution};
use crate::token::Token;

use super::context::ResolveContext;
use super::scope::{CachedInstance, Injector, ScopePhase};

/// Outcome of consulting a single scope.
enum Lookup {
    /// This scope answered
    Found(Resolution),
    /// This scope owns the token but produced nothing; stop walking
    Absent,
    /// Ask the parent
    Skip,
}

/// Removes the pending entry unless construction completed.
///
/// Runs on every exit path, including unwinding out of a panicking binding, so a
/// failed construction can be retried.
struct PendingGuard<'a> {
    scope: &'a Injector,
    token: &'a Token,
    armed: bool,
}

impl PendingGuard<'_> {
    /// Moves the pending entry into the instance cache and settles waiters.
    ///
    /// Returns `false` without caching when the scope was unmounted meanwhile; waiters
    /// then see the placeholder fail.
    fn complete(mut self, instance: &Instance, owned: bool) -> bool {
        self.armed = false;
        let slot = {
            let mut state = self.scope.inner.state.lock();
            if state.phase == ScopePhase::Unmounted {
                return false;
            }
            state.instances.insert(
                self.token.clone(),
                CachedInstance {
                    instance: instance.clone(),
                    owned,
                },
            );
            state.pending.remove(self.token)
        };
        if let Some(slot) = slot {
            slot.settle(instance.clone());
        }
        true
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let slot = self.scope.inner.state.lock().pending.remove(self.token);
            drop(slot);
        }
    }
}

impl Injector {
    /// Resolves `token` by walking from this scope towards the root.
    ///
    /// Deferred registrations are applied first. At each scope, in order: a cached or
    /// pending entry answers immediately; otherwise the provider's binding runs (after
    /// deferring to an ancestor when it prefers one); otherwise the auto factory may
    /// synthesize a binding. A miss at every scope is reported and yields `None`.
    pub fn resolve(&self, token: &Token) -> Option<Resolution> {
        self.registry().flush();
        let found = self.walk(token);
        if found.is_none() {
            self.diagnostics().not_found(token);
        }
        found
    }

    fn walk(&self, token: &Token) -> Option<Resolution> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            match scope.lookup(token) {
                Lookup::Found(resolution) => return Some(resolution),
                Lookup::Absent => return None,
                Lookup::Skip => current = scope.parent(),
            }
        }
        None
    }

    fn lookup(&self, token: &Token) -> Lookup {
        if let Some(resolution) = self.inner.state.lock().lookup(token) {
            if self.diagnostics().tracing() {
                tracing::trace!(
                    target: TARGET,
                    scope = %self.name(),
                    token = %token,
                    pending = resolution.is_pending(),
                    "cache hit"
                );
            }
            return Lookup::Found(resolution);
        }

        if let Some(binding) = self.provider().binding(token) {
            return self.run_binding(token, binding);
        }

        if let Some(factory) = self.provider().auto_factory().cloned() {
            let bound_above = self
                .ancestors()
                .any(|scope| scope.provider().has_explicit_binding(token));
            if !bound_above {
                if let Some(binding) = factory(token, self) {
                    let binding = binding.into_auto();
                    self.provider().insert_binding(token.clone(), binding.clone());
                    return self.run_binding(token, binding);
                }
            }
        }

        Lookup::Skip
    }

    fn run_binding(&self, token: &Token, binding: Binding) -> Lookup {
        if binding.prefers_ancestor() {
            if let Some(owner) = self.ancestors().find(|scope| scope.has_binding(token)) {
                if self.diagnostics().tracing() {
                    tracing::trace!(
                        target: TARGET,
                        scope = %self.name(),
                        owner = %owner.name(),
                        token = %token,
                        "deferring to ancestor binding"
                    );
                }
                return match owner.walk(token) {
                    Some(resolution) => Lookup::Found(resolution),
                    None => Lookup::Absent,
                };
            }
        }
        self.instantiate(token, &binding)
    }

    fn instantiate(&self, token: &Token, binding: &Binding) -> Lookup {
        let (handle, guard) = {
            let mut state = self.inner.state.lock();
            // Another thread may have finished (or started) while we were choosing
            if let Some(resolution) = state.lookup(token) {
                return Lookup::Found(resolution);
            }
            if state.phase == ScopePhase::Unmounted {
                drop(state);
                self.diagnostics().unmounted(self.name(), token);
                return Lookup::Absent;
            }
            let slot = PendingSlot::new(token.clone());
            let handle = slot.handle();
            state.pending.insert(token.clone(), slot);
            (
                handle,
                PendingGuard {
                    scope: self,
                    token,
                    armed: true,
                },
            )
        };

        let _frame = ResolutionFrame::enter(format!("{}::{}", self.name(), token));
        if self.diagnostics().tracing() {
            tracing::trace!(
                target: TARGET,
                scope = %self.name(),
                token = %token,
                binding = binding.label(),
                "instantiating"
            );
        }

        binding.run_pre(token);
        let produced = binding.produce(&ResolveContext::new(self, token, &handle));

        let Some(instance) = produced else {
            drop(guard);
            return if binding.is_auto() {
                Lookup::Skip
            } else {
                Lookup::Absent
            };
        };

        let owned = binding.kind() != BindingKind::Existing;
        if !guard.complete(&instance, owned) {
            // Unmounted while the binding ran: treat the instance as torn down with the scope
            if owned {
                instance.dispose();
                self.registry().untag(&instance, self);
            }
            self.diagnostics().unmounted(self.name(), token);
            return Lookup::Absent;
        }
        self.init_instance(&instance);
        binding.run_post(&instance);
        Lookup::Found(Resolution::Ready(instance))
    }
}
