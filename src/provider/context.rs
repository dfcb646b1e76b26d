//! Context handed to bindings while they run.

use crate::config::ContainerConfig;
use crate::instance::Instance;
use crate::internal::resolution_path;
use crate::pending::{PendingInstance, Resolution};
use crate::registry::Registry;
use crate::token::Token;
use crate::traits::ResolverCore;

use super::Injector;

/// What a binding sees while producing the instance for `token`.
///
/// Resolving through the context walks the chain of the scope that is instantiating,
/// which is not necessarily the scope the original request started from.
pub struct ResolveContext<'a> {
    injector: &'a Injector,
    token: &'a Token,
    pending: &'a PendingInstance,
}

impl<'a> ResolveContext<'a> {
    pub(crate) fn new(injector: &'a Injector, token: &'a Token, pending: &'a PendingInstance) -> Self {
        Self {
            injector,
            token,
            pending,
        }
    }

    /// Scope that will cache the produced instance.
    pub fn injector(&self) -> &Injector {
        self.injector
    }

    /// Token being produced.
    pub fn token(&self) -> &Token {
        self.token
    }

    /// Placeholder other lookups receive until this binding returns.
    pub fn pending(&self) -> &PendingInstance {
        self.pending
    }

    /// Registry of the resolving scope.
    pub fn registry(&self) -> &Registry {
        self.injector.registry()
    }

    /// Resolves another token from the instantiating scope.
    pub fn resolve(&self, token: &Token) -> Option<Resolution> {
        self.injector.resolve(token)
    }

    /// Records the instantiating scope as the instance's owner unless it already has one.
    pub(crate) fn adopt(&self, instance: &Instance) {
        self.injector.registry().tag(instance, self.injector);
    }

    pub(crate) fn report_pending(&self, target: &Token) {
        let subject = format!("{}.{}", self.token, target);
        self.injector
            .diagnostics()
            .pending_access(&subject, &resolution_path());
    }
}

impl ResolverCore for ResolveContext<'_> {
    fn resolve_token(&self, token: &Token) -> Option<Resolution> {
        self.resolve(token)
    }

    fn config(&self) -> &ContainerConfig {
        self.injector.registry().config()
    }

    fn subject(&self) -> String {
        self.token.to_string()
    }
}
