//! Non-fatal diagnostic channel.
//!
//! Configuration mistakes and unresolved dependencies are logged, never thrown. Whether
//! anything is emitted depends on the [`ContainerConfig`] in effect.

use crate::config::ContainerConfig;
use crate::error::DiError;
use crate::token::Token;

pub(crate) const TARGET: &str = "ferrous_tree_di";

/// Reporting switches derived from a [`ContainerConfig`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Diagnostics {
    enabled: bool,
    pending_warnings: bool,
    trace: bool,
}

impl Diagnostics {
    pub(crate) fn from_config(config: &ContainerConfig) -> Self {
        Self {
            enabled: config.diagnostics_enabled(),
            pending_warnings: config.warn_on_pending_access,
            trace: config.trace_resolution,
        }
    }

    /// Diagnostics for code running before any registry exists.
    pub(crate) fn global() -> Self {
        Self::from_config(ContainerConfig::global())
    }

    pub(crate) fn enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn tracing(&self) -> bool {
        self.trace
    }

    pub(crate) fn error(&self, error: &DiError) {
        if self.enabled {
            tracing::error!(target: TARGET, "{}", error);
        }
    }

    pub(crate) fn warn(&self, error: &DiError) {
        if self.enabled {
            tracing::warn!(target: TARGET, "{}", error);
        }
    }

    pub(crate) fn not_found(&self, token: &Token) {
        self.error(&DiError::NotFound(token.to_string()));
    }

    pub(crate) fn incorrect_binding(&self, token: &Token, binding: &str) {
        self.error(&DiError::IncorrectBinding {
            token: token.to_string(),
            binding: binding.to_string(),
        });
    }

    pub(crate) fn provider_not_found(&self, target: &str) {
        self.error(&DiError::ProviderNotFound(target.to_string()));
    }

    pub(crate) fn unmounted(&self, scope: &str, token: &Token) {
        self.warn(&DiError::ScopeUnmounted {
            scope: scope.to_string(),
            token: token.to_string(),
        });
    }

    /// Reading a placeholder before it settled; `path` is the active resolution chain.
    pub(crate) fn pending_access(&self, subject: &str, path: &[String]) {
        if !self.pending_warnings {
            return;
        }
        let subject = if path.is_empty() {
            subject.to_string()
        } else {
            format!("{} (while resolving {})", subject, path.join(" -> "))
        };
        self.warn(&DiError::Pending(subject));
    }
}
