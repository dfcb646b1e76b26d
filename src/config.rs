//! Container configuration.
//!
//! Controls the non-fatal diagnostic channel. Configuration is read from code, from the
//! environment, or (with the `config` feature) from JSON.

use std::env;
use std::str::FromStr;

use once_cell::sync::Lazy;
#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Environment variable selecting the [`DiagnosticsMode`].
pub const DIAGNOSTICS_ENV: &str = "FERROUS_TREE_DI_DIAGNOSTICS";
/// Environment variable enabling per-resolution trace events.
pub const TRACE_ENV: &str = "FERROUS_TREE_DI_TRACE";

static GLOBAL: Lazy<ContainerConfig> = Lazy::new(ContainerConfig::from_env);

/// When configuration diagnostics and missing-dependency reports are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum DiagnosticsMode {
    /// Enabled in debug builds, silent in release builds
    #[default]
    Auto,
    /// Always report
    Enabled,
    /// Never report
    Disabled,
}

impl DiagnosticsMode {
    /// Resolves `Auto` against the current build profile.
    pub fn is_enabled(self) -> bool {
        match self {
            DiagnosticsMode::Auto => cfg!(debug_assertions),
            DiagnosticsMode::Enabled => true,
            DiagnosticsMode::Disabled => false,
        }
    }
}

impl FromStr for DiagnosticsMode {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(DiagnosticsMode::Auto),
            "on" | "enabled" | "true" | "1" => Ok(DiagnosticsMode::Enabled),
            "off" | "disabled" | "false" | "0" => Ok(DiagnosticsMode::Disabled),
            other => Err(DiError::Config(format!("unknown diagnostics mode '{}'", other))),
        }
    }
}

/// Configuration shared by every scope under one [`Registry`](crate::Registry).
///
/// # Examples
///
/// ```rust
/// use ferrous_tree_di::{ContainerConfig, DiagnosticsMode};
///
/// let config = ContainerConfig::default()
///     .with_diagnostics(DiagnosticsMode::Disabled)
///     .with_trace_resolution(true);
///
/// assert!(!config.diagnostics_enabled());
/// assert!(config.trace_resolution);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerConfig {
    /// Diagnostic reporting mode
    pub diagnostics: DiagnosticsMode,
    /// Warn when a pending placeholder is read as if it were final
    pub warn_on_pending_access: bool,
    /// Emit a trace event for every resolution step
    pub trace_resolution: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            diagnostics: DiagnosticsMode::Auto,
            warn_on_pending_access: true,
            trace_resolution: false,
        }
    }
}

impl ContainerConfig {
    /// Sets the diagnostics mode.
    pub fn with_diagnostics(mut self, mode: DiagnosticsMode) -> Self {
        self.diagnostics = mode;
        self
    }

    /// Enables or disables pending-access warnings.
    pub fn with_pending_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_pending_access = enabled;
        self
    }

    /// Enables or disables per-resolution trace events.
    pub fn with_trace_resolution(mut self, enabled: bool) -> Self {
        self.trace_resolution = enabled;
        self
    }

    /// Whether diagnostics are reported under this configuration.
    pub fn diagnostics_enabled(&self) -> bool {
        self.diagnostics.is_enabled()
    }

    /// Reads the configuration from the environment.
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::try_from_env().unwrap_or_default()
    }

    /// Reads the configuration from the environment, reporting unparseable values.
    pub fn try_from_env() -> DiResult<Self> {
        let mut config = Self::default();
        if let Ok(value) = env::var(DIAGNOSTICS_ENV) {
            config.diagnostics = value.parse()?;
        }
        if let Ok(value) = env::var(TRACE_ENV) {
            config.trace_resolution = parse_flag(&value)?;
        }
        Ok(config)
    }

    /// Parses a JSON document; missing fields take their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        serde_json::from_str(json).map_err(|e| DiError::Config(e.to_string()))
    }

    /// Process-wide configuration read once from the environment.
    ///
    /// Used for diagnostics raised before any registry exists, such as binding validation.
    pub fn global() -> &'static ContainerConfig {
        &GLOBAL
    }
}

fn parse_flag(value: &str) -> DiResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" | "" => Ok(false),
        other => Err(DiError::Config(format!("unknown flag value '{}'", other))),
    }
}
