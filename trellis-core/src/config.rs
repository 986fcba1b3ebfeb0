//! Runtime Configuration
//!
//! Settings that change how the runtime behaves rather than what it renders.
//! The configuration can be built in code or parsed from JSON:
//!
//! ```rust,ignore
//! let config = RuntimeConfig::from_json(r#"{ "mode": "production", "max_flush_passes": 5 }"#)?;
//! let rt = Runtime::with_config(config);
//! ```

use serde::{Deserialize, Serialize};

/// Default number of passes a single flush may take.
pub const DEFAULT_MAX_FLUSH_PASSES: usize = 3;

/// Error isolation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Component failures are caught at the component boundary, reported
    /// with the component ancestry, and the failing branch is abandoned.
    Development,

    /// Component failures propagate to the caller.
    Production,
}

impl Default for Mode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Mode::Development
        } else {
            Mode::Production
        }
    }
}

/// Configuration for a [`Runtime`](crate::reactive::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Error isolation mode.
    pub mode: Mode,

    /// Maximum number of passes per flush. Updates queued after the last
    /// pass are dropped and reported as an overflow.
    pub max_flush_passes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            max_flush_passes: DEFAULT_MAX_FLUSH_PASSES,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        config.max_flush_passes = config.max_flush_passes.max(1);
        Ok(config)
    }

    /// Set the error isolation mode.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the flush pass cap. Values below one are raised to one.
    pub fn max_flush_passes(mut self, passes: usize) -> Self {
        self.max_flush_passes = passes.max(1);
        self
    }

    pub fn is_development(&self) -> bool {
        self.mode == Mode::Development
    }
}
