use std::fs;
use std::path::Path;
use std::time::Duration;

use knock_core::{ALLOWED_ERROR_MS, IDLE_TIMEOUT_MS, Matcher};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Tunables read from `knock.toml`. Missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Quiet time after the last tap that ends a capture session.
    pub idle_timeout_ms: u64,
    /// Per-gap deviation accepted after rescaling.
    pub tolerance_ms: u64,
    /// Keep the pattern after a successful unlock so the same knock can be reused.
    pub retain_on_unlock: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            idle_timeout_ms: IDLE_TIMEOUT_MS,
            tolerance_ms: ALLOWED_ERROR_MS,
            retain_on_unlock: false,
        }
    }
}

impl Settings {
    /// Load settings from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let settings = Self::from_toml(&content)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        tracing::debug!(?settings, "loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, String> {
        let settings: Settings = toml::from_str(content).map_err(|e| e.message().to_string())?;
        if settings.idle_timeout_ms == 0 {
            return Err("idle_timeout_ms must be greater than zero".to_string());
        }
        Ok(settings)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn matcher(&self) -> Matcher {
        Matcher::new(self.tolerance_ms)
    }
}
