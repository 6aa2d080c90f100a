use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::error::Result;
use crate::lock::Lock;
use crate::pattern::PatternStore;
use crate::settings::Settings;
use crate::store::Store;

const DB_FILE: &str = "knock.db";
const SETTINGS_FILE: &str = "knock.toml";

/// Default base directory for all knock storage.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".secret-knock")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// The on-disk home of one lock.
///
/// Layout:
/// ```text
/// ~/.secret-knock/
/// ├── knock.db     (metadata: durations, lock_state, schema_version)
/// └── knock.toml   (optional settings)
/// ```
pub struct KnockHome {
    base: PathBuf,
    store: Store,
    settings: Settings,
}

impl KnockHome {
    /// Open the store and settings, creating the directory as needed.
    /// `base_dir` overrides the default location (for testing).
    pub fn open(base_dir: Option<&Path>) -> Result<Self> {
        let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
        fs::create_dir_all(&base)?;

        let settings = Settings::load(&base.join(SETTINGS_FILE))?;
        let store = Store::open(&base.join(DB_FILE))?;
        tracing::debug!("opened knock home at {}", base.display());

        Ok(Self {
            base,
            store,
            settings,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Build the lock over this home's store using `settings`
    /// (usually [`KnockHome::settings`] with command-line overrides applied).
    pub fn into_lock(self, settings: &Settings) -> Result<Lock<Store>> {
        let patterns = PatternStore::with_matcher(self.store, settings.matcher());
        Lock::open(patterns, settings.retain_on_unlock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knock_core::{DurationSequence, LockState};
    use tempfile::TempDir;

    #[test]
    fn test_directory_creation() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("nested").join("home");

        let home = KnockHome::open(Some(&base)).unwrap();
        assert!(base.join(DB_FILE).exists());
        assert_eq!(home.base_dir(), base.as_path());
        assert_eq!(home.settings(), &Settings::default());
    }

    #[test]
    fn test_settings_file_picked_up() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "retain_on_unlock = true\n").unwrap();

        let home = KnockHome::open(Some(dir.path())).unwrap();
        assert!(home.settings().retain_on_unlock);
    }

    #[test]
    fn test_into_lock_uses_settings() {
        let dir = TempDir::new().unwrap();
        let home = KnockHome::open(Some(dir.path())).unwrap();
        let settings = Settings {
            tolerance_ms: 5,
            ..Settings::default()
        };

        let mut lock = home.into_lock(&settings).unwrap();
        assert_eq!(lock.state(), LockState::Unlocked);
        assert_eq!(lock.patterns().matcher().tolerance_ms(), 5);

        lock.submit(DurationSequence::new(vec![1000, 1000])).unwrap();
        assert!(!lock
            .patterns()
            .matches(&DurationSequence::new(vec![1010, 990]))
            .unwrap());
    }

    #[test]
    fn test_default_base_dir_is_named() {
        assert!(default_base_dir().ends_with(".secret-knock"));
    }
}
