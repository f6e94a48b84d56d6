//! User preference persistence.
//!
//! Stored as `<config_dir>/snip-relay/preferences.json`:
//! `{"hotkey": {"keys": ["Ctrl", "Shift", "S"]}, "destination": "chatgpt"}`.
//! A missing, unreadable or invalid file loads as absent and defaults apply.

use crate::destination::Destination;
use crate::events::ErrorKind;
use crate::hotkey::KeyCombo;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub hotkey: KeyCombo,
    pub destination: Destination,
}

pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> Option<Preferences>;

    fn save(&self, prefs: &Preferences) -> Result<(), PrefsError>;
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct JsonPreferenceStore {
    path: PathBuf,
}

impl JsonPreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/snip-relay/preferences.json`.
    pub fn default_location() -> Result<Self, PrefsError> {
        let dir = dirs::config_dir().ok_or(PrefsError::NoConfigDir)?;
        Ok(Self::new(dir.join("snip-relay").join("preferences.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn load(&self) -> Option<Preferences> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("[PREFS] Cannot read {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<Preferences>(&raw) {
            Ok(prefs) => {
                log::info!(
                    "[PREFS] Loaded hotkey={} destination={}",
                    prefs.hotkey,
                    prefs.destination
                );
                Some(prefs)
            }
            Err(e) => {
                log::warn!("[PREFS] Ignoring invalid {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Creates the config directory if it doesn't exist.
    fn save(&self, prefs: &Preferences) -> Result<(), PrefsError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(prefs)?;
        std::fs::write(&self.path, json)?;
        log::info!(
            "[PREFS] Saved hotkey={} destination={} to {}",
            prefs.hotkey,
            prefs.destination,
            self.path.display()
        );
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("Failed to write preferences: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("No per-user config directory on this system")]
    NoConfigDir,
}

impl PrefsError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::PreferencesFailed
    }
}
