//! The configured key combination.

use super::keys::{Key, Modifier};
use super::HotkeyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One or more modifiers plus exactly one terminal key.
///
/// The terminal key is the trigger; every modifier must already be held
/// when it goes down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ComboRecord", into = "ComboRecord")]
pub struct KeyCombo {
    modifiers: BTreeSet<Modifier>,
    terminal: Key,
}

impl KeyCombo {
    pub fn new(
        modifiers: impl IntoIterator<Item = Modifier>,
        terminal: Key,
    ) -> Result<Self, HotkeyError> {
        let modifiers: BTreeSet<Modifier> = modifiers.into_iter().collect();
        if modifiers.is_empty() {
            return Err(HotkeyError::NoModifier);
        }
        if terminal.is_modifier() {
            return Err(HotkeyError::MissingTerminal);
        }
        Ok(Self {
            modifiers,
            terminal,
        })
    }

    /// Build a combo from UI labels, e.g. `["Ctrl", "Shift", "S"]`.
    ///
    /// Order does not matter except that exactly one label may name a
    /// non-modifier key.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self, HotkeyError> {
        let mut modifiers = BTreeSet::new();
        let mut terminal = None;

        for label in labels {
            match Key::parse(label.as_ref())? {
                Key::Modifier(m) => {
                    if !modifiers.insert(m) {
                        return Err(HotkeyError::DuplicateKey(m.to_string()));
                    }
                }
                key => {
                    if terminal.replace(key).is_some() {
                        return Err(HotkeyError::MultipleTerminals);
                    }
                }
            }
        }

        let terminal = terminal.ok_or(HotkeyError::MissingTerminal)?;
        Self::new(modifiers, terminal)
    }

    pub fn modifiers(&self) -> impl Iterator<Item = Modifier> + '_ {
        self.modifiers.iter().copied()
    }

    pub fn terminal(&self) -> Key {
        self.terminal
    }

    /// Labels in display order: modifiers first, terminal last.
    pub fn labels(&self) -> Vec<String> {
        self.modifiers
            .iter()
            .map(|m| m.to_string())
            .chain(std::iter::once(self.terminal.to_string()))
            .collect()
    }
}

impl Default for KeyCombo {
    /// Ctrl+Shift+S.
    fn default() -> Self {
        Self {
            modifiers: [Modifier::Ctrl, Modifier::Shift].into_iter().collect(),
            terminal: Key::Letter('S'),
        }
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.labels().join("+"))
    }
}

/// On-disk shape: `{"keys": ["Ctrl", "Shift", "S"]}`.
#[derive(Serialize, Deserialize)]
struct ComboRecord {
    keys: Vec<String>,
}

impl TryFrom<ComboRecord> for KeyCombo {
    type Error = HotkeyError;

    fn try_from(record: ComboRecord) -> Result<Self, Self::Error> {
        KeyCombo::from_labels(&record.keys)
    }
}

impl From<KeyCombo> for ComboRecord {
    fn from(combo: KeyCombo) -> Self {
        ComboRecord {
            keys: combo.labels(),
        }
    }
}
