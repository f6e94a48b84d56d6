//! Edge-triggered combo detection over a raw key event stream.
//!
//! Pure state machine: no OS calls, no timers. The listener feeds it
//! events from whatever hook is installed.

use super::combo::KeyCombo;
use super::keys::{Key, Modifier, PhysicalKey};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTransition {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: PhysicalKey,
    pub transition: KeyTransition,
}

impl KeyEvent {
    pub fn down(key: PhysicalKey) -> Self {
        Self {
            key,
            transition: KeyTransition::Down,
        }
    }

    pub fn up(key: PhysicalKey) -> Self {
        Self {
            key,
            transition: KeyTransition::Up,
        }
    }
}

/// Physical keys currently held down.
#[derive(Debug, Default)]
pub struct KeyState {
    down: HashSet<PhysicalKey>,
}

impl KeyState {
    /// Record a press. Returns `false` if the key was already down (auto-repeat).
    fn press(&mut self, key: PhysicalKey) -> bool {
        self.down.insert(key)
    }

    fn release(&mut self, key: PhysicalKey) {
        self.down.remove(&key);
    }

    pub fn is_down(&self, key: &PhysicalKey) -> bool {
        self.down.contains(key)
    }

    /// True if any physical copy of `modifier` is held.
    pub fn modifier_held(&self, modifier: Modifier) -> bool {
        self.down.iter().any(|k| k.key == Key::Modifier(modifier))
    }

    pub fn len(&self) -> usize {
        self.down.len()
    }

    pub fn is_empty(&self) -> bool {
        self.down.is_empty()
    }
}

/// Watches key events for one binding. Rebinding means building a new
/// monitor, never mutating the combo of a live one.
#[derive(Debug)]
pub struct HotkeyMonitor {
    combo: KeyCombo,
    state: KeyState,
}

impl HotkeyMonitor {
    pub fn new(combo: KeyCombo) -> Self {
        Self {
            combo,
            state: KeyState::default(),
        }
    }

    pub fn combo(&self) -> &KeyCombo {
        &self.combo
    }

    pub fn key_state(&self) -> &KeyState {
        &self.state
    }

    /// Feed one event. Returns `true` exactly when this event completes the combo.
    ///
    /// A trigger requires a fresh DOWN of the terminal key while every
    /// modifier is held. Repeated DOWNs of an already-held key never fire.
    pub fn handle(&mut self, event: KeyEvent) -> bool {
        match event.transition {
            KeyTransition::Up => {
                self.state.release(event.key);
                false
            }
            KeyTransition::Down => {
                let fresh = self.state.press(event.key);
                fresh
                    && event.key.key == self.combo.terminal()
                    && self.combo.modifiers().all(|m| self.state.modifier_held(m))
            }
        }
    }
}
