//! Global hotkey domain: public API.
//!
//! - keys:     logical/physical key identifiers and label parsing
//! - combo:    the configured `KeyCombo`
//! - monitor:  edge-triggered detection over raw key events
//! - listener: hook install/teardown and trigger delivery

pub mod combo;
pub mod keys;
pub mod listener;
pub mod monitor;

pub use combo::KeyCombo;
pub use keys::{Key, KeyLocation, Modifier, NamedKey, PhysicalKey};
pub use listener::{HookGuard, HotkeyListener, HotkeyTrigger, KeyEventSink, KeyHook};
pub use monitor::{HotkeyMonitor, KeyEvent, KeyState, KeyTransition};

#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("Unknown key label: {0:?}")]
    UnknownKey(String),

    #[error("Hotkey needs at least one modifier (Ctrl, Shift, Alt or Meta)")]
    NoModifier,

    #[error("Hotkey needs a non-modifier key to trigger on")]
    MissingTerminal,

    #[error("Hotkey can only have one non-modifier key")]
    MultipleTerminals,

    #[error("Key {0} appears more than once")]
    DuplicateKey(String),

    #[error("Global input hook refused: {0}")]
    PermissionDenied(String),
}
