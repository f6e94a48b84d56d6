//! Global hotkey hook backed by tauri-plugin-global-shortcut.
//!
//! The plugin reports whole-combo presses rather than single keys, so each
//! press is replayed into the sink as the combo's key-downs and each release
//! as its key-ups. The monitor then applies the same edge rule as for any
//! other hook.

use crate::hotkey::{
    HookGuard, HotkeyError, KeyCombo, KeyEvent, KeyEventSink, KeyHook, Modifier, PhysicalKey,
};
use tauri::AppHandle;
use tauri_plugin_global_shortcut::{GlobalShortcutExt, Shortcut, ShortcutState};

pub struct GlobalShortcutHook {
    app: AppHandle,
}

impl GlobalShortcutHook {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl KeyHook for GlobalShortcutHook {
    fn install(&self, combo: &KeyCombo, sink: KeyEventSink) -> Result<HookGuard, HotkeyError> {
        let accelerator = accelerator(combo);
        let shortcut: Shortcut = accelerator
            .parse()
            .map_err(|e| HotkeyError::UnknownKey(format!("{} ({})", accelerator, e)))?;

        let keys = combo_keys(combo);
        self.app
            .global_shortcut()
            .on_shortcut(shortcut, move |_app, _shortcut, event| match event.state {
                ShortcutState::Pressed => {
                    for key in &keys {
                        sink(KeyEvent::down(*key));
                    }
                }
                ShortcutState::Released => {
                    for key in keys.iter().rev() {
                        sink(KeyEvent::up(*key));
                    }
                }
            })
            .map_err(|e| HotkeyError::PermissionDenied(e.to_string()))?;
        log::info!("[HOTKEY] Registered global shortcut {}", accelerator);

        let app = self.app.clone();
        Ok(HookGuard::new(move || {
            if let Err(e) = app.global_shortcut().unregister(shortcut) {
                log::warn!("[HOTKEY] Failed to unregister {}: {}", accelerator, e);
            }
        }))
    }
}

/// Accelerator string in the plugin's syntax, e.g. `control+shift+S`.
fn accelerator(combo: &KeyCombo) -> String {
    let mut parts: Vec<String> = combo
        .modifiers()
        .map(|m| {
            match m {
                Modifier::Ctrl => "control",
                Modifier::Shift => "shift",
                Modifier::Alt => "alt",
                Modifier::Meta => "super",
            }
            .to_string()
        })
        .collect();

    parts.push(combo.terminal().to_string());
    parts.join("+")
}

fn combo_keys(combo: &KeyCombo) -> Vec<PhysicalKey> {
    combo
        .modifiers()
        .map(PhysicalKey::left)
        .chain(std::iter::once(PhysicalKey::new(combo.terminal())))
        .collect()
}
