//! Paste keystroke injection through enigo.

use super::PlatformError;
use enigo::{
    Direction::{Click, Press, Release},
    Enigo, Key, Keyboard, Settings,
};

#[cfg(target_os = "macos")]
const PASTE_MODIFIER: Key = Key::Meta;
#[cfg(not(target_os = "macos"))]
const PASTE_MODIFIER: Key = Key::Control;

/// Send Ctrl+V (Cmd+V on macOS) to the focused window.
pub async fn send_paste_keystroke() -> Result<(), PlatformError> {
    tokio::task::spawn_blocking(|| {
        let mut enigo = Enigo::new(&Settings::default())
            .map_err(|e| PlatformError::Injection(format!("cannot start input simulation: {}", e)))?;

        let pressed = enigo
            .key(PASTE_MODIFIER, Press)
            .and_then(|_| enigo.key(Key::Unicode('v'), Click));
        // Always release the modifier, even if the V click failed.
        let released = enigo.key(PASTE_MODIFIER, Release);

        pressed
            .and(released)
            .map_err(|e| PlatformError::Injection(format!("paste keystroke failed: {}", e)))?;
        log::info!("[PLATFORM] Paste keystroke sent");
        Ok(())
    })
    .await
    .map_err(|e| PlatformError::Injection(e.to_string()))?
}
