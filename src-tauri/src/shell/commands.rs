//! Tauri command handlers.
//!
//! Thin wrappers that bridge frontend invoke() calls to the core. The
//! settings window uses the preference commands; the overlay reports the
//! drawn rectangle back through `region_selected` / `region_cancelled`.

use crate::capture::CaptureRegion;
use crate::core::{Core, TriggerDisposition};
use crate::destination::Destination;
use crate::hotkey::KeyCombo;
use serde::Serialize;

/// What the settings window shows.
#[derive(Debug, Serialize)]
pub struct PreferencesView {
    /// Hotkey labels in display order, e.g. `["Ctrl", "Shift", "S"]`.
    pub keys: Vec<String>,
    /// Saved destination.
    pub destination: Destination,
    /// Destination the next run uses; differs when overridden from the environment.
    pub active_destination: Destination,
}

fn view(core: &Core) -> PreferencesView {
    let prefs = core.preferences();
    PreferencesView {
        keys: prefs.hotkey.labels(),
        destination: prefs.destination,
        active_destination: core.destination(),
    }
}

#[tauri::command]
pub fn get_preferences(core: tauri::State<'_, Core>) -> PreferencesView {
    view(&core)
}

/// Replace the hotkey. The new combo is saved, then the listener is
/// rebuilt around it.
#[tauri::command]
pub fn set_hotkey(core: tauri::State<'_, Core>, keys: Vec<String>) -> Result<PreferencesView, String> {
    let combo = KeyCombo::from_labels(&keys).map_err(|e| e.to_string())?;
    log::info!("[SETTINGS] Hotkey -> {}", combo);
    core.on_hotkey_binding_changed(combo)
        .map_err(|e| e.to_string())?;
    Ok(view(&core))
}

#[tauri::command]
pub fn set_destination(
    core: tauri::State<'_, Core>,
    destination: String,
) -> Result<PreferencesView, String> {
    let destination: Destination = destination.parse()?;
    log::info!("[SETTINGS] Destination -> {}", destination);
    core.on_destination_changed(destination)
        .map_err(|e| e.to_string())?;
    Ok(view(&core))
}

/// Same as pressing the hotkey.
#[tauri::command]
pub async fn start_capture(core: tauri::State<'_, Core>) -> Result<TriggerDisposition, String> {
    Ok(core.on_hotkey_triggered().await)
}

/// Called by the overlay on mouse release. Coordinates are CSS pixels
/// relative to the overlay window.
#[tauri::command]
pub async fn region_selected(
    core: tauri::State<'_, Core>,
    window: tauri::WebviewWindow,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) -> Result<(), String> {
    let scale = window.scale_factor().map_err(|e| e.to_string())?;
    let origin = window.outer_position().map_err(|e| e.to_string())?;

    let mut region = match CaptureRegion::from_logical(x, y, width, height, scale) {
        Ok(region) => region,
        Err(e) => {
            // A click without a drag: treat like Escape.
            log::info!("[OVERLAY] Empty selection ({}), cancelling", e);
            core.on_region_cancelled();
            return Ok(());
        }
    };
    region.x += origin.x;
    region.y += origin.y;
    log::info!(
        "[OVERLAY] Selected {}x{} at {},{} (scale {})",
        region.width,
        region.height,
        region.x,
        region.y,
        scale
    );

    let core = core.inner().clone();
    tauri::async_runtime::spawn(async move { core.on_region_selected(region).await });
    Ok(())
}

#[tauri::command]
pub fn region_cancelled(core: tauri::State<'_, Core>) {
    core.on_region_cancelled();
}
