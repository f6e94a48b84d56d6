//! Snip Relay desktop shell.
//!
//! Wires the core to Tauri: tray, overlay window, global shortcut and the
//! command registry. No capture or paste logic lives here.
//!
//!   - commands.rs : invoke() handlers for the settings window and overlay
//!   - overlay.rs : `RegionSelector` backed by a fullscreen webview
//!   - shortcut.rs: `KeyHook` backed by tauri-plugin-global-shortcut
//!   - tray.rs    : tray icon and menu

mod commands;
mod overlay;
mod shortcut;
mod tray;

use crate::capture::XcapFrameSource;
use crate::clipboard::SystemClipboard;
use crate::config::{self, AppConfig};
use crate::core::{Collaborators, Core};
use crate::platform;
use crate::prefs::JsonPreferenceStore;
use std::sync::Arc;
use tauri::{Emitter, Manager, RunEvent, WindowEvent};

const MAIN_LABEL: &str = "main";

/// Event name the webview listens on for `CoreEvent`s.
pub const CORE_EVENT: &str = "core-event";

/// Entry point, called by the Tauri runtime.
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    config::load_env_files();
    env_logger::init();

    let config = AppConfig::from_env();

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_global_shortcut::Builder::new().build())
        .invoke_handler(tauri::generate_handler![
            commands::get_preferences,
            commands::set_hotkey,
            commands::set_destination,
            commands::start_capture,
            commands::region_selected,
            commands::region_cancelled,
        ])
        .on_window_event(|window, event| {
            if overlay::is_overlay(window.label()) {
                if let WindowEvent::Destroyed = event {
                    overlay_destroyed(window.app_handle(), window.label());
                }
                return;
            }
            // The main window hides instead of closing or minimizing; the tray
            // brings it back.
            if window.label() != MAIN_LABEL {
                return;
            }
            match event {
                WindowEvent::CloseRequested { api, .. } => {
                    api.prevent_close();
                    let _ = window.hide();
                }
                WindowEvent::Resized(_) if window.is_minimized().unwrap_or(false) => {
                    let _ = window.hide();
                }
                _ => {}
            }
        })
        .setup(move |app| {
            log::info!("Snip Relay starting up");
            let handle = app.handle().clone();

            let store = JsonPreferenceStore::default_location().unwrap_or_else(|e| {
                log::warn!("[PREFS] {}; using ./preferences.json", e);
                JsonPreferenceStore::new("preferences.json")
            });
            log::info!("[PREFS] Using {}", store.path().display());

            let selector = Arc::new(overlay::TauriRegionSelector::new(handle.clone()));
            app.manage(Arc::clone(&selector));

            let collaborators = Collaborators {
                frames: Arc::new(XcapFrameSource::new()),
                clipboard: Arc::new(SystemClipboard::new()),
                selector,
                prefs: Arc::new(store),
                key_hook: Arc::new(shortcut::GlobalShortcutHook::new(handle.clone())),
                automation: platform::native_automation(&config),
            };
            let (core, mut events) = Core::new(collaborators, config);
            app.manage(core.clone());

            let emitter = handle.clone();
            tauri::async_runtime::spawn(async move {
                while let Some(event) = events.recv().await {
                    if let Err(e) = emitter.emit(CORE_EVENT, &event) {
                        log::warn!("[SHELL] Failed to forward {:?}: {}", event, e);
                    }
                }
            });
            tauri::async_runtime::spawn(async move { core.start().await });

            tray::setup_tray(&handle)?;

            log::info!("System tray initialized, ready for snips");
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("Error building Snip Relay");

    app.run(|handle, event| match event {
        RunEvent::ExitRequested { code: None, api, .. } => {
            // Last window closed; stay in the tray.
            api.prevent_exit();
        }
        RunEvent::Exit => {
            if let Some(core) = handle.try_state::<Core>() {
                let core = core.inner().clone();
                tauri::async_runtime::block_on(core.shutdown());
            }
            log::info!("Snip Relay exited");
        }
        _ => {}
    });
}

/// An overlay closed behind the selector's back (Alt+F4, window manager,
/// failed page load): treat it as a cancelled selection.
fn overlay_destroyed(app: &tauri::AppHandle, label: &str) {
    let Some(selector) = app.try_state::<Arc<overlay::TauriRegionSelector>>() else {
        return;
    };
    if !selector.window_destroyed(label) {
        return;
    }
    log::info!("[OVERLAY] {} closed without a selection", label);
    if let Some(core) = app.try_state::<Core>() {
        core.on_region_cancelled();
    }
}

/// Show, restore and focus the main window.
pub(crate) fn show_main_window(app: &tauri::AppHandle) {
    match app.get_webview_window(MAIN_LABEL) {
        Some(window) => {
            let _ = window.show();
            let _ = window.unminimize();
            let _ = window.set_focus();
        }
        None => log::warn!("[SHELL] Main window missing"),
    }
}
