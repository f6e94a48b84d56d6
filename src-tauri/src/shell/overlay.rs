//! Selection overlay window.
//!
//! Every selection gets its own window labelled `overlay-<n>`. Only the
//! live label is tracked, so the `Destroyed` event of an overlay the
//! selector tore down itself is told apart from one the user or the window
//! manager closed.

use crate::core::{RegionSelector, SelectorError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tauri::{AppHandle, Manager};

pub const OVERLAY_PREFIX: &str = "overlay-";

pub fn is_overlay(label: &str) -> bool {
    label.starts_with(OVERLAY_PREFIX)
}

pub struct TauriRegionSelector {
    app: AppHandle,
    live: Mutex<Option<String>>,
    next_id: AtomicU64,
}

impl TauriRegionSelector {
    pub fn new(app: AppHandle) -> Self {
        Self {
            app,
            live: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Record that overlay `label` is gone. True if it was the live overlay,
    /// i.e. it closed without the selector closing it.
    pub fn window_destroyed(&self, label: &str) -> bool {
        let mut live = self.live.lock().unwrap_or_else(|p| p.into_inner());
        if live.as_deref() == Some(label) {
            *live = None;
            true
        } else {
            false
        }
    }

    fn take_live(&self) -> Option<String> {
        self.live.lock().unwrap_or_else(|p| p.into_inner()).take()
    }

    fn destroy(&self, label: &str) {
        if let Some(window) = self.app.get_webview_window(label) {
            match window.destroy() {
                Ok(()) => log::info!("[OVERLAY] Closed {}", label),
                Err(e) => log::warn!("[OVERLAY] Failed to close {}: {}", label, e),
            }
        }
    }
}

impl RegionSelector for TauriRegionSelector {
    /// Fullscreen, transparent and frameless so the desktop shows through;
    /// the page draws the dimming and the rubber band.
    fn open(&self) -> Result<(), SelectorError> {
        // A stale overlay from an earlier cycle is replaced, not reused.
        if let Some(stale) = self.take_live() {
            log::info!("[OVERLAY] Replacing {}", stale);
            self.destroy(&stale);
        }

        let label = format!("{}{}", OVERLAY_PREFIX, self.next_id.fetch_add(1, Ordering::SeqCst));
        let window = tauri::WebviewWindowBuilder::new(
            &self.app,
            &label,
            tauri::WebviewUrl::App("overlay.html".into()),
        )
        .fullscreen(true)
        .transparent(true)
        .decorations(false)
        .always_on_top(true)
        .skip_taskbar(true)
        .title("Snip Relay Overlay")
        .build()
        .map_err(|e| SelectorError(e.to_string()))?;

        let _ = window.set_focus();
        log::info!("[OVERLAY] Opened {}", label);
        *self.live.lock().unwrap_or_else(|p| p.into_inner()) = Some(label);
        Ok(())
    }

    fn close(&self) {
        if let Some(label) = self.take_live() {
            self.destroy(&label);
        }
    }
}
