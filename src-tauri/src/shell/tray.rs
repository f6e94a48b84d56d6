//! System tray setup and click handler.
//!
//! Left-click starts a snip, same as the hotkey. The menu holds
//! Show App, Snip Screen and Exit.

use crate::core::Core;
use tauri::{
    image::Image as TauriImage,
    menu::{MenuBuilder, MenuItemBuilder},
    tray::{MouseButton, TrayIconBuilder, TrayIconEvent},
    AppHandle, Manager,
};

pub fn setup_tray(app: &AppHandle) -> Result<(), Box<dyn std::error::Error>> {
    let show_item = MenuItemBuilder::with_id("show", "Show App").build(app)?;
    let snip_item = MenuItemBuilder::with_id("snip", "Snip Screen").build(app)?;
    let quit_item = MenuItemBuilder::with_id("quit", "Exit").build(app)?;
    let menu = MenuBuilder::new(app)
        .item(&show_item)
        .item(&snip_item)
        .separator()
        .item(&quit_item)
        .build()?;

    // Decode the PNG icon to RGBA for Tauri's Image type
    let icon_bytes = include_bytes!("../../icons/32x32.png");
    let icon_img = image::load_from_memory(icon_bytes)
        .map_err(|e| format!("Failed to decode tray icon: {}", e))?;
    let rgba = icon_img.to_rgba8();
    let (w, h) = (rgba.width(), rgba.height());
    let tray_icon = TauriImage::new_owned(rgba.into_raw(), w, h);

    let _tray = TrayIconBuilder::new()
        .icon(tray_icon)
        .tooltip("Snip Relay - Click to snip")
        .menu(&menu)
        .show_menu_on_left_click(false)
        .on_tray_icon_event(|tray_icon, event| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                ..
            } = event
            {
                log::info!("[TRAY] Clicked");
                start_snip(tray_icon.app_handle());
            }
        })
        .on_menu_event(|app, event| match event.id().as_ref() {
            "show" => super::show_main_window(app),
            "snip" => start_snip(app),
            "quit" => {
                log::info!("[TRAY] Exit requested");
                app.exit(0);
            }
            _ => {}
        })
        .build(app)?;

    Ok(())
}

fn start_snip(app: &AppHandle) {
    let core = app.state::<Core>().inner().clone();
    tauri::async_runtime::spawn(async move {
        let disposition = core.on_hotkey_triggered().await;
        log::debug!("[TRAY] Snip request: {:?}", disposition);
    });
}
