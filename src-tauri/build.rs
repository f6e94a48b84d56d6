//! Build script. Tauri code generation only runs for the desktop app;
//! the core library builds without it.

fn main() {
    #[cfg(feature = "desktop")]
    tauri_build::build();
}
