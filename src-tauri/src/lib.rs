//! Snip Relay: snip a screen region, put it on the clipboard and paste it
//! into a chat page or a running editor.
//!
//! The library is the core and its platform adapters. The Tauri shell in
//! `shell` (feature `desktop`) only wires them to a tray, an overlay and
//! the settings window.
//!
//! Domains:
//!   - hotkey      : global key combo detection and rebinding
//!   - capture     : display lookup, grab and crop
//!   - clipboard   : image publishing
//!   - destination : per-destination orchestration runs and outcomes
//!   - platform    : OS automation behind async traits
//!   - core        : the capture cycle and its concurrency policy

pub mod capture;
pub mod clipboard;
pub mod config;
pub mod core;
pub mod destination;
pub mod events;
pub mod hotkey;
pub mod platform;
pub mod prefs;

#[cfg(feature = "desktop")]
mod shell;

#[cfg(feature = "desktop")]
pub use shell::run;
