//! OS automation seams used by the destination orchestrator.
//!
//! Every interaction with other applications goes through one of four
//! capabilities so the orchestration policy (retries, fallbacks,
//! timeouts) stays platform-agnostic and testable with fakes:
//!
//! - `UrlLauncher`:           hand a URL to the browser
//! - `WindowLocator`:         list visible window titles
//! - `ProcessProbe`:          find running processes by executable name
//! - `ForegroundController`:  focus, foreground query, mouse state, paste keystroke
//!
//! Native implementations live in the per-OS submodules and are only
//! built with the `desktop` feature.

pub mod command;
pub mod launcher;
pub mod process;

#[cfg(all(feature = "desktop", target_os = "linux"))]
mod linux;
#[cfg(all(feature = "desktop", target_os = "macos"))]
mod macos;
#[cfg(feature = "desktop")]
mod paste;
#[cfg(all(feature = "desktop", target_os = "windows"))]
mod win32;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Helper '{0}' not found on PATH")]
    HelperMissing(String),

    #[error("'{program}' failed: {message}")]
    CommandFailed { program: String, message: String },

    #[error("'{0}' did not finish in time")]
    Timeout(String),

    #[error("Native call failed: {0}")]
    Native(String),

    #[error("Input injection failed: {0}")]
    Injection(String),
}

/// A running process, as seen by a probe or the foreground query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessIdentity {
    pub pid: u32,
    pub name: String,
}

impl ProcessIdentity {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
        }
    }
}

#[async_trait]
pub trait UrlLauncher: Send + Sync {
    /// Fire-and-forget: success means a browser accepted the URL, not
    /// that a page has loaded.
    async fn open_url(&self, url: &str) -> Result<(), PlatformError>;
}

#[async_trait]
pub trait WindowLocator: Send + Sync {
    fn name(&self) -> &str;

    /// Titles of all visible top-level windows.
    async fn window_titles(&self) -> Result<Vec<String>, PlatformError>;
}

#[async_trait]
pub trait ProcessProbe: Send + Sync {
    fn name(&self) -> &str;

    /// Running processes whose executable matches one of `names`
    /// (see `names_match`). An empty list means "looked, found nothing".
    async fn find(&self, names: &[String]) -> Result<Vec<ProcessIdentity>, PlatformError>;
}

#[async_trait]
pub trait ForegroundController: Send + Sync {
    /// Raise the first visible window whose title contains `title`.
    async fn activate_window_titled(&self, title: &str) -> Result<(), PlatformError>;

    /// Raise the main window of process `pid`.
    async fn activate_process(&self, pid: u32) -> Result<(), PlatformError>;

    /// Owner of the window that currently has keyboard focus.
    async fn foreground_process(&self) -> Result<Option<ProcessIdentity>, PlatformError>;

    async fn primary_button_down(&self) -> Result<bool, PlatformError>;

    /// Ctrl+V, or Cmd+V on macOS, into whatever has focus.
    async fn send_paste(&self) -> Result<(), PlatformError>;
}

/// The full set of automation capabilities for one platform.
#[derive(Clone)]
pub struct Automation {
    pub launcher: Arc<dyn UrlLauncher>,
    /// Tried in order each poll round; an erroring locator falls through.
    pub locators: Vec<Arc<dyn WindowLocator>>,
    /// Tried in order; the first probe that finds the process wins.
    pub probes: Vec<Arc<dyn ProcessProbe>>,
    pub foreground: Arc<dyn ForegroundController>,
}

/// Compare executable names the way users write them: case-insensitive,
/// ignoring a trailing `.exe` and any leading directory.
pub fn names_match(actual: &str, wanted: &str) -> bool {
    normalize_name(actual) == normalize_name(wanted)
}

fn normalize_name(name: &str) -> String {
    let base = name
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    match base.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => base,
    }
}

/// Native automation for the current OS.
#[cfg(feature = "desktop")]
pub fn native_automation(config: &crate::config::AppConfig) -> Automation {
    let helper_timeout = config.timings.helper_timeout;
    let launcher = Arc::new(launcher::SystemBrowser::new(config.browser_command.clone()));
    let probes: Vec<Arc<dyn ProcessProbe>> = vec![
        Arc::new(process::SysinfoProbe::new()),
        Arc::new(process::CommandProbe::new(helper_timeout)),
    ];

    #[cfg(target_os = "linux")]
    let (locators, foreground) = linux::automation(helper_timeout);
    #[cfg(target_os = "macos")]
    let (locators, foreground) = macos::automation(helper_timeout);
    #[cfg(target_os = "windows")]
    let (locators, foreground) = win32::automation(helper_timeout);

    log::info!(
        "[PLATFORM] Automation ready: locators=[{}], probes=[{}]",
        locators.iter().map(|l| l.name()).collect::<Vec<_>>().join(", "),
        probes.iter().map(|p| p.name()).collect::<Vec<_>>().join(", "),
    );

    Automation {
        launcher,
        locators,
        probes,
        foreground,
    }
}
