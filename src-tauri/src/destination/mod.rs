//! Destination domain: public API.
//!
//! After a capture lands on the clipboard, one orchestration run brings
//! the chosen destination forward and pastes into it:
//!
//! - webchat:      open the chat URL, poll for its window, paste immediately
//! - editor:       detect the running editor, focus it, paste after a user click
//! - orchestrator: dispatch plus the single-outcome guarantee

mod editor;
mod orchestrator;
mod webchat;

pub use orchestrator::DestinationOrchestrator;

use crate::events::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a capture gets pasted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Destination {
    /// Chat page in the default browser.
    #[default]
    #[serde(rename = "chatgpt")]
    WebChat,
    /// A desktop editor that is already running.
    #[serde(rename = "cursor")]
    DesktopEditor,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::WebChat => "chatgpt",
            Destination::DesktopEditor => "cursor",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Destination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chatgpt" | "webchat" | "web" => Ok(Destination::WebChat),
            "cursor" | "editor" => Ok(Destination::DesktopEditor),
            other => Err(format!("Unknown destination: {:?}", other)),
        }
    }
}

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FailureReason {
    /// The URL could not be handed to a browser.
    LaunchFailed(String),
    /// Every window locator errored in the same poll round.
    WindowQueryFailed(String),
    /// Every process probe errored.
    DetectionFailed(String),
    /// Mouse button state could not be read during the click wait.
    PointerUnavailable(String),
    /// The paste keystroke could not be sent.
    InjectionFailed(String),
    /// Superseded by a new capture, or the app is shutting down.
    Cancelled(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::LaunchFailed(m) => write!(f, "launch failed: {}", m),
            FailureReason::WindowQueryFailed(m) => write!(f, "window query failed: {}", m),
            FailureReason::DetectionFailed(m) => write!(f, "process detection failed: {}", m),
            FailureReason::PointerUnavailable(m) => write!(f, "pointer unavailable: {}", m),
            FailureReason::InjectionFailed(m) => write!(f, "paste injection failed: {}", m),
            FailureReason::Cancelled(m) => write!(f, "cancelled: {}", m),
        }
    }
}

/// Terminal result of one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum PasteOutcome {
    Success,
    TimedOut,
    AppNotRunning,
    Failed(FailureReason),
}

impl PasteOutcome {
    pub fn cancelled(why: impl Into<String>) -> Self {
        PasteOutcome::Failed(FailureReason::Cancelled(why.into()))
    }

    /// Error kind to surface alongside the result. `None` for success,
    /// cancellation, and failures that have no kind of their own.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            PasteOutcome::TimedOut => Some(ErrorKind::TimedOut),
            PasteOutcome::AppNotRunning => Some(ErrorKind::AppNotRunning),
            PasteOutcome::Failed(FailureReason::InjectionFailed(_)) => Some(ErrorKind::InjectionFailed),
            PasteOutcome::Success | PasteOutcome::Failed(_) => None,
        }
    }

    /// User-facing line for this outcome.
    pub fn describe(&self, name: &str) -> String {
        match self {
            PasteOutcome::Success => format!("Pasted into {}", name),
            PasteOutcome::TimedOut => format!(
                "Timed out waiting for {}. The image is still on the clipboard",
                name
            ),
            PasteOutcome::AppNotRunning => format!("{} is not running", name),
            PasteOutcome::Failed(reason) => format!("Could not paste into {}: {}", name, reason),
        }
    }
}

/// Progress of a run, reported to the UI as it happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum OrchestrationState {
    Launching,
    WaitingForWindow,
    Detecting,
    Focusing,
    /// Waiting for the user to click into the destination. With
    /// `manual_focus` the window could not be raised automatically.
    AwaitingClick { manual_focus: bool },
    Pasting,
}

impl OrchestrationState {
    /// User-facing line for this step; `name` is the destination's display name.
    pub fn message(&self, name: &str) -> String {
        match self {
            OrchestrationState::Launching => format!("Opening {}...", name),
            OrchestrationState::WaitingForWindow => format!("Waiting for {} to load...", name),
            OrchestrationState::Detecting => format!("Looking for a running {}...", name),
            OrchestrationState::Focusing => format!("Bringing {} to the front...", name),
            OrchestrationState::AwaitingClick { manual_focus: false } => {
                format!("Click into the {} chat box to paste", name)
            }
            OrchestrationState::AwaitingClick { manual_focus: true } => format!(
                "Could not focus {}. Switch to it and click into the chat box to paste",
                name
            ),
            OrchestrationState::Pasting => format!("Pasting into {}...", name),
        }
    }
}

/// What a run reports while it is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationEvent {
    Status(OrchestrationState),
    /// Non-fatal problem; the run carries on.
    Warning(ErrorKind, String),
}

/// Progress callback handed to a run.
pub type Progress<'a> = &'a (dyn Fn(OrchestrationEvent) + Send + Sync);
