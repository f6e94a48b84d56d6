//! Messages from the core to the app shell.
//!
//! One-way and serializable so the shell can forward them to the
//! webview unchanged.

use crate::destination::{Destination, OrchestrationState, PasteOutcome};
use serde::Serialize;

/// Error taxonomy shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PermissionDenied,
    NoScreenSource,
    CaptureFailed,
    ClipboardWriteFailed,
    AppNotRunning,
    TimedOut,
    FocusFailed,
    InjectionFailed,
    InvalidRegion,
    PreferencesFailed,
    SelectorFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreEvent {
    /// The selection overlay is open.
    CaptureStarted,
    /// The image is on the clipboard.
    CaptureReady { width: u32, height: u32 },
    OrchestrationStatus {
        destination: Destination,
        state: OrchestrationState,
        message: String,
    },
    /// Terminal outcome of a run. Emitted exactly once per capture.
    OrchestrationResult {
        destination: Destination,
        outcome: PasteOutcome,
    },
    Error { kind: ErrorKind, message: String },
}

impl CoreEvent {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        CoreEvent::Error {
            kind,
            message: message.into(),
        }
    }
}
