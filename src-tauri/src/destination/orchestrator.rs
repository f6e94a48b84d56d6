//! Dispatches one orchestration run to the destination-specific flow.

use super::{editor, webchat, Destination, PasteOutcome, Progress};
use crate::config::{AppConfig, EditorProfile, OrchestratorTimings, WebChatProfile};
use crate::platform::Automation;

pub struct DestinationOrchestrator {
    automation: Automation,
    web_chat: WebChatProfile,
    editor: EditorProfile,
    timings: OrchestratorTimings,
}

impl DestinationOrchestrator {
    pub fn new(automation: Automation, config: &AppConfig) -> Self {
        Self {
            automation,
            web_chat: config.web_chat.clone(),
            editor: config.editor.clone(),
            timings: config.timings.clone(),
        }
    }

    pub fn display_name(&self, destination: Destination) -> &str {
        match destination {
            Destination::WebChat => &self.web_chat.display_name,
            Destination::DesktopEditor => &self.editor.display_name,
        }
    }

    /// Run once and return the terminal outcome.
    ///
    /// Dropping the returned future cancels the run: pending timers go
    /// with it and helper processes are killed.
    pub async fn run(&self, destination: Destination, progress: Progress<'_>) -> PasteOutcome {
        let start = std::time::Instant::now();
        log::info!("[ORCH] Run started for {}", destination);

        let outcome = match destination {
            Destination::WebChat => {
                webchat::run(&self.automation, &self.web_chat, &self.timings, progress).await
            }
            Destination::DesktopEditor => {
                editor::run(&self.automation, &self.editor, &self.timings, progress).await
            }
        };

        log::info!(
            "[ORCH] Run for {} finished in {}ms: {:?}",
            destination,
            start.elapsed().as_millis(),
            outcome
        );
        outcome
    }
}
