//! Web chat run: open the URL, wait for the chat window, paste.
//!
//! The paste is sent as soon as the page had time to settle; unlike the
//! editor run there is no click-gate, since the chat input has focus
//! on load.

use super::{FailureReason, OrchestrationEvent, OrchestrationState, PasteOutcome, Progress};
use crate::config::{OrchestratorTimings, WebChatProfile};
use crate::platform::{Automation, WindowLocator};
use std::sync::Arc;
use tokio::time::{sleep, timeout};

pub(super) async fn run(
    automation: &Automation,
    profile: &WebChatProfile,
    timings: &OrchestratorTimings,
    progress: Progress<'_>,
) -> PasteOutcome {
    progress(OrchestrationEvent::Status(OrchestrationState::Launching));
    if let Err(e) = automation.launcher.open_url(&profile.url).await {
        log::error!("[ORCH] Could not open {}: {}", profile.url, e);
        return PasteOutcome::Failed(FailureReason::LaunchFailed(e.to_string()));
    }
    sleep(timings.launch_delay).await;

    progress(OrchestrationEvent::Status(OrchestrationState::WaitingForWindow));
    let polled = timeout(
        timings.poll_ceiling(),
        poll_for_window(&automation.locators, &profile.window_titles, timings),
    )
    .await;

    let title = match polled {
        Ok(Ok(Some(title))) => title,
        Ok(Ok(None)) | Err(_) => {
            log::warn!(
                "[ORCH] No {} window within {:?}; image stays on the clipboard",
                profile.display_name,
                timings.poll_ceiling()
            );
            return PasteOutcome::TimedOut;
        }
        Ok(Err(reason)) => return PasteOutcome::Failed(reason),
    };

    log::info!("[ORCH] Found window {:?}", title);
    sleep(timings.web_settle).await;

    // The browser usually has focus already; raising it again is best effort.
    if let Err(e) = automation.foreground.activate_window_titled(&title).await {
        log::warn!("[ORCH] Re-activating {:?} failed: {}", title, e);
    }

    progress(OrchestrationEvent::Status(OrchestrationState::Pasting));
    match automation.foreground.send_paste().await {
        Ok(()) => PasteOutcome::Success,
        Err(e) => PasteOutcome::Failed(FailureReason::InjectionFailed(e.to_string())),
    }
}

/// Poll until a window matches, the attempts run out (`Ok(None)`), or a
/// whole round of locators errors.
async fn poll_for_window(
    locators: &[Arc<dyn WindowLocator>],
    expected: &[String],
    timings: &OrchestratorTimings,
) -> Result<Option<String>, FailureReason> {
    for attempt in 1..=timings.poll_attempts {
        if let Some(title) = find_matching_window(locators, expected).await? {
            log::debug!("[ORCH] Window matched on attempt {}", attempt);
            return Ok(Some(title));
        }
        sleep(timings.poll_interval).await;
    }
    Ok(None)
}

/// One poll round. Locators are tried in order until one sees a match;
/// an erroring locator falls through to the next. The round only fails
/// when every locator errored.
pub(super) async fn find_matching_window(
    locators: &[Arc<dyn WindowLocator>],
    expected: &[String],
) -> Result<Option<String>, FailureReason> {
    let mut errors = Vec::new();
    let mut answered = false;

    for locator in locators {
        match locator.window_titles().await {
            Ok(titles) => {
                answered = true;
                if let Some(title) = titles.into_iter().find(|t| title_matches(t, expected)) {
                    return Ok(Some(title));
                }
            }
            Err(e) => {
                log::debug!("[ORCH] Locator {} failed: {}", locator.name(), e);
                errors.push(format!("{}: {}", locator.name(), e));
            }
        }
    }

    if answered {
        Ok(None)
    } else if errors.is_empty() {
        Err(FailureReason::WindowQueryFailed(
            "no window locator available".to_string(),
        ))
    } else {
        Err(FailureReason::WindowQueryFailed(errors.join("; ")))
    }
}

/// Case-insensitive containment against any expected title.
pub(super) fn title_matches(title: &str, expected: &[String]) -> bool {
    let title = title.to_lowercase();
    expected.iter().any(|e| title.contains(&e.to_lowercase()))
}
