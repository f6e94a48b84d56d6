//! Desktop editor run: detect, focus, wait for the user's click, paste.
//!
//! The editor is never launched. The paste is click-gated: the editor
//! may have several panes, so we wait until the user clicks into the one
//! they want before sending the keystroke.

use super::{FailureReason, OrchestrationEvent, OrchestrationState, PasteOutcome, Progress};
use crate::config::{EditorProfile, OrchestratorTimings};
use crate::events::ErrorKind;
use crate::platform::{names_match, Automation, ForegroundController, ProcessIdentity, ProcessProbe};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

pub(super) async fn run(
    automation: &Automation,
    profile: &EditorProfile,
    timings: &OrchestratorTimings,
    progress: Progress<'_>,
) -> PasteOutcome {
    progress(OrchestrationEvent::Status(OrchestrationState::Detecting));
    let processes = match detect(&automation.probes, &profile.process_names).await {
        Ok(found) => found,
        Err(reason) => return PasteOutcome::Failed(reason),
    };
    if processes.is_empty() {
        log::info!("[ORCH] {} is not running", profile.display_name);
        return PasteOutcome::AppNotRunning;
    }
    log::info!(
        "[ORCH] {} running as pid(s) {:?}",
        profile.display_name,
        processes.iter().map(|p| p.pid).collect::<Vec<_>>()
    );

    progress(OrchestrationEvent::Status(OrchestrationState::Focusing));
    let manual_focus = match focus(automation.foreground.as_ref(), &processes).await {
        Ok(()) => false,
        Err(message) => {
            log::warn!("[ORCH] Focus failed, falling back to manual: {}", message);
            progress(OrchestrationEvent::Warning(ErrorKind::FocusFailed, message));
            true
        }
    };

    progress(OrchestrationEvent::Status(OrchestrationState::AwaitingClick { manual_focus }));
    let target = ClickTarget {
        processes: &processes,
        names: &profile.process_names,
    };
    let clicked = timeout(
        timings.click_watchdog,
        wait_for_click(automation.foreground.as_ref(), &target, timings.click_poll_interval),
    )
    .await;
    match clicked {
        Ok(Ok(())) => {}
        Ok(Err(reason)) => return PasteOutcome::Failed(reason),
        Err(_) => {
            log::warn!(
                "[ORCH] No click into {} within {:?}",
                profile.display_name,
                timings.click_watchdog
            );
            return PasteOutcome::TimedOut;
        }
    }

    sleep(timings.click_settle).await;
    progress(OrchestrationEvent::Status(OrchestrationState::Pasting));
    match automation.foreground.send_paste().await {
        Ok(()) => PasteOutcome::Success,
        Err(e) => PasteOutcome::Failed(FailureReason::InjectionFailed(e.to_string())),
    }
}

/// Ask each probe in turn; the first non-empty answer wins. An empty
/// result means at least one probe answered and none found the process.
pub(super) async fn detect(
    probes: &[Arc<dyn ProcessProbe>],
    names: &[String],
) -> Result<Vec<ProcessIdentity>, FailureReason> {
    let mut errors = Vec::new();
    let mut answered = false;

    for probe in probes {
        match probe.find(names).await {
            Ok(found) if !found.is_empty() => return Ok(found),
            Ok(_) => answered = true,
            Err(e) => {
                log::warn!("[ORCH] Probe {} failed: {}", probe.name(), e);
                errors.push(format!("{}: {}", probe.name(), e));
            }
        }
    }

    if answered {
        Ok(Vec::new())
    } else if errors.is_empty() {
        Err(FailureReason::DetectionFailed("no process probe available".to_string()))
    } else {
        Err(FailureReason::DetectionFailed(errors.join("; ")))
    }
}

/// Try to raise any of the detected processes.
async fn focus(
    foreground: &dyn ForegroundController,
    processes: &[ProcessIdentity],
) -> Result<(), String> {
    let mut errors = Vec::new();
    for process in processes {
        match foreground.activate_process(process.pid).await {
            Ok(()) => return Ok(()),
            Err(e) => errors.push(format!("pid {}: {}", process.pid, e)),
        }
    }
    Err(errors.join("; "))
}

struct ClickTarget<'a> {
    processes: &'a [ProcessIdentity],
    names: &'a [String],
}

impl ClickTarget<'_> {
    fn owns(&self, foreground: &ProcessIdentity) -> bool {
        self.processes.iter().any(|p| p.pid == foreground.pid)
            || self.names.iter().any(|n| names_match(&foreground.name, n))
    }
}

/// Resolve once the user presses and releases the primary button while
/// the destination owns the foreground window.
///
/// A button already held when the wait starts does not count; the press
/// has to be observed here.
async fn wait_for_click(
    foreground: &dyn ForegroundController,
    target: &ClickTarget<'_>,
    poll: Duration,
) -> Result<(), FailureReason> {
    let mut was_down = read_button(foreground).await?;
    let mut pressed = false;

    loop {
        sleep(poll).await;
        let down = read_button(foreground).await?;

        if down && !was_down {
            pressed = true;
        } else if !down && was_down && pressed {
            pressed = false;
            match foreground.foreground_process().await {
                Ok(Some(front)) if target.owns(&front) => {
                    log::info!("[ORCH] Click landed in {} (pid {})", front.name, front.pid);
                    return Ok(());
                }
                Ok(front) => log::debug!("[ORCH] Click outside destination: {:?}", front),
                Err(e) => log::debug!("[ORCH] Foreground query failed: {}", e),
            }
        }
        was_down = down;
    }
}

async fn read_button(foreground: &dyn ForegroundController) -> Result<bool, FailureReason> {
    foreground
        .primary_button_down()
        .await
        .map_err(|e| FailureReason::PointerUnavailable(e.to_string()))
}
