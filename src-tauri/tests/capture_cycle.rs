//! The full capture cycle through `Core`: hotkey, selection, capture,
//! clipboard, orchestration, and what overlapping triggers do.

mod common;

use common::{results, FakeClipboard, FakeKeyboard, FakeSelector, HarnessBuilder, MemoryPrefs};
use snip_relay_lib::capture::CaptureRegion;
use snip_relay_lib::config::AppConfig;
use snip_relay_lib::core::TriggerDisposition;
use snip_relay_lib::destination::{
    Destination, FailureReason, OrchestrationState, PasteOutcome,
};
use snip_relay_lib::events::{CoreEvent, ErrorKind};
use snip_relay_lib::hotkey::KeyCombo;
use snip_relay_lib::prefs::Preferences;
use std::time::Duration;

fn region() -> CaptureRegion {
    CaptureRegion::new(100, 100, 200, 150).unwrap()
}

fn editor_config() -> AppConfig {
    AppConfig {
        destination_override: Some(Destination::DesktopEditor),
        ..AppConfig::default()
    }
}

fn is_awaiting_click(event: &CoreEvent) -> bool {
    matches!(
        event,
        CoreEvent::OrchestrationStatus {
            state: OrchestrationState::AwaitingClick { .. },
            ..
        }
    )
}

fn is_cancelled(event: &CoreEvent) -> bool {
    matches!(
        event,
        CoreEvent::OrchestrationResult {
            outcome: PasteOutcome::Failed(FailureReason::Cancelled(_)),
            ..
        }
    )
}

// ── Happy path ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn hotkey_to_paste_in_web_chat() {
    let mut h = HarnessBuilder::default().build();
    h.core.start().await;

    h.keyboard.type_combo(&KeyCombo::default());
    assert_eq!(h.next_event().await, Some(CoreEvent::CaptureStarted));
    assert_eq!(h.selector.opens(), 1);

    h.core.on_region_selected(region()).await;
    let events = h.events_until_result().await;

    assert_eq!(
        events.first(),
        Some(&CoreEvent::CaptureReady {
            width: 200,
            height: 150
        })
    );
    assert_eq!(
        events.last(),
        Some(&CoreEvent::OrchestrationResult {
            destination: Destination::WebChat,
            outcome: PasteOutcome::Success,
        })
    );
    assert_eq!(*h.clipboard.published.lock().unwrap(), vec![(200, 150)]);
    assert_eq!(h.selector.closes(), 1);
    assert_eq!(h.foreground.pastes(), 1);

    // Back to idle: the next trigger opens a fresh selection.
    assert_eq!(h.core.on_hotkey_triggered().await, TriggerDisposition::Opened);
}

#[tokio::test(start_paused = true)]
async fn status_messages_name_the_destination() {
    let mut h = HarnessBuilder::default().build();
    h.core.start().await;
    h.core.on_hotkey_triggered().await;
    h.core.on_region_selected(region()).await;

    let events = h.events_until_result().await;
    let messages: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            CoreEvent::OrchestrationStatus { message, .. } => Some(message.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        messages,
        vec![
            "Opening ChatGPT...",
            "Waiting for ChatGPT to load...",
            "Pasting into ChatGPT...",
        ]
    );
}

// ── Cancellation and failures before orchestration ───────────────────

#[tokio::test(start_paused = true)]
async fn cancelled_selection_writes_nothing() {
    let mut h = HarnessBuilder::default().build();
    h.core.start().await;

    assert_eq!(h.core.on_hotkey_triggered().await, TriggerDisposition::Opened);
    h.core.on_region_cancelled();

    assert_eq!(h.selector.closes(), 1);
    assert_eq!(h.drain(), vec![CoreEvent::CaptureStarted]);
    assert!(h.next_event().await.is_none());
    assert_eq!(h.clipboard.writes(), 0);
    assert!(h.launcher.opened.lock().unwrap().is_empty());

    assert_eq!(h.core.on_hotkey_triggered().await, TriggerDisposition::Opened);
}

#[tokio::test(start_paused = true)]
async fn region_off_every_display_reports_no_screen_source() {
    let mut h = HarnessBuilder::default().build();
    h.core.start().await;
    h.core.on_hotkey_triggered().await;

    h.core
        .on_region_selected(CaptureRegion::new(5000, 5000, 10, 10).unwrap())
        .await;

    let events = h.drain();
    assert!(matches!(
        events.last(),
        Some(CoreEvent::Error {
            kind: ErrorKind::NoScreenSource,
            ..
        })
    ));
    assert_eq!(h.clipboard.writes(), 0);
    assert!(h.launcher.opened.lock().unwrap().is_empty());
    assert_eq!(h.core.on_hotkey_triggered().await, TriggerDisposition::Opened);
}

#[tokio::test(start_paused = true)]
async fn clipboard_failure_stops_before_orchestration() {
    let mut h = HarnessBuilder {
        clipboard: FakeClipboard {
            fails: true,
            ..Default::default()
        },
        ..Default::default()
    }
    .build();
    h.core.start().await;
    h.core.on_hotkey_triggered().await;
    h.core.on_region_selected(region()).await;

    let events = h.drain();
    assert!(matches!(
        events.last(),
        Some(CoreEvent::Error {
            kind: ErrorKind::ClipboardWriteFailed,
            ..
        })
    ));
    assert!(results(&events).is_empty());
    assert!(h.next_event().await.is_none());
    assert!(h.launcher.opened.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn region_without_selection_is_ignored() {
    let mut h = HarnessBuilder::default().build();
    h.core.start().await;

    h.core.on_region_selected(region()).await;

    assert!(h.next_event().await.is_none());
    assert_eq!(h.clipboard.writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn overlay_failure_returns_to_idle() {
    let mut h = HarnessBuilder {
        selector: FakeSelector {
            fails: true,
            ..Default::default()
        },
        ..Default::default()
    }
    .build();
    h.core.start().await;

    assert_eq!(h.core.on_hotkey_triggered().await, TriggerDisposition::Ignored);
    assert!(matches!(
        h.next_event().await,
        Some(CoreEvent::Error {
            kind: ErrorKind::SelectorFailed,
            ..
        })
    ));

    // Not stuck in Selecting: a region now is ignored rather than captured.
    h.core.on_region_selected(region()).await;
    assert_eq!(h.clipboard.writes(), 0);
}

// ── Overlapping triggers ─────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn trigger_during_capture_is_dropped() {
    let h = HarnessBuilder::default().build();
    h.core.start().await;
    h.core.on_hotkey_triggered().await;

    // The capture parks on the overlay hide delay before the second trigger.
    let ((), second) = tokio::join!(
        h.core.on_region_selected(region()),
        h.core.on_hotkey_triggered()
    );

    assert_eq!(second, TriggerDisposition::Ignored);
    assert_eq!(h.selector.opens(), 1);
    assert_eq!(*h.clipboard.published.lock().unwrap(), vec![(200, 150)]);
}

#[tokio::test(start_paused = true)]
async fn vanished_overlay_is_replaced_by_next_trigger() {
    let mut h = HarnessBuilder::default().build();
    h.core.start().await;
    assert_eq!(h.core.on_hotkey_triggered().await, TriggerDisposition::Opened);

    // The overlay went away without reporting a selection or a cancel.
    tokio::time::sleep(Duration::from_secs(3600)).await;

    assert_eq!(h.core.on_hotkey_triggered().await, TriggerDisposition::Reopened);
    assert_eq!(h.selector.opens(), 2);
    assert_eq!(h.selector.closes(), 1);
    assert_eq!(
        h.drain(),
        vec![CoreEvent::CaptureStarted, CoreEvent::CaptureStarted]
    );

    // The fresh overlay drives a normal cycle.
    h.core.on_region_selected(region()).await;
    let events = h.events_until_result().await;
    assert!(matches!(
        events.last(),
        Some(CoreEvent::OrchestrationResult {
            outcome: PasteOutcome::Success,
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn trigger_during_orchestration_cancels_run_once() {
    let mut h = HarnessBuilder {
        config: editor_config(),
        ..Default::default()
    }
    .build();
    h.core.start().await;
    h.core.on_hotkey_triggered().await;
    h.core.on_region_selected(region()).await;

    // No click is ever scripted, so the run parks in the click wait.
    let before = h.events_until(is_awaiting_click).await;
    assert!(results(&before).is_empty());

    assert_eq!(h.core.on_hotkey_triggered().await, TriggerDisposition::Superseded);

    let after = h.drain();
    assert_eq!(results(&after).len(), 1);
    assert!(is_cancelled(&after[0]), "{:?}", after);
    assert_eq!(after.last(), Some(&CoreEvent::CaptureStarted));
    assert_eq!(h.foreground.pastes(), 0);
    assert_eq!(h.selector.opens(), 2);

    // The cancelled run never reports again, even past its watchdog.
    h.core.on_region_cancelled();
    assert!(h.next_event().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_run_and_releases_hotkey() {
    let mut h = HarnessBuilder {
        config: editor_config(),
        ..Default::default()
    }
    .build();
    h.core.start().await;
    assert_eq!(h.keyboard.installed(), 1);
    h.core.on_hotkey_triggered().await;
    h.core.on_region_selected(region()).await;
    h.events_until(is_awaiting_click).await;

    h.core.shutdown().await;

    let after = h.drain();
    assert_eq!(results(&after).len(), 1);
    assert!(is_cancelled(&after[0]));
    assert_eq!(h.keyboard.installed(), 0);
    assert_eq!(h.core.on_hotkey_triggered().await, TriggerDisposition::Ignored);
}

#[tokio::test(start_paused = true)]
async fn shutdown_while_superseding_opens_nothing() {
    let mut h = HarnessBuilder {
        config: editor_config(),
        ..Default::default()
    }
    .build();
    h.core.start().await;
    h.core.on_hotkey_triggered().await;
    h.core.on_region_selected(region()).await;
    h.events_until(is_awaiting_click).await;

    // The trigger parks waiting for the old run to finish; shutdown lands then.
    let (disposition, ()) = tokio::join!(h.core.on_hotkey_triggered(), h.core.shutdown());

    assert_eq!(disposition, TriggerDisposition::Ignored);
    assert_eq!(h.selector.opens(), 1);
    let after = h.drain();
    assert_eq!(results(&after).len(), 1);
    assert!(is_cancelled(&after[0]), "{:?}", after);
    assert!(!after.contains(&CoreEvent::CaptureStarted), "{:?}", after);
}

#[tokio::test(start_paused = true)]
async fn editor_timeout_is_reported_as_timed_out_error() {
    let mut h = HarnessBuilder {
        config: editor_config(),
        ..Default::default()
    }
    .build();
    h.core.start().await;
    h.core.on_hotkey_triggered().await;
    h.core.on_region_selected(region()).await;

    // No click ever arrives.
    let events = h.events_until_result().await;
    let n = events.len();
    assert!(matches!(
        &events[n - 2],
        CoreEvent::Error {
            kind: ErrorKind::TimedOut,
            ..
        }
    ));
    assert!(matches!(
        &events[n - 1],
        CoreEvent::OrchestrationResult {
            outcome: PasteOutcome::TimedOut,
            ..
        }
    ));
    // The image stays available for a manual paste.
    assert_eq!(h.clipboard.writes(), 1);
}

// ── Preferences and hotkey binding ───────────────────────────────────

#[tokio::test(start_paused = true)]
async fn saved_preferences_apply_at_start() {
    let alt_k = KeyCombo::from_labels(&["Alt", "K"]).unwrap();
    let mut h = HarnessBuilder {
        prefs: MemoryPrefs::with(Preferences {
            hotkey: alt_k.clone(),
            destination: Destination::DesktopEditor,
        }),
        ..Default::default()
    }
    .build();
    h.core.start().await;

    assert_eq!(h.keyboard.hooks.lock().unwrap()[0].0, alt_k);
    assert_eq!(h.core.destination(), Destination::DesktopEditor);

    h.keyboard.type_combo(&KeyCombo::default());
    assert!(h.next_event().await.is_none());
    h.keyboard.type_combo(&alt_k);
    assert_eq!(h.next_event().await, Some(CoreEvent::CaptureStarted));
}

#[tokio::test(start_paused = true)]
async fn rebinding_persists_and_retires_old_combo() {
    let mut h = HarnessBuilder::default().build();
    h.core.start().await;

    let alt_k = KeyCombo::from_labels(&["Alt", "K"]).unwrap();
    h.core.on_hotkey_binding_changed(alt_k.clone()).unwrap();

    assert_eq!(h.prefs.stored().unwrap().hotkey, alt_k);
    assert_eq!(h.keyboard.installed(), 1);

    // Late events on the torn-down hook are ignored.
    h.keyboard.type_combo_on(0, &KeyCombo::default());
    assert!(h.next_event().await.is_none());

    h.keyboard.type_combo(&alt_k);
    assert_eq!(h.next_event().await, Some(CoreEvent::CaptureStarted));
}

#[tokio::test(start_paused = true)]
async fn refused_hook_is_reported_but_tray_still_works() {
    let mut h = HarnessBuilder {
        keyboard: FakeKeyboard {
            refuse: true,
            ..Default::default()
        },
        ..Default::default()
    }
    .build();
    h.core.start().await;

    assert!(matches!(
        h.next_event().await,
        Some(CoreEvent::Error {
            kind: ErrorKind::PermissionDenied,
            ..
        })
    ));
    assert_eq!(h.core.on_hotkey_triggered().await, TriggerDisposition::Opened);
}

#[tokio::test(start_paused = true)]
async fn destination_change_is_saved_and_clears_override() {
    let mut h = HarnessBuilder {
        config: editor_config(),
        ..Default::default()
    }
    .build();
    h.core.start().await;
    assert_eq!(h.core.destination(), Destination::DesktopEditor);
    assert_eq!(h.core.preferences().destination, Destination::WebChat);

    h.core.on_destination_changed(Destination::WebChat).unwrap();
    assert_eq!(h.core.destination(), Destination::WebChat);
    assert_eq!(h.prefs.stored().unwrap().destination, Destination::WebChat);

    h.core.on_hotkey_triggered().await;
    h.core.on_region_selected(region()).await;
    let events = h.events_until_result().await;
    assert!(matches!(
        events.last(),
        Some(CoreEvent::OrchestrationResult {
            destination: Destination::WebChat,
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn unwritable_preferences_surface_an_error() {
    let mut h = HarnessBuilder {
        prefs: MemoryPrefs {
            fails: true,
            ..Default::default()
        },
        ..Default::default()
    }
    .build();
    h.core.start().await;

    assert!(h.core.on_destination_changed(Destination::DesktopEditor).is_err());
    assert!(matches!(
        h.next_event().await,
        Some(CoreEvent::Error {
            kind: ErrorKind::PreferencesFailed,
            ..
        })
    ));
    // The choice still applies for this session.
    assert_eq!(h.core.destination(), Destination::DesktopEditor);
}
