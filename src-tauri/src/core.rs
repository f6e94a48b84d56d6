//! The capture cycle: hotkey → selection → capture → clipboard → paste.
//!
//! `Core` is the single process-wide coordinator. The app shell feeds it
//! UI events (`on_*` methods) and receives `CoreEvent`s on the channel
//! returned by `Core::new`. One cycle runs at a time; the phase guard
//! below decides what a new trigger does to a cycle already in flight.

use crate::capture::{CaptureRegion, FrameCapturer, FrameSource};
use crate::clipboard::ClipboardPublisher;
use crate::config::AppConfig;
use crate::destination::{
    Destination, DestinationOrchestrator, OrchestrationEvent, PasteOutcome,
};
use crate::events::{CoreEvent, ErrorKind};
use crate::hotkey::{HotkeyError, HotkeyListener, HotkeyTrigger, KeyCombo, KeyHook};
use crate::platform::Automation;
use crate::prefs::{PreferenceStore, Preferences, PrefsError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Full-screen overlay the user drags a rectangle on.
///
/// The result comes back through `Core::on_region_selected` or
/// `Core::on_region_cancelled`.
pub trait RegionSelector: Send + Sync {
    fn open(&self) -> Result<(), SelectorError>;

    /// Hide the overlay. Must be idempotent.
    fn close(&self);
}

#[derive(Debug, thiserror::Error)]
#[error("Selection overlay failed: {0}")]
pub struct SelectorError(pub String);

/// Everything the core talks to.
pub struct Collaborators {
    pub frames: Arc<dyn FrameSource>,
    pub clipboard: Arc<dyn ClipboardPublisher>,
    pub selector: Arc<dyn RegionSelector>,
    pub prefs: Arc<dyn PreferenceStore>,
    pub key_hook: Arc<dyn KeyHook>,
    pub automation: Automation,
}

/// What a hotkey trigger did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerDisposition {
    /// The selection overlay opened.
    Opened,
    /// A selection was already open; its overlay was replaced.
    Reopened,
    /// An orchestration run was cancelled, then the overlay opened.
    Superseded,
    /// A capture was in progress, the app is shutting down, or the overlay
    /// failed to open; nothing happened.
    Ignored,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Prefs(#[from] PrefsError),

    #[error(transparent)]
    Hotkey(#[from] HotkeyError),
}

enum TriggerStep {
    Open,
    Reopen,
    Supersede(RunHandle),
}

struct RunHandle {
    id: u64,
    cancel: oneshot::Sender<String>,
    done: JoinHandle<()>,
}

enum Phase {
    Idle,
    Selecting,
    Capturing,
    Orchestrating(RunHandle),
    /// A run is being torn down so a new selection can start.
    Cancelling,
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Selecting => "selecting",
            Phase::Capturing => "capturing",
            Phase::Orchestrating(_) => "orchestrating",
            Phase::Cancelling => "cancelling",
        }
    }
}

struct Shared {
    config: AppConfig,
    events: mpsc::UnboundedSender<CoreEvent>,
    capturer: FrameCapturer,
    clipboard: Arc<dyn ClipboardPublisher>,
    selector: Arc<dyn RegionSelector>,
    store: Arc<dyn PreferenceStore>,
    orchestrator: DestinationOrchestrator,
    prefs: Mutex<Preferences>,
    destination_override: Mutex<Option<Destination>>,
    listener: Mutex<HotkeyListener>,
    triggers: Mutex<Option<mpsc::UnboundedReceiver<HotkeyTrigger>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    phase: Mutex<Phase>,
    next_run_id: AtomicU64,
    stopped: AtomicBool,
}

/// Cheap to clone; all clones drive the same cycle.
#[derive(Clone)]
pub struct Core {
    shared: Arc<Shared>,
}

/// Poisoning only happens if a holder panicked; the state is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Core {
    pub fn new(collaborators: Collaborators, config: AppConfig) -> (Core, mpsc::UnboundedReceiver<CoreEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();

        let shared = Shared {
            orchestrator: DestinationOrchestrator::new(collaborators.automation, &config),
            destination_override: Mutex::new(config.destination_override),
            config,
            events: events_tx,
            capturer: FrameCapturer::new(collaborators.frames),
            clipboard: collaborators.clipboard,
            selector: collaborators.selector,
            store: collaborators.prefs,
            prefs: Mutex::new(Preferences::default()),
            listener: Mutex::new(HotkeyListener::new(collaborators.key_hook, trigger_tx)),
            triggers: Mutex::new(Some(trigger_rx)),
            pump: Mutex::new(None),
            phase: Mutex::new(Phase::Idle),
            next_run_id: AtomicU64::new(1),
            stopped: AtomicBool::new(false),
        };

        (
            Core {
                shared: Arc::new(shared),
            },
            events_rx,
        )
    }

    /// Load preferences, bind the hotkey and start listening for triggers.
    ///
    /// A refused hotkey hook is reported as a `PermissionDenied` error
    /// event; the app stays usable through the tray.
    pub async fn start(&self) {
        let prefs = self.shared.store.load().unwrap_or_default();
        log::info!(
            "[CORE] Starting with hotkey={} destination={}",
            prefs.hotkey,
            prefs.destination
        );
        let combo = prefs.hotkey.clone();
        *lock(&self.shared.prefs) = prefs;

        self.bind_hotkey(combo);

        let Some(mut triggers) = lock(&self.shared.triggers).take() else {
            log::warn!("[CORE] start() called twice; ignoring");
            return;
        };
        let core = self.clone();
        let pump = tokio::spawn(async move {
            while let Some(trigger) = triggers.recv().await {
                let current = lock(&core.shared.listener).is_current(&trigger);
                if !current {
                    log::debug!("[CORE] Dropping trigger from stale binding {}", trigger.combo);
                    continue;
                }
                core.on_hotkey_triggered().await;
            }
        });
        *lock(&self.shared.pump) = Some(pump);
    }

    /// Release the hotkey and cancel whatever is in flight.
    pub async fn shutdown(&self) {
        if self.shared.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!("[CORE] Shutting down");
        lock(&self.shared.listener).unbind();
        if let Some(pump) = lock(&self.shared.pump).take() {
            pump.abort();
        }

        let previous = std::mem::replace(&mut *lock(&self.shared.phase), Phase::Idle);
        match previous {
            Phase::Orchestrating(run) => self.cancel_run(run, "app is shutting down").await,
            Phase::Selecting => self.shared.selector.close(),
            _ => {}
        }
    }

    /// Hotkey pressed (or tray "Snip Screen").
    ///
    /// Dropped while a capture is in progress. A selection already open is
    /// replaced by a fresh overlay, so an overlay that vanished without
    /// reporting back cannot wedge the cycle. An in-flight orchestration is
    /// cancelled first; its `Failed(Cancelled)` outcome is emitted before
    /// the new overlay opens.
    pub async fn on_hotkey_triggered(&self) -> TriggerDisposition {
        if self.shared.stopped.load(Ordering::SeqCst) {
            return TriggerDisposition::Ignored;
        }

        let step = {
            let mut phase = lock(&self.shared.phase);
            match std::mem::replace(&mut *phase, Phase::Cancelling) {
                Phase::Idle => {
                    *phase = Phase::Selecting;
                    TriggerStep::Open
                }
                Phase::Selecting => {
                    *phase = Phase::Selecting;
                    TriggerStep::Reopen
                }
                Phase::Orchestrating(run) => TriggerStep::Supersede(run),
                busy => {
                    log::info!("[CORE] Trigger ignored: {} in progress", busy.name());
                    *phase = busy;
                    return TriggerDisposition::Ignored;
                }
            }
        };

        let disposition = match step {
            TriggerStep::Open => TriggerDisposition::Opened,
            TriggerStep::Reopen => {
                log::info!("[CORE] Selection restarted with a fresh overlay");
                self.shared.selector.close();
                TriggerDisposition::Reopened
            }
            TriggerStep::Supersede(run) => {
                log::info!("[CORE] New capture supersedes run {}", run.id);
                self.cancel_run(run, "superseded by a new capture").await;
                let mut phase = lock(&self.shared.phase);
                let stopped = self.shared.stopped.load(Ordering::SeqCst);
                if stopped || !matches!(*phase, Phase::Cancelling) {
                    log::info!("[CORE] Shut down while cancelling; not opening a selection");
                    return TriggerDisposition::Ignored;
                }
                *phase = Phase::Selecting;
                TriggerDisposition::Superseded
            }
        };

        match self.shared.selector.open() {
            Ok(()) => {
                self.emit(CoreEvent::CaptureStarted);
                disposition
            }
            Err(e) => {
                log::error!("[CORE] {}", e);
                self.set_phase_if_selecting(Phase::Idle);
                self.emit(CoreEvent::error(ErrorKind::SelectorFailed, e.to_string()));
                TriggerDisposition::Ignored
            }
        }
    }

    /// The user drew a rectangle (physical pixels).
    pub async fn on_region_selected(&self, region: CaptureRegion) {
        {
            let mut phase = lock(&self.shared.phase);
            if !matches!(*phase, Phase::Selecting) {
                log::warn!("[CORE] Region ignored while {}", phase.name());
                return;
            }
            *phase = Phase::Capturing;
        }

        self.shared.selector.close();
        tokio::time::sleep(self.shared.config.overlay_hide_delay).await;

        let shared = Arc::clone(&self.shared);
        let captured = tokio::task::spawn_blocking(move || {
            let image = shared
                .capturer
                .capture(&region)
                .map_err(|e| (e.kind(), e.to_string()))?;
            shared
                .clipboard
                .publish(&image)
                .map_err(|e| (e.kind(), e.to_string()))?;
            Ok::<_, (ErrorKind, String)>((image.width(), image.height()))
        })
        .await
        .unwrap_or_else(|e| Err((ErrorKind::CaptureFailed, format!("capture task failed: {}", e))));

        let (width, height) = match captured {
            Ok(size) => size,
            Err((kind, message)) => {
                log::error!("[CORE] Capture failed ({:?}): {}", kind, message);
                if self.set_phase_if_capturing(Phase::Idle) {
                    self.emit(CoreEvent::error(kind, message));
                }
                return;
            }
        };

        let destination = self.destination();
        let mut phase = lock(&self.shared.phase);
        if !matches!(*phase, Phase::Capturing) {
            // Shut down while the capture was running.
            return;
        }
        self.emit(CoreEvent::CaptureReady { width, height });
        *phase = Phase::Orchestrating(self.spawn_run(destination));
    }

    /// The user dismissed the overlay. No capture, no clipboard write.
    pub fn on_region_cancelled(&self) {
        if self.set_phase_if_selecting(Phase::Idle) {
            log::info!("[CORE] Selection cancelled");
            self.shared.selector.close();
        }
    }

    /// Persist a new destination. Applies to the next run; also clears any
    /// session override from the environment.
    pub fn on_destination_changed(&self, destination: Destination) -> Result<(), CoreError> {
        *lock(&self.shared.destination_override) = None;
        let prefs = {
            let mut prefs = lock(&self.shared.prefs);
            prefs.destination = destination;
            prefs.clone()
        };
        self.persist(&prefs)?;
        Ok(())
    }

    /// Persist a new hotkey, then rebuild the listener around it.
    pub fn on_hotkey_binding_changed(&self, combo: KeyCombo) -> Result<(), CoreError> {
        let prefs = {
            let mut prefs = lock(&self.shared.prefs);
            prefs.hotkey = combo.clone();
            prefs.clone()
        };
        self.persist(&prefs)?;
        if self.shared.stopped.load(Ordering::SeqCst) {
            return Ok(());
        }
        let bound = lock(&self.shared.listener).bind(combo);
        bound.map_err(|e| {
            self.report_hotkey_error(&e);
            CoreError::from(e)
        })
    }

    /// Saved preferences.
    pub fn preferences(&self) -> Preferences {
        lock(&self.shared.prefs).clone()
    }

    /// Destination the next run will use: the session override if set,
    /// otherwise the saved preference.
    pub fn destination(&self) -> Destination {
        let override_dest = *lock(&self.shared.destination_override);
        override_dest.unwrap_or_else(|| lock(&self.shared.prefs).destination)
    }

    fn bind_hotkey(&self, combo: KeyCombo) {
        let bound = lock(&self.shared.listener).bind(combo);
        if let Err(e) = bound {
            self.report_hotkey_error(&e);
        }
    }

    fn report_hotkey_error(&self, e: &HotkeyError) {
        log::warn!("[HOTKEY] Hotkey disabled: {}", e);
        let kind = match e {
            HotkeyError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            _ => ErrorKind::PreferencesFailed,
        };
        self.emit(CoreEvent::error(kind, format!("Hotkey disabled: {}", e)));
    }

    fn persist(&self, prefs: &Preferences) -> Result<(), PrefsError> {
        self.shared.store.save(prefs).map_err(|e| {
            log::error!("[PREFS] {}", e);
            self.emit(CoreEvent::error(e.kind(), e.to_string()));
            e
        })
    }

    /// Spawn one orchestration run. Call with the phase lock held so the
    /// run cannot finish before its handle is stored.
    fn spawn_run(&self, destination: Destination) -> RunHandle {
        let id = self.shared.next_run_id.fetch_add(1, Ordering::SeqCst);
        let (cancel_tx, cancel_rx) = oneshot::channel::<String>();
        let shared = Arc::clone(&self.shared);

        let done = tokio::spawn(async move {
            let name = shared.orchestrator.display_name(destination).to_string();
            let events = shared.events.clone();
            let progress_name = name.clone();
            let progress = move |event: OrchestrationEvent| {
                let core_event = match event {
                    OrchestrationEvent::Status(state) => CoreEvent::OrchestrationStatus {
                        destination,
                        message: state.message(&progress_name),
                        state,
                    },
                    OrchestrationEvent::Warning(kind, message) => CoreEvent::error(kind, message),
                };
                let _ = events.send(core_event);
            };

            let outcome = tokio::select! {
                biased;
                reason = cancel_rx => {
                    let reason = reason.unwrap_or_else(|_| "cancelled".to_string());
                    log::info!("[CORE] Run {} cancelled: {}", id, reason);
                    PasteOutcome::cancelled(reason)
                }
                outcome = shared.orchestrator.run(destination, &progress) => outcome,
            };

            if let Some(kind) = outcome.error_kind() {
                let _ = shared.events.send(CoreEvent::error(kind, outcome.describe(&name)));
            }
            let _ = shared.events.send(CoreEvent::OrchestrationResult {
                destination,
                outcome,
            });

            let mut phase = lock(&shared.phase);
            if matches!(&*phase, Phase::Orchestrating(run) if run.id == id) {
                *phase = Phase::Idle;
            }
        });

        RunHandle {
            id,
            cancel: cancel_tx,
            done,
        }
    }

    /// Cancel a run and wait until its single outcome has been emitted.
    async fn cancel_run(&self, run: RunHandle, reason: &str) {
        let _ = run.cancel.send(reason.to_string());
        if let Err(e) = run.done.await {
            log::error!("[CORE] Run {} task failed: {}", run.id, e);
            self.emit(CoreEvent::OrchestrationResult {
                destination: self.destination(),
                outcome: PasteOutcome::cancelled(reason),
            });
        }
    }

    fn set_phase_if_selecting(&self, next: Phase) -> bool {
        let mut phase = lock(&self.shared.phase);
        if matches!(*phase, Phase::Selecting) {
            *phase = next;
            true
        } else {
            false
        }
    }

    fn set_phase_if_capturing(&self, next: Phase) -> bool {
        let mut phase = lock(&self.shared.phase);
        if matches!(*phase, Phase::Capturing) {
            *phase = next;
            true
        } else {
            false
        }
    }

    fn emit(&self, event: CoreEvent) {
        log::debug!("[CORE] -> {:?}", event);
        let _ = self.shared.events.send(event);
    }
}
