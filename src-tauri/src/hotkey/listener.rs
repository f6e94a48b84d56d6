//! Hotkey listener lifecycle: install a hook, feed a monitor, emit triggers.
//!
//! Rebinding tears the whole thing down and builds a new hook + monitor.
//! Every binding gets a generation number; events from a torn-down hook
//! and triggers computed under an old binding are discarded by comparing
//! generations, so a trigger never mixes two bindings.

use super::combo::KeyCombo;
use super::monitor::{HotkeyMonitor, KeyEvent};
use super::HotkeyError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Callback the OS hook invokes for every key event. May be called from
/// any thread.
pub type KeyEventSink = Arc<dyn Fn(KeyEvent) + Send + Sync>;

/// Uninstalls a hook when dropped.
pub struct HookGuard {
    uninstall: Option<Box<dyn FnOnce() + Send>>,
}

impl HookGuard {
    pub fn new(uninstall: impl FnOnce() + Send + 'static) -> Self {
        Self {
            uninstall: Some(Box::new(uninstall)),
        }
    }

    /// A guard with nothing to release.
    pub fn noop() -> Self {
        Self { uninstall: None }
    }
}

impl Drop for HookGuard {
    fn drop(&mut self) {
        if let Some(uninstall) = self.uninstall.take() {
            uninstall();
        }
    }
}

/// A system-wide key event source.
pub trait KeyHook: Send + Sync {
    /// Start delivering key events relevant to `combo` into `sink`.
    ///
    /// Fails with `HotkeyError::PermissionDenied` when the OS refuses the hook.
    fn install(&self, combo: &KeyCombo, sink: KeyEventSink) -> Result<HookGuard, HotkeyError>;
}

/// Emitted once per completed combo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyTrigger {
    pub generation: u64,
    pub combo: KeyCombo,
}

struct ActiveBinding {
    combo: KeyCombo,
    _guard: HookGuard,
}

pub struct HotkeyListener {
    hook: Arc<dyn KeyHook>,
    triggers: mpsc::UnboundedSender<HotkeyTrigger>,
    generation: Arc<AtomicU64>,
    active: Option<ActiveBinding>,
}

impl HotkeyListener {
    pub fn new(hook: Arc<dyn KeyHook>, triggers: mpsc::UnboundedSender<HotkeyTrigger>) -> Self {
        Self {
            hook,
            triggers,
            generation: Arc::new(AtomicU64::new(0)),
            active: None,
        }
    }

    /// Replace the active binding. The previous hook is uninstalled first;
    /// the new monitor starts with an empty key state.
    pub fn bind(&mut self, combo: KeyCombo) -> Result<(), HotkeyError> {
        self.unbind();

        let generation = self.generation.load(Ordering::SeqCst);
        let monitor = Mutex::new(HotkeyMonitor::new(combo.clone()));
        let current = Arc::clone(&self.generation);
        let triggers = self.triggers.clone();
        let trigger_combo = combo.clone();

        let sink: KeyEventSink = Arc::new(move |event: KeyEvent| {
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            let fired = match monitor.lock() {
                Ok(mut m) => m.handle(event),
                Err(_) => return,
            };
            if fired {
                log::info!("[HOTKEY] {} pressed", trigger_combo);
                let _ = triggers.send(HotkeyTrigger {
                    generation,
                    combo: trigger_combo.clone(),
                });
            }
        });

        let guard = self.hook.install(&combo, sink)?;
        log::info!("[HOTKEY] Listening for {} (generation {})", combo, generation);
        self.active = Some(ActiveBinding {
            combo,
            _guard: guard,
        });
        Ok(())
    }

    /// Uninstall the current hook, if any. Pending events from it are
    /// discarded.
    pub fn unbind(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(active) = self.active.take() {
            log::info!("[HOTKEY] Released {}", active.combo);
        }
    }

    pub fn combo(&self) -> Option<&KeyCombo> {
        self.active.as_ref().map(|a| &a.combo)
    }

    /// Whether `trigger` was produced by the binding that is active now.
    pub fn is_current(&self, trigger: &HotkeyTrigger) -> bool {
        self.active.is_some() && trigger.generation == self.generation.load(Ordering::SeqCst)
    }
}
