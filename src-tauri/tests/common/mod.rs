//! Shared fakes for the integration tests.
//!
//! Every OS-facing seam gets a scripted stand-in that records what was
//! asked of it, so tests can assert both outcomes and side effects.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use snip_relay_lib::capture::{CaptureError, CapturedImage, DisplayGeometry, Frame, FrameSource};
use snip_relay_lib::clipboard::{ClipboardError, ClipboardPublisher};
use snip_relay_lib::config::AppConfig;
use snip_relay_lib::core::{Collaborators, Core, RegionSelector, SelectorError};
use snip_relay_lib::events::CoreEvent;
use snip_relay_lib::hotkey::{
    HookGuard, HotkeyError, KeyCombo, KeyEvent, KeyEventSink, KeyHook, PhysicalKey,
};
use snip_relay_lib::platform::{
    Automation, ForegroundController, PlatformError, ProcessIdentity, ProcessProbe, UrlLauncher,
    WindowLocator,
};
use snip_relay_lib::prefs::{PreferenceStore, Preferences, PrefsError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// ── Platform fakes ───────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeLauncher {
    pub fails: bool,
    pub opened: Mutex<Vec<String>>,
}

#[async_trait]
impl UrlLauncher for FakeLauncher {
    async fn open_url(&self, url: &str) -> Result<(), PlatformError> {
        if self.fails {
            return Err(PlatformError::HelperMissing("xdg-open".into()));
        }
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Reports `titles` from the `appear_after`-th call on; before that only
/// an unrelated window is open.
pub struct FakeLocator {
    pub name: String,
    pub titles: Vec<String>,
    pub appear_after: usize,
    pub fails: bool,
    pub calls: AtomicUsize,
}

impl FakeLocator {
    pub fn showing(titles: &[&str], appear_after: usize) -> Self {
        Self {
            name: "fake-windows".into(),
            titles: titles.iter().map(|t| t.to_string()).collect(),
            appear_after,
            fails: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn never() -> Self {
        Self::showing(&[], 0)
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: name.into(),
            titles: Vec::new(),
            appear_after: 0,
            fails: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WindowLocator for FakeLocator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn window_titles(&self) -> Result<Vec<String>, PlatformError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fails {
            return Err(PlatformError::CommandFailed {
                program: self.name.clone(),
                message: "cannot open display".into(),
            });
        }
        let mut titles = vec!["Terminal".to_string()];
        if call >= self.appear_after {
            titles.extend(self.titles.iter().cloned());
        }
        Ok(titles)
    }
}

pub struct FakeProbe {
    pub name: String,
    pub result: Result<Vec<ProcessIdentity>, String>,
    pub calls: AtomicUsize,
}

impl FakeProbe {
    pub fn finding(processes: Vec<ProcessIdentity>) -> Self {
        Self {
            name: "fake-probe".into(),
            result: Ok(processes),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: name.into(),
            result: Err("process table unavailable".into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessProbe for FakeProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, _names: &[String]) -> Result<Vec<ProcessIdentity>, PlatformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(PlatformError::Native)
    }
}

/// Button reads come from `buttons` in order; once the script runs out
/// the button stays up.
#[derive(Default)]
pub struct FakeForeground {
    pub activate_fails: bool,
    pub pointer_fails: bool,
    pub paste_fails: bool,
    pub front: Mutex<Option<ProcessIdentity>>,
    pub buttons: Mutex<VecDeque<bool>>,
    pub activated_titles: Mutex<Vec<String>>,
    pub activated_pids: Mutex<Vec<u32>>,
    pub button_reads: AtomicUsize,
    pub pastes: AtomicUsize,
}

impl FakeForeground {
    pub fn with_front(front: ProcessIdentity) -> Self {
        Self {
            front: Mutex::new(Some(front)),
            ..Default::default()
        }
    }

    pub fn script_buttons(&self, states: &[bool]) {
        self.buttons.lock().unwrap().extend(states.iter().copied());
    }

    pub fn pastes(&self) -> usize {
        self.pastes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ForegroundController for FakeForeground {
    async fn activate_window_titled(&self, title: &str) -> Result<(), PlatformError> {
        self.activated_titles.lock().unwrap().push(title.to_string());
        Ok(())
    }

    async fn activate_process(&self, pid: u32) -> Result<(), PlatformError> {
        self.activated_pids.lock().unwrap().push(pid);
        if self.activate_fails {
            return Err(PlatformError::Native("SetForegroundWindow refused".into()));
        }
        Ok(())
    }

    async fn foreground_process(&self) -> Result<Option<ProcessIdentity>, PlatformError> {
        Ok(self.front.lock().unwrap().clone())
    }

    async fn primary_button_down(&self) -> Result<bool, PlatformError> {
        self.button_reads.fetch_add(1, Ordering::SeqCst);
        if self.pointer_fails {
            return Err(PlatformError::Native("no pointer device".into()));
        }
        Ok(self.buttons.lock().unwrap().pop_front().unwrap_or(false))
    }

    async fn send_paste(&self) -> Result<(), PlatformError> {
        if self.paste_fails {
            return Err(PlatformError::Injection("input blocked".into()));
        }
        self.pastes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn automation(
    launcher: Arc<FakeLauncher>,
    locators: Vec<Arc<FakeLocator>>,
    probes: Vec<Arc<FakeProbe>>,
    foreground: Arc<FakeForeground>,
) -> Automation {
    Automation {
        launcher,
        locators: locators.into_iter().map(|l| l as Arc<dyn WindowLocator>).collect(),
        probes: probes.into_iter().map(|p| p as Arc<dyn ProcessProbe>).collect(),
        foreground,
    }
}

// ── Core collaborator fakes ──────────────────────────────────────────

pub fn primary_display() -> DisplayGeometry {
    DisplayGeometry {
        id: 1,
        x: 0,
        y: 0,
        width: 1920,
        height: 1080,
    }
}

pub struct FakeScreen;

impl FrameSource for FakeScreen {
    fn displays(&self) -> Result<Vec<DisplayGeometry>, CaptureError> {
        Ok(vec![primary_display()])
    }

    fn grab(&self, display: &DisplayGeometry) -> Result<Frame, CaptureError> {
        Ok(Frame {
            image: RgbaImage::from_pixel(display.width, display.height, Rgba([10, 20, 30, 255])),
            display: *display,
        })
    }
}

#[derive(Default)]
pub struct FakeClipboard {
    pub fails: bool,
    pub published: Mutex<Vec<(u32, u32)>>,
}

impl FakeClipboard {
    pub fn writes(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

impl ClipboardPublisher for FakeClipboard {
    fn publish(&self, image: &CapturedImage) -> Result<(), ClipboardError> {
        if self.fails {
            return Err(ClipboardError::WriteFailed("clipboard owned by another app".into()));
        }
        self.published
            .lock()
            .unwrap()
            .push((image.width(), image.height()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSelector {
    pub fails: bool,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
}

impl FakeSelector {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl RegionSelector for FakeSelector {
    fn open(&self) -> Result<(), SelectorError> {
        if self.fails {
            return Err(SelectorError("no webview".into()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MemoryPrefs {
    pub stored: Mutex<Option<Preferences>>,
    pub saves: AtomicUsize,
    pub fails: bool,
}

impl MemoryPrefs {
    pub fn with(prefs: Preferences) -> Self {
        Self {
            stored: Mutex::new(Some(prefs)),
            ..Default::default()
        }
    }

    pub fn stored(&self) -> Option<Preferences> {
        self.stored.lock().unwrap().clone()
    }
}

impl PreferenceStore for MemoryPrefs {
    fn load(&self) -> Option<Preferences> {
        self.stored()
    }

    fn save(&self, prefs: &Preferences) -> Result<(), PrefsError> {
        if self.fails {
            return Err(PrefsError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only config dir",
            )));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.stored.lock().unwrap() = Some(prefs.clone());
        Ok(())
    }
}

/// Hands out the installed sinks so tests can type on a fake keyboard.
#[derive(Default)]
pub struct FakeKeyboard {
    pub refuse: bool,
    pub hooks: Mutex<Vec<(KeyCombo, KeyEventSink)>>,
    pub installed: Arc<AtomicUsize>,
}

impl FakeKeyboard {
    /// Press and release `combo` on the most recently installed hook.
    pub fn type_combo(&self, combo: &KeyCombo) {
        let latest = self.hooks.lock().unwrap().len().saturating_sub(1);
        self.type_combo_on(latest, combo);
    }

    /// Press and release `combo` on the `index`-th hook ever installed,
    /// whether or not it has been torn down since.
    pub fn type_combo_on(&self, index: usize, combo: &KeyCombo) {
        let sink = match self.hooks.lock().unwrap().get(index) {
            Some((_, sink)) => sink.clone(),
            None => return,
        };
        let keys: Vec<PhysicalKey> = combo
            .modifiers()
            .map(PhysicalKey::left)
            .chain(std::iter::once(PhysicalKey::new(combo.terminal())))
            .collect();
        for key in &keys {
            sink(KeyEvent::down(*key));
        }
        for key in keys.iter().rev() {
            sink(KeyEvent::up(*key));
        }
    }

    pub fn installed(&self) -> usize {
        self.installed.load(Ordering::SeqCst)
    }
}

impl KeyHook for FakeKeyboard {
    fn install(&self, combo: &KeyCombo, sink: KeyEventSink) -> Result<HookGuard, HotkeyError> {
        if self.refuse {
            return Err(HotkeyError::PermissionDenied("accessibility access not granted".into()));
        }
        self.hooks.lock().unwrap().push((combo.clone(), sink));
        self.installed.fetch_add(1, Ordering::SeqCst);
        let installed = Arc::clone(&self.installed);
        Ok(HookGuard::new(move || {
            installed.fetch_sub(1, Ordering::SeqCst);
        }))
    }
}

// ── Core harness ─────────────────────────────────────────────────────

pub struct Harness {
    pub core: Core,
    pub events: mpsc::UnboundedReceiver<CoreEvent>,
    pub selector: Arc<FakeSelector>,
    pub clipboard: Arc<FakeClipboard>,
    pub prefs: Arc<MemoryPrefs>,
    pub keyboard: Arc<FakeKeyboard>,
    pub launcher: Arc<FakeLauncher>,
    pub locator: Arc<FakeLocator>,
    pub probe: Arc<FakeProbe>,
    pub foreground: Arc<FakeForeground>,
}

/// Fakes for a desktop where the chat window appears on the second poll
/// and the editor is running as pid 42 and owns the foreground.
pub struct HarnessBuilder {
    pub config: AppConfig,
    pub selector: FakeSelector,
    pub clipboard: FakeClipboard,
    pub prefs: MemoryPrefs,
    pub keyboard: FakeKeyboard,
    pub locator: FakeLocator,
    pub foreground: FakeForeground,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            selector: FakeSelector::default(),
            clipboard: FakeClipboard::default(),
            prefs: MemoryPrefs::default(),
            keyboard: FakeKeyboard::default(),
            locator: FakeLocator::showing(&["ChatGPT - Google Chrome"], 1),
            foreground: FakeForeground::with_front(ProcessIdentity::new(42, "Cursor")),
        }
    }
}

impl HarnessBuilder {
    pub fn build(self) -> Harness {
        let selector = Arc::new(self.selector);
        let clipboard = Arc::new(self.clipboard);
        let prefs = Arc::new(self.prefs);
        let keyboard = Arc::new(self.keyboard);
        let launcher = Arc::new(FakeLauncher::default());
        let locator = Arc::new(self.locator);
        let probe = Arc::new(FakeProbe::finding(vec![ProcessIdentity::new(42, "Cursor")]));
        let foreground = Arc::new(self.foreground);

        let collaborators = Collaborators {
            frames: Arc::new(FakeScreen),
            clipboard: clipboard.clone(),
            selector: selector.clone(),
            prefs: prefs.clone(),
            key_hook: keyboard.clone(),
            automation: automation(
                launcher.clone(),
                vec![locator.clone()],
                vec![probe.clone()],
                foreground.clone(),
            ),
        };
        let (core, events) = Core::new(collaborators, self.config);

        Harness {
            core,
            events,
            selector,
            clipboard,
            prefs,
            keyboard,
            launcher,
            locator,
            probe,
            foreground,
        }
    }
}

impl Harness {
    /// Next event, or `None` if nothing arrives within a minute of
    /// (virtual) time.
    pub async fn next_event(&mut self) -> Option<CoreEvent> {
        tokio::time::timeout(Duration::from_secs(60), self.events.recv())
            .await
            .ok()
            .flatten()
    }

    /// Collect events up to and including the next orchestration result.
    pub async fn events_until_result(&mut self) -> Vec<CoreEvent> {
        let mut seen = Vec::new();
        while let Some(event) = self.next_event().await {
            let done = matches!(event, CoreEvent::OrchestrationResult { .. });
            seen.push(event);
            if done {
                break;
            }
        }
        seen
    }

    /// Collect events up to and including the first one matching `done`.
    pub async fn events_until(&mut self, done: impl Fn(&CoreEvent) -> bool) -> Vec<CoreEvent> {
        let mut seen = Vec::new();
        while let Some(event) = self.next_event().await {
            let stop = done(&event);
            seen.push(event);
            if stop {
                break;
            }
        }
        seen
    }

    /// Drain whatever is queued right now.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            seen.push(event);
        }
        seen
    }
}

pub fn results(events: &[CoreEvent]) -> Vec<&CoreEvent> {
    events
        .iter()
        .filter(|e| matches!(e, CoreEvent::OrchestrationResult { .. }))
        .collect()
}
