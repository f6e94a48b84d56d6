//! Runtime configuration: destination profiles, timing knobs and
//! environment overrides.
//!
//! Persistent user choices (hotkey, destination) live in prefs.rs.
//! Everything here is rebuilt from defaults plus environment at startup.

use crate::destination::Destination;
use std::time::Duration;

/// Every wait the orchestrator performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorTimings {
    /// Pause after handing the URL to the browser, before the first poll.
    pub launch_delay: Duration,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
    /// Let the chat page finish rendering before pasting.
    pub web_settle: Duration,
    pub click_poll_interval: Duration,
    /// Pause between the user's click and the paste.
    pub click_settle: Duration,
    /// Ceiling on the editor click wait.
    pub click_watchdog: Duration,
    /// Ceiling on any one helper command (osascript, xdotool, ...).
    pub helper_timeout: Duration,
}

impl Default for OrchestratorTimings {
    fn default() -> Self {
        Self {
            launch_delay: Duration::from_millis(500),
            poll_interval: Duration::from_millis(500),
            poll_attempts: 60,
            web_settle: Duration::from_millis(800),
            click_poll_interval: Duration::from_millis(50),
            click_settle: Duration::from_millis(300),
            click_watchdog: Duration::from_secs(30),
            helper_timeout: Duration::from_secs(5),
        }
    }
}

impl OrchestratorTimings {
    /// Wall-clock ceiling for the window poll.
    pub fn poll_ceiling(&self) -> Duration {
        self.poll_interval * self.poll_attempts
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebChatProfile {
    pub display_name: String,
    pub url: String,
    /// Any window whose title contains one of these (case-insensitive) is the chat.
    pub window_titles: Vec<String>,
}

impl Default for WebChatProfile {
    fn default() -> Self {
        Self {
            display_name: "ChatGPT".to_string(),
            url: "https://chat.openai.com/".to_string(),
            window_titles: ["ChatGPT", "chat.openai.com", "New chat - ChatGPT", "OpenAI", "New chat"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorProfile {
    pub display_name: String,
    /// Executable names, compared case-insensitively without `.exe`.
    pub process_names: Vec<String>,
}

impl Default for EditorProfile {
    fn default() -> Self {
        Self {
            display_name: "Cursor".to_string(),
            process_names: vec!["Cursor".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub web_chat: WebChatProfile,
    pub editor: EditorProfile,
    pub timings: OrchestratorTimings,
    /// Custom browser command; `{url}` is replaced with the target URL.
    pub browser_command: Option<String>,
    /// Session-only destination that wins over the saved preference.
    pub destination_override: Option<Destination>,
    /// Time for the overlay to disappear before the screen is grabbed.
    pub overlay_hide_delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            web_chat: WebChatProfile::default(),
            editor: EditorProfile::default(),
            timings: OrchestratorTimings::default(),
            browser_command: None,
            destination_override: None,
            overlay_hide_delay: Duration::from_millis(150),
        }
    }
}

impl AppConfig {
    /// Defaults plus `SNIP_RELAY_*` overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// Invalid values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(raw) = get("SNIP_RELAY_DESTINATION") {
            match raw.parse::<Destination>() {
                Ok(dest) => {
                    log::info!("[CONFIG] Destination override: {}", dest);
                    config.destination_override = Some(dest);
                }
                Err(e) => log::warn!("[CONFIG] Ignoring SNIP_RELAY_DESTINATION: {}", e),
            }
        }

        if let Some(url) = get("SNIP_RELAY_CHAT_URL") {
            config.web_chat.url = url;
        }

        if let Some(raw) = get("SNIP_RELAY_EDITOR_PROCESS") {
            let names: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !names.is_empty() {
                config.editor.process_names = names;
            }
        }

        config.browser_command = get("SNIP_RELAY_BROWSER");

        if let Some(raw) = get("SNIP_RELAY_PASTE_TIMEOUT_SECS") {
            let parsed = raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .and_then(|secs| Some((secs, secs.checked_mul(1000)?)));
            match parsed {
                Some((secs, total_ms)) => {
                    config.timings.click_watchdog = Duration::from_secs(secs);
                    let interval_ms = config.timings.poll_interval.as_millis().max(1) as u64;
                    config.timings.poll_attempts =
                        (total_ms / interval_ms).clamp(1, u32::MAX as u64) as u32;
                }
                _ => log::warn!(
                    "[CONFIG] Ignoring SNIP_RELAY_PASTE_TIMEOUT_SECS={:?}: expected whole seconds > 0",
                    raw
                ),
            }
        }

        config
    }
}

/// Load `.env.local` then `.env` from the working directory, first match wins.
pub fn load_env_files() {
    'env_load: for env_file in [".env.local", ".env"] {
        let path = std::path::Path::new(env_file);
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => eprintln!("[STARTUP] Loaded {}", path.display()),
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
            break 'env_load;
        }
    }
}
