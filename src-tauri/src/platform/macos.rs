//! macOS automation via AppleScript (System Events) and AppKit.
//!
//! System Events needs the Accessibility permission. Without it the
//! window locator errors and the browser-tab locator takes over.

use super::command::run_helper_ok;
use super::{ForegroundController, PlatformError, ProcessIdentity, WindowLocator};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub(super) fn automation(
    timeout: Duration,
) -> (Vec<Arc<dyn WindowLocator>>, Arc<dyn ForegroundController>) {
    let locators: Vec<Arc<dyn WindowLocator>> = vec![
        Arc::new(SystemEventsLocator { timeout }),
        Arc::new(BrowserTabLocator { timeout }),
    ];
    let foreground: Arc<dyn ForegroundController> = Arc::new(MacForeground { timeout });
    (locators, foreground)
}

async fn osascript(script: &str, timeout: Duration) -> Result<String, PlatformError> {
    run_helper_ok("osascript", &["-e", script], timeout).await
}

/// AppleScript string literal for `s`.
fn applescript_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

const LIST_WINDOWS: &str = r#"
set out to ""
tell application "System Events"
    repeat with p in (every process whose visible is true)
        repeat with w in (every window of p)
            set out to out & (name of w as text) & linefeed
        end repeat
    end repeat
end tell
return out
"#;

const LIST_BROWSER_TABS: &str = r#"
set out to ""
if application "Google Chrome" is running then
    tell application "Google Chrome"
        repeat with w in windows
            set out to out & (title of active tab of w) & linefeed
        end repeat
    end tell
end if
if application "Safari" is running then
    tell application "Safari"
        repeat with w in windows
            set out to out & (name of w) & linefeed
        end repeat
    end tell
end if
return out
"#;

struct SystemEventsLocator {
    timeout: Duration,
}

#[async_trait]
impl WindowLocator for SystemEventsLocator {
    fn name(&self) -> &str {
        "system-events"
    }

    async fn window_titles(&self) -> Result<Vec<String>, PlatformError> {
        Ok(lines(&osascript(LIST_WINDOWS, self.timeout).await?))
    }
}

struct BrowserTabLocator {
    timeout: Duration,
}

#[async_trait]
impl WindowLocator for BrowserTabLocator {
    fn name(&self) -> &str {
        "browser-tabs"
    }

    async fn window_titles(&self) -> Result<Vec<String>, PlatformError> {
        Ok(lines(&osascript(LIST_BROWSER_TABS, self.timeout).await?))
    }
}

struct MacForeground {
    timeout: Duration,
}

#[async_trait]
impl ForegroundController for MacForeground {
    async fn activate_window_titled(&self, title: &str) -> Result<(), PlatformError> {
        let script = format!(
            r#"
tell application "System Events"
    repeat with p in (every process whose visible is true)
        repeat with w in (every window of p)
            if (name of w as text) contains {title} then
                set frontmost of p to true
                perform action "AXRaise" of w
                return "ok"
            end if
        end repeat
    end repeat
end tell
error "no window titled " & {title}
"#,
            title = applescript_quote(title)
        );
        osascript(&script, self.timeout).await.map(|_| ())
    }

    async fn activate_process(&self, pid: u32) -> Result<(), PlatformError> {
        let script = format!(
            "tell application \"System Events\" to set frontmost of (first process whose unix id is {}) to true",
            pid
        );
        osascript(&script, self.timeout).await.map(|_| ())
    }

    async fn foreground_process(&self) -> Result<Option<ProcessIdentity>, PlatformError> {
        let out = osascript(
            "tell application \"System Events\" to get {unix id, name} of first process whose frontmost is true",
            self.timeout,
        )
        .await?;
        Ok(parse_front_process(&out))
    }

    async fn primary_button_down(&self) -> Result<bool, PlatformError> {
        use cocoa::appkit::NSEvent;
        use cocoa::base::nil;

        let buttons = unsafe { NSEvent::pressedMouseButtons(nil) };
        Ok(buttons & 1 != 0)
    }

    async fn send_paste(&self) -> Result<(), PlatformError> {
        super::paste::send_paste_keystroke().await
    }
}

fn lines(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// `"4242, Cursor"` as printed by osascript for a two-item list.
fn parse_front_process(out: &str) -> Option<ProcessIdentity> {
    let (pid, name) = out.trim().split_once(',')?;
    Some(ProcessIdentity::new(pid.trim().parse().ok()?, name.trim()))
}
