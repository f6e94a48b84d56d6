//! Linux (X11) automation: xdotool first, wmctrl as fallback, Xlib for
//! the mouse button state.

use super::command::run_helper_ok;
use super::{ForegroundController, PlatformError, ProcessIdentity, WindowLocator};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub(super) fn automation(
    timeout: Duration,
) -> (Vec<Arc<dyn WindowLocator>>, Arc<dyn ForegroundController>) {
    let locators: Vec<Arc<dyn WindowLocator>> = vec![
        Arc::new(XdotoolLocator { timeout }),
        Arc::new(WmctrlLocator { timeout }),
    ];
    let foreground: Arc<dyn ForegroundController> = Arc::new(X11Foreground { timeout });
    (locators, foreground)
}

struct XdotoolLocator {
    timeout: Duration,
}

#[async_trait]
impl WindowLocator for XdotoolLocator {
    fn name(&self) -> &str {
        "xdotool"
    }

    async fn window_titles(&self) -> Result<Vec<String>, PlatformError> {
        let out = run_helper_ok(
            "xdotool",
            &["search", "--onlyvisible", "--name", ".+", "getwindowname", "%@"],
            self.timeout,
        )
        .await?;
        Ok(non_empty_lines(&out))
    }
}

struct WmctrlLocator {
    timeout: Duration,
}

#[async_trait]
impl WindowLocator for WmctrlLocator {
    fn name(&self) -> &str {
        "wmctrl"
    }

    async fn window_titles(&self) -> Result<Vec<String>, PlatformError> {
        let out = run_helper_ok("wmctrl", &["-l"], self.timeout).await?;
        Ok(out.lines().filter_map(|l| wmctrl_field(l, 3)).collect())
    }
}

struct X11Foreground {
    timeout: Duration,
}

impl X11Foreground {
    async fn wmctrl_activate_pid(&self, pid: u32) -> Result<(), PlatformError> {
        let listing = run_helper_ok("wmctrl", &["-lp"], self.timeout).await?;
        let window_id = listing
            .lines()
            .find(|line| wmctrl_column(line, 2).and_then(|p| p.parse::<u32>().ok()) == Some(pid))
            .and_then(|line| wmctrl_column(line, 0))
            .ok_or_else(|| PlatformError::Native(format!("no window for pid {}", pid)))?;
        run_helper_ok("wmctrl", &["-i", "-a", window_id], self.timeout).await?;
        Ok(())
    }
}

#[async_trait]
impl ForegroundController for X11Foreground {
    async fn activate_window_titled(&self, title: &str) -> Result<(), PlatformError> {
        let pattern = regex_escape(title);
        let xdotool = run_helper_ok(
            "xdotool",
            &["search", "--onlyvisible", "--name", &pattern, "windowactivate"],
            self.timeout,
        )
        .await;
        match xdotool {
            Ok(_) => Ok(()),
            Err(e) => {
                log::debug!("[PLATFORM] xdotool activate failed ({}), trying wmctrl", e);
                run_helper_ok("wmctrl", &["-a", title], self.timeout).await.map(|_| ())
            }
        }
    }

    async fn activate_process(&self, pid: u32) -> Result<(), PlatformError> {
        let pid_arg = pid.to_string();
        let xdotool = run_helper_ok(
            "xdotool",
            &["search", "--onlyvisible", "--pid", &pid_arg, "windowactivate"],
            self.timeout,
        )
        .await;
        match xdotool {
            Ok(_) => Ok(()),
            Err(e) => {
                log::debug!("[PLATFORM] xdotool activate pid {} failed ({}), trying wmctrl", pid, e);
                self.wmctrl_activate_pid(pid).await
            }
        }
    }

    async fn foreground_process(&self) -> Result<Option<ProcessIdentity>, PlatformError> {
        let out = run_helper_ok("xdotool", &["getactivewindow", "getwindowpid"], self.timeout).await?;
        let Some(pid) = out.trim().parse::<u32>().ok() else {
            return Ok(None);
        };
        let name = std::fs::read_to_string(format!("/proc/{}/comm", pid))
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        Ok(Some(ProcessIdentity::new(pid, name)))
    }

    async fn primary_button_down(&self) -> Result<bool, PlatformError> {
        tokio::task::spawn_blocking(query_button1)
            .await
            .map_err(|e| PlatformError::Native(e.to_string()))?
    }

    async fn send_paste(&self) -> Result<(), PlatformError> {
        super::paste::send_paste_keystroke().await
    }
}

fn query_button1() -> Result<bool, PlatformError> {
    use std::ptr;
    use x11::xlib::{Button1Mask, XCloseDisplay, XDefaultRootWindow, XOpenDisplay, XQueryPointer};

    unsafe {
        let display = XOpenDisplay(ptr::null());
        if display.is_null() {
            return Err(PlatformError::Native("cannot open X11 display".to_string()));
        }

        let root = XDefaultRootWindow(display);
        let (mut root_return, mut child_return) = (0, 0);
        let (mut root_x, mut root_y, mut win_x, mut win_y) = (0, 0, 0, 0);
        let mut mask = 0;

        let result = XQueryPointer(
            display,
            root,
            &mut root_return,
            &mut child_return,
            &mut root_x,
            &mut root_y,
            &mut win_x,
            &mut win_y,
            &mut mask,
        );
        XCloseDisplay(display);

        if result == 0 {
            return Err(PlatformError::Native("XQueryPointer failed".to_string()));
        }
        Ok(mask & Button1Mask != 0)
    }
}

fn non_empty_lines(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// The `index`-th whitespace-separated column of a `wmctrl -l`/`-lp` line.
fn wmctrl_column(line: &str, index: usize) -> Option<&str> {
    line.split_whitespace().nth(index)
}

/// Everything after the first `skip` columns, i.e. the title.
fn wmctrl_field(line: &str, skip: usize) -> Option<String> {
    let mut rest = line.trim_start();
    for _ in 0..skip {
        let end = rest.find(char::is_whitespace)?;
        rest = rest[end..].trim_start();
    }
    (!rest.is_empty()).then(|| rest.to_string())
}

/// Escape for xdotool's POSIX ERE. `regex::escape` targets Rust syntax and
/// also escapes `-`, `#`, `&` and `~`, which ERE leaves undefined.
fn regex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
