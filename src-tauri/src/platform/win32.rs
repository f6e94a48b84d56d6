//! Windows automation: Win32 window APIs first, `tasklist /v` as the
//! fallback locator.

use super::command::run_helper_ok;
use super::process::split_csv_line;
use super::{ForegroundController, PlatformError, ProcessIdentity, WindowLocator};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use windows::core::BOOL;
use windows::Win32::Foundation::{HWND, LPARAM};
use windows::Win32::UI::Input::KeyboardAndMouse::{GetAsyncKeyState, VK_LBUTTON};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetForegroundWindow, GetWindowTextW, GetWindowThreadProcessId, IsIconic,
    IsWindowVisible, SetForegroundWindow, ShowWindow, SW_RESTORE,
};

pub(super) fn automation(
    timeout: Duration,
) -> (Vec<Arc<dyn WindowLocator>>, Arc<dyn ForegroundController>) {
    let locators: Vec<Arc<dyn WindowLocator>> = vec![
        Arc::new(EnumWindowsLocator),
        Arc::new(TasklistLocator { timeout }),
    ];
    let foreground: Arc<dyn ForegroundController> = Arc::new(Win32Foreground);
    (locators, foreground)
}

/// A visible top-level window with a non-empty title.
struct TopWindow {
    raw: isize,
    title: String,
    pid: u32,
}

impl TopWindow {
    fn hwnd(&self) -> HWND {
        HWND(self.raw as *mut _)
    }
}

unsafe extern "system" fn collect_hwnd(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let out = &mut *(lparam.0 as *mut Vec<isize>);
    out.push(hwnd.0 as isize);
    BOOL(1)
}

fn visible_windows() -> Result<Vec<TopWindow>, PlatformError> {
    let mut handles: Vec<isize> = Vec::new();
    unsafe {
        EnumWindows(
            Some(collect_hwnd),
            LPARAM(&mut handles as *mut Vec<isize> as isize),
        )
        .map_err(|e| PlatformError::Native(format!("EnumWindows failed: {}", e)))?;
    }

    let mut windows = Vec::new();
    for raw in handles {
        let hwnd = HWND(raw as *mut _);
        unsafe {
            if !IsWindowVisible(hwnd).as_bool() {
                continue;
            }
            let mut buf = [0u16; 512];
            let len = GetWindowTextW(hwnd, &mut buf);
            if len <= 0 {
                continue;
            }
            let title = String::from_utf16_lossy(&buf[..len as usize]);
            if title.trim().is_empty() {
                continue;
            }
            let mut pid: u32 = 0;
            GetWindowThreadProcessId(hwnd, Some(&mut pid));
            windows.push(TopWindow { raw, title, pid });
        }
    }
    Ok(windows)
}

/// Window enumeration and the process table are synchronous; keep them off
/// the runtime workers.
async fn blocking<T, F>(work: F) -> Result<T, PlatformError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PlatformError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| PlatformError::Native(e.to_string()))?
}

fn bring_to_front(window: &TopWindow) -> Result<(), PlatformError> {
    let hwnd = window.hwnd();
    unsafe {
        if IsIconic(hwnd).as_bool() {
            let _ = ShowWindow(hwnd, SW_RESTORE);
        }
        if !SetForegroundWindow(hwnd).as_bool() {
            return Err(PlatformError::Native(format!(
                "SetForegroundWindow refused for '{}'",
                window.title
            )));
        }
    }
    Ok(())
}

struct EnumWindowsLocator;

#[async_trait]
impl WindowLocator for EnumWindowsLocator {
    fn name(&self) -> &str {
        "enum-windows"
    }

    async fn window_titles(&self) -> Result<Vec<String>, PlatformError> {
        let windows = blocking(visible_windows).await?;
        Ok(windows.into_iter().map(|w| w.title).collect())
    }
}

struct TasklistLocator {
    timeout: Duration,
}

#[async_trait]
impl WindowLocator for TasklistLocator {
    fn name(&self) -> &str {
        "tasklist"
    }

    async fn window_titles(&self) -> Result<Vec<String>, PlatformError> {
        let out = run_helper_ok("tasklist", &["/v", "/fo", "csv", "/nh"], self.timeout).await?;
        Ok(out
            .lines()
            .filter_map(|line| split_csv_line(line).pop())
            .filter(|title| !title.is_empty() && title != "N/A")
            .collect())
    }
}

struct Win32Foreground;

#[async_trait]
impl ForegroundController for Win32Foreground {
    async fn activate_window_titled(&self, title: &str) -> Result<(), PlatformError> {
        let title = title.to_string();
        blocking(move || {
            let wanted = title.to_lowercase();
            let windows = visible_windows()?;
            let window = windows
                .iter()
                .find(|w| w.title.to_lowercase().contains(&wanted))
                .ok_or_else(|| PlatformError::Native(format!("no window titled '{}'", title)))?;
            bring_to_front(window)
        })
        .await
    }

    async fn activate_process(&self, pid: u32) -> Result<(), PlatformError> {
        blocking(move || {
            let windows = visible_windows()?;
            let window = windows
                .iter()
                .find(|w| w.pid == pid)
                .ok_or_else(|| PlatformError::Native(format!("no visible window for pid {}", pid)))?;
            bring_to_front(window)
        })
        .await
    }

    async fn foreground_process(&self) -> Result<Option<ProcessIdentity>, PlatformError> {
        let pid = unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.0.is_null() {
                return Ok(None);
            }
            let mut pid: u32 = 0;
            GetWindowThreadProcessId(hwnd, Some(&mut pid));
            pid
        };
        if pid == 0 {
            return Ok(None);
        }
        let name = blocking(move || Ok(process_name(pid))).await?;
        Ok(Some(ProcessIdentity::new(pid, name)))
    }

    async fn primary_button_down(&self) -> Result<bool, PlatformError> {
        // High bit set means the button is down right now.
        let state = unsafe { GetAsyncKeyState(VK_LBUTTON.0 as i32) };
        Ok(state < 0)
    }

    async fn send_paste(&self) -> Result<(), PlatformError> {
        super::paste::send_paste_keystroke().await
    }
}

fn process_name(pid: u32) -> String {
    use sysinfo::{Pid, ProcessesToUpdate, System};

    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system
        .process(pid)
        .map(|p| p.name().to_string_lossy().into_owned())
        .unwrap_or_default()
}
