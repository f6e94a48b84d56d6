//! Helper command runner (osascript, xdotool, wmctrl, pgrep, tasklist...).
//!
//! Every helper gets a wall-clock timeout and is killed when its future
//! is dropped, so cancelling an orchestration never leaves children behind.

use super::PlatformError;
use std::process::Stdio;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HelperOutput {
    pub program: String,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl HelperOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout if the helper exited 0, otherwise `CommandFailed`.
    pub fn into_stdout(self) -> Result<String, PlatformError> {
        if self.success() {
            return Ok(self.stdout);
        }
        let detail = self.stderr.trim();
        Err(PlatformError::CommandFailed {
            message: if detail.is_empty() {
                format!("exit code {:?}", self.code)
            } else {
                detail.to_string()
            },
            program: self.program,
        })
    }
}

/// Run `program` with `args`, capturing output. The exit status is not
/// interpreted here; see `HelperOutput::into_stdout`.
pub async fn run_helper(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<HelperOutput, PlatformError> {
    let path = which::which(program).map_err(|_| PlatformError::HelperMissing(program.to_string()))?;

    let mut cmd = tokio::process::Command::new(path);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| PlatformError::Timeout(program.to_string()))?
        .map_err(|e| PlatformError::CommandFailed {
            program: program.to_string(),
            message: e.to_string(),
        })?;

    log::debug!("[PLATFORM] {} {:?} -> {:?}", program, args, output.status.code());

    Ok(HelperOutput {
        program: program.to_string(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// `run_helper` for helpers whose non-zero exit is always an error.
pub async fn run_helper_ok(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, PlatformError> {
    run_helper(program, args, timeout).await?.into_stdout()
}
