//! Process probes: is the editor running, and under which pids?
//!
//! Two independent sources so one broken source does not blind the
//! orchestrator: the sysinfo process table, and the OS's own listing
//! command (`pgrep` / `tasklist`).

use super::command::{run_helper, HelperOutput};
use super::{names_match, PlatformError, ProcessIdentity, ProcessProbe};
use async_trait::async_trait;
use std::time::Duration;
use sysinfo::{ProcessesToUpdate, System};

/// Reads the process table through sysinfo.
#[derive(Debug, Default)]
pub struct SysinfoProbe;

impl SysinfoProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessProbe for SysinfoProbe {
    fn name(&self) -> &str {
        "sysinfo"
    }

    async fn find(&self, names: &[String]) -> Result<Vec<ProcessIdentity>, PlatformError> {
        let names = names.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut system = System::new();
            system.refresh_processes(ProcessesToUpdate::All, true);
            let found: Vec<ProcessIdentity> = system
                .processes()
                .iter()
                .filter_map(|(pid, process)| {
                    let name = process.name().to_string_lossy();
                    names
                        .iter()
                        .any(|wanted| names_match(&name, wanted))
                        .then(|| ProcessIdentity::new(pid.as_u32(), name.into_owned()))
                })
                .collect();
            found
        })
        .await
        .map_err(|e| PlatformError::Native(format!("process scan panicked: {}", e)))
    }
}

/// Asks the OS listing command: `pgrep` on Unix, `tasklist` on Windows.
#[derive(Debug)]
pub struct CommandProbe {
    timeout: Duration,
}

impl CommandProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ProcessProbe for CommandProbe {
    fn name(&self) -> &str {
        if cfg!(windows) {
            "tasklist"
        } else {
            "pgrep"
        }
    }

    async fn find(&self, names: &[String]) -> Result<Vec<ProcessIdentity>, PlatformError> {
        if cfg!(windows) {
            let out = run_helper("tasklist", &["/FO", "CSV", "/NH"], self.timeout).await?;
            let listing = out.into_stdout()?;
            Ok(parse_tasklist_csv(&listing)
                .into_iter()
                .filter(|p| names.iter().any(|wanted| names_match(&p.name, wanted)))
                .collect())
        } else {
            let mut found = Vec::new();
            for wanted in names {
                let out = run_helper("pgrep", &["-i", "-x", "-l", wanted], self.timeout).await?;
                found.extend(pgrep_matches(out)?);
            }
            Ok(found)
        }
    }
}

/// pgrep exits 1 when nothing matched; that is an answer, not an error.
fn pgrep_matches(out: HelperOutput) -> Result<Vec<ProcessIdentity>, PlatformError> {
    if out.code == Some(1) {
        return Ok(Vec::new());
    }
    Ok(parse_pgrep(&out.into_stdout()?))
}

/// Lines of `<pid> <name>`.
fn parse_pgrep(listing: &str) -> Vec<ProcessIdentity> {
    listing
        .lines()
        .filter_map(|line| {
            let (pid, name) = line.trim().split_once(char::is_whitespace)?;
            Some(ProcessIdentity::new(pid.parse().ok()?, name.trim()))
        })
        .collect()
}

/// Rows of `"Image Name","PID","Session Name","Session#","Mem Usage"`.
pub(crate) fn parse_tasklist_csv(listing: &str) -> Vec<ProcessIdentity> {
    listing
        .lines()
        .filter_map(|line| {
            let fields = split_csv_line(line);
            let name = fields.first()?;
            let pid = fields.get(1)?.parse().ok()?;
            Some(ProcessIdentity::new(pid, name.as_str()))
        })
        .collect()
}

/// Minimal CSV split for tasklist output: every field is double-quoted.
pub(crate) fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim().chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if !current.is_empty() || !fields.is_empty() {
        fields.push(current);
    }
    fields
}
