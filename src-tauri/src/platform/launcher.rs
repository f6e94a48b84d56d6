//! Open a URL in the user's browser.

use super::{PlatformError, UrlLauncher};
use async_trait::async_trait;

/// System default browser, or a custom command with a `{url}` placeholder.
#[derive(Debug, Clone, Default)]
pub struct SystemBrowser {
    command: Option<String>,
}

impl SystemBrowser {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }
}

/// Split the command template into argv first, then substitute, so the
/// URL always stays a single argument.
pub fn expand_browser_command(command: &str, url: &str) -> Result<Vec<String>, PlatformError> {
    let tokens = shell_words::split(command).map_err(|e| PlatformError::CommandFailed {
        program: command.to_string(),
        message: format!("cannot parse browser command: {}", e),
    })?;
    if tokens.is_empty() {
        return Err(PlatformError::CommandFailed {
            program: command.to_string(),
            message: "browser command is empty".to_string(),
        });
    }
    let has_placeholder = tokens.iter().any(|t| t.contains("{url}"));
    let mut parts: Vec<String> = tokens.into_iter().map(|t| t.replace("{url}", url)).collect();
    if !has_placeholder {
        parts.push(url.to_string());
    }
    Ok(parts)
}

#[async_trait]
impl UrlLauncher for SystemBrowser {
    async fn open_url(&self, url: &str) -> Result<(), PlatformError> {
        match &self.command {
            None => {
                let target = url.to_string();
                tokio::task::spawn_blocking(move || open::that_detached(&target))
                    .await
                    .map_err(|e| PlatformError::Native(e.to_string()))?
                    .map_err(|e| PlatformError::CommandFailed {
                        program: "default browser".to_string(),
                        message: e.to_string(),
                    })?;
            }
            Some(command) => {
                let parts = expand_browser_command(command, url)?;
                // Detached on purpose: the browser outlives this run.
                std::process::Command::new(&parts[0])
                    .args(&parts[1..])
                    .spawn()
                    .map_err(|e| PlatformError::CommandFailed {
                        program: parts[0].clone(),
                        message: e.to_string(),
                    })?;
            }
        }
        log::info!("[PLATFORM] Opened {}", url);
        Ok(())
    }
}
