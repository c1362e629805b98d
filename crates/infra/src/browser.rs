//! System browser launcher
//!
//! Opens URLs by spawning the platform's URL handler (`open`, `xdg-open` or
//! `cmd /C start`). Chrome options from [`InAppBrowserConfig`] only apply to
//! embedded browsers and are logged, not enforced.

use std::path::Path;

use async_trait::async_trait;
use authsession_core::InAppBrowser;
use authsession_domain::{InAppBrowserConfig, Result, SessionError};
use tokio::process::Command;
use tracing::{debug, warn};

/// Browser opening URLs through an external command.
#[derive(Debug, Clone)]
pub struct CommandBrowser {
    program: String,
    args: Vec<String>,
}

impl CommandBrowser {
    /// `program args... <url>`
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// Handler for the current platform.
    pub fn system() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("open", Vec::new())
        } else if cfg!(target_os = "windows") {
            Self::new("cmd", vec!["/C".into(), "start".into(), String::new()])
        } else {
            Self::new("xdg-open", Vec::new())
        }
    }

    /// Program that receives the URL
    pub fn program(&self) -> &str {
        &self.program
    }

    fn program_on_path(&self) -> bool {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return program.is_file();
        }
        std::env::var_os("PATH").is_some_and(|paths| {
            std::env::split_paths(&paths).any(|dir| {
                let candidate = dir.join(&self.program);
                candidate.is_file() || candidate.with_extension("exe").is_file()
            })
        })
    }
}

impl Default for CommandBrowser {
    fn default() -> Self {
        Self::system()
    }
}

#[async_trait]
impl InAppBrowser for CommandBrowser {
    async fn is_available(&self) -> Result<bool> {
        let available = self.program_on_path();
        if !available {
            warn!(program = %self.program, "browser launcher not found on PATH");
        }
        Ok(available)
    }

    async fn open(&self, url: &str, config: &InAppBrowserConfig) -> Result<()> {
        debug!(
            program = %self.program,
            modal = config.modal_enabled,
            "opening browser"
        );
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .status()
            .await
            .map_err(|err| SessionError::Browser(format!("failed to launch {}: {err}", self.program)))?;

        if status.success() {
            Ok(())
        } else {
            Err(SessionError::Browser(format!("{} exited with {status}", self.program)))
        }
    }
}
