//! Context sources backed by the local machine.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use switchyard_core::context::ContextSource;
use switchyard_core::error::ContextError;

/// Reads one markdown file from the context directory on every request.
///
/// A missing file contributes nothing. Any other read failure is an error,
/// so the router falls back to the minimal prompt.
pub struct MarkdownFileContext {
    name: String,
    path: PathBuf,
}

impl MarkdownFileContext {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// `<dir>/<FILE>.md` named after the lowercased file stem.
    pub fn in_dir(dir: &Path, file: &str) -> Self {
        let name = file.trim_end_matches(".md").to_lowercase();
        Self::new(name, dir.join(file))
    }
}

#[async_trait]
impl ContextSource for MarkdownFileContext {
    fn name(&self) -> &str {
        &self.name
    }

    async fn build(&self, _is_admin: bool) -> Result<String, ContextError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(ContextError::new(
                self.name.clone(),
                format!("{}: {e}", self.path.display()),
            )),
        }
    }
}

/// Live block: current UTC time and process uptime.
pub struct ClockContext {
    started: Instant,
}

impl ClockContext {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for ClockContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContextSource for ClockContext {
    fn name(&self) -> &str {
        "live_state"
    }

    async fn build(&self, _is_admin: bool) -> Result<String, ContextError> {
        let now = chrono::Utc::now();
        Ok(format!(
            "Current time: {} UTC\nUptime: {}s",
            now.format("%Y-%m-%d %H:%M"),
            self.started.elapsed().as_secs()
        ))
    }
}
