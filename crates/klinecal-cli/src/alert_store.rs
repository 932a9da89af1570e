//! JSON file holding the user's alerts between runs.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use klinecal_core::Alert;
use tracing::debug;

use crate::error::CliError;

#[derive(Debug, Clone)]
pub struct AlertStore {
    path: PathBuf,
}

impl AlertStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored alerts; a missing file reads as an empty list.
    pub fn load(&self) -> Result<Vec<Alert>, CliError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    /// Replaces the file contents through a sibling temp file and rename.
    pub fn save(&self, alerts: &[Alert]) -> Result<(), CliError> {
        let payload = serde_json::to_string_pretty(alerts)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, payload)?;
        fs::rename(&staging, &self.path)?;
        debug!(path = %self.path.display(), count = alerts.len(), "saved alerts");
        Ok(())
    }
}
