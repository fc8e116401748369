//! JSON file state store.

use crate::StateStore;
use dualstream_core::{state::MonitorState, Error, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stores state as one pretty-printed JSON document.
///
/// Saves go to a sibling temp file which is then renamed over the target, so
/// a reader never sees a half-written document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<Option<MonitorState>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::storage(format!(
                    "Failed to read state from {}: {e}",
                    self.path.display()
                )))
            }
        };

        let state = serde_json::from_str(&content).map_err(|e| {
            Error::storage(format!(
                "Failed to parse state from {}: {e}",
                self.path.display()
            ))
        })?;
        debug!(path = %self.path.display(), "Loaded monitor state");
        Ok(Some(state))
    }

    fn save(&mut self, state: &MonitorState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.temp_path();
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Error::storage(format!(
                "Failed to write state to {}: {e}",
                self.path.display()
            ))
        })?;

        debug!(
            path = %self.path.display(),
            batches_seen = state.batches_seen,
            events = state.events().len(),
            "Saved monitor state"
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
