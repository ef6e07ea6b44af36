use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::models::{History, VideoRecord};
use crate::services::statistics::rebuild_history;

/// CSV file holding the channel history, one row per video.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        HistoryStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored history. A missing file is not an error: it means the
    /// channel has not been bootstrapped yet.
    pub fn load(&self) -> Result<Option<History>> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", self.path.display()))
            }
        };

        let mut reader = csv::Reader::from_reader(file);
        let records = reader
            .deserialize::<VideoRecord>()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to read history from {}", self.path.display()))?;

        let history = rebuild_history(records);
        info!(
            "Loaded {} videos from {}",
            history.len(),
            self.path.display()
        );
        Ok(Some(history))
    }

    /// Writes the history sorted by publish time. The file is replaced
    /// atomically so an interrupted write leaves the previous version intact.
    pub fn save(&self, history: &History) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp_path)
                .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
            for record in history.records() {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        info!(
            "Stored {} videos to {}",
            history.len(),
            self.path.display()
        );
        Ok(())
    }
}
