//! JSON-file sink for finished run records.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::orchestrator::RunRecord;

/// Writes one `<flight_id>.json` per run into a directory.
#[derive(Debug, Clone)]
pub struct RunRecordStore {
    dir: PathBuf,
}

impl RunRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, flight_id: &str) -> PathBuf {
        let file_name: String = flight_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }

    /// Persist `record`, replacing any earlier record for the same flight.
    pub async fn save(
        &self,
        record: &RunRecord,
    ) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
        let path = self.path_for(&record.flight_id);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let payload = serde_json::to_vec_pretty(record)?;
        fs::write(&path, payload).await?;
        Ok(path)
    }

    pub async fn load(
        &self,
        flight_id: &str,
    ) -> Result<Option<RunRecord>, Box<dyn std::error::Error + Send + Sync>> {
        let path = self.path_for(flight_id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).await?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}
