//! Durable result store.
//!
//! A small JSON-file key-value store shared across pages: the most recent
//! result, a bounded rolling history, the latest detection verdict, and the
//! auto-process setting. Load-mutate-save with last-writer-wins semantics;
//! each page keeps its own in-memory statistics, so no transactions are
//! needed here.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AisError, Result};
use crate::types::{AnalysisResult, ClassificationResult};

/// Most-recent entries kept in the history; oldest are dropped first.
pub const HISTORY_CAP: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub url: String,
    pub result: AnalysisResult,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoreData {
    last_processed_image: Option<StoredRecord>,
    processed_images: Vec<StoredRecord>,
    latest_detection_result: Option<ClassificationResult>,
    auto_process_enabled: bool,
}

pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location next to the central config.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ais").join("results.json"))
    }

    /// Append a completed record: becomes the last-processed entry and joins
    /// the history, which keeps only the [`HISTORY_CAP`] most recent entries.
    pub fn record_processed(&self, url: &str, result: &AnalysisResult) -> Result<()> {
        let record = StoredRecord {
            url: url.to_string(),
            result: result.clone(),
            timestamp: Utc::now(),
        };

        let mut data = self.load()?;
        data.last_processed_image = Some(record.clone());
        data.processed_images.push(record);
        if data.processed_images.len() > HISTORY_CAP {
            let excess = data.processed_images.len() - HISTORY_CAP;
            data.processed_images.drain(0..excess);
        }
        self.save(&data)
    }

    pub fn set_latest_detection(&self, result: &ClassificationResult) -> Result<()> {
        let mut data = self.load()?;
        data.latest_detection_result = Some(result.clone());
        self.save(&data)
    }

    pub fn set_auto_process(&self, enabled: bool) -> Result<()> {
        let mut data = self.load()?;
        data.auto_process_enabled = enabled;
        self.save(&data)
    }

    pub fn auto_process(&self) -> Result<bool> {
        Ok(self.load()?.auto_process_enabled)
    }

    pub fn last_processed(&self) -> Result<Option<StoredRecord>> {
        Ok(self.load()?.last_processed_image)
    }

    pub fn latest_detection(&self) -> Result<Option<ClassificationResult>> {
        Ok(self.load()?.latest_detection_result)
    }

    /// The rolling history, oldest first.
    pub fn history(&self) -> Result<Vec<StoredRecord>> {
        Ok(self.load()?.processed_images)
    }

    fn load(&self) -> Result<StoreData> {
        if !self.path.exists() {
            return Ok(StoreData::default());
        }
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| AisError::store(format!("failed to read {}: {}", self.path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| AisError::store(format!("failed to parse {}: {}", self.path.display(), e)))
    }

    fn save(&self, data: &StoreData) -> Result<()> {
        ensure_parent(&self.path)?;
        let raw = serde_json::to_string_pretty(data).map_err(AisError::Serialization)?;
        std::fs::write(&self.path, raw)
            .map_err(|e| AisError::store(format!("failed to write {}: {}", self.path.display(), e)))
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AisError::store(format!("failed to create {}: {}", parent.display(), e)))?;
    }
    Ok(())
}
