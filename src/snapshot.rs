//! # Corpus Snapshot Store
//!
//! ## Purpose
//! Persists and loads dated snapshots of the vocabulary corpus. One snapshot
//! file per calendar day, named `YYYY-MM-DD.json`; running twice on the same
//! day overwrites that day's file. Loading picks the snapshot whose embedded
//! date is nearest to the reference date, not necessarily before it.
//!
//! ## Input/Output Specification
//! - **Input**: Corpus folder path, reference date, records to persist
//! - **Output**: Whole-buffer JSON files, loaded back as full record vectors
//!
//! Writes are whole-buffer ("read-all, merge, write-all"); there is no
//! streaming and no partial write. Concurrent runs against the same folder
//! are unsupported.

use crate::errors::{HarvestError, Result};
use crate::VocabularyRecord;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Dated JSON snapshot persistence for a single corpus folder.
pub struct SnapshotStore {
    folder: PathBuf,
}

impl SnapshotStore {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    /// Load the snapshot whose date is closest to `reference_date`. A
    /// missing folder or a folder without snapshot files yields an empty
    /// corpus, not an error. Ties between an older and a newer snapshot at
    /// equal distance go to the newer one.
    pub fn load_closest_snapshot(&self, reference_date: NaiveDate) -> Result<Vec<VocabularyRecord>> {
        let Some(date) = self.closest_snapshot_date(reference_date)? else {
            tracing::info!("No snapshots in {}, starting empty", self.folder.display());
            return Ok(Vec::new());
        };

        let path = self.snapshot_path(date);
        tracing::info!("Loading corpus snapshot {}", path.display());
        let body = fs::read_to_string(&path)?;
        serde_json::from_str(&body).map_err(|e| HarvestError::Snapshot {
            folder: self.folder.display().to_string(),
            details: format!("malformed snapshot {}: {}", path.display(), e),
        })
    }

    /// Persist the whole corpus as `date`'s snapshot, creating the folder if
    /// needed and overwriting any snapshot already written for that date.
    pub fn save_snapshot(&self, records: &[VocabularyRecord], date: NaiveDate) -> Result<PathBuf> {
        fs::create_dir_all(&self.folder)?;
        let path = self.snapshot_path(date);
        let body = serde_json::to_string_pretty(records)?;
        fs::write(&path, body)?;
        tracing::info!("Saved {} records to {}", records.len(), path.display());
        Ok(path)
    }

    /// Dates of all snapshot files present, unordered. Files whose stem does
    /// not parse as a date are ignored.
    fn snapshot_dates(&self) -> Result<Vec<NaiveDate>> {
        if !self.folder.exists() {
            return Ok(Vec::new());
        }

        let mut dates = Vec::new();
        for entry in fs::read_dir(&self.folder)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(date) = NaiveDate::parse_from_str(stem, SNAPSHOT_DATE_FORMAT) {
                dates.push(date);
            }
        }
        Ok(dates)
    }

    fn closest_snapshot_date(&self, reference_date: NaiveDate) -> Result<Option<NaiveDate>> {
        let closest = self
            .snapshot_dates()?
            .into_iter()
            .min_by_key(|date| {
                let distance = (*date - reference_date).num_days().abs();
                // Newer wins a distance tie.
                (distance, reference_date.signed_duration_since(*date).num_days())
            });
        Ok(closest)
    }

    fn snapshot_path(&self, date: NaiveDate) -> PathBuf {
        self.folder
            .join(format!("{}.json", date.format(SNAPSHOT_DATE_FORMAT)))
    }
}

/// Convenience for callers that only have the folder path.
pub fn load_closest_snapshot(
    folder: &Path,
    reference_date: NaiveDate,
) -> Result<Vec<VocabularyRecord>> {
    SnapshotStore::new(folder).load_closest_snapshot(reference_date)
}
