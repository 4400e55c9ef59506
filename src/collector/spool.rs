//! Day-level raw data sources.
//!
//! Each upstream record is decoded on its own so one malformed slot never
//! aborts the whole day.

use crate::collector::types::RawRecord;
use crate::error::MoodError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One day of raw records plus the number of elements that had to be dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayBatch {
    pub records: Vec<RawRecord>,
    pub rejected: usize,
}

impl DayBatch {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            records,
            rejected: 0,
        }
    }
}

/// Supplies the raw records of one user's day.
pub trait RawDataSource: Send + Sync {
    fn fetch_day(&self, user_id: &str, date: NaiveDate) -> Result<DayBatch, MoodError>;
}

/// Decode a day payload: a JSON array of records or an object with a `rows` array.
pub fn parse_day_records(json: &str) -> Result<DayBatch, MoodError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    parse_day_value(value)
}

/// Decode an already-parsed day payload.
pub fn parse_day_value(value: serde_json::Value) -> Result<DayBatch, MoodError> {
    let rows = match value {
        serde_json::Value::Array(rows) => rows,
        serde_json::Value::Object(mut map) => match map.remove("rows") {
            Some(serde_json::Value::Array(rows)) => rows,
            _ => {
                return Err(MoodError::Input(
                    "day payload object must contain a `rows` array".to_string(),
                ))
            }
        },
        _ => {
            return Err(MoodError::Input(
                "day payload must be an array of records".to_string(),
            ))
        }
    };

    let mut batch = DayBatch::default();
    for (index, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<RawRecord>(row) {
            Ok(record) => batch.records.push(record),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping malformed raw record");
                batch.rejected += 1;
            }
        }
    }

    Ok(batch)
}

/// Check that a user id is safe to use as a storage key component.
pub fn validate_user_id(user_id: &str) -> Result<(), MoodError> {
    if user_id.is_empty() {
        return Err(MoodError::Input("user_id must not be empty".to_string()));
    }
    let valid = user_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && user_id != "."
        && user_id != "..";
    if !valid {
        return Err(MoodError::Input(format!("invalid user_id: {user_id:?}")));
    }
    Ok(())
}

/// Reads day files dropped by the upstream exporter.
///
/// Layout: `<root>/<user_id>/<YYYY-MM-DD>.json`
#[derive(Debug, Clone)]
pub struct SpoolSource {
    root: PathBuf,
}

impl SpoolSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the day file for a user and date.
    pub fn day_path(&self, user_id: &str, date: NaiveDate) -> PathBuf {
        self.root
            .join(user_id)
            .join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    /// Users that have a spool directory, sorted.
    pub fn users(&self) -> Result<Vec<String>, MoodError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut users: Vec<String> = std::fs::read_dir(&self.root)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(|s| s.to_string()))
            .filter(|name| validate_user_id(name).is_ok())
            .collect();
        users.sort();
        Ok(users)
    }

    /// Write a day file; used by exporters and tests.
    pub fn store_day(
        &self,
        user_id: &str,
        date: NaiveDate,
        records: &[RawRecord],
    ) -> Result<PathBuf, MoodError> {
        validate_user_id(user_id)?;
        let path = self.day_path(user_id, date);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string(records)?)?;
        Ok(path)
    }
}

impl RawDataSource for SpoolSource {
    fn fetch_day(&self, user_id: &str, date: NaiveDate) -> Result<DayBatch, MoodError> {
        validate_user_id(user_id)?;
        let path = self.day_path(user_id, date);
        if !path.exists() {
            return Err(MoodError::Input(format!(
                "no raw data for user {user_id} on {date} (expected {path:?})"
            )));
        }
        let content = std::fs::read_to_string(&path)?;
        parse_day_records(&content)
    }
}

/// In-memory source, keyed by (user, date).
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    days: std::collections::HashMap<(String, NaiveDate), Vec<RawRecord>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user_id: impl Into<String>, date: NaiveDate, records: Vec<RawRecord>) {
        self.days.insert((user_id.into(), date), records);
    }
}

impl RawDataSource for MemorySource {
    fn fetch_day(&self, user_id: &str, date: NaiveDate) -> Result<DayBatch, MoodError> {
        self.days
            .get(&(user_id.to_string(), date))
            .map(|records| DayBatch::new(records.clone()))
            .ok_or_else(|| MoodError::Input(format!("no raw data for user {user_id} on {date}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_malformed_rows() {
        let json = r#"[
            {"timestamp": "2025-11-30T00:00:00Z", "average_stress_index": 40},
            {"timestamp": "not a time"},
            {"timestamp": "2025-11-30T00:20:00Z", "sigh": "many"},
            {"timestamp": "2025-11-30T00:30:00Z", "laughter": 1}
        ]"#;
        let batch = parse_day_records(json).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.rejected, 2);
    }

    #[test]
    fn test_parse_accepts_fractional_counts() {
        let json = r#"[
            {"timestamp": "2025-11-30T00:00:00Z", "average_stress_index": 40, "laughter": 2.0, "sigh": 1.0},
            {"timestamp": "2025-11-30T00:10:00Z", "laughter": 0.5, "sigh": -1}
        ]"#;
        let batch = parse_day_records(json).unwrap();
        assert_eq!(batch.rejected, 0);
        assert_eq!(batch.records[0].laughter, Some(2.0));
        assert_eq!(batch.records[0].sigh, Some(1.0));
        assert_eq!(batch.records[0].average_stress_index, Some(40.0));
        assert_eq!(batch.records[1].laughter, Some(0.5));
    }

    #[test]
    fn test_parse_rows_envelope() {
        let json = r#"{"rows": [{"timestamp": "2025-11-30T00:00:00Z"}]}"#;
        let batch = parse_day_records(json).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.rejected, 0);
    }

    #[test]
    fn test_parse_rejects_scalar_payload() {
        assert!(matches!(parse_day_records("42"), Err(MoodError::Input(_))));
        assert!(matches!(parse_day_records("{\"data\": []}"), Err(MoodError::Input(_))));
        assert!(matches!(parse_day_records("[{"), Err(MoodError::Json(_))));
    }

    #[test]
    fn test_user_id_validation() {
        assert!(validate_user_id("user_001").is_ok());
        assert!(validate_user_id("a.b-c").is_ok());
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id("..").is_err());
        assert!(validate_user_id("../etc").is_err());
        assert!(validate_user_id("a/b").is_err());
    }

    #[test]
    fn test_spool_round_trip() {
        let root = std::env::temp_dir().join(format!("mood-spool-{}", uuid::Uuid::new_v4()));
        let spool = SpoolSource::new(&root);
        let date = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let record = RawRecord::empty("2025-11-30T00:00:00Z".parse().unwrap());

        spool.store_day("user_001", date, &[record.clone()]).unwrap();
        let batch = spool.fetch_day("user_001", date).unwrap();
        assert_eq!(batch.records, vec![record]);
        assert_eq!(spool.users().unwrap(), vec!["user_001".to_string()]);

        let missing = spool.fetch_day("user_001", date.succ_opt().unwrap());
        assert!(matches!(missing, Err(MoodError::Input(_))));

        let _ = std::fs::remove_dir_all(&root);
    }
}
