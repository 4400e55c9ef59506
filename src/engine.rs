//! The mood engine facade.
//!
//! Ties the model builder, the model store and the transparency counters
//! together so the CLI and the HTTP server share one pipeline.

use crate::collector::spool::{DayBatch, RawDataSource};
use crate::collector::types::{RawRecord, Reading};
use crate::config::Config;
use crate::core::builder::DailyModelBuilder;
use crate::core::classifier::{infer, InferenceResult};
use crate::core::model::{DailyModel, ModelKey};
use crate::error::MoodError;
use crate::store::{CachedModelStore, FileModelStore, ModelStore};
use crate::transparency::{
    create_shared_log, create_shared_log_with_persistence, SharedTransparencyLog,
};
use chrono::{DateTime, NaiveDate, Utc};
use crossbeam_channel::bounded;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;

/// Result of a successful build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub user_id: String,
    pub target_date: NaiveDate,
    pub model_id: String,
    pub model_path: String,
    pub windows: usize,
    pub degenerate_states: Vec<usize>,
    /// Records that reached the cleaner
    pub readings: usize,
    /// Records skipped as malformed
    pub rejected: usize,
}

/// Single entry point for building and consulting daily models.
pub struct MoodEngine {
    config: Config,
    builder: DailyModelBuilder,
    store: Arc<dyn ModelStore>,
    transparency: SharedTransparencyLog,
}

impl MoodEngine {
    pub fn new(
        config: Config,
        store: Arc<dyn ModelStore>,
        transparency: SharedTransparencyLog,
    ) -> Self {
        Self {
            builder: DailyModelBuilder::new(config.model.clone()),
            config,
            store,
            transparency,
        }
    }

    /// Engine over the on-disk model store under `config.data_path`, with
    /// persisted transparency counters.
    pub fn from_config(config: Config) -> Self {
        let store = CachedModelStore::new(FileModelStore::new(config.models_path()));
        let transparency = create_shared_log_with_persistence(config.transparency_path());
        Self::new(config, Arc::new(store), transparency)
    }

    /// Engine with an explicit store and in-memory counters.
    pub fn with_store(config: Config, store: Arc<dyn ModelStore>) -> Self {
        Self::new(config, store, create_shared_log())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ModelStore> {
        &self.store
    }

    pub fn transparency(&self) -> &SharedTransparencyLog {
        &self.transparency
    }

    /// Previous calendar day, relative to `now`, in the configured timezone.
    pub fn day_before(&self, now: DateTime<Utc>) -> NaiveDate {
        self.config.day_before(now)
    }

    /// Fetch a day from `source`, then build and store its model.
    pub fn build_day(
        &self,
        user_id: &str,
        date: NaiveDate,
        source: &dyn RawDataSource,
    ) -> Result<BuildOutcome, MoodError> {
        let batch = source.fetch_day(user_id, date).map_err(|e| {
            tracing::error!(user_id, %date, error = %e, "Could not fetch raw day");
            self.transparency.record_build_failed();
            e
        })?;
        self.build_batch(user_id, date, batch)
    }

    /// Build and store a model from records already in hand.
    pub fn build_from_records(
        &self,
        user_id: &str,
        date: NaiveDate,
        records: Vec<RawRecord>,
    ) -> Result<BuildOutcome, MoodError> {
        self.build_batch(user_id, date, DayBatch::new(records))
    }

    /// Build and store a model from a decoded day batch.
    pub fn build_batch(
        &self,
        user_id: &str,
        date: NaiveDate,
        batch: DayBatch,
    ) -> Result<BuildOutcome, MoodError> {
        let DayBatch { records, rejected } = batch;
        let readings = records.len();
        self.transparency
            .record_readings(readings as u64, rejected as u64);

        tracing::info!(user_id, %date, readings, rejected, "Building daily model");
        let result = self
            .builder
            .build(user_id, date, records)
            .and_then(|model| self.store.put(&model).map(|path| (model, path)));

        match result {
            Ok((model, model_path)) => {
                self.transparency.record_model_built();
                Ok(BuildOutcome {
                    user_id: model.user_id.clone(),
                    target_date: model.date,
                    model_id: model.model_id.to_string(),
                    model_path,
                    windows: model.labels.len(),
                    degenerate_states: model.degenerate_states.clone(),
                    readings,
                    rejected,
                })
            }
            Err(e) => {
                tracing::error!(user_id, %date, error = %e, "Daily model build failed");
                self.transparency.record_build_failed();
                Err(e)
            }
        }
    }

    /// Load the model for `user_id` on `date`.
    pub fn model(&self, user_id: &str, date: NaiveDate) -> Result<Arc<DailyModel>, MoodError> {
        self.store.get(&ModelKey::new(user_id, date))
    }

    /// Classify a live reading against a stored model.
    ///
    /// `model_date` defaults to the day before `now`; `forecast_minutes`
    /// defaults to the configured horizon.
    pub fn infer(
        &self,
        user_id: &str,
        reading: &Reading,
        forecast_minutes: Option<u32>,
        model_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<InferenceResult, MoodError> {
        let date = model_date.unwrap_or_else(|| self.day_before(now));
        let model = match self.model(user_id, date) {
            Ok(model) => model,
            Err(e @ MoodError::ModelNotFound { .. }) => {
                tracing::info!(user_id, %date, "No model for inference");
                self.transparency.record_model_not_found();
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let minutes = forecast_minutes.unwrap_or(self.config.forecast_minutes);
        let result = infer(&model, reading, minutes, now)?;
        self.transparency.record_inference();
        Ok(result)
    }

    /// Build one day for many users on a pool of `workers` threads.
    ///
    /// Results come back in the order of `users`; one user's failure does
    /// not affect the others.
    pub fn build_many(
        &self,
        users: &[String],
        date: NaiveDate,
        source: &dyn RawDataSource,
        workers: usize,
    ) -> Vec<(String, Result<BuildOutcome, MoodError>)> {
        let workers = workers.clamp(1, users.len().max(1));
        let (job_tx, job_rx) = bounded::<(usize, &str)>(users.len().max(1));
        let (result_tx, result_rx) = bounded(users.len().max(1));

        for (index, user) in users.iter().enumerate() {
            // capacity covers every job, so this never blocks
            let _ = job_tx.send((index, user.as_str()));
        }
        drop(job_tx);

        thread::scope(|s| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                s.spawn(move || {
                    while let Ok((index, user)) = job_rx.recv() {
                        let result = self.build_day(user, date, source);
                        if result_tx.send((index, result)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut results: Vec<(usize, Result<BuildOutcome, MoodError>)> = result_rx.iter().collect();
        results.sort_by_key(|(index, _)| *index);
        results
            .into_iter()
            .map(|(index, result)| (users[index].clone(), result))
            .collect()
    }

    /// Persist the transparency counters.
    pub fn save_stats(&self) {
        if let Err(e) = self.transparency.save() {
            tracing::warn!(error = %e, "Could not save transparency stats");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::spool::MemorySource;
    use crate::config::ModelConfig;
    use chrono::{Duration, TimeZone};

    fn config() -> Config {
        Config {
            model: ModelConfig {
                window_length: 6,
                clusters: 2,
                ..Default::default()
            },
            data_path: std::env::temp_dir().join(format!("mood-engine-{}", uuid::Uuid::new_v4())),
            ..Default::default()
        }
    }

    fn day(date: NaiveDate, slots: usize) -> Vec<RawRecord> {
        let start = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap());
        (0..slots)
            .map(|i| RawRecord {
                average_stress_index: Some(if i < slots / 2 { 15.0 } else { 85.0 }),
                recent_stress_index: Some(if i < slots / 2 { 15.0 } else { 85.0 }),
                latest_sleep_score: Some(75.0),
                latest_sleep_duration: Some(450.0),
                ..RawRecord::empty(start + Duration::minutes(10 * i as i64))
            })
            .collect()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 30).unwrap()
    }

    #[test]
    fn test_build_then_infer() {
        let engine = MoodEngine::from_config(config());
        let outcome = engine
            .build_from_records("user_001", date(), day(date(), 30))
            .unwrap();
        assert_eq!(outcome.windows, 25);
        assert!(outcome.model_path.ends_with("2025-11-30.json"));

        let reading = crate::core::cleaner::clean_day(day(date(), 1)).unwrap().remove(0);
        let now = Utc.with_ymd_and_hms(2025, 12, 1, 8, 0, 0).unwrap();
        let result = engine.infer("user_001", &reading, None, None, now).unwrap();
        assert_eq!(result.model_date, date());
        assert_eq!(result.forecast_steps, 3);

        let stats = engine.transparency().stats();
        assert_eq!(stats.models_built, 1);
        assert_eq!(stats.readings_ingested, 30);
        assert_eq!(stats.inferences_served, 1);

        let _ = std::fs::remove_dir_all(&engine.config().data_path);
    }

    #[test]
    fn test_infer_without_model() {
        let engine = MoodEngine::from_config(config());
        let reading = crate::core::cleaner::clean_day(day(date(), 1)).unwrap().remove(0);
        let now = Utc.with_ymd_and_hms(2025, 12, 1, 8, 0, 0).unwrap();
        let err = engine.infer("user_001", &reading, Some(10), None, now).unwrap_err();
        assert!(matches!(err, MoodError::ModelNotFound { .. }));
        assert_eq!(engine.transparency().stats().models_not_found, 1);
    }

    #[test]
    fn test_insufficient_day_counts_as_failed_build() {
        let engine = MoodEngine::from_config(config());
        let err = engine
            .build_from_records("user_001", date(), day(date(), 4))
            .unwrap_err();
        assert!(matches!(err, MoodError::InsufficientData { .. }));
        let stats = engine.transparency().stats();
        assert_eq!(stats.builds_failed, 1);
        assert_eq!(stats.models_built, 0);
    }

    #[test]
    fn test_build_many_isolates_failures() {
        let engine = MoodEngine::from_config(config());
        let mut source = MemorySource::new();
        source.insert("alice", date(), day(date(), 30));
        source.insert("bob", date(), day(date(), 3));
        source.insert("carol", date(), day(date(), 24));

        let users: Vec<String> = ["alice", "bob", "carol", "dave"]
            .iter()
            .map(|u| u.to_string())
            .collect();
        let results = engine.build_many(&users, date(), &source, 3);

        let names: Vec<&str> = results.iter().map(|(u, _)| u.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "carol", "dave"]);
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(MoodError::InsufficientData { .. })));
        assert_eq!(results[2].1.as_ref().map(|o| o.windows).ok(), Some(19));
        assert!(matches!(results[3].1, Err(MoodError::Input(_))));

        let stats = engine.transparency().stats();
        assert_eq!(stats.models_built, 2);
        assert_eq!(stats.builds_failed, 2);

        let _ = std::fs::remove_dir_all(&engine.config().data_path);
    }

    #[test]
    fn test_day_before_respects_timezone() {
        let mut cfg = config();
        cfg.timezone = "Asia/Seoul".to_string();
        let engine = MoodEngine::from_config(cfg);
        // 16:00 UTC is already the next day in Seoul
        let now = Utc.with_ymd_and_hms(2025, 11, 30, 16, 0, 0).unwrap();
        assert_eq!(engine.day_before(now), date());
    }
}
