//! Processing transparency log.
//!
//! Counts what the engine has ingested, built and served. Only aggregate
//! counters are kept; no readings or user identifiers are stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Engine counters for the current process.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Raw readings accepted into a build
    readings_ingested: AtomicU64,
    /// Raw readings skipped as malformed
    readings_rejected: AtomicU64,
    /// Daily models built and stored
    models_built: AtomicU64,
    /// Builds that ended in an error
    builds_failed: AtomicU64,
    /// Successful inferences
    inferences_served: AtomicU64,
    /// Inferences requested without a model
    models_not_found: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    pub fn new() -> Self {
        Self {
            readings_ingested: AtomicU64::new(0),
            readings_rejected: AtomicU64::new(0),
            models_built: AtomicU64::new(0),
            builds_failed: AtomicU64::new(0),
            inferences_served: AtomicU64::new(0),
            models_not_found: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log backed by a JSON file, resuming from it if present.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!(error = %e, "Could not load previous transparency stats");
        }

        log
    }

    pub fn record_readings(&self, ingested: u64, rejected: u64) {
        self.readings_ingested.fetch_add(ingested, Ordering::Relaxed);
        self.readings_rejected.fetch_add(rejected, Ordering::Relaxed);
    }

    pub fn record_model_built(&self) {
        self.models_built.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_build_failed(&self) {
        self.builds_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inference(&self) {
        self.inferences_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_model_not_found(&self) {
        self.models_not_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            readings_ingested: self.readings_ingested.load(Ordering::Relaxed),
            readings_rejected: self.readings_rejected.load(Ordering::Relaxed),
            models_built: self.models_built.load(Ordering::Relaxed),
            builds_failed: self.builds_failed.load(Ordering::Relaxed),
            inferences_served: self.inferences_served.load(Ordering::Relaxed),
            models_not_found: self.models_not_found.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Engine Statistics:\n\
             - Readings ingested: {}\n\
             - Readings rejected: {}\n\
             - Models built: {}\n\
             - Builds failed: {}\n\
             - Inferences served: {}\n\
             - Inferences without a model: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Data Handling:\n\
             - Raw readings are never copied into models\n\
             - Models hold only aggregate state shapes and transition rates\n\
             - Realtime readings are never stored",
            stats.readings_ingested,
            stats.readings_rejected,
            stats.models_built,
            stats.builds_failed,
            stats.inferences_served,
            stats.models_not_found,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                readings_ingested: stats.readings_ingested,
                readings_rejected: stats.readings_rejected,
                models_built: stats.models_built,
                builds_failed: stats.builds_failed,
                inferences_served: stats.inferences_served,
                models_not_found: stats.models_not_found,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.readings_ingested
                    .store(persisted.readings_ingested, Ordering::Relaxed);
                self.readings_rejected
                    .store(persisted.readings_rejected, Ordering::Relaxed);
                self.models_built
                    .store(persisted.models_built, Ordering::Relaxed);
                self.builds_failed
                    .store(persisted.builds_failed, Ordering::Relaxed);
                self.inferences_served
                    .store(persisted.inferences_served, Ordering::Relaxed);
                self.models_not_found
                    .store(persisted.models_not_found, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.readings_ingested.store(0, Ordering::Relaxed);
        self.readings_rejected.store(0, Ordering::Relaxed);
        self.models_built.store(0, Ordering::Relaxed);
        self.builds_failed.store(0, Ordering::Relaxed);
        self.inferences_served.store(0, Ordering::Relaxed);
        self.models_not_found.store(0, Ordering::Relaxed);
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub readings_ingested: u64,
    pub readings_rejected: u64,
    pub models_built: u64,
    pub builds_failed: u64,
    pub inferences_served: u64,
    pub models_not_found: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    readings_ingested: u64,
    readings_rejected: u64,
    models_built: u64,
    builds_failed: u64,
    inferences_served: u64,
    models_not_found: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}
