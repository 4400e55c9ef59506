//! Daily model building.
//!
//! One pipeline for every caller: clean, score, window, cluster, estimate
//! transitions, then summarise each state.

use crate::collector::spool::validate_user_id;
use crate::collector::types::RawRecord;
use crate::config::ModelConfig;
use crate::core::cleaner::clean_day;
use crate::core::cluster::{ClusterConfig, StateClusterer};
use crate::core::features::{score_series, FeatureVector, FEATURE_DIM, FEATURE_NAMES};
use crate::core::model::{
    ClusterSummary, DailyModel, ModelProducer, MODEL_FORMAT_VERSION, PRODUCER_NAME,
};
use crate::core::transitions::estimate_transitions;
use crate::core::windowing::{build_windows, Window};
use crate::error::MoodError;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

/// Builds [`DailyModel`]s from one day of raw records.
pub struct DailyModelBuilder {
    config: ModelConfig,
    instance_id: Uuid,
}

impl DailyModelBuilder {
    /// Create a builder with a unique instance ID.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            instance_id: Uuid::new_v4(),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Build the model for `user_id` on `date`.
    ///
    /// Fails with [`MoodError::InsufficientData`] when the day is shorter
    /// than one window. Nothing is persisted here.
    pub fn build(
        &self,
        user_id: &str,
        date: NaiveDate,
        records: Vec<RawRecord>,
    ) -> Result<DailyModel, MoodError> {
        validate_user_id(user_id)?;
        let cfg = &self.config;

        let expected = cfg.slots_per_day();
        if records.len() != expected {
            tracing::warn!(
                user_id,
                %date,
                records = records.len(),
                expected,
                "Day does not have the nominal number of slots"
            );
        }
        let slots = records.len();

        let readings = clean_day(records)?;
        let features = score_series(&readings);
        let windows = build_windows(&features, cfg.window_length);
        if windows.is_empty() {
            return Err(MoodError::InsufficientData {
                slots: features.len(),
                window_length: cfg.window_length,
            });
        }

        tracing::debug!(user_id, %date, windows = windows.len(), "Clustering windows");
        let clustering = StateClusterer::new(ClusterConfig::from(cfg)).fit(&windows)?;

        let transitions =
            estimate_transitions(&clustering.labels, cfg.clusters, &cfg.estimated_horizons());
        let endpoint_means =
            endpoint_means(&windows, &clustering.labels, cfg.clusters, cfg.endpoint_tail);
        let summaries = clustering
            .centroids
            .iter()
            .zip(&clustering.counts)
            .enumerate()
            .map(|(k, (centroid, &count))| ClusterSummary::from_centroid(k, centroid, count))
            .collect();

        let degenerate_states = clustering.empty_states();
        if !degenerate_states.is_empty() {
            tracing::warn!(
                user_id,
                %date,
                states = ?degenerate_states,
                "States without windows are unreachable until the next build"
            );
        }

        tracing::info!(
            user_id,
            %date,
            windows = windows.len(),
            iterations = clustering.iterations,
            inertia = clustering.inertia,
            "Daily model built"
        );

        Ok(DailyModel {
            format_version: MODEL_FORMAT_VERSION.to_string(),
            model_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            date,
            built_at: Utc::now(),
            producer: ModelProducer {
                name: PRODUCER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                instance_id: Some(self.instance_id.to_string()),
            },
            slot_minutes: cfg.slot_minutes,
            window_length: cfg.window_length,
            clusters: cfg.clusters,
            endpoint_tail: cfg.endpoint_tail,
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            horizon_policy: cfg.horizon_policy,
            centroids: clustering.centroids,
            endpoint_means,
            transitions,
            summaries,
            degenerate_states,
            window_end_indices: windows.iter().map(|w| w.end_index).collect(),
            labels: clustering.labels,
            slots,
        })
    }
}

/// Per-state mean of the last `tail` frames of every assigned window.
///
/// States with no windows get `None`.
pub fn endpoint_means(
    windows: &[Window],
    labels: &[usize],
    states: usize,
    tail: usize,
) -> Vec<Option<FeatureVector>> {
    let mut sums = vec![[0.0; FEATURE_DIM]; states];
    let mut counts = vec![0usize; states];

    for (window, &label) in windows.iter().zip(labels) {
        if label >= states {
            continue;
        }
        for (s, v) in sums[label].iter_mut().zip(window.tail_mean(tail)) {
            *s += v;
        }
        counts[label] += 1;
    }

    sums.into_iter()
        .zip(counts)
        .map(|(mut sum, count)| {
            if count == 0 {
                return None;
            }
            for v in sum.iter_mut() {
                *v /= count as f64;
            }
            Some(FeatureVector::from_frame(&sum))
        })
        .collect()
}
