//! The persisted daily model and its per-state summaries.

use crate::config::HorizonPolicy;
use crate::core::features::{FeatureVector, Frame, FEATURE_DIM};
use crate::core::transitions::TransitionMatrix;
use crate::error::MoodError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use uuid::Uuid;

/// Model artifact format version.
pub const MODEL_FORMAT_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "synheart-mood-engine";

/// Software that built a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProducer {
    pub name: String,
    pub version: String,
    /// Builder instance identifier (UUID)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

/// Storage key of a daily model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelKey {
    pub user_id: String,
    pub date: NaiveDate,
}

impl ModelKey {
    pub fn new(user_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            date,
        }
    }
}

impl std::fmt::Display for ModelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user_id, self.date.format("%Y-%m-%d"))
    }
}

/// Mean scores of one state's centroid plus derived valence/arousal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster_id: usize,
    pub mean_scores: FeatureVector,
    pub valence: f64,
    pub arousal: f64,
    /// Training windows assigned to this state
    pub window_count: usize,
}

impl ClusterSummary {
    /// Summarise a centroid by averaging over its time axis.
    pub fn from_centroid(cluster_id: usize, centroid: &[Frame], window_count: usize) -> Self {
        let mut mean = [0.0; FEATURE_DIM];
        if !centroid.is_empty() {
            for (d, m) in mean.iter_mut().enumerate() {
                *m = centroid.iter().map(|frame| frame[d]).mean();
            }
        }
        let mean_scores = FeatureVector::from_frame(&mean);

        Self {
            cluster_id,
            mean_scores,
            valence: mean_scores.valence(),
            arousal: mean_scores.arousal(),
            window_count,
        }
    }
}

/// Everything inference needs about one user's day.
///
/// Built once, then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyModel {
    pub format_version: String,
    pub model_id: Uuid,
    pub user_id: String,
    pub date: NaiveDate,
    pub built_at: DateTime<Utc>,
    pub producer: ModelProducer,
    pub slot_minutes: u32,
    pub window_length: usize,
    pub clusters: usize,
    pub endpoint_tail: usize,
    pub feature_names: Vec<String>,
    pub horizon_policy: HorizonPolicy,
    /// `clusters` centroid shapes, each `window_length` frames
    pub centroids: Vec<Vec<Frame>>,
    /// Per-state endpoint mean; `None` for states without windows
    pub endpoint_means: Vec<Option<FeatureVector>>,
    /// Directly estimated matrices, ascending by horizon
    pub transitions: Vec<TransitionMatrix>,
    pub summaries: Vec<ClusterSummary>,
    pub degenerate_states: Vec<usize>,
    /// State label of each training window
    pub labels: Vec<usize>,
    /// Last slot index of each training window
    pub window_end_indices: Vec<usize>,
    /// Raw records the cleaner received
    pub slots: usize,
}

impl DailyModel {
    pub fn key(&self) -> ModelKey {
        ModelKey::new(self.user_id.clone(), self.date)
    }

    /// Endpoint mean of `state`, failing for degenerate states.
    pub fn endpoint_mean(&self, state: usize) -> Result<&FeatureVector, MoodError> {
        match self.endpoint_means.get(state) {
            Some(Some(mean)) => Ok(mean),
            Some(None) => Err(MoodError::DegenerateState { state }),
            None => Err(MoodError::Input(format!(
                "state {state} out of range (model has {} states)",
                self.clusters
            ))),
        }
    }

    /// Nearest reachable state by Euclidean distance to its endpoint mean.
    ///
    /// Ties go to the lowest state id. `None` only if every state is degenerate.
    pub fn nearest_state(&self, features: &FeatureVector) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (state, mean) in self.endpoint_means.iter().enumerate() {
            let Some(mean) = mean else { continue };
            let d = features.distance(mean);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((state, d));
            }
        }
        best
    }

    /// Directly estimated matrix for exactly `horizon` steps.
    pub fn transition(&self, horizon: usize) -> Option<&TransitionMatrix> {
        self.transitions.iter().find(|p| p.horizon == horizon)
    }

    /// Forecast steps for a horizon in minutes: `max(1, minutes / slot_minutes)`.
    pub fn steps_for_minutes(&self, minutes: u32) -> usize {
        if self.slot_minutes == 0 {
            return 1;
        }
        ((minutes / self.slot_minutes) as usize).max(1)
    }

    /// Matrix used for a forecast of `steps` window-steps.
    ///
    /// Under [`HorizonPolicy::Direct`] an exactly matching estimated matrix is
    /// preferred; otherwise the one-step matrix is raised to `steps`.
    pub fn transition_for_steps(&self, steps: usize) -> Result<TransitionMatrix, MoodError> {
        if self.horizon_policy == HorizonPolicy::Direct {
            if let Some(direct) = self.transition(steps) {
                return Ok(direct.clone());
            }
        }
        let one_step = self.transition(1).ok_or_else(|| {
            MoodError::Internal(format!(
                "model {} has no one-step transition matrix",
                self.key()
            ))
        })?;
        Ok(one_step.power(steps))
    }

    pub fn summary(&self, state: usize) -> Option<&ClusterSummary> {
        self.summaries.get(state)
    }
}
