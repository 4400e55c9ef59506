//! Shape-aware clustering of feature windows into behavioral states.
//!
//! K-means under the band-constrained DTW distance: windows are assigned to
//! the nearest centroid, centroids are recomputed as DTW barycenters of their
//! members, and the two steps alternate for a fixed iteration budget or until
//! assignments stop changing.
//!
//! Seeding is deterministic: the first centroid is window `seed % N`, each
//! following centroid is the window farthest from every centroid chosen so far.
//! With fewer windows than states some centroids are duplicates; ties always go
//! to the lowest state id, so duplicates end up with no members. A state with
//! no members, whether a seeded duplicate or one that lost every window during
//! reassignment, keeps its previous centroid.

use crate::config::ModelConfig;
use crate::core::dtw::{dba_barycenter, dtw_distance};
use crate::core::features::Frame;
use crate::core::windowing::Window;
use crate::error::MoodError;
use serde::{Deserialize, Serialize};

/// Clustering parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterConfig {
    pub clusters: usize,
    pub max_iterations: usize,
    pub barycenter_iterations: usize,
    pub warping_radius: usize,
    pub seed: u64,
}

impl From<&ModelConfig> for ClusterConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            clusters: config.clusters,
            max_iterations: config.max_iterations,
            barycenter_iterations: config.barycenter_iterations,
            warping_radius: config.warping_radius,
            seed: config.seed,
        }
    }
}

/// Result of clustering a day's windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clustering {
    /// State label per window, in window order
    pub labels: Vec<usize>,
    /// One centroid shape per state
    pub centroids: Vec<Vec<Frame>>,
    /// Windows assigned to each state
    pub counts: Vec<usize>,
    /// Update rounds actually run
    pub iterations: usize,
    /// Sum of squared distances from each window to its centroid
    pub inertia: f64,
}

impl Clustering {
    /// States that received no windows.
    pub fn empty_states(&self) -> Vec<usize> {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == 0)
            .map(|(k, _)| k)
            .collect()
    }
}

/// Groups windows into `K` states.
#[derive(Debug, Clone)]
pub struct StateClusterer {
    config: ClusterConfig,
}

impl StateClusterer {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Distance used for assignment.
    pub fn distance(&self, a: &[Frame], b: &[Frame]) -> f64 {
        dtw_distance(a, b, self.config.warping_radius)
    }

    /// Cluster `windows` into the configured number of states.
    pub fn fit(&self, windows: &[Window]) -> Result<Clustering, MoodError> {
        if windows.is_empty() {
            return Err(MoodError::Internal(
                "clustering requires at least one window".to_string(),
            ));
        }
        if self.config.clusters == 0 {
            return Err(MoodError::Internal(
                "clustering requires at least one state".to_string(),
            ));
        }
        let length = windows[0].len();
        if windows.iter().any(|w| w.len() != length) {
            return Err(MoodError::Internal(
                "all windows must have the same length".to_string(),
            ));
        }

        let mut centroids = self.initial_centroids(windows);
        let (mut labels, mut inertia) = self.assign(windows, &centroids);
        let mut iterations = 0;

        for _ in 0..self.config.max_iterations {
            iterations += 1;
            centroids = self.update_centroids(windows, &labels, &centroids);

            let (new_labels, new_inertia) = self.assign(windows, &centroids);
            inertia = new_inertia;
            if new_labels == labels {
                break;
            }
            labels = new_labels;
        }

        let mut counts = vec![0; self.config.clusters];
        for &label in &labels {
            counts[label] += 1;
        }

        Ok(Clustering {
            labels,
            centroids,
            counts,
            iterations,
            inertia,
        })
    }

    /// Farthest-first seeding starting from window `seed % N`.
    fn initial_centroids(&self, windows: &[Window]) -> Vec<Vec<Frame>> {
        let n = windows.len();
        let first = (self.config.seed % n as u64) as usize;

        let mut chosen = vec![first];
        let mut nearest: Vec<f64> = windows
            .iter()
            .map(|w| self.distance(&w.frames, &windows[first].frames))
            .collect();

        while chosen.len() < self.config.clusters {
            let mut best = 0;
            for (i, &d) in nearest.iter().enumerate() {
                if d > nearest[best] {
                    best = i;
                }
            }
            chosen.push(best);
            for (i, w) in windows.iter().enumerate() {
                let d = self.distance(&w.frames, &windows[best].frames);
                if d < nearest[i] {
                    nearest[i] = d;
                }
            }
        }

        chosen.into_iter().map(|i| windows[i].frames.clone()).collect()
    }

    /// Nearest-centroid labels (lowest id on ties) and total inertia.
    fn assign(&self, windows: &[Window], centroids: &[Vec<Frame>]) -> (Vec<usize>, f64) {
        let mut inertia = 0.0;
        let labels = windows
            .iter()
            .map(|w| {
                let mut best = 0;
                let mut best_distance = f64::INFINITY;
                for (k, centroid) in centroids.iter().enumerate() {
                    let d = self.distance(&w.frames, centroid);
                    if d < best_distance {
                        best = k;
                        best_distance = d;
                    }
                }
                inertia += best_distance * best_distance;
                best
            })
            .collect();
        (labels, inertia)
    }

    /// Barycenter update; empty states keep their previous centroid.
    fn update_centroids(
        &self,
        windows: &[Window],
        labels: &[usize],
        centroids: &[Vec<Frame>],
    ) -> Vec<Vec<Frame>> {
        centroids
            .iter()
            .enumerate()
            .map(|(k, centroid)| {
                let members: Vec<&[Frame]> = windows
                    .iter()
                    .zip(labels)
                    .filter(|(_, &label)| label == k)
                    .map(|(w, _)| w.frames.as_slice())
                    .collect();
                if members.is_empty() {
                    centroid.clone()
                } else {
                    dba_barycenter(
                        centroid,
                        &members,
                        self.config.warping_radius,
                        self.config.barycenter_iterations,
                    )
                }
            })
            .collect()
    }
}
