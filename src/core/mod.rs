//! Core functionality for the Synheart Mood Engine.
//!
//! This module contains:
//! - Day cleaning and per-slot feature scoring
//! - Sliding windows and DTW-based state clustering
//! - Transition estimation and daily model building
//! - Realtime classification and state descriptions

pub mod builder;
pub mod classifier;
pub mod cleaner;
pub mod cluster;
pub mod describe;
pub mod dtw;
pub mod features;
pub mod model;
pub mod transitions;
pub mod windowing;

// Re-export commonly used types
pub use builder::DailyModelBuilder;
pub use classifier::{classify, infer, InferenceResult, StatePrediction};
pub use cleaner::clean_day;
pub use cluster::{ClusterConfig, Clustering, StateClusterer};
pub use describe::{describe_state, StateDescription};
pub use features::{score_reading, score_series, FeatureVector, Frame, FEATURE_NAMES};
pub use model::{ClusterSummary, DailyModel, ModelKey, PRODUCER_NAME};
pub use transitions::{estimate_transitions, TransitionMatrix};
pub use windowing::{build_windows, Window};
