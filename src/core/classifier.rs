//! Realtime classification of a single reading against a daily model.

use crate::collector::types::Reading;
use crate::core::describe::{describe_state, StateDescription};
use crate::core::features::{score_reading, FeatureVector};
use crate::core::model::DailyModel;
use crate::error::MoodError;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Current and forecast state for one reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePrediction {
    pub features: FeatureVector,
    pub current_state: usize,
    /// Distance from the reading to the current state's endpoint mean
    pub current_distance: f64,
    pub future_state: usize,
    pub future_probability: f64,
    pub forecast_steps: usize,
}

/// Inference payload returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub user_id: String,
    /// RFC 3339 UTC timestamp of the inference
    pub inference_time: String,
    pub current_id: usize,
    pub current_title: String,
    pub current_description: String,
    pub future_id: usize,
    pub future_title: String,
    pub future_description: String,
    pub model_date: NaiveDate,
    pub forecast_steps: usize,
}

/// Classify `reading` and forecast `forecast_minutes` ahead.
pub fn classify(
    model: &DailyModel,
    reading: &Reading,
    forecast_minutes: u32,
) -> Result<StatePrediction, MoodError> {
    let features = score_reading(reading);
    let (current_state, current_distance) = model.nearest_state(&features).ok_or_else(|| {
        MoodError::Internal(format!("model {} has no reachable states", model.key()))
    })?;

    let forecast_steps = model.steps_for_minutes(forecast_minutes);
    let matrix = model.transition_for_steps(forecast_steps)?;
    let (future_state, future_probability) =
        matrix.most_likely(current_state).ok_or_else(|| {
            MoodError::Internal(format!(
                "transition matrix of model {} has no row for state {current_state}",
                model.key()
            ))
        })?;

    Ok(StatePrediction {
        features,
        current_state,
        current_distance,
        future_state,
        future_probability,
        forecast_steps,
    })
}

fn describe(model: &DailyModel, state: usize) -> Result<StateDescription, MoodError> {
    model
        .summary(state)
        .map(describe_state)
        .ok_or_else(|| {
            MoodError::Internal(format!(
                "model {} has no summary for state {state}",
                model.key()
            ))
        })
}

/// Full inference: classification plus titles and descriptions.
pub fn infer(
    model: &DailyModel,
    reading: &Reading,
    forecast_minutes: u32,
    now: DateTime<Utc>,
) -> Result<InferenceResult, MoodError> {
    let prediction = classify(model, reading, forecast_minutes)?;
    let current = describe(model, prediction.current_state)?;
    let future = describe(model, prediction.future_state)?;

    tracing::debug!(
        user_id = %model.user_id,
        current = prediction.current_state,
        future = prediction.future_state,
        steps = prediction.forecast_steps,
        "Reading classified"
    );

    Ok(InferenceResult {
        user_id: model.user_id.clone(),
        inference_time: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        current_id: prediction.current_state,
        current_title: current.title,
        current_description: current.description,
        future_id: prediction.future_state,
        future_title: future.title,
        future_description: future.description,
        model_date: model.date,
        forecast_steps: prediction.forecast_steps,
    })
}
