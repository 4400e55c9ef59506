//! Gap filling for one day of raw records.
//!
//! Continuous fields are linearly interpolated between valid neighbours and
//! forward/backward filled at the edges. Counts default to zero. Categorical
//! codes are forward then backward filled. A field with no valid value at all
//! falls back to a neutral constant.

use crate::collector::types::{
    event_count, PrecipitationCode, RawRecord, Reading, SkyCode, COMFORT_TEMPERATURE,
};
use crate::error::MoodError;

/// Neutral values for fields that are missing for the entire day.
const FALLBACK_STRESS_INDEX: f64 = 50.0;
const FALLBACK_SLEEP_SCORE: f64 = 50.0;
const FALLBACK_SLEEP_MINUTES: f64 = 420.0;
const FALLBACK_HUMIDITY: f64 = 50.0;

/// Sort, fill and return a fully-populated series of the same length.
pub fn clean_day(mut records: Vec<RawRecord>) -> Result<Vec<Reading>, MoodError> {
    if records.is_empty() {
        return Err(MoodError::Input("cannot clean an empty day".to_string()));
    }

    records.sort_by_key(|r| r.timestamp);

    let average_stress = fill_continuous(
        &column(&records, |r| r.average_stress_index),
        FALLBACK_STRESS_INDEX,
        "average_stress_index",
    );
    let recent_stress = fill_continuous(
        &column(&records, |r| r.recent_stress_index),
        FALLBACK_STRESS_INDEX,
        "recent_stress_index",
    );
    let sleep_score = fill_continuous(
        &column(&records, |r| r.latest_sleep_score),
        FALLBACK_SLEEP_SCORE,
        "latest_sleep_score",
    );
    let sleep_minutes = fill_continuous(
        &column(&records, |r| r.latest_sleep_duration),
        FALLBACK_SLEEP_MINUTES,
        "latest_sleep_duration",
    );
    let temperature = fill_continuous(
        &column(&records, |r| r.temperature),
        COMFORT_TEMPERATURE,
        "temperature",
    );
    let humidity = fill_continuous(
        &column(&records, |r| r.humidity),
        FALLBACK_HUMIDITY,
        "humidity",
    );
    let rain = fill_categorical(
        &column(&records, |r| r.rain_type),
        PrecipitationCode::NONE,
        "rainType",
    );
    let sky = fill_categorical(&column(&records, |r| r.sky), SkyCode::CLEAR, "sky");

    let cleaned = records
        .iter()
        .enumerate()
        .map(|(i, r)| Reading {
            timestamp: r.timestamp,
            average_stress_index: average_stress[i],
            recent_stress_index: recent_stress[i],
            latest_sleep_score: sleep_score[i],
            latest_sleep_duration: sleep_minutes[i],
            temperature: temperature[i],
            humidity: humidity[i],
            rain_type: rain[i],
            sky: sky[i],
            laughter: event_count(r.laughter),
            sigh: event_count(r.sigh),
        })
        .collect();

    Ok(cleaned)
}

fn column<T>(records: &[RawRecord], field: impl Fn(&RawRecord) -> Option<T>) -> Vec<Option<T>> {
    records.iter().map(field).collect()
}

/// Index-based linear interpolation with constant extrapolation at both ends.
fn fill_continuous(values: &[Option<f64>], fallback: f64, name: &str) -> Vec<f64> {
    let valid: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| x.is_finite()).map(|x| (i, x)))
        .collect();

    let (Some(&(first_idx, first_val)), Some(&(last_idx, last_val))) =
        (valid.first(), valid.last())
    else {
        tracing::warn!(field = name, fallback, "No valid values for the whole day");
        return vec![fallback; values.len()];
    };

    let mut filled = vec![0.0; values.len()];
    for slot in filled.iter_mut().take(first_idx + 1) {
        *slot = first_val;
    }
    for slot in filled.iter_mut().skip(last_idx) {
        *slot = last_val;
    }
    for pair in valid.windows(2) {
        let (i0, v0) = pair[0];
        let (i1, v1) = pair[1];
        let span = (i1 - i0) as f64;
        for (i, slot) in filled.iter_mut().enumerate().take(i1 + 1).skip(i0) {
            let t = (i - i0) as f64 / span;
            *slot = v0 + t * (v1 - v0);
        }
    }

    filled
}

/// Forward fill, then backward fill the leading gap.
fn fill_categorical<T: Copy>(values: &[Option<T>], fallback: T, name: &str) -> Vec<T> {
    let Some(first) = values.iter().flatten().next().copied() else {
        tracing::warn!(field = name, "No valid categorical values for the whole day");
        return vec![fallback; values.len()];
    };

    let mut current = first;
    values
        .iter()
        .map(|v| {
            if let Some(v) = v {
                current = *v;
            }
            current
        })
        .collect()
}
