//! Raw reading types consumed by the mood engine.
//!
//! `RawRecord` mirrors the upstream wire shape, where any measurement may be
//! missing. `Reading` is the fully-populated form produced by the day cleaner
//! and by live-reading conversion.

use crate::error::MoodError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sky code the weather service uses for an overcast sky.
pub const OVERCAST_SKY_CODE: u8 = 4;

/// Temperature (°C) with no thermal discomfort.
pub const COMFORT_TEMPERATURE: f64 = 22.0;

/// Categorical precipitation code from the weather service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrecipitationCode(pub u8);

impl PrecipitationCode {
    pub const NONE: PrecipitationCode = PrecipitationCode(0);

    /// Discomfort added by this precipitation.
    pub fn penalty(self) -> f64 {
        match self.0 {
            1 => 0.1,
            2 | 3 => 0.2,
            _ => 0.0,
        }
    }
}

/// Categorical sky-condition code from the weather service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkyCode(pub u8);

impl SkyCode {
    pub const CLEAR: SkyCode = SkyCode(1);

    /// Discomfort added by this sky condition.
    pub fn penalty(self) -> f64 {
        if self.0 == OVERCAST_SKY_CODE {
            0.05
        } else {
            0.0
        }
    }
}

impl Default for SkyCode {
    fn default() -> Self {
        SkyCode::CLEAR
    }
}

/// One slot of upstream data, exactly as delivered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub average_stress_index: Option<f64>,
    #[serde(default)]
    pub recent_stress_index: Option<f64>,
    #[serde(default)]
    pub latest_sleep_score: Option<f64>,
    /// Minutes
    #[serde(default)]
    pub latest_sleep_duration: Option<f64>,
    /// °C
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Percent
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default, rename = "rainType")]
    pub rain_type: Option<PrecipitationCode>,
    #[serde(default)]
    pub sky: Option<SkyCode>,
    #[serde(default)]
    pub laughter: Option<f64>,
    #[serde(default)]
    pub sigh: Option<f64>,
}

impl RawRecord {
    /// A record with only a timestamp; every measurement missing.
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }
}

/// A fully-populated slot reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub average_stress_index: f64,
    pub recent_stress_index: f64,
    pub latest_sleep_score: f64,
    pub latest_sleep_duration: f64,
    pub temperature: f64,
    pub humidity: f64,
    #[serde(rename = "rainType")]
    pub rain_type: PrecipitationCode,
    pub sky: SkyCode,
    /// Event counts; never negative after cleaning
    pub laughter: f64,
    pub sigh: f64,
}

/// Weather block of a live reading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveWeather {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default, rename = "rainType")]
    pub rain_type: Option<PrecipitationCode>,
    #[serde(default)]
    pub sky: Option<SkyCode>,
}

/// Audio-event counts of a live reading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveEmotion {
    #[serde(default)]
    pub sigh_count: Option<f64>,
    #[serde(default)]
    pub laugh_count: Option<f64>,
}

/// The current-moment reading sent by the realtime client.
///
/// Stress and sleep fields are required; weather and emotion blocks may be
/// partially or entirely absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveReading {
    #[serde(default)]
    pub average_stress_index: Option<f64>,
    #[serde(default)]
    pub recent_stress_index: Option<f64>,
    #[serde(default)]
    pub latest_sleep_score: Option<f64>,
    #[serde(default)]
    pub latest_sleep_duration: Option<f64>,
    #[serde(default)]
    pub weather: Option<LiveWeather>,
    #[serde(default)]
    pub emotion: Option<LiveEmotion>,
}

impl LiveReading {
    /// Convert into a scoreable reading stamped with `timestamp`.
    pub fn into_reading(self, timestamp: DateTime<Utc>) -> Result<Reading, MoodError> {
        let required = |value: Option<f64>, name: &str| {
            value.ok_or_else(|| MoodError::Input(format!("missing required field: {name}")))
        };

        let average_stress_index = required(self.average_stress_index, "average_stress_index")?;
        let recent_stress_index = required(self.recent_stress_index, "recent_stress_index")?;
        let latest_sleep_score = required(self.latest_sleep_score, "latest_sleep_score")?;
        let latest_sleep_duration = required(self.latest_sleep_duration, "latest_sleep_duration")?;

        let weather = self.weather.unwrap_or_default();
        let emotion = self.emotion.unwrap_or_default();

        Ok(Reading {
            timestamp,
            average_stress_index,
            recent_stress_index,
            latest_sleep_score,
            latest_sleep_duration,
            temperature: weather.temperature.unwrap_or(COMFORT_TEMPERATURE),
            // 60% is the humidity discomfort threshold, so a missing value adds nothing
            humidity: weather.humidity.unwrap_or(60.0),
            rain_type: weather.rain_type.unwrap_or_default(),
            sky: weather.sky.unwrap_or_default(),
            laughter: event_count(emotion.laugh_count),
            sigh: event_count(emotion.sigh_count),
        })
    }
}

/// Missing or negative counts count as zero.
pub fn event_count(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0).max(0.0)
}

impl From<&Reading> for LiveReading {
    fn from(reading: &Reading) -> Self {
        Self {
            average_stress_index: Some(reading.average_stress_index),
            recent_stress_index: Some(reading.recent_stress_index),
            latest_sleep_score: Some(reading.latest_sleep_score),
            latest_sleep_duration: Some(reading.latest_sleep_duration),
            weather: Some(LiveWeather {
                temperature: Some(reading.temperature),
                humidity: Some(reading.humidity),
                rain_type: Some(reading.rain_type),
                sky: Some(reading.sky),
            }),
            emotion: Some(LiveEmotion {
                sigh_count: Some(reading.sigh),
                laugh_count: Some(reading.laughter),
            }),
        }
    }
}
