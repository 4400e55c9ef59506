//! Feature scoring for a single reading.
//!
//! Every score is a pure function of one reading and lies in [0, 1].
//! There is no cross-slot state.

use crate::collector::types::{Reading, COMFORT_TEMPERATURE};
use serde::{Deserialize, Serialize};

/// Number of scores per reading.
pub const FEATURE_DIM: usize = 5;

/// Score names, in `Frame` order.
pub const FEATURE_NAMES: [&str; FEATURE_DIM] = [
    "StressScore",
    "CalmScore",
    "FatigueScore",
    "VibrancyScore",
    "WeatherScore",
];

/// A feature vector in array form, used by the distance and clustering code.
pub type Frame = [f64; FEATURE_DIM];

/// Sleep duration (minutes) treated as a full night.
const FULL_SLEEP_MINUTES: f64 = 600.0;

/// Event count at which laughter/sigh saturate.
const EVENT_SATURATION: f64 = 10.0;

/// Upper bound on combined weather discomfort.
const MAX_DISCOMFORT: f64 = 1.5;

/// The five behavioral scores of one slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub stress: f64,
    pub calm: f64,
    pub fatigue: f64,
    pub vibrancy: f64,
    pub weather: f64,
}

impl FeatureVector {
    pub fn to_frame(&self) -> Frame {
        [
            self.stress,
            self.calm,
            self.fatigue,
            self.vibrancy,
            self.weather,
        ]
    }

    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            stress: frame[0],
            calm: frame[1],
            fatigue: frame[2],
            vibrancy: frame[3],
            weather: frame[4],
        }
    }

    /// Euclidean distance to another vector.
    pub fn distance(&self, other: &FeatureVector) -> f64 {
        self.to_frame()
            .iter()
            .zip(other.to_frame().iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// (Calm + Vibrancy + Weather) - (Stress + Fatigue)
    pub fn valence(&self) -> f64 {
        (self.calm + self.vibrancy + self.weather) - (self.stress + self.fatigue)
    }

    /// (Stress + Vibrancy) / 2
    pub fn arousal(&self) -> f64 {
        (self.stress + self.vibrancy) / 2.0
    }
}

/// Score one reading.
pub fn score_reading(reading: &Reading) -> FeatureVector {
    let stress = clamp01(
        0.4 * (reading.average_stress_index / 100.0) + 0.6 * (reading.recent_stress_index / 100.0),
    );
    let calm = clamp01(1.0 - 0.9 * stress);

    let sleep_fatigue = clamp01(
        1.0 - 0.7 * (reading.latest_sleep_score / 100.0)
            - 0.3 * (reading.latest_sleep_duration / FULL_SLEEP_MINUTES),
    );
    let sigh = clamp01(reading.sigh / EVENT_SATURATION);
    let fatigue = clamp01(0.6 * sleep_fatigue + 0.4 * sigh);

    let laugh = clamp01(reading.laughter / EVENT_SATURATION);
    let vibrancy = clamp01(0.7 * laugh + 0.3 * (1.0 - fatigue));

    let weather = clamp01(1.0 - discomfort(reading));

    FeatureVector {
        stress,
        calm,
        fatigue,
        vibrancy,
        weather,
    }
}

/// Score a whole series, index-aligned with the input.
pub fn score_series(readings: &[Reading]) -> Vec<FeatureVector> {
    readings.iter().map(score_reading).collect()
}

/// Combined thermal, humidity, precipitation and sky discomfort.
fn discomfort(reading: &Reading) -> f64 {
    let thermal = (reading.temperature - COMFORT_TEMPERATURE).abs() / 20.0;
    let humid = ((reading.humidity - 60.0) / 40.0).max(0.0);
    (thermal + humid + reading.rain_type.penalty() + reading.sky.penalty())
        .clamp(0.0, MAX_DISCOMFORT)
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::{PrecipitationCode, SkyCode};
    use chrono::Utc;

    fn reading(stress: f64, sleep_score: f64, sleep_minutes: f64) -> Reading {
        Reading {
            timestamp: Utc::now(),
            average_stress_index: stress,
            recent_stress_index: stress,
            latest_sleep_score: sleep_score,
            latest_sleep_duration: sleep_minutes,
            temperature: 22.0,
            humidity: 50.0,
            rain_type: PrecipitationCode::NONE,
            sky: SkyCode::CLEAR,
            laughter: 0.0,
            sigh: 0.0,
        }
    }

    fn assert_in_unit_range(v: &FeatureVector) {
        for (name, score) in FEATURE_NAMES.iter().zip(v.to_frame()) {
            assert!((0.0..=1.0).contains(&score), "{name} out of range: {score}");
        }
    }

    #[test]
    fn test_stress_and_calm() {
        let mut r = reading(0.0, 80.0, 420.0);
        r.average_stress_index = 50.0;
        r.recent_stress_index = 100.0;
        let v = score_reading(&r);
        assert!((v.stress - 0.8).abs() < 1e-12);
        assert!((v.calm - 0.28).abs() < 1e-12);
    }

    #[test]
    fn test_fatigue_and_vibrancy() {
        let mut r = reading(0.0, 50.0, 300.0);
        r.sigh = 5.0;
        r.laughter = 20.0;
        let v = score_reading(&r);
        // sleep fatigue = 1 - 0.35 - 0.15 = 0.5; fatigue = 0.3 + 0.2
        assert!((v.fatigue - 0.5).abs() < 1e-12);
        assert!((v.vibrancy - (0.7 + 0.15)).abs() < 1e-12);
    }

    #[test]
    fn test_weather_penalties() {
        let mut r = reading(0.0, 80.0, 420.0);
        assert_eq!(score_reading(&r).weather, 1.0);

        r.temperature = 32.0;
        r.humidity = 80.0;
        r.rain_type = PrecipitationCode(1);
        r.sky = SkyCode(4);
        // 0.5 + 0.5 + 0.1 + 0.05 = 1.15 discomfort
        assert_eq!(score_reading(&r).weather, 0.0);

        r.temperature = 12.0;
        r.humidity = 40.0;
        r.rain_type = PrecipitationCode(3);
        r.sky = SkyCode::CLEAR;
        assert!((score_reading(&r).weather - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_scores_clamped_at_boundaries() {
        let cases = [
            reading(0.0, 0.0, 0.0),
            reading(100.0, 100.0, 600.0),
            reading(100.0, 0.0, 900.0),
            reading(150.0, -20.0, -10.0),
        ];
        for mut r in cases {
            for temp in [-30.0, 2.0, 22.0, 42.0, 60.0] {
                r.temperature = temp;
                r.humidity = 100.0;
                r.laughter = 1000.0;
                r.sigh = 1000.0;
                assert_in_unit_range(&score_reading(&r));
                r.laughter = 0.0;
                r.sigh = 0.0;
                assert_in_unit_range(&score_reading(&r));
            }
        }
    }

    #[test]
    fn test_valence_and_arousal() {
        let v = FeatureVector {
            stress: 0.2,
            calm: 0.8,
            fatigue: 0.1,
            vibrancy: 0.6,
            weather: 0.9,
        };
        assert!((v.valence() - 2.0).abs() < 1e-12);
        assert!((v.arousal() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_frame_round_trip_and_distance() {
        let v = FeatureVector {
            stress: 0.1,
            calm: 0.2,
            fatigue: 0.3,
            vibrancy: 0.4,
            weather: 0.5,
        };
        assert_eq!(FeatureVector::from_frame(&v.to_frame()), v);
        assert_eq!(v.distance(&v), 0.0);

        let w = FeatureVector {
            stress: 0.4,
            calm: 0.6,
            ..v
        };
        assert!((v.distance(&w) - 0.5).abs() < 1e-12);
    }
}
