//! Human-readable titles and descriptions for learned states.
//!
//! Deterministic text derived from a state's mean scores and its
//! valence/arousal. No model state beyond the summary is consulted.

use crate::core::model::ClusterSummary;
use serde::{Deserialize, Serialize};

/// Score below which a level reads as low.
const LOW_CUT: f64 = 0.33;
/// Score above which a level reads as high.
const HIGH_CUT: f64 = 0.66;

/// Title and description for one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDescription {
    pub title: String,
    pub description: String,
}

/// Three-way banding of a single score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    Moderate,
    High,
}

impl Level {
    pub fn of(score: f64) -> Self {
        if score < LOW_CUT {
            Level::Low
        } else if score > HIGH_CUT {
            Level::High
        } else {
            Level::Moderate
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    EnergizedPositive,
    RelaxedPositive,
    SteadyPositive,
    Drained,
    Tense,
    Mixed,
}

impl Tone {
    fn from_affect(valence: f64, arousal: f64) -> Self {
        if valence > 0.7 && arousal > 0.55 {
            Tone::EnergizedPositive
        } else if valence > 0.7 {
            Tone::RelaxedPositive
        } else if valence > 0.2 {
            Tone::SteadyPositive
        } else if valence < -0.3 && arousal < 0.4 {
            Tone::Drained
        } else if valence < -0.3 {
            Tone::Tense
        } else {
            Tone::Mixed
        }
    }

    fn is_positive(self) -> bool {
        matches!(
            self,
            Tone::EnergizedPositive | Tone::RelaxedPositive | Tone::SteadyPositive
        )
    }

    fn title(self) -> &'static str {
        match self {
            Tone::EnergizedPositive => "Energized positive state",
            Tone::RelaxedPositive => "Relaxed positive state",
            Tone::SteadyPositive => "Steady neutral-to-positive state",
            Tone::Drained => "Drained low state",
            Tone::Tense => "Tense or on-edge state",
            Tone::Mixed => "Mixed emotional state",
        }
    }
}

fn title_for(summary: &ClusterSummary) -> &'static str {
    let tone = Tone::from_affect(summary.valence, summary.arousal);
    let scores = &summary.mean_scores;
    let stress = Level::of(scores.stress);
    let fatigue = Level::of(scores.fatigue);
    let vibrancy = Level::of(scores.vibrancy);

    if tone.is_positive() && fatigue == Level::Low && vibrancy == Level::High {
        return "Upbeat positive state with good energy";
    }
    if tone.is_positive() && fatigue == Level::Moderate && vibrancy == Level::Low {
        return "Positive but somewhat tired state";
    }
    if tone == Tone::Drained && stress == Level::High {
        return "Worn-out state under heavy pressure";
    }
    if tone == Tone::RelaxedPositive && fatigue != Level::High {
        return "Calm and comfortable positive state";
    }
    tone.title()
}

/// Describe a state from its summary.
pub fn describe_state(summary: &ClusterSummary) -> StateDescription {
    let s = &summary.mean_scores;
    let mut parts: Vec<&str> = Vec::new();

    parts.push(if summary.valence > 0.7 {
        "Overall mood is quite good."
    } else if summary.valence > 0.2 {
        "Overall mood is stable and unremarkable."
    } else if summary.valence > -0.2 {
        "Mood is neither particularly good nor bad."
    } else {
        "Mood is somewhat subdued."
    });

    parts.push(if summary.arousal > 0.6 {
        "Energy is up, with room to take things on."
    } else if summary.arousal > 0.4 {
        "There is enough energy for everyday tasks."
    } else {
        "Energy is on the low side; rest suits this state better than exertion."
    });

    if s.stress > 0.6 {
        parts.push("Stress and tension are relatively high; some self-care would help.");
    } else if s.stress < 0.4 {
        parts.push("Stress is low and there is little sense of pressure.");
    }

    if s.calm > 0.65 {
        parts.push("The mind is fairly calm and settled.");
    } else if s.calm < 0.45 {
        parts.push("The mind may feel scattered or unsettled.");
    }

    parts.push(if s.fatigue > 0.6 {
        "Fatigue has built up and proper rest looks necessary."
    } else if s.fatigue > 0.35 {
        "Some tiredness is present, though not to the point of exhaustion."
    } else {
        "Fatigue is modest and overall condition is fairly good."
    });

    if s.vibrancy > 0.6 {
        parts.push("Interest and enjoyment come through clearly.");
    } else if s.vibrancy < 0.3 {
        parts.push("Interest and excitement are low; familiar things may feel easier than new ones.");
    }

    if s.weather > 0.7 {
        parts.push("Weather and surroundings are not getting in the way.");
    } else if s.weather < 0.4 {
        parts.push("Weather or surroundings may be weighing on condition.");
    }

    StateDescription {
        title: title_for(summary).to_string(),
        description: parts.join(" "),
    }
}
