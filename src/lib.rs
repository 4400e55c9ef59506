//! Synheart Mood Engine - daily mood-state models and realtime forecasts.
//!
//! Once a day the engine turns a user's stress, sleep, weather and emotion
//! readings into a small set of recurring mood states, learned by clustering
//! sliding windows of per-slot scores under dynamic time warping, and
//! estimates how likely each state is to follow another. During the day a
//! single live reading is mapped onto the nearest state and the most likely
//! next state is forecast from the stored transition matrices.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       Synheart Mood Engine                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────┐   ┌──────────┐   ┌─────────────┐  │
//! │  │ Raw source│──▶│ Cleaner  │──▶│ Scoring  │──▶│  Windowing  │  │
//! │  │(spool/API)│   │(fill gap)│   │(5 scores)│   │ (L slots)   │  │
//! │  └───────────┘   └──────────┘   └──────────┘   └─────────────┘  │
//! │                                                       │         │
//! │                                                       ▼         │
//! │  ┌───────────┐   ┌──────────┐   ┌──────────┐   ┌─────────────┐  │
//! │  │Classifier │◀──│  Store   │◀──│Transition│◀──│ DTW k-means │  │
//! │  │(realtime) │   │ (cached) │   │ matrices │   │  (K states) │  │
//! │  └───────────┘   └──────────┘   └──────────┘   └─────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use synheart_mood_engine::{collector::SpoolSource, Config, MoodEngine};
//!
//! let config = Config::default();
//! let engine = MoodEngine::from_config(config.clone());
//! let source = SpoolSource::new(config.raw_path());
//! let date = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
//!
//! let outcome = engine.build_day("user_001", date, &source).expect("build failed");
//! println!("{} windows clustered", outcome.windows);
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod store;
pub mod transparency;

#[cfg(feature = "upstream")]
pub mod upstream;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use collector::{DayBatch, LiveReading, RawDataSource, RawRecord, Reading};
pub use config::{Config, HorizonPolicy, ModelConfig};
pub use core::{DailyModel, DailyModelBuilder, FeatureVector, InferenceResult, TransitionMatrix};
pub use engine::{BuildOutcome, MoodEngine};
pub use error::MoodError;
pub use store::{CachedModelStore, FileModelStore, ModelStore};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

#[cfg(feature = "upstream")]
pub use upstream::{BlockingUpstreamClient, UpstreamClient, UpstreamError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Data handling notice shown by `synheart-mood status`.
pub const DATA_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║            SYNHEART MOOD ENGINE - DATA HANDLING NOTICE           ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  ✓ WHAT A DAILY MODEL KEEPS:                                     ║
║    • State shapes built from five derived scores (stress, calm,  ║
║      fatigue, vibrancy, weather)                                 ║
║    • State-to-state transition rates                             ║
║                                                                  ║
║  ✗ WHAT A DAILY MODEL NEVER HOLDS:                               ║
║    • Raw per-slot readings                                       ║
║    • Live readings sent for inference or their preferences       ║
║                                                                  ║
║  Models stay under the local data directory and are replaced     ║
║  when the same day is rebuilt.                                   ║
║                                                                  ║
║  You can view engine statistics anytime with:                    ║
║    synheart-mood status                                          ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
