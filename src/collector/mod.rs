//! Raw data collection for the mood engine.
//!
//! This module defines the upstream record schema and the sources that
//! deliver one user's day of readings.

pub mod spool;
pub mod types;

// Re-export commonly used types
pub use spool::{
    parse_day_records, parse_day_value, validate_user_id, DayBatch, MemorySource, RawDataSource,
    SpoolSource,
};
pub use types::{
    event_count, LiveEmotion, LiveReading, LiveWeather, PrecipitationCode, RawRecord, Reading, SkyCode,
    COMFORT_TEMPERATURE, OVERCAST_SKY_CODE,
};
