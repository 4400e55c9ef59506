//! Transparency module for the Synheart Mood Engine.
//!
//! Aggregate counters describing what the engine has processed, exposed
//! through the `status` command.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, SharedTransparencyLog, TransparencyLog,
    TransparencyStats,
};
