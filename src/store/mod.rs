//! Persistence and caching of daily models.
//!
//! Models are keyed by `(user_id, date)`. Stored models are never mutated;
//! a rebuild for the same key replaces the previous artifact.

pub mod cache;
pub mod file;

pub use cache::{CachedModelStore, ModelCache};
pub use file::FileModelStore;

use crate::core::model::{DailyModel, ModelKey};
use crate::error::MoodError;
use std::sync::Arc;

/// Get/put/exists access to daily models.
pub trait ModelStore: Send + Sync {
    /// Load the model for `key`, or [`MoodError::ModelNotFound`].
    fn get(&self, key: &ModelKey) -> Result<Arc<DailyModel>, MoodError>;

    /// Store `model` under its own key and return where it was written.
    fn put(&self, model: &DailyModel) -> Result<String, MoodError>;

    fn exists(&self, key: &ModelKey) -> Result<bool, MoodError>;
}

impl<S: ModelStore + ?Sized> ModelStore for Arc<S> {
    fn get(&self, key: &ModelKey) -> Result<Arc<DailyModel>, MoodError> {
        (**self).get(key)
    }

    fn put(&self, model: &DailyModel) -> Result<String, MoodError> {
        (**self).put(model)
    }

    fn exists(&self, key: &ModelKey) -> Result<bool, MoodError> {
        (**self).exists(key)
    }
}

pub(crate) fn not_found(key: &ModelKey) -> MoodError {
    MoodError::ModelNotFound {
        user_id: key.user_id.clone(),
        date: key.date,
    }
}
