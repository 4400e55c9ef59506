//! Process-wide model cache.
//!
//! Holds at most one model per user: the one for the latest date seen.
//! Entries are replaced wholesale when a build for the same or a later day
//! completes. Cached models are shared read-only.

use super::ModelStore;
use crate::core::model::{DailyModel, ModelKey};
use crate::error::MoodError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Read-mostly map of loaded models, keyed by user.
#[derive(Debug, Default)]
pub struct ModelCache {
    models: RwLock<HashMap<String, Arc<DailyModel>>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ModelKey) -> Option<Arc<DailyModel>> {
        self.models
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key.user_id)
            .filter(|model| model.date == key.date)
            .cloned()
    }

    /// Cache `model` unless a later day is already cached for its user.
    /// Returns whether the model was stored.
    pub fn insert(&self, model: Arc<DailyModel>) -> bool {
        let mut models = self.models.write().unwrap_or_else(|e| e.into_inner());
        match models.get(&model.user_id) {
            Some(current) if current.date > model.date => false,
            _ => {
                models.insert(model.user_id.clone(), model);
                true
            }
        }
    }

    /// Drop the entry for `key`; returns whether one was present.
    pub fn invalidate(&self, key: &ModelKey) -> bool {
        let mut models = self.models.write().unwrap_or_else(|e| e.into_inner());
        match models.get(&key.user_id) {
            Some(current) if current.date == key.date => {
                models.remove(&key.user_id);
                true
            }
            _ => false,
        }
    }

    pub fn clear(&self) {
        self.models
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.models.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A [`ModelStore`] fronted by a [`ModelCache`].
#[derive(Debug)]
pub struct CachedModelStore<S> {
    store: S,
    cache: ModelCache,
}

impl<S: ModelStore> CachedModelStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: ModelCache::new(),
        }
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn inner(&self) -> &S {
        &self.store
    }
}

impl<S: ModelStore> ModelStore for CachedModelStore<S> {
    fn get(&self, key: &ModelKey) -> Result<Arc<DailyModel>, MoodError> {
        if let Some(model) = self.cache.get(key) {
            tracing::debug!(model = %key, "Model cache hit");
            return Ok(model);
        }

        tracing::debug!(model = %key, "Model cache miss");
        let model = self.store.get(key)?;
        self.cache.insert(Arc::clone(&model));
        Ok(model)
    }

    fn put(&self, model: &DailyModel) -> Result<String, MoodError> {
        let location = self.store.put(model)?;
        self.cache.insert(Arc::new(model.clone()));
        Ok(location)
    }

    fn exists(&self, key: &ModelKey) -> Result<bool, MoodError> {
        if self.cache.get(key).is_some() {
            return Ok(true);
        }
        self.store.exists(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::not_found;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory store that counts reads.
    #[derive(Default)]
    struct CountingStore {
        models: Mutex<HashMap<ModelKey, DailyModel>>,
        reads: AtomicUsize,
    }

    impl ModelStore for CountingStore {
        fn get(&self, key: &ModelKey) -> Result<Arc<DailyModel>, MoodError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.models
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .map(Arc::new)
                .ok_or_else(|| not_found(key))
        }

        fn put(&self, model: &DailyModel) -> Result<String, MoodError> {
            self.models.lock().unwrap().insert(model.key(), model.clone());
            Ok(format!("memory://{}", model.key()))
        }

        fn exists(&self, key: &ModelKey) -> Result<bool, MoodError> {
            Ok(self.models.lock().unwrap().contains_key(key))
        }
    }

    fn model_on(user_id: &str, date: NaiveDate) -> DailyModel {
        use crate::collector::types::RawRecord;
        use crate::config::ModelConfig;
        use crate::core::builder::DailyModelBuilder;
        use chrono::{Duration, TimeZone, Utc};

        let start = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap());
        let records = (0..8)
            .map(|i| RawRecord {
                average_stress_index: Some(10.0 * i as f64),
                ..RawRecord::empty(start + Duration::minutes(10 * i))
            })
            .collect();
        DailyModelBuilder::new(ModelConfig {
            window_length: 4,
            clusters: 2,
            ..Default::default()
        })
        .build(user_id, date, records)
        .unwrap()
    }

    fn model(user_id: &str) -> DailyModel {
        model_on(user_id, NaiveDate::from_ymd_opt(2025, 11, 30).unwrap())
    }

    #[test]
    fn test_second_get_hits_cache() {
        let store = CachedModelStore::new(CountingStore::default());
        let model = model("user_001");
        store.inner().put(&model).unwrap();

        let first = store.get(&model.key()).unwrap();
        let second = store.get(&model.key()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.inner().reads.load(Ordering::SeqCst), 1);
        assert_eq!(store.cache().len(), 1);
    }

    #[test]
    fn test_put_replaces_cached_entry() {
        let store = CachedModelStore::new(CountingStore::default());
        let old = model("user_001");
        store.put(&old).unwrap();
        let new = model("user_001");
        store.put(&new).unwrap();

        let loaded = store.get(&old.key()).unwrap();
        assert_eq!(loaded.model_id, new.model_id);
        assert_eq!(store.inner().reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_miss_is_not_cached() {
        let store = CachedModelStore::new(CountingStore::default());
        let key = ModelKey::new("nobody", NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(matches!(store.get(&key), Err(MoodError::ModelNotFound { .. })));
        assert!(store.cache().is_empty());
        assert!(!store.exists(&key).unwrap());
    }

    #[test]
    fn test_invalidate() {
        let cache = ModelCache::new();
        let model = Arc::new(model("user_003"));
        cache.insert(Arc::clone(&model));
        assert!(cache.invalidate(&model.key()));
        assert!(!cache.invalidate(&model.key()));
        assert!(cache.get(&model.key()).is_none());
    }

    #[test]
    fn test_daily_rebuilds_keep_one_entry_per_user() {
        let store = CachedModelStore::new(CountingStore::default());
        let first = NaiveDate::from_ymd_opt(2025, 11, 26).unwrap();
        let days: Vec<NaiveDate> = (0..5).map(|d| first + chrono::Duration::days(d)).collect();
        for &day in &days {
            store.put(&model_on("user_001", day)).unwrap();
        }
        store.put(&model_on("user_002", days[0])).unwrap();

        assert_eq!(store.cache().len(), 2);
        let newest = ModelKey::new("user_001", days[4]);
        assert!(store.cache().get(&newest).is_some());
        assert!(store.cache().get(&ModelKey::new("user_001", days[0])).is_none());

        // an older day is served from the store without evicting the newest
        let older = store.get(&ModelKey::new("user_001", days[1])).unwrap();
        assert_eq!(older.date, days[1]);
        assert_eq!(store.inner().reads.load(Ordering::SeqCst), 1);
        assert!(store.cache().get(&newest).is_some());
        assert_eq!(store.cache().len(), 2);
    }

    #[test]
    fn test_invalidate_ignores_other_dates() {
        let cache = ModelCache::new();
        let model = Arc::new(model("user_004"));
        assert!(cache.insert(Arc::clone(&model)));

        let other_day = ModelKey::new("user_004", NaiveDate::from_ymd_opt(2025, 11, 29).unwrap());
        assert!(!cache.invalidate(&other_day));
        assert!(!cache.insert(Arc::new(model_on("user_004", other_day.date))));
        assert!(cache.get(&model.key()).is_some());
    }
}
