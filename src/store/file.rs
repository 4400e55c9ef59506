//! JSON files on disk: `<root>/<user_id>/<YYYY-MM-DD>.json`.

use super::{not_found, ModelStore};
use crate::collector::spool::validate_user_id;
use crate::core::model::{DailyModel, ModelKey};
use crate::error::MoodError;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File-backed model store.
#[derive(Debug, Clone)]
pub struct FileModelStore {
    root: PathBuf,
}

impl FileModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the model for `key`.
    pub fn path_for(&self, key: &ModelKey) -> PathBuf {
        self.root
            .join(&key.user_id)
            .join(format!("{}.json", key.date.format("%Y-%m-%d")))
    }
}

impl ModelStore for FileModelStore {
    fn get(&self, key: &ModelKey) -> Result<Arc<DailyModel>, MoodError> {
        validate_user_id(&key.user_id)?;
        let path = self.path_for(key);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found(key)),
            Err(e) => return Err(e.into()),
        };
        let model: DailyModel = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| corrupt(&path, e))?;
        Ok(Arc::new(model))
    }

    fn put(&self, model: &DailyModel) -> Result<String, MoodError> {
        let key = model.key();
        validate_user_id(&key.user_id)?;
        let path = self.path_for(&key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically via a temp file private to this build
        let temp_path = path.with_extension(format!("{}.tmp", model.model_id));
        let written = write_model(&temp_path, model).and_then(|()| fs::rename(&temp_path, &path));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        tracing::debug!(model = %key, path = %path.display(), "Model written");
        Ok(path.display().to_string())
    }

    fn exists(&self, key: &ModelKey) -> Result<bool, MoodError> {
        validate_user_id(&key.user_id)?;
        Ok(self.path_for(key).is_file())
    }
}

fn write_model(path: &Path, model: &DailyModel) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, model)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
    writer.flush()
}

/// A model file that exists but cannot be decoded is a storage fault.
fn corrupt(path: &Path, err: serde_json::Error) -> MoodError {
    tracing::error!(path = %path.display(), error = %err, "Stored model is unreadable");
    MoodError::Storage(io::Error::new(
        ErrorKind::InvalidData,
        format!("unreadable model file {}: {err}", path.display()),
    ))
}
