use crate::error::{RecError, Result};
use crate::models::{Model, RatingKey};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelHandle(String);

impl ModelHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persists trained models. Loading a saved model reproduces its scores exactly.
pub trait ModelStore: Send + Sync {
    fn save<K: RatingKey>(&self, model: &Model<K>) -> Result<ModelHandle>;
    fn load<K: RatingKey>(&self, handle: &ModelHandle) -> Result<Model<K>>;
}

/// One bincode file per model under a directory; the handle is the file path.
#[derive(Debug, Clone)]
pub struct FileModelStore {
    directory: PathBuf,
}

impl FileModelStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path_for(&self, version: &str) -> PathBuf {
        self.directory.join(format!("{}.bin", version))
    }
}

impl ModelStore for FileModelStore {
    fn save<K: RatingKey>(&self, model: &Model<K>) -> Result<ModelHandle> {
        fs::create_dir_all(&self.directory)?;
        let path = self.path_for(&model.metadata().version);

        // never replace a saved model; an existing handle must keep loading it
        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, model)?;
        writer.flush()?;

        info!("Saved model {} to {}", model.metadata().version, path.display());
        Ok(ModelHandle::new(path.to_string_lossy()))
    }

    fn load<K: RatingKey>(&self, handle: &ModelHandle) -> Result<Model<K>> {
        let file = File::open(handle.as_str()).map_err(|e| match e.kind() {
            ErrorKind::NotFound => RecError::ModelNotFound(handle.to_string()),
            _ => RecError::Io(e),
        })?;

        let model: Model<K> = bincode::deserialize_from(BufReader::new(file))?;
        info!("Loaded model {} from {}", model.metadata().version, handle);
        Ok(model)
    }
}

/// Serialized models kept in memory, keyed by random handles.
#[derive(Debug, Default)]
pub struct InMemoryModelStore {
    blobs: DashMap<Uuid, Vec<u8>>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn remove(&self, handle: &ModelHandle) -> bool {
        Uuid::parse_str(handle.as_str())
            .map(|id| self.blobs.remove(&id).is_some())
            .unwrap_or(false)
    }
}

impl ModelStore for InMemoryModelStore {
    fn save<K: RatingKey>(&self, model: &Model<K>) -> Result<ModelHandle> {
        let id = Uuid::new_v4();
        self.blobs.insert(id, bincode::serialize(model)?);
        Ok(ModelHandle::new(id.to_string()))
    }

    fn load<K: RatingKey>(&self, handle: &ModelHandle) -> Result<Model<K>> {
        let missing = || RecError::ModelNotFound(handle.to_string());
        let id = Uuid::parse_str(handle.as_str()).map_err(|_| missing())?;
        let blob = self.blobs.get(&id).ok_or_else(missing)?;
        Ok(bincode::deserialize(blob.value())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{Solver, Trainer};
    use crate::config::TrainingConfig;
    use crate::data::{IdEncoder, RatingDataset};
    use crate::models::{ModelMetadata, RawRating};
    use nalgebra::DMatrix;

    fn trained_model() -> Model<String> {
        let raw: Vec<RawRating<String>> = [("a", "x", 4.0), ("a", "y", 2.0), ("b", "x", 3.0), ("c", "z", 5.0)]
            .iter()
            .map(|(u, i, r)| RawRating::new(u.to_string(), i.to_string(), *r))
            .collect();
        let encoder = IdEncoder::fit(&raw);
        let dataset = RatingDataset::encode(&encoder, &raw).unwrap();
        let trainer = Trainer::new(TrainingConfig {
            rank: 3,
            iterations: 5,
            solver: Solver::Sgd,
            learning_rate: 0.05,
            seed: Some(5),
            ..TrainingConfig::default()
        })
        .unwrap();
        trainer.fit(encoder, &dataset).unwrap()
    }

    fn constant_model(score: f32) -> Model<String> {
        let raw = vec![RawRating::new("u".to_string(), "m".to_string(), score)];
        Model::from_parts(
            IdEncoder::fit(&raw),
            DMatrix::from_element(1, 1, 1.0),
            DMatrix::from_element(1, 1, score),
            ModelMetadata::new(Solver::Als, 1, 0.0),
        )
        .unwrap()
    }

    fn assert_same_scores(a: &Model<String>, b: &Model<String>) {
        assert_eq!(a.encoder(), b.encoder());
        assert_eq!(a.rank(), b.rank());
        assert_eq!(a.metadata(), b.metadata());
        for u in 0..a.num_users() {
            for i in 0..a.num_items() {
                assert_eq!(a.score(u, i).unwrap(), b.score(u, i).unwrap());
            }
        }
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path().join("models"));
        let model = trained_model();

        let handle = store.save(&model).unwrap();
        assert!(Path::new(handle.as_str()).exists());

        let loaded: Model<String> = store.load(&handle).unwrap();
        assert_same_scores(&model, &loaded);
    }

    #[test]
    fn test_back_to_back_saves_keep_distinct_handles() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path());
        let first = constant_model(1.0);
        let second = constant_model(5.0);

        let first_handle = store.save(&first).unwrap();
        let second_handle = store.save(&second).unwrap();
        assert_ne!(first_handle, second_handle);

        let loaded: Model<String> = store.load(&first_handle).unwrap();
        assert_eq!(loaded.score(0, 0).unwrap(), 1.0);
        let loaded: Model<String> = store.load(&second_handle).unwrap();
        assert_eq!(loaded.score(0, 0).unwrap(), 5.0);
    }

    #[test]
    fn test_save_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path());
        let model = constant_model(2.0);

        let handle = store.save(&model).unwrap();
        assert!(matches!(store.save(&model), Err(RecError::Io(_))));
        let loaded: Model<String> = store.load(&handle).unwrap();
        assert_eq!(loaded.score(0, 0).unwrap(), 2.0);
    }

    #[test]
    fn test_in_memory_store_round_trip() {
        let store = InMemoryModelStore::new();
        let model = trained_model();

        let handle = store.save(&model).unwrap();
        assert_eq!(store.len(), 1);
        let loaded: Model<String> = store.load(&handle).unwrap();
        assert_same_scores(&model, &loaded);

        assert!(store.remove(&handle));
        assert!(matches!(
            store.load::<String>(&handle),
            Err(RecError::ModelNotFound(_))
        ));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path());
        let handle = ModelHandle::new(dir.path().join("absent.bin").to_string_lossy());
        assert!(matches!(
            store.load::<String>(&handle),
            Err(RecError::ModelNotFound(_))
        ));
    }
}
