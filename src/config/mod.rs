use crate::algorithms::initializer::InitializationMethod;
use crate::algorithms::optimizer::OptimizerKind;
use crate::algorithms::Solver;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub training: TrainingConfig,
    pub recommendation: RecommendationConfig,
    pub model_store: ModelStoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub has_header: bool,
    pub delimiter: char,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub rank: usize,
    pub iterations: usize,
    /// Step size for the SGD solver; ignored by ALS.
    pub learning_rate: f64,
    pub regularization: f64,
    pub solver: Solver,
    pub optimizer: OptimizerKind,
    pub initialization: InitializationMethod,
    /// Seed for initialization and shuffling; fresh entropy when unset.
    pub seed: Option<u64>,
    /// Worker threads for ALS passes. Zero lets rayon decide.
    pub threads: usize,
    /// Only consulted when training with a validation set.
    pub early_stopping: Option<EarlyStopping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarlyStopping {
    pub patience: usize,
    pub min_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// A rounded score must be strictly above this to recommend.
    pub threshold: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelStoreConfig {
    pub directory: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            train_path: PathBuf::from("data/recommendation-ratings-train.csv"),
            test_path: PathBuf::from("data/recommendation-ratings-test.csv"),
            has_header: true,
            delimiter: ',',
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            rank: 100,
            iterations: 20,
            learning_rate: 0.1,
            regularization: 0.1,
            solver: Solver::Als,
            optimizer: OptimizerKind::Sgd,
            initialization: InitializationMethod::default(),
            seed: None,
            threads: num_cpus::get(),
            early_stopping: None,
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self { threshold: 3.5 }
    }
}

impl Default for ModelStoreConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("model"),
        }
    }
}

impl Config {
    /// Layers `path` and `MOVIEREC__SECTION__KEY` environment variables over the defaults.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("MOVIEREC").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
