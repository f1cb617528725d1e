use crate::algorithms::Trainer;
use crate::config::Config;
use crate::data::{IdEncoder, RatingDataset, RatingSource};
use crate::error::{RecError, Result};
use crate::models::{Model, ModelMetadata, RatingKey, RawRating};
use crate::services::model_store::{ModelHandle, ModelStore};
use crate::utils::metrics::{self, RegressionMetrics};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Summary of one load, train, evaluate and save run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub metadata: ModelMetadata,
    pub metrics: RegressionMetrics,
    pub handle: ModelHandle,
    pub num_users: usize,
    pub num_items: usize,
    pub train_ratings: usize,
    pub test_ratings: usize,
    /// Test rows dropped because a key was never seen in training.
    pub skipped_test_ratings: usize,
    pub elapsed_ms: u128,
}

pub struct TrainingService<S> {
    config: Arc<Config>,
    trainer: Trainer,
    store: S,
    skip_unknown_test_keys: bool,
}

impl<S: ModelStore> TrainingService<S> {
    pub fn new(config: Arc<Config>, store: S) -> Result<Self> {
        let trainer = Trainer::new(config.training.clone())?;
        Ok(Self {
            config,
            trainer,
            store,
            skip_unknown_test_keys: false,
        })
    }

    /// Drop test rows with unseen keys instead of failing the run. Dropped
    /// rows are logged and counted in the report.
    pub fn skip_unknown_test_keys(mut self, skip: bool) -> Self {
        self.skip_unknown_test_keys = skip;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn train<K: RatingKey>(&self, train: &[RawRating<K>]) -> Result<Model<K>> {
        if train.is_empty() {
            return Err(RecError::EmptyTrainingSet);
        }
        let encoder = IdEncoder::fit(train);
        let dataset = RatingDataset::encode(&encoder, train)?;
        self.trainer.fit(encoder, &dataset)
    }

    pub fn encode_test_set<K: RatingKey>(&self, model: &Model<K>, test: &[RawRating<K>]) -> Result<(RatingDataset, usize)> {
        if !self.skip_unknown_test_keys {
            return Ok((RatingDataset::encode(model.encoder(), test)?, 0));
        }

        let mut kept = Vec::with_capacity(test.len());
        let mut skipped = 0;
        for rating in test {
            match model.encoder().encode(rating) {
                Ok(encoded) => kept.push(encoded),
                Err(RecError::UnknownKey { .. }) => skipped += 1,
                Err(e) => return Err(e),
            }
        }
        if skipped > 0 {
            warn!("Skipped {} test ratings with keys unseen in training", skipped);
        }
        Ok((RatingDataset::new(kept), skipped))
    }

    /// Loads both splits, trains, evaluates on the test split and saves the model.
    pub fn run<Src: RatingSource>(&self, train_source: &Src, test_source: &Src) -> Result<(Model<Src::Key>, TrainingReport)> {
        let started = Instant::now();

        let train = train_source.ratings()?;
        let test = test_source.ratings()?;
        info!("Loaded {} training and {} test ratings", train.len(), test.len());

        info!("=============== Training the model ===============");
        let model = self.train(&train)?;

        info!("=============== Evaluating the model ===============");
        let (test_set, skipped) = self.encode_test_set(&model, &test)?;
        let metrics = metrics::evaluate(&model, &test_set)?;
        info!("Root Mean Squared Error: {:.4}", metrics.rmse);
        info!("RSquared: {:.4}", metrics.r_squared);

        info!("=============== Saving the model ===============");
        let handle = self.store.save(&model)?;

        let report = TrainingReport {
            metadata: model.metadata().clone(),
            metrics,
            handle,
            num_users: model.num_users(),
            num_items: model.num_items(),
            train_ratings: train.len(),
            test_ratings: test_set.len(),
            skipped_test_ratings: skipped,
            elapsed_ms: started.elapsed().as_millis(),
        };
        Ok((model, report))
    }
}
