pub mod als;
pub mod initializer;
pub mod optimizer;
pub mod sgd;

use crate::config::{EarlyStopping, TrainingConfig};
use crate::data::{IdEncoder, RatingDataset};
use crate::error::{EntityKind, RecError, Result};
use crate::models::{EncodedRating, Model, ModelMetadata, RatingKey};
use crate::utils::validation;
use als::AlsSolver;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use sgd::SgdSolver;
use std::ops::ControlFlow;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Solver {
    Sgd,
    #[default]
    Als,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Factors {
    pub users: DMatrix<f32>,
    pub items: DMatrix<f32>,
}

impl Factors {
    pub fn predict(&self, user_index: usize, item_index: usize) -> f32 {
        self.users.row(user_index).dot(&self.items.row(item_index))
    }

    /// Root mean squared error over `ratings`; indices must already be checked.
    pub fn rmse(&self, ratings: &[EncodedRating]) -> f64 {
        if ratings.is_empty() {
            return 0.0;
        }
        let squared = ratings
            .iter()
            .map(|r| {
                let error = r.rating as f64 - self.predict(r.user_index, r.item_index) as f64;
                error * error
            })
            .sum::<f64>();
        (squared / ratings.len() as f64).sqrt()
    }
}

/// Progress after one completed pass, handed to the training callback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassReport {
    /// One-based pass number.
    pub pass: usize,
    pub train_rmse: f64,
    pub validation_rmse: Option<f64>,
}

enum SolverState {
    Sgd(SgdSolver),
    Als(AlsSolver),
}

pub fn score<K: RatingKey>(model: &Model<K>, user_index: usize, item_index: usize) -> Result<f32> {
    model.score(user_index, item_index)
}

/// Learns user and item factors minimizing the regularized squared error.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Result<Self> {
        validation::validate_training_config(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn fit<K: RatingKey>(&self, encoder: IdEncoder<K>, train: &RatingDataset) -> Result<Model<K>> {
        self.fit_with_callback(encoder, train, None, |_| ControlFlow::Continue(()))
    }

    /// Like [`Trainer::fit`], also tracking RMSE on `validation` after every
    /// pass, which early stopping (when configured) watches.
    pub fn fit_with_validation<K: RatingKey>(
        &self,
        encoder: IdEncoder<K>,
        train: &RatingDataset,
        validation: &RatingDataset,
    ) -> Result<Model<K>> {
        self.fit_with_callback(encoder, train, Some(validation), |_| ControlFlow::Continue(()))
    }

    /// Full training entry point. `callback` runs after every pass; returning
    /// `ControlFlow::Break(())` ends training with the factors of that pass,
    /// or of the best validation pass when early stopping is active.
    pub fn fit_with_callback<K, F>(
        &self,
        encoder: IdEncoder<K>,
        train: &RatingDataset,
        validation: Option<&RatingDataset>,
        mut callback: F,
    ) -> Result<Model<K>>
    where
        K: RatingKey,
        F: FnMut(&PassReport) -> ControlFlow<()>,
    {
        if train.is_empty() {
            return Err(RecError::EmptyTrainingSet);
        }
        let num_users = encoder.num_users();
        let num_items = encoder.num_items();
        check_ratings(train, num_users, num_items)?;
        if let Some(validation) = validation {
            check_ratings(validation, num_users, num_items)?;
        }

        let config = &self.config;
        info!(
            "Training {:?} factorization: {} users, {} items, {} ratings, rank {}, {} passes",
            config.solver,
            num_users,
            num_items,
            train.len(),
            config.rank,
            config.iterations
        );

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut factors = Factors {
            users: config.initialization.initialize_matrix(&mut rng, num_users, config.rank),
            items: config.initialization.initialize_matrix(&mut rng, num_items, config.rank),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
            .map_err(|e| RecError::InvalidConfig(format!("thread pool: {}", e)))?;

        let mut solver = match config.solver {
            Solver::Sgd => SolverState::Sgd(SgdSolver::new(
                config.optimizer.build(config.learning_rate),
                config.regularization,
            )),
            Solver::Als => SolverState::Als(AlsSolver::new(
                config.regularization,
                train.as_slice(),
                num_users,
                num_items,
            )),
        };

        let mut stopper = match (config.early_stopping, validation) {
            (Some(early_stopping), Some(_)) => Some(EarlyStopper::new(early_stopping)),
            _ => None,
        };

        let started = Instant::now();
        let mut passes_run = 0;
        let mut train_rmse = f64::NAN;

        for pass in 1..=config.iterations {
            let pass_started = Instant::now();
            match &mut solver {
                SolverState::Sgd(sgd) => sgd.run_pass(&mut factors, train.as_slice(), &mut rng),
                SolverState::Als(als) => pool.install(|| als.run_pass(&mut factors)),
            }
            passes_run = pass;

            train_rmse = factors.rmse(train.as_slice());
            let validation_rmse = validation.map(|v| factors.rmse(v.as_slice()));
            let report = PassReport {
                pass,
                train_rmse,
                validation_rmse,
            };

            match validation_rmse {
                Some(v) => info!(
                    "Pass {}/{}: train RMSE {:.4}, validation RMSE {:.4}",
                    pass, config.iterations, train_rmse, v
                ),
                None => info!("Pass {}/{}: train RMSE {:.4}", pass, config.iterations, train_rmse),
            }
            debug!("Pass {} took {:?}", pass, pass_started.elapsed());

            if let (Some(stopper), Some(v)) = (stopper.as_mut(), validation_rmse) {
                if stopper.observe(v, &factors, train_rmse, pass) {
                    info!(
                        "Early stopping after pass {}: no validation improvement in {} passes",
                        pass, stopper.config.patience
                    );
                    break;
                }
            }

            if callback(&report).is_break() {
                info!("Training interrupted after pass {}", pass);
                break;
            }
        }

        if let Some(best) = stopper.and_then(EarlyStopper::into_best) {
            factors = best.factors;
            train_rmse = best.train_rmse;
            passes_run = best.pass;
        }

        info!(
            "Training finished after {} passes in {:?}, train RMSE {:.4}",
            passes_run,
            started.elapsed(),
            train_rmse
        );

        Model::from_parts(
            encoder,
            factors.users,
            factors.items,
            ModelMetadata::new(config.solver, passes_run, train_rmse),
        )
    }
}

fn check_ratings(dataset: &RatingDataset, num_users: usize, num_items: usize) -> Result<()> {
    for (row, rating) in dataset.iter().enumerate() {
        if rating.user_index >= num_users {
            return Err(RecError::OutOfRange {
                kind: EntityKind::User,
                index: rating.user_index,
                bound: num_users,
            });
        }
        if rating.item_index >= num_items {
            return Err(RecError::OutOfRange {
                kind: EntityKind::Item,
                index: rating.item_index,
                bound: num_items,
            });
        }
        if !rating.rating.is_finite() {
            return Err(RecError::InvalidRating {
                row,
                value: rating.rating,
            });
        }
    }
    Ok(())
}

struct BestPass {
    factors: Factors,
    train_rmse: f64,
    pass: usize,
    validation_rmse: f64,
}

struct EarlyStopper {
    config: EarlyStopping,
    best: Option<BestPass>,
    stale_passes: usize,
}

impl EarlyStopper {
    fn new(config: EarlyStopping) -> Self {
        Self {
            config,
            best: None,
            stale_passes: 0,
        }
    }

    /// Records a pass; returns true once patience is exhausted.
    fn observe(&mut self, validation_rmse: f64, factors: &Factors, train_rmse: f64, pass: usize) -> bool {
        let improved = match &self.best {
            None => true,
            Some(best) => validation_rmse < best.validation_rmse - self.config.min_delta,
        };

        if improved {
            self.best = Some(BestPass {
                factors: factors.clone(),
                train_rmse,
                pass,
                validation_rmse,
            });
            self.stale_passes = 0;
            false
        } else {
            self.stale_passes += 1;
            self.stale_passes >= self.config.patience
        }
    }

    fn into_best(self) -> Option<BestPass> {
        self.best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawRating;

    fn checkerboard() -> (IdEncoder<u32>, RatingDataset) {
        let raw = vec![
            RawRating::new(1, 1, 5.0),
            RawRating::new(1, 2, 1.0),
            RawRating::new(2, 1, 1.0),
            RawRating::new(2, 2, 5.0),
        ];
        let encoder = IdEncoder::fit(&raw);
        let dataset = RatingDataset::encode(&encoder, &raw).unwrap();
        (encoder, dataset)
    }

    fn small_config(solver: Solver) -> TrainingConfig {
        TrainingConfig {
            rank: 2,
            iterations: 10,
            solver,
            seed: Some(3),
            threads: 2,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_empty_training_set() {
        let trainer = Trainer::new(small_config(Solver::Als)).unwrap();
        let (encoder, _) = checkerboard();
        let result = trainer.fit(encoder, &RatingDataset::default());
        assert!(matches!(result, Err(RecError::EmptyTrainingSet)));
    }

    #[test]
    fn test_out_of_range_rows_rejected() {
        let trainer = Trainer::new(small_config(Solver::Sgd)).unwrap();
        let (encoder, _) = checkerboard();
        let bad = RatingDataset::new(vec![EncodedRating::new(0, 7, 3.0)]);
        assert!(matches!(
            trainer.fit(encoder, &bad),
            Err(RecError::OutOfRange { kind: EntityKind::Item, index: 7, bound: 2 })
        ));
    }

    #[test]
    fn test_non_finite_rating_rejected() {
        let trainer = Trainer::new(small_config(Solver::Als)).unwrap();
        let (encoder, _) = checkerboard();
        let bad = RatingDataset::new(vec![EncodedRating::new(0, 0, f32::NAN)]);
        assert!(matches!(trainer.fit(encoder, &bad), Err(RecError::InvalidRating { row: 0, .. })));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TrainingConfig {
            rank: 0,
            ..TrainingConfig::default()
        };
        assert!(matches!(Trainer::new(config), Err(RecError::InvalidConfig(_))));
    }

    #[test]
    fn test_seeded_training_is_reproducible() {
        for solver in [Solver::Sgd, Solver::Als] {
            let trainer = Trainer::new(small_config(solver)).unwrap();
            let (encoder, dataset) = checkerboard();
            let a = trainer.fit(encoder.clone(), &dataset).unwrap();
            let b = trainer.fit(encoder, &dataset).unwrap();
            assert_eq!(a.user_factors(), b.user_factors());
            assert_eq!(a.item_factors(), b.item_factors());
        }
    }

    #[test]
    fn test_callback_break_stops_between_passes() {
        let trainer = Trainer::new(small_config(Solver::Als)).unwrap();
        let (encoder, dataset) = checkerboard();
        let mut seen = Vec::new();
        let model = trainer
            .fit_with_callback(encoder, &dataset, None, |report| {
                seen.push(report.pass);
                if report.pass == 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(model.metadata().iterations_run, 3);
    }

    #[test]
    fn test_early_stopping_on_stalled_validation() {
        let config = TrainingConfig {
            iterations: 50,
            early_stopping: Some(EarlyStopping {
                patience: 2,
                min_delta: 10.0,
            }),
            ..small_config(Solver::Als)
        };
        let trainer = Trainer::new(config).unwrap();
        let (encoder, dataset) = checkerboard();
        let mut passes = 0;
        let model = trainer
            .fit_with_callback(encoder, &dataset, Some(&dataset), |_| {
                passes += 1;
                ControlFlow::Continue(())
            })
            .unwrap();
        // an improvement larger than 10 RMSE never happens, so pass 1 stays best
        assert_eq!(passes, 2);
        assert_eq!(model.metadata().iterations_run, 1);
    }

    #[test]
    fn test_input_dataset_not_mutated() {
        let trainer = Trainer::new(small_config(Solver::Sgd)).unwrap();
        let (encoder, dataset) = checkerboard();
        let before = dataset.clone();
        trainer.fit(encoder, &dataset).unwrap();
        assert_eq!(dataset, before);
    }
}
