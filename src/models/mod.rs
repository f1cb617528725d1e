use crate::algorithms::Solver;
use crate::data::IdEncoder;
use crate::error::{EntityKind, RecError, Result};
use chrono::{DateTime, Utc};
use nalgebra::DMatrix;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use uuid::Uuid;

/// Anything usable as a raw user or movie identifier.
pub trait RatingKey:
    Clone + Eq + Hash + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> RatingKey for T where
    T: Clone + Eq + Hash + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRating<K> {
    pub user_key: K,
    pub item_key: K,
    pub rating: f32,
    /// Carried through from the source, never used for training.
    pub timestamp: Option<i64>,
}

impl<K> RawRating<K> {
    pub fn new(user_key: K, item_key: K, rating: f32) -> Self {
        Self {
            user_key,
            item_key,
            rating,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncodedRating {
    pub user_index: usize,
    pub item_index: usize,
    pub rating: f32,
}

impl EncodedRating {
    pub fn new(user_index: usize, item_index: usize, rating: f32) -> Self {
        Self {
            user_index,
            item_index,
            rating,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub solver: Solver,
    pub iterations_run: usize,
    /// Training RMSE after the last completed pass.
    pub final_loss: f64,
}

impl ModelMetadata {
    pub fn new(solver: Solver, iterations_run: usize, final_loss: f64) -> Self {
        let trained_at = Utc::now();
        Self {
            version: format!("v{}-{}", trained_at.timestamp_millis(), Uuid::new_v4().simple()),
            trained_at,
            solver,
            iterations_run,
            final_loss,
        }
    }
}

/// A trained factorization: factor matrices plus the key mappings they were
/// trained against. Never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "K: RatingKey")]
pub struct Model<K> {
    encoder: IdEncoder<K>,
    user_factors: DMatrix<f32>,
    item_factors: DMatrix<f32>,
    rank: usize,
    metadata: ModelMetadata,
}

impl<K: RatingKey> Model<K> {
    /// Assembles a model, checking that the factor shapes agree with the
    /// encoder and with each other.
    pub fn from_parts(
        encoder: IdEncoder<K>,
        user_factors: DMatrix<f32>,
        item_factors: DMatrix<f32>,
        metadata: ModelMetadata,
    ) -> Result<Self> {
        let rank = user_factors.ncols();
        if rank == 0 || item_factors.ncols() != rank {
            return Err(RecError::InvalidConfig(format!(
                "factor rank mismatch: users {} columns, items {} columns",
                user_factors.ncols(),
                item_factors.ncols()
            )));
        }
        if user_factors.nrows() != encoder.num_users() {
            return Err(RecError::InvalidConfig(format!(
                "{} user rows for {} encoded users",
                user_factors.nrows(),
                encoder.num_users()
            )));
        }
        if item_factors.nrows() != encoder.num_items() {
            return Err(RecError::InvalidConfig(format!(
                "{} item rows for {} encoded items",
                item_factors.nrows(),
                encoder.num_items()
            )));
        }

        Ok(Self {
            encoder,
            user_factors,
            item_factors,
            rank,
            metadata,
        })
    }

    pub fn encoder(&self) -> &IdEncoder<K> {
        &self.encoder
    }

    pub fn user_factors(&self) -> &DMatrix<f32> {
        &self.user_factors
    }

    pub fn item_factors(&self) -> &DMatrix<f32> {
        &self.item_factors
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn num_users(&self) -> usize {
        self.user_factors.nrows()
    }

    pub fn num_items(&self) -> usize {
        self.item_factors.nrows()
    }

    /// Predicted rating for an encoded pair: the dot product of the two factor rows.
    pub fn score(&self, user_index: usize, item_index: usize) -> Result<f32> {
        if user_index >= self.num_users() {
            return Err(RecError::OutOfRange {
                kind: EntityKind::User,
                index: user_index,
                bound: self.num_users(),
            });
        }
        if item_index >= self.num_items() {
            return Err(RecError::OutOfRange {
                kind: EntityKind::Item,
                index: item_index,
                bound: self.num_items(),
            });
        }

        Ok(self
            .user_factors
            .row(user_index)
            .dot(&self.item_factors.row(item_index)))
    }

    pub fn predict(&self, user_key: &K, item_key: &K) -> Result<f32> {
        let user_index = self.encoder.user_index(user_key)?;
        let item_index = self.encoder.item_index(item_key)?;
        self.score(user_index, item_index)
    }
}
