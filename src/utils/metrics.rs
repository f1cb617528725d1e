use crate::data::RatingDataset;
use crate::error::{RecError, Result};
use crate::models::{Model, RatingKey};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Regression accuracy of predicted against observed ratings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rmse: f64,
    /// `NaN` when every observed rating is identical.
    pub r_squared: f64,
    pub mae: f64,
    pub mse: f64,
    pub count: usize,
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RMSE {:.4}, R² {:.4}, MAE {:.4}, MSE {:.4} over {} ratings",
            self.rmse, self.r_squared, self.mae, self.mse, self.count
        )
    }
}

impl RegressionMetrics {
    /// Aggregates `(observed, predicted)` pairs. `None` on an empty input.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Option<Self> {
        let observed: Vec<f64> = pairs.iter().map(|(actual, _)| *actual).collect();
        let mean = super::mean(&observed)?;
        let n = pairs.len() as f64;

        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        let mut abs_sum = 0.0;
        for &(actual, predicted) in pairs {
            let residual = actual - predicted;
            ss_res += residual * residual;
            abs_sum += residual.abs();
            ss_tot += (actual - mean) * (actual - mean);
        }

        let mse = ss_res / n;
        let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { f64::NAN };

        Some(Self {
            rmse: mse.sqrt(),
            r_squared,
            mae: abs_sum / n,
            mse,
            count: pairs.len(),
        })
    }
}

/// Scores every test rating and aggregates the residuals.
///
/// A row the model cannot score fails the whole evaluation rather than being
/// skipped.
pub fn evaluate<K: RatingKey>(model: &Model<K>, test: &RatingDataset) -> Result<RegressionMetrics> {
    if test.is_empty() {
        return Err(RecError::EmptyTestSet);
    }

    let pairs = test
        .as_slice()
        .par_iter()
        .map(|rating| {
            model
                .score(rating.user_index, rating.item_index)
                .map(|predicted| (rating.rating as f64, predicted as f64))
        })
        .collect::<Result<Vec<_>>>()?;

    let metrics = RegressionMetrics::from_pairs(&pairs).ok_or(RecError::EmptyTestSet)?;
    tracing::info!("Evaluated model {}: {}", model.metadata().version, metrics);
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let metrics = RegressionMetrics::from_pairs(&[(1.0, 1.0), (3.0, 3.0), (5.0, 5.0)]).unwrap();
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.mae, 0.0);
        assert!((metrics.r_squared - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_known_values() {
        // residuals 1, -1, 0, 2; observed mean 2.5, SS_tot 5
        let pairs = [(1.0, 0.0), (2.0, 3.0), (3.0, 3.0), (4.0, 2.0)];
        let metrics = RegressionMetrics::from_pairs(&pairs).unwrap();
        assert!((metrics.mse - 1.5).abs() < 1e-12);
        assert!((metrics.rmse - 1.5f64.sqrt()).abs() < 1e-12);
        assert!((metrics.mae - 1.0).abs() < 1e-12);
        assert!((metrics.r_squared - (1.0 - 6.0 / 5.0)).abs() < 1e-12);
        assert!(metrics.r_squared <= 1.0);
        assert_eq!(metrics.count, 4);
    }

    #[test]
    fn test_constant_observations_leave_r_squared_undefined() {
        let metrics = RegressionMetrics::from_pairs(&[(3.0, 2.0), (3.0, 4.0)]).unwrap();
        assert!(metrics.r_squared.is_nan());
        assert!((metrics.rmse - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_pairs() {
        assert!(RegressionMetrics::from_pairs(&[]).is_none());
    }

    #[test]
    fn test_out_of_range_row_fails_evaluation() {
        use crate::algorithms::Solver;
        use crate::data::IdEncoder;
        use crate::error::EntityKind;
        use crate::models::{EncodedRating, ModelMetadata, RawRating};
        use nalgebra::DMatrix;

        let raw = vec![RawRating::new(1u32, 1u32, 4.0)];
        let model = Model::from_parts(
            IdEncoder::fit(&raw),
            DMatrix::from_element(1, 1, 2.0),
            DMatrix::from_element(1, 1, 2.0),
            ModelMetadata::new(Solver::Als, 1, 0.0),
        )
        .unwrap();

        let valid = RatingDataset::new(vec![EncodedRating::new(0, 0, 4.0)]);
        assert_eq!(evaluate(&model, &valid).unwrap().count, 1);

        let mixed = RatingDataset::new(vec![EncodedRating::new(0, 0, 4.0), EncodedRating::new(0, 9, 3.0)]);
        match evaluate(&model, &mixed) {
            Err(RecError::OutOfRange { kind, index, bound }) => {
                assert_eq!(kind, EntityKind::Item);
                assert_eq!(index, 9);
                assert_eq!(bound, 1);
            }
            other => panic!("expected out of range, got {:?}", other),
        }
    }
}
