use crate::config::RecommendationConfig;
use crate::error::Result;
use crate::models::{Model, RatingKey};
use crate::utils::round_to_one_decimal;
use crate::utils::validation::validate_threshold;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_THRESHOLD: f32 = 3.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "K: RatingKey")]
pub struct Recommendation<K> {
    pub user_key: K,
    pub item_key: K,
    pub score: f32,
    pub rounded_score: f32,
    pub recommended: bool,
}

/// True iff the score, rounded to one decimal, is strictly above `threshold`.
pub fn is_recommended(score: f32, threshold: f32) -> bool {
    round_to_one_decimal(score) > threshold
}

pub fn recommend<K: RatingKey>(model: &Model<K>, user_key: &K, item_key: &K, threshold: f32) -> Result<bool> {
    validate_threshold(threshold)?;
    let score = model.predict(user_key, item_key)?;
    Ok(is_recommended(score, threshold))
}

/// Recommendation decisions against one shared, read-only model.
#[derive(Debug, Clone)]
pub struct Recommender<K> {
    model: Arc<Model<K>>,
    threshold: f32,
}

impl<K: RatingKey> Recommender<K> {
    pub fn new(model: Arc<Model<K>>, config: &RecommendationConfig) -> Result<Self> {
        validate_threshold(config.threshold)?;
        Ok(Self {
            model,
            threshold: config.threshold,
        })
    }

    pub fn model(&self) -> &Arc<Model<K>> {
        &self.model
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn decide(&self, user_key: &K, item_key: &K) -> Result<Recommendation<K>> {
        let score = self.model.predict(user_key, item_key)?;
        let rounded_score = round_to_one_decimal(score);
        let recommended = rounded_score > self.threshold;

        debug!(
            "Movie {} for user {}: score {:.3} (rounded {:.1}), recommended: {}",
            item_key, user_key, score, rounded_score, recommended
        );

        Ok(Recommendation {
            user_key: user_key.clone(),
            item_key: item_key.clone(),
            score,
            rounded_score,
            recommended,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::Solver;
    use crate::data::IdEncoder;
    use crate::error::RecError;
    use crate::models::{ModelMetadata, RawRating};
    use nalgebra::DMatrix;

    /// Rank-1 model whose score for user 1 and item `i` is exactly the item factor.
    fn fixed_score_model(scores: &[f32]) -> Model<u32> {
        let raw: Vec<RawRating<u32>> = (0..scores.len() as u32)
            .map(|item| RawRating::new(1, item, 0.0))
            .collect();
        let encoder = IdEncoder::fit(&raw);
        let users = DMatrix::from_element(1, 1, 1.0);
        let items = DMatrix::from_column_slice(scores.len(), 1, scores);
        Model::from_parts(encoder, users, items, ModelMetadata::new(Solver::Als, 1, 0.0)).unwrap()
    }

    #[test]
    fn test_rounding_boundary() {
        assert!(!is_recommended(3.44, DEFAULT_THRESHOLD));
        assert!(!is_recommended(3.449, DEFAULT_THRESHOLD));
        assert!(!is_recommended(3.451, DEFAULT_THRESHOLD));
        assert!(!is_recommended(3.46, DEFAULT_THRESHOLD));
        assert!(!is_recommended(3.5, DEFAULT_THRESHOLD));
        assert!(is_recommended(3.55, DEFAULT_THRESHOLD));
        assert!(is_recommended(4.9, DEFAULT_THRESHOLD));
    }

    #[test]
    fn test_recommend_uses_model_scores() {
        let model = fixed_score_model(&[3.44, 3.46, 3.55]);
        assert!(!recommend(&model, &1, &0, DEFAULT_THRESHOLD).unwrap());
        assert!(!recommend(&model, &1, &1, DEFAULT_THRESHOLD).unwrap());
        assert!(recommend(&model, &1, &2, DEFAULT_THRESHOLD).unwrap());
    }

    #[test]
    fn test_unknown_keys_are_errors() {
        let model = fixed_score_model(&[4.0]);
        assert!(matches!(
            recommend(&model, &99, &0, DEFAULT_THRESHOLD),
            Err(RecError::UnknownKey { .. })
        ));
        assert!(matches!(
            recommend(&model, &1, &99, DEFAULT_THRESHOLD),
            Err(RecError::UnknownKey { .. })
        ));
    }

    #[test]
    fn test_recommender_reports_score() {
        let recommender = Recommender::new(
            Arc::new(fixed_score_model(&[3.46, 4.04])),
            &RecommendationConfig::default(),
        )
        .unwrap();

        let decision = recommender.decide(&1, &0).unwrap();
        assert_eq!(decision.rounded_score, 3.5);
        assert!(!decision.recommended);

        let decision = recommender.decide(&1, &1).unwrap();
        assert!((decision.score - 4.04).abs() < 1e-6);
        assert_eq!(decision.rounded_score, 4.0);
        assert!(decision.recommended);
    }

    #[test]
    fn test_bad_threshold_is_rejected() {
        let model = fixed_score_model(&[1.0]);
        let config = RecommendationConfig { threshold: f32::NAN };
        assert!(Recommender::new(Arc::new(model.clone()), &config).is_err());
        assert!(matches!(
            recommend(&model, &1, &0, f32::NAN),
            Err(RecError::InvalidConfig(_))
        ));
        assert!(recommend(&model, &1, &0, f32::NEG_INFINITY).is_err());
    }
}
