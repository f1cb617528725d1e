use super::IdEncoder;
use crate::error::{RecError, Result};
use crate::models::{EncodedRating, RatingKey, RawRating};
use std::ops::Index;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingDataset {
    ratings: Vec<EncodedRating>,
}

impl RatingDataset {
    pub fn new(ratings: Vec<EncodedRating>) -> Self {
        Self { ratings }
    }

    /// Encodes every raw rating, failing on the first key the encoder has not seen.
    pub fn encode<K: RatingKey>(encoder: &IdEncoder<K>, raw: &[RawRating<K>]) -> Result<Self> {
        let ratings = raw
            .iter()
            .map(|rating| encoder.encode(rating))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { ratings })
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&EncodedRating> {
        self.ratings.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EncodedRating> {
        self.ratings.iter()
    }

    pub fn as_slice(&self) -> &[EncodedRating] {
        &self.ratings
    }

    pub fn split_at(&self, row: usize) -> Result<(Self, Self)> {
        if row > self.ratings.len() {
            return Err(RecError::InvalidConfig(format!(
                "split row {} beyond dataset of {} rows",
                row,
                self.ratings.len()
            )));
        }
        let (head, tail) = self.ratings.split_at(row);
        Ok((Self::new(head.to_vec()), Self::new(tail.to_vec())))
    }

    pub fn mean_rating(&self) -> Option<f64> {
        if self.ratings.is_empty() {
            return None;
        }
        let sum: f64 = self.ratings.iter().map(|r| r.rating as f64).sum();
        Some(sum / self.ratings.len() as f64)
    }
}

impl Index<usize> for RatingDataset {
    type Output = EncodedRating;

    fn index(&self, index: usize) -> &Self::Output {
        &self.ratings[index]
    }
}

impl From<Vec<EncodedRating>> for RatingDataset {
    fn from(ratings: Vec<EncodedRating>) -> Self {
        Self::new(ratings)
    }
}

impl FromIterator<EncodedRating> for RatingDataset {
    fn from_iter<I: IntoIterator<Item = EncodedRating>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RatingDataset {
    type Item = &'a EncodedRating;
    type IntoIter = std::slice::Iter<'a, EncodedRating>;

    fn into_iter(self) -> Self::IntoIter {
        self.ratings.iter()
    }
}
