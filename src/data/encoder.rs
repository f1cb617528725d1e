use crate::error::{EntityKind, RecError, Result};
use crate::models::{EncodedRating, RatingKey, RawRating};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Maps raw user and item keys to dense zero-based indices.
///
/// Indices are assigned in order of first appearance while fitting. The
/// position of a key inside its set is its index, so the tables stay dense
/// and contiguous and can be serialized as plain ordered lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "K: RatingKey")]
pub struct IdEncoder<K> {
    users: IndexSet<K>,
    items: IndexSet<K>,
}

impl<K: RatingKey> IdEncoder<K> {
    pub fn fit(ratings: &[RawRating<K>]) -> Self {
        let mut users = IndexSet::new();
        let mut items = IndexSet::new();

        for rating in ratings {
            // an existing key keeps its first position
            users.insert(rating.user_key.clone());
            items.insert(rating.item_key.clone());
        }

        tracing::debug!(
            users = users.len(),
            items = items.len(),
            "Fitted id encoder over {} ratings",
            ratings.len()
        );

        Self { users, items }
    }

    pub fn encode(&self, rating: &RawRating<K>) -> Result<EncodedRating> {
        Ok(EncodedRating {
            user_index: self.user_index(&rating.user_key)?,
            item_index: self.item_index(&rating.item_key)?,
            rating: rating.rating,
        })
    }

    pub fn user_index(&self, key: &K) -> Result<usize> {
        self.users
            .get_index_of(key)
            .ok_or_else(|| RecError::UnknownKey {
                kind: EntityKind::User,
                key: key.to_string(),
            })
    }

    pub fn item_index(&self, key: &K) -> Result<usize> {
        self.items
            .get_index_of(key)
            .ok_or_else(|| RecError::UnknownKey {
                kind: EntityKind::Item,
                key: key.to_string(),
            })
    }

    pub fn user_key(&self, index: usize) -> Option<&K> {
        self.users.get_index(index)
    }

    pub fn item_key(&self, index: usize) -> Option<&K> {
        self.items.get_index(index)
    }

    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn user_keys(&self) -> impl Iterator<Item = &K> {
        self.users.iter()
    }

    pub fn item_keys(&self) -> impl Iterator<Item = &K> {
        self.items.iter()
    }
}

// IndexSet equality ignores order, but here order is the index assignment.
impl<K: RatingKey> PartialEq for IdEncoder<K> {
    fn eq(&self, other: &Self) -> bool {
        self.users.iter().eq(other.users.iter()) && self.items.iter().eq(other.items.iter())
    }
}
