use super::optimizer::{Optimizer, Slot};
use super::Factors;
use crate::models::EncodedRating;
use nalgebra::DVector;
use rand::seq::SliceRandom;
use rand::Rng;

/// Stochastic gradient descent over individual ratings.
///
/// Each pass visits every training rating once, in an order reshuffled from
/// the trainer's seeded generator.
pub struct SgdSolver {
    optimizer: Box<dyn Optimizer>,
    regularization: f32,
    order: Vec<usize>,
}

impl SgdSolver {
    pub fn new(optimizer: Box<dyn Optimizer>, regularization: f64) -> Self {
        Self {
            optimizer,
            regularization: regularization as f32,
            order: Vec::new(),
        }
    }

    pub fn run_pass<R: Rng>(&mut self, factors: &mut Factors, ratings: &[EncodedRating], rng: &mut R) {
        let mut order = std::mem::take(&mut self.order);
        order.clear();
        order.extend(0..ratings.len());
        order.shuffle(rng);

        for &position in &order {
            self.update(factors, &ratings[position]);
        }
        self.order = order;
    }

    fn update(&mut self, factors: &mut Factors, rating: &EncodedRating) {
        let user_emb: DVector<f32> = factors.users.row(rating.user_index).transpose();
        let item_emb: DVector<f32> = factors.items.row(rating.item_index).transpose();

        let error = rating.rating - user_emb.dot(&item_emb);

        // gradients of the regularized squared error, both from the pre-update rows
        let user_gradient = &user_emb * self.regularization - &item_emb * error;
        let item_gradient = &item_emb * self.regularization - &user_emb * error;

        let mut new_user_emb = user_emb;
        let mut new_item_emb = item_emb;
        self.optimizer
            .update(Slot::user(rating.user_index), &mut new_user_emb, &user_gradient);
        self.optimizer
            .update(Slot::item(rating.item_index), &mut new_item_emb, &item_gradient);

        factors.users.set_row(rating.user_index, &new_user_emb.transpose());
        factors.items.set_row(rating.item_index, &new_item_emb.transpose());
    }
}
