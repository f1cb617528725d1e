use super::Factors;
use crate::error::EntityKind;
use crate::models::EncodedRating;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::warn;

/// Alternating least squares.
///
/// A pass solves every user row with the item factors held fixed, then every
/// item row with the user factors held fixed. Rows on one side are
/// independent, so they are solved in parallel and each row is written by
/// exactly one task.
pub struct AlsSolver {
    regularization: f32,
    by_user: Vec<Vec<(usize, f32)>>,
    by_item: Vec<Vec<(usize, f32)>>,
}

impl AlsSolver {
    pub fn new(regularization: f64, ratings: &[EncodedRating], num_users: usize, num_items: usize) -> Self {
        let mut by_user = vec![Vec::new(); num_users];
        let mut by_item = vec![Vec::new(); num_items];

        for rating in ratings {
            by_user[rating.user_index].push((rating.item_index, rating.rating));
            by_item[rating.item_index].push((rating.user_index, rating.rating));
        }

        Self {
            regularization: regularization as f32,
            by_user,
            by_item,
        }
    }

    pub fn run_pass(&self, factors: &mut Factors) {
        solve_side(
            &mut factors.users,
            &factors.items,
            &self.by_user,
            self.regularization,
            EntityKind::User,
        );
        solve_side(
            &mut factors.items,
            &factors.users,
            &self.by_item,
            self.regularization,
            EntityKind::Item,
        );
    }
}

fn solve_side(
    target: &mut DMatrix<f32>,
    fixed: &DMatrix<f32>,
    adjacency: &[Vec<(usize, f32)>],
    regularization: f32,
    kind: EntityKind,
) {
    let solved: Vec<Option<DVector<f32>>> = adjacency
        .par_iter()
        .enumerate()
        .map(|(row, entries)| solve_row(fixed, entries, regularization, kind, row))
        .collect();

    for (row, solution) in solved.into_iter().enumerate() {
        if let Some(solution) = solution {
            target.set_row(row, &solution.transpose());
        }
    }
}

/// Solves `(Σ f fᵀ + λ·n·I) x = Σ r·f` over the fixed-side rows `f` this row rated.
/// `None` leaves the row untouched.
fn solve_row(
    fixed: &DMatrix<f32>,
    entries: &[(usize, f32)],
    regularization: f32,
    kind: EntityKind,
    row: usize,
) -> Option<DVector<f32>> {
    if entries.is_empty() {
        return None;
    }

    let rank = fixed.ncols();
    let mut gram = DMatrix::<f32>::zeros(rank, rank);
    let mut rhs = DVector::<f32>::zeros(rank);

    for &(other, rating) in entries {
        let factor: DVector<f32> = fixed.row(other).transpose();
        gram.ger(1.0, &factor, &factor, 1.0);
        rhs.axpy(rating, &factor, 1.0);
    }

    let ridge = regularization * entries.len() as f32;
    for k in 0..rank {
        gram[(k, k)] += ridge;
    }

    if let Some(cholesky) = gram.clone().cholesky() {
        return Some(cholesky.solve(&rhs));
    }

    let solution = gram.lu().solve(&rhs);
    if solution.is_none() {
        warn!("Singular normal equations for {} row {}, keeping previous factors", kind, row);
    }
    solution
}
