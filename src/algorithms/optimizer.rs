use crate::error::EntityKind;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifies one factor row, so stateful optimizers can keep per-row history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub kind: EntityKind,
    pub row: usize,
}

impl Slot {
    pub fn user(row: usize) -> Self {
        Self { kind: EntityKind::User, row }
    }

    pub fn item(row: usize) -> Self {
        Self { kind: EntityKind::Item, row }
    }
}

/// Applies a gradient step to one factor row. `gradients` points uphill.
pub trait Optimizer: Send + Sync {
    fn update(&mut self, slot: Slot, params: &mut DVector<f32>, gradients: &DVector<f32>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    #[default]
    Sgd,
    AdaGrad,
}

impl OptimizerKind {
    pub fn build(self, learning_rate: f64) -> Box<dyn Optimizer> {
        match self {
            OptimizerKind::Sgd => Box::new(SGD::new(learning_rate)),
            OptimizerKind::AdaGrad => Box::new(AdaGrad::new(learning_rate, 1e-8)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SGD {
    learning_rate: f64,
}

impl SGD {
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for SGD {
    fn update(&mut self, _slot: Slot, params: &mut DVector<f32>, gradients: &DVector<f32>) {
        params.axpy(-(self.learning_rate as f32), gradients, 1.0);
    }
}

#[derive(Debug, Clone)]
pub struct AdaGrad {
    learning_rate: f64,
    epsilon: f64,
    sum_squared_gradients: HashMap<Slot, DVector<f32>>,
}

impl AdaGrad {
    pub fn new(learning_rate: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            epsilon,
            sum_squared_gradients: HashMap::new(),
        }
    }
}

impl Optimizer for AdaGrad {
    fn update(&mut self, slot: Slot, params: &mut DVector<f32>, gradients: &DVector<f32>) {
        let sum_sq_grad = self
            .sum_squared_gradients
            .entry(slot)
            .or_insert_with(|| DVector::zeros(params.len()));

        *sum_sq_grad += gradients.component_mul(gradients);

        let lr = self.learning_rate as f32;
        let eps = self.epsilon as f32;
        let adaptive_lr = sum_sq_grad.map(|x| lr / (x + eps).sqrt());

        *params -= gradients.component_mul(&adaptive_lr);
    }
}
