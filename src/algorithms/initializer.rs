use nalgebra::DMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Standard normal sample via Box-Muller.
fn standard_normal<R: Rng>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

pub fn uniform<R: Rng>(rng: &mut R, size: usize, low: f32, high: f32) -> Vec<f32> {
    (0..size).map(|_| rng.gen_range(low..high)).collect()
}

pub fn normal<R: Rng>(rng: &mut R, size: usize, mean: f32, std_dev: f32) -> Vec<f32> {
    (0..size)
        .map(|_| standard_normal(rng) * std_dev + mean)
        .collect()
}

/// Uniform in `±sqrt(6 / fan)`.
pub fn xavier_uniform<R: Rng>(rng: &mut R, size: usize, fan: usize) -> Vec<f32> {
    let limit = (6.0 / fan.max(1) as f32).sqrt();
    uniform(rng, size, -limit, limit)
}

/// Uniform in `±sqrt(3 / fan)`.
pub fn lecun_uniform<R: Rng>(rng: &mut R, size: usize, fan: usize) -> Vec<f32> {
    let limit = (3.0 / fan.max(1) as f32).sqrt();
    uniform(rng, size, -limit, limit)
}

pub fn lecun_normal<R: Rng>(rng: &mut R, size: usize, fan: usize) -> Vec<f32> {
    normal(rng, size, 0.0, (1.0 / fan.max(1) as f32).sqrt())
}

pub fn constant(size: usize, value: f32) -> Vec<f32> {
    vec![value; size]
}

/// How latent factor matrices are filled before the first pass.
///
/// The fan-scaled variants use the rank as fan, so the expected magnitude of
/// an initial prediction does not grow with the rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum InitializationMethod {
    Uniform { low: f32, high: f32 },
    Normal { mean: f32, std_dev: f32 },
    XavierUniform,
    LecunUniform,
    LecunNormal,
    Constant { value: f32 },
}

impl Default for InitializationMethod {
    fn default() -> Self {
        InitializationMethod::Normal {
            mean: 0.0,
            std_dev: 0.1,
        }
    }
}

impl InitializationMethod {
    pub fn initialize<R: Rng>(&self, rng: &mut R, size: usize, fan: usize) -> Vec<f32> {
        match self {
            InitializationMethod::Uniform { low, high } => uniform(rng, size, *low, *high),
            InitializationMethod::Normal { mean, std_dev } => normal(rng, size, *mean, *std_dev),
            InitializationMethod::XavierUniform => xavier_uniform(rng, size, fan),
            InitializationMethod::LecunUniform => lecun_uniform(rng, size, fan),
            InitializationMethod::LecunNormal => lecun_normal(rng, size, fan),
            InitializationMethod::Constant { value } => constant(size, *value),
        }
    }

    pub fn initialize_matrix<R: Rng>(&self, rng: &mut R, rows: usize, rank: usize) -> DMatrix<f32> {
        let values = self.initialize(rng, rows * rank, rank);
        DMatrix::from_row_slice(rows, rank, &values)
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            InitializationMethod::Uniform { low, high } if !(low < high) || !low.is_finite() || !high.is_finite() => {
                Err(format!("uniform initialization needs low < high, got [{}, {})", low, high))
            }
            InitializationMethod::Normal { mean, std_dev } if !mean.is_finite() || !(*std_dev >= 0.0) || !std_dev.is_finite() => {
                Err(format!("normal initialization needs a finite mean and std_dev >= 0, got {} / {}", mean, std_dev))
            }
            InitializationMethod::Constant { value } if !value.is_finite() => {
                Err(format!("constant initialization value must be finite, got {}", value))
            }
            _ => Ok(()),
        }
    }
}
