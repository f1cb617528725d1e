pub mod algorithms;
pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use algorithms::{PassReport, Solver, Trainer};
pub use config::Config;
pub use data::{CsvRatingSource, IdEncoder, RatingDataset, RatingSource};
pub use error::{EntityKind, RecError, Result};
pub use models::*;
pub use services::model_store::{FileModelStore, InMemoryModelStore, ModelHandle, ModelStore};
pub use services::recommendation::{recommend, Recommendation, Recommender};
pub use utils::metrics::{evaluate, RegressionMetrics};

/// Installs the fmt subscriber, filtered by `RUST_LOG` or `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
