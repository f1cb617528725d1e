//! Everything between a raw rating file and the encoded rows the trainer consumes.

pub mod dataset;
pub mod encoder;
pub mod source;

pub use dataset::RatingDataset;
pub use encoder::IdEncoder;
pub use source::{CsvRatingSource, RatingSource};
