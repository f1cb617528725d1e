use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Item,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => write!(f, "user"),
            EntityKind::Item => write!(f, "item"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RecError {
    /// Key was never observed while the encoder was fitted.
    #[error("unknown {kind} key: {key}")]
    UnknownKey { kind: EntityKind, key: String },

    /// Index outside the bounds of the factor matrix; encoder and model disagree.
    #[error("{kind} index {index} out of range (bound {bound})")]
    OutOfRange {
        kind: EntityKind,
        index: usize,
        bound: usize,
    },

    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("test set is empty")]
    EmptyTestSet,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid rating {value} at row {row}")]
    InvalidRating { row: usize, value: f32 },

    #[error("parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, RecError>;
