use crate::error::{RecError, Result};
use crate::models::{RatingKey, RawRating};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::info;

pub trait RatingSource {
    type Key: RatingKey;

    fn ratings(&self) -> Result<Vec<RawRating<Self::Key>>>;
}

impl<K: RatingKey> RatingSource for Vec<RawRating<K>> {
    type Key = K;

    fn ratings(&self) -> Result<Vec<RawRating<K>>> {
        Ok(self.clone())
    }
}

/// Delimited text file with columns `user, item, rating[, timestamp]`.
#[derive(Debug, Clone)]
pub struct CsvRatingSource {
    path: PathBuf,
    has_header: bool,
    delimiter: u8,
}

impl CsvRatingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            has_header: true,
            delimiter: b',',
        }
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_from<R: Read>(&self, reader: R) -> Result<Vec<RawRating<String>>> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(self.has_header)
            .delimiter(self.delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let first_line = if self.has_header { 2 } else { 1 };
        let mut ratings = Vec::new();

        for (i, result) in rdr.records().enumerate() {
            let record = result?;
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(first_line + i);

            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            if record.len() < 3 {
                return Err(RecError::Parse {
                    line,
                    reason: format!("expected at least 3 fields, found {}", record.len()),
                });
            }

            let user_key = required_field(&record, 0, "user", line)?;
            let item_key = required_field(&record, 1, "item", line)?;
            let rating_field = required_field(&record, 2, "rating", line)?;
            let rating = rating_field.parse::<f32>().map_err(|e| RecError::Parse {
                line,
                reason: format!("rating {:?}: {}", rating_field, e),
            })?;
            let timestamp = match record.get(3).filter(|f| !f.is_empty()) {
                Some(field) => Some(field.parse::<i64>().map_err(|e| RecError::Parse {
                    line,
                    reason: format!("timestamp {:?}: {}", field, e),
                })?),
                None => None,
            };

            ratings.push(RawRating {
                user_key,
                item_key,
                rating,
                timestamp,
            });
        }

        Ok(ratings)
    }
}

fn required_field(record: &csv::StringRecord, index: usize, name: &str, line: usize) -> Result<String> {
    match record.get(index) {
        Some(field) if !field.is_empty() => Ok(field.to_string()),
        _ => Err(RecError::Parse {
            line,
            reason: format!("missing {} field", name),
        }),
    }
}

impl RatingSource for CsvRatingSource {
    type Key = String;

    fn ratings(&self) -> Result<Vec<RawRating<String>>> {
        let file = File::open(&self.path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                RecError::Io(std::io::Error::new(
                    ErrorKind::NotFound,
                    format!("file not found: {}", self.path.display()),
                ))
            } else {
                RecError::Io(e)
            }
        })?;

        let ratings = self.read_from(file)?;
        info!("Loaded {} ratings from {}", ratings.len(), self.path.display());
        Ok(ratings)
    }
}
