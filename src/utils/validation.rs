use crate::config::TrainingConfig;
use crate::error::{RecError, Result};

pub fn validate_training_config(config: &TrainingConfig) -> Result<()> {
    if config.rank == 0 {
        return Err(RecError::InvalidConfig("rank must be a positive integer".to_string()));
    }

    if config.iterations == 0 {
        return Err(RecError::InvalidConfig(
            "iterations must be a positive integer".to_string(),
        ));
    }

    validate_non_negative("learning_rate", config.learning_rate)?;
    validate_non_negative("regularization", config.regularization)?;

    config
        .initialization
        .validate()
        .map_err(RecError::InvalidConfig)?;

    if let Some(early_stopping) = &config.early_stopping {
        if early_stopping.patience == 0 {
            return Err(RecError::InvalidConfig(
                "early stopping patience must be at least 1".to_string(),
            ));
        }
        validate_non_negative("early stopping min_delta", early_stopping.min_delta)?;
    }

    Ok(())
}

pub fn validate_threshold(threshold: f32) -> Result<()> {
    if !threshold.is_finite() {
        return Err(RecError::InvalidConfig(format!(
            "recommendation threshold must be finite, got {}",
            threshold
        )));
    }
    Ok(())
}

/// The csv reader takes a single byte, so only ASCII delimiters are usable.
pub fn validate_delimiter(delimiter: char) -> Result<u8> {
    if !delimiter.is_ascii() {
        return Err(RecError::InvalidConfig(format!(
            "delimiter must be a single ASCII character, got {:?}",
            delimiter
        )));
    }
    Ok(delimiter as u8)
}

fn validate_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(RecError::InvalidConfig(format!(
            "{} must be a non-negative real, got {}",
            name, value
        )));
    }
    Ok(())
}
