use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use movierec::{
    evaluate, init_tracing, Config, CsvRatingSource, FileModelStore, ModelHandle, ModelStore,
    RatingDataset, RatingSource, Recommender,
};
use movierec::utils::validation::validate_delimiter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Movie recommendations from a trained factorization model", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decide whether to recommend a movie to a user
    Recommend {
        /// Saved model file
        #[arg(short, long)]
        model: PathBuf,

        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        item: String,

        /// Overrides the configured threshold
        #[arg(short, long)]
        threshold: Option<f32>,
    },
    /// Score a saved model against a rating file
    Evaluate {
        #[arg(short, long)]
        model: PathBuf,

        #[arg(short, long)]
        test: PathBuf,
    },
}

fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file(path)
    } else {
        info!("Config file not found, using default configuration");
        Ok(Config::default())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let mut config = load_config(&args.config)?;
    let store = FileModelStore::new(&config.model_store.directory);

    match args.command {
        Command::Recommend {
            model,
            user,
            item,
            threshold,
        } => {
            if let Some(threshold) = threshold {
                config.recommendation.threshold = threshold;
            }
            let handle = ModelHandle::new(model.to_string_lossy());
            let model = store
                .load::<String>(&handle)
                .with_context(|| format!("loading model {}", handle))?;

            let recommender = Recommender::new(Arc::new(model), &config.recommendation)?;
            let decision = recommender.decide(&user, &item)?;

            if decision.recommended {
                println!("Movie {} is recommended for user {}", decision.item_key, decision.user_key);
            } else {
                println!("Movie {} is not recommended for user {}", decision.item_key, decision.user_key);
            }
            println!(
                "Predicted score: {:.3} (rounded {:.1}, threshold {:.1})",
                decision.score,
                decision.rounded_score,
                recommender.threshold()
            );
        }
        Command::Evaluate { model, test } => {
            let handle = ModelHandle::new(model.to_string_lossy());
            let model = store
                .load::<String>(&handle)
                .with_context(|| format!("loading model {}", handle))?;

            let delimiter = validate_delimiter(config.data.delimiter)?;
            let source = CsvRatingSource::new(test)
                .with_header(config.data.has_header)
                .with_delimiter(delimiter);
            let test_set = RatingDataset::encode(model.encoder(), &source.ratings()?)?;
            let metrics = evaluate(&model, &test_set)?;

            println!("Root Mean Squared Error : {:.4}", metrics.rmse);
            println!("RSquared: {:.4}", metrics.r_squared);
            println!("Mean Absolute Error: {:.4}", metrics.mae);
        }
    }

    Ok(())
}
