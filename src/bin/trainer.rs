use anyhow::Result;
use clap::Parser;
use movierec::algorithms::Solver;
use movierec::services::training::TrainingService;
use movierec::utils::validation::validate_delimiter;
use movierec::{init_tracing, Config, CsvRatingSource, FileModelStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Overrides the configured training file
    #[arg(long)]
    train: Option<PathBuf>,

    /// Overrides the configured test file
    #[arg(long)]
    test: Option<PathBuf>,

    #[arg(long)]
    rank: Option<usize>,

    #[arg(long)]
    iterations: Option<usize>,

    #[arg(long, value_parser = parse_solver)]
    solver: Option<Solver>,

    #[arg(long)]
    seed: Option<u64>,

    /// Drop test ratings whose user or movie never appears in training
    #[arg(long)]
    skip_unknown: bool,

    /// Write the training report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

fn parse_solver(value: &str) -> Result<Solver, String> {
    match value {
        "sgd" => Ok(Solver::Sgd),
        "als" => Ok(Solver::Als),
        other => Err(format!("unknown solver {:?}, expected sgd or als", other)),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    info!("Starting movierec trainer");

    let mut config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };

    if let Some(train) = args.train {
        config.data.train_path = train;
    }
    if let Some(test) = args.test {
        config.data.test_path = test;
    }
    if let Some(rank) = args.rank {
        config.training.rank = rank;
    }
    if let Some(iterations) = args.iterations {
        config.training.iterations = iterations;
    }
    if let Some(solver) = args.solver {
        config.training.solver = solver;
    }
    if args.seed.is_some() {
        config.training.seed = args.seed;
    }

    info!("Training configuration: {:?}", config.training);

    let delimiter = validate_delimiter(config.data.delimiter)?;
    let source = |path: &PathBuf| {
        CsvRatingSource::new(path)
            .with_header(config.data.has_header)
            .with_delimiter(delimiter)
    };
    let train_source = source(&config.data.train_path);
    let test_source = source(&config.data.test_path);
    let store = FileModelStore::new(&config.model_store.directory);

    let config = Arc::new(config);
    let service = TrainingService::new(config.clone(), store)?.skip_unknown_test_keys(args.skip_unknown);
    let (_, report) = service.run(&train_source, &test_source)?;

    println!("Root Mean Squared Error : {:.4}", report.metrics.rmse);
    println!("RSquared: {:.4}", report.metrics.r_squared);
    println!("Model saved to {}", report.handle);

    if let Some(path) = args.report {
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        info!("Wrote training report to {}", path.display());
    }

    Ok(())
}
