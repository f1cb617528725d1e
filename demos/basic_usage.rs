use movierec::config::{RecommendationConfig, TrainingConfig};
use movierec::*;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    init_tracing("info");

    println!("🎬 movierec basic usage");

    // 1. A tiny rating log: two users with opposite taste
    let ratings: Vec<RawRating<String>> = [
        ("1", "10", 5.0),
        ("1", "20", 1.0),
        ("1", "30", 4.5),
        ("2", "10", 1.0),
        ("2", "20", 5.0),
        ("6", "10", 4.0),
        ("6", "30", 4.0),
    ]
    .iter()
    .map(|(user, movie, rating)| RawRating::new(user.to_string(), movie.to_string(), *rating))
    .collect();
    println!("✅ Loaded {} ratings", ratings.len());

    // 2. Encode keys and train
    let encoder = IdEncoder::fit(&ratings);
    println!("👤 {} users, 📦 {} movies", encoder.num_users(), encoder.num_items());

    let dataset = RatingDataset::encode(&encoder, &ratings)?;
    let trainer = Trainer::new(TrainingConfig {
        rank: 4,
        iterations: 20,
        regularization: 0.05,
        seed: Some(2024),
        ..TrainingConfig::default()
    })?;
    let model = trainer.fit(encoder, &dataset)?;
    println!("🧠 Trained in {} passes", model.metadata().iterations_run);

    // 3. Evaluate on the training data
    let metrics = evaluate(&model, &dataset)?;
    println!("📊 {}", metrics);

    // 4. Save and reload
    let store = InMemoryModelStore::new();
    let handle = store.save(&model)?;
    let model: Model<String> = store.load(&handle)?;
    println!("💾 Model stored as {}", handle);

    // 5. Ask for a decision
    let recommender = Recommender::new(Arc::new(model), &RecommendationConfig::default())?;
    for movie in ["10", "20", "30"] {
        let decision = recommender.decide(&"6".to_string(), &movie.to_string())?;
        let verdict = if decision.recommended { "is" } else { "is not" };
        println!(
            "🎯 Movie {} {} recommended for user 6 (score {:.2})",
            movie, verdict, decision.score
        );
    }

    Ok(())
}
