pub mod model_store;
pub mod recommendation;
pub mod training;
