pub mod learn;
pub mod patterns;
pub mod recall;
pub mod traits;

pub use learn::{LearnEngine, LearnOptions};
pub use patterns::extract_patterns;
pub use recall::RecallEngine;
pub use traits::{ChromaStore, GraphStore, Neo4jStore, StrategyUpsert, VectorStore};
