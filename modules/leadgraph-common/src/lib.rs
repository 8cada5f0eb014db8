pub mod config;
pub mod error;
pub mod keys;
pub mod types;

pub use config::Config;
pub use error::EngineError;
pub use keys::{objection_strategy_key, signal_strategy_key, KeyOrder};
pub use types::*;
