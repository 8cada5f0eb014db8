pub mod analytics;
pub mod client;
pub mod reader;
pub mod schema;
pub mod writer;

#[cfg(any(test, feature = "test-utils"))]
pub mod testutil;

pub use analytics::AnalyticsReader;
pub use client::GraphClient;
pub use reader::KnowledgeReader;
pub use writer::KnowledgeWriter;
