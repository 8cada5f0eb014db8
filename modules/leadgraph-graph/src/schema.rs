use neo4rs::query;
use tracing::{info, warn};

use crate::GraphClient;

/// Run idempotent schema migrations: unique constraints and indexes for the
/// knowledge graph. "Already exists" errors are ignored so this is safe to
/// run on every startup.
pub async fn migrate(client: &GraphClient) -> Result<(), neo4rs::Error> {
    let g = &client.graph;

    info!("Running knowledge graph schema migrations...");

    // One unique key per node label.
    let constraints = [
        "CREATE CONSTRAINT ON (n:Lead) ASSERT n.lead_id IS UNIQUE",
        "CREATE CONSTRAINT ON (n:Conversation) ASSERT n.conversation_id IS UNIQUE",
        "CREATE CONSTRAINT ON (n:BuyingSignal) ASSERT n.name IS UNIQUE",
        "CREATE CONSTRAINT ON (n:Objection) ASSERT n.objection_type IS UNIQUE",
        "CREATE CONSTRAINT ON (n:HandlingStrategy) ASSERT n.strategy IS UNIQUE",
        "CREATE CONSTRAINT ON (n:ConversationPattern) ASSERT n.pattern_id IS UNIQUE",
        "CREATE CONSTRAINT ON (n:Industry) ASSERT n.name IS UNIQUE",
        "CREATE CONSTRAINT ON (n:CompanySize) ASSERT n.size IS UNIQUE",
        "CREATE CONSTRAINT ON (n:Strategy) ASSERT n.strategy_id IS UNIQUE",
    ];

    for c in &constraints {
        run_ignoring_exists(g, c).await?;
    }
    info!("Uniqueness constraints created");

    // Secondary indexes on the properties retrieval filters and sorts by.
    let indexes = [
        "CREATE INDEX ON :Lead(industry)",
        "CREATE INDEX ON :Lead(success_rate)",
        "CREATE INDEX ON :Conversation(is_successful)",
        "CREATE INDEX ON :Strategy(industry)",
        "CREATE INDEX ON :Strategy(confidence)",
        "CREATE INDEX ON :BuyingSignal(success_rate)",
        "CREATE INDEX ON :ConversationPattern(success_rate)",
        "CREATE INDEX ON :Objection(total_occurrences)",
    ];

    for idx in &indexes {
        run_ignoring_exists(g, idx).await?;
    }
    info!("Property indexes created");

    Ok(())
}

async fn run_ignoring_exists(g: &neo4rs::Graph, cypher: &str) -> Result<(), neo4rs::Error> {
    match g.run(query(cypher)).await {
        Ok(_) => Ok(()),
        Err(e) => {
            let msg = e.to_string();
            if is_exists_error(&msg) {
                Ok(())
            } else {
                warn!(cypher, "Schema migration statement failed: {msg}");
                Err(e)
            }
        }
    }
}

/// True only for the duplicate-schema-rule errors the store raises when the
/// constraint or index is already in place.
fn is_exists_error(msg: &str) -> bool {
    let msg = msg.to_lowercase();
    msg.contains("already exists") || msg.contains("equivalent")
}
