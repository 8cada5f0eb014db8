use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use leadgraph_common::Config;
use leadgraph_engine::{ChromaStore, LearnEngine, Neo4jStore, RecallEngine};
use leadgraph_graph::{schema, AnalyticsReader, GraphClient};

mod rest;

pub struct AppState {
    pub learn: LearnEngine,
    pub recall: RecallEngine,
    pub analytics: AnalyticsReader,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("leadgraph=info".parse()?))
        .init();

    let config = Config::from_env();

    let client = GraphClient::from_config(&config).await?;
    schema::migrate(&client).await?;

    let graph = Arc::new(Neo4jStore::new(client.clone()));
    let vectors = Arc::new(
        ChromaStore::connect(&config.chroma_url, &config.chroma_collection).await?,
    );

    let state = Arc::new(AppState {
        learn: LearnEngine::new(graph.clone(), vectors.clone()),
        recall: RecallEngine::new(graph, vectors),
        analytics: AnalyticsReader::new(client),
    });

    let app = Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Knowledge engine API
        .route("/api/learn", post(rest::api_learn))
        .route("/api/recall", post(rest::api_recall))
        .route("/api/analytics", get(rest::api_analytics))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!(addr = addr.as_str(), "leadgraph API listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
