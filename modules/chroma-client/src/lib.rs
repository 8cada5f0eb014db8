pub mod error;

pub use error::{ChromaError, Result};

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Client for the Chroma HTTP API. Text embedding happens server-side
/// through the collection's configured embedding function.
pub struct ChromaClient {
    client: reqwest::Client,
    base_url: String,
}

/// Nearest-neighbor results for one query text.
///
/// Chroma returns parallel per-query arrays; since we always query with a
/// single text, the outer dimension is flattened away here.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub ids: Vec<String>,
    pub distances: Vec<f64>,
    pub metadatas: Vec<Value>,
    pub documents: Vec<Option<String>>,
}

#[derive(Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Deserialize)]
struct RawQueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Value>>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
}

impl ChromaClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get or create a named collection. Returns the collection id used by
    /// the other endpoints.
    pub async fn get_or_create_collection(&self, name: &str) -> Result<String> {
        let endpoint = format!("{}/api/v1/collections", self.base_url);
        let body = serde_json::json!({ "name": name, "get_or_create": true });

        let resp = self.client.post(&endpoint).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ChromaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let collection: CollectionResponse = resp
            .json()
            .await
            .map_err(|e| ChromaError::Decode(e.to_string()))?;
        debug!(name, id = collection.id.as_str(), "Chroma collection ready");
        Ok(collection.id)
    }

    /// Add documents to a collection. `ids`, `documents` and `metadatas`
    /// are parallel arrays.
    pub async fn add(
        &self,
        collection_id: &str,
        ids: &[String],
        documents: &[String],
        metadatas: &[Value],
    ) -> Result<()> {
        let endpoint = format!("{}/api/v1/collections/{collection_id}/add", self.base_url);
        let body = serde_json::json!({
            "ids": ids,
            "documents": documents,
            "metadatas": metadatas,
        });

        let resp = self.client.post(&endpoint).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ChromaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    /// Query a collection for the nearest neighbors of `query_text`,
    /// optionally restricted by a metadata `where` filter.
    pub async fn query(
        &self,
        collection_id: &str,
        query_text: &str,
        n_results: usize,
        where_filter: Option<Value>,
    ) -> Result<QueryResult> {
        let endpoint = format!("{}/api/v1/collections/{collection_id}/query", self.base_url);
        let mut body = serde_json::json!({
            "query_texts": [query_text],
            "n_results": n_results,
            "include": ["metadatas", "documents", "distances"],
        });
        if let Some(filter) = where_filter {
            body["where"] = filter;
        }

        let resp = self.client.post(&endpoint).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ChromaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let raw: RawQueryResponse = resp
            .json()
            .await
            .map_err(|e| ChromaError::Decode(e.to_string()))?;

        let ids = raw.ids.into_iter().next().unwrap_or_default();
        let distances = raw
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();
        let metadatas = raw
            .metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default();
        let documents = raw
            .documents
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();

        Ok(QueryResult {
            ids,
            distances,
            metadatas,
            documents,
        })
    }
}
