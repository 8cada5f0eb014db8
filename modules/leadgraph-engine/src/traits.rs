//! Trait abstractions for the engine's storage dependencies.
//!
//! GraphStore wraps the Neo4j writer/reader pair; VectorStore wraps the
//! Chroma collection. These seams let the pipeline and retrieval tests run
//! against in-memory doubles: no network, no database, no Docker.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use chroma_client::ChromaClient;
use leadgraph_common::{
    BuyingSignal, CallOutcome, ConversationPattern, IndustryInsights, Objection, ObjectionInsight,
    PatternStats, SemanticMatch, SignalStats, SimilarLead, StrategyRecord,
};
use leadgraph_graph::{GraphClient, KnowledgeReader, KnowledgeWriter};

/// Upsert payload for one derived Strategy node.
#[derive(Debug, Clone)]
pub struct StrategyUpsert {
    pub strategy_id: String,
    pub strategy_type: String,
    pub industry: String,
    pub company_size: Option<String>,
    pub components: Vec<String>,
    pub qualification_score: f64,
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    // Write side: one method per ingestion step, each atomic per node.
    async fn merge_lead(
        &self,
        outcome: &CallOutcome,
        is_successful: bool,
        now: DateTime<Utc>,
    ) -> Result<()>;

    async fn create_conversation(
        &self,
        outcome: &CallOutcome,
        is_successful: bool,
        now: DateTime<Utc>,
    ) -> Result<()>;

    async fn merge_buying_signal(
        &self,
        conversation_id: &str,
        signal: &BuyingSignal,
        is_successful: bool,
        now: DateTime<Utc>,
    ) -> Result<()>;

    async fn merge_objection(
        &self,
        conversation_id: &str,
        objection: &Objection,
        now: DateTime<Utc>,
    ) -> Result<()>;

    async fn merge_handling_strategy(&self, objection_type: &str, strategy: &str) -> Result<()>;

    async fn merge_pattern(
        &self,
        conversation_id: &str,
        pattern: &ConversationPattern,
        is_successful: bool,
    ) -> Result<()>;

    async fn merge_industry(
        &self,
        industry: &str,
        qualification_score: f64,
        is_successful: bool,
    ) -> Result<()>;

    async fn merge_company_size(
        &self,
        industry: &str,
        size: &str,
        is_successful: bool,
    ) -> Result<()>;

    async fn merge_strategy(&self, conversation_id: &str, strategy: &StrategyUpsert)
        -> Result<()>;

    // Read side: one method per retrieval sub-query.
    async fn similar_successful_leads(&self, industry: &str) -> Result<Vec<SimilarLead>>;

    async fn strategies_for(
        &self,
        industry: &str,
        company_size: Option<&str>,
    ) -> Result<Vec<StrategyRecord>>;

    async fn objections_with_handling(&self, industry: &str) -> Result<Vec<ObjectionInsight>>;

    async fn industry_insights(&self, industry: &str) -> Result<Option<IndustryInsights>>;

    async fn successful_patterns(&self, industry: &str) -> Result<Vec<PatternStats>>;

    async fn effective_signals(&self, industry: &str) -> Result<Vec<SignalStats>>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Append one successful-conversation transcript, keyed by conversation
    /// id, with filterable metadata.
    async fn add_transcript(
        &self,
        conversation_id: &str,
        transcript: &str,
        metadata: Value,
    ) -> Result<()>;

    /// Nearest neighbors of `query_text` within one industry.
    /// Similarity is 1 − distance.
    async fn similar_transcripts(
        &self,
        query_text: &str,
        k: usize,
        industry: &str,
    ) -> Result<Vec<SemanticMatch>>;
}

// ---------------------------------------------------------------------------
// Neo4jStore — production GraphStore over the writer/reader pair
// ---------------------------------------------------------------------------

pub struct Neo4jStore {
    writer: KnowledgeWriter,
    reader: KnowledgeReader,
}

impl Neo4jStore {
    pub fn new(client: GraphClient) -> Self {
        Self {
            writer: KnowledgeWriter::new(client.clone()),
            reader: KnowledgeReader::new(client),
        }
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn merge_lead(
        &self,
        outcome: &CallOutcome,
        is_successful: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        Ok(self.writer.merge_lead(outcome, is_successful, now).await?)
    }

    async fn create_conversation(
        &self,
        outcome: &CallOutcome,
        is_successful: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        Ok(self
            .writer
            .create_conversation(outcome, is_successful, now)
            .await?)
    }

    async fn merge_buying_signal(
        &self,
        conversation_id: &str,
        signal: &BuyingSignal,
        is_successful: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        Ok(self
            .writer
            .merge_buying_signal(conversation_id, signal, is_successful, now)
            .await?)
    }

    async fn merge_objection(
        &self,
        conversation_id: &str,
        objection: &Objection,
        now: DateTime<Utc>,
    ) -> Result<()> {
        Ok(self
            .writer
            .merge_objection(conversation_id, objection, now)
            .await?)
    }

    async fn merge_handling_strategy(&self, objection_type: &str, strategy: &str) -> Result<()> {
        Ok(self
            .writer
            .merge_handling_strategy(objection_type, strategy)
            .await?)
    }

    async fn merge_pattern(
        &self,
        conversation_id: &str,
        pattern: &ConversationPattern,
        is_successful: bool,
    ) -> Result<()> {
        Ok(self
            .writer
            .merge_pattern(conversation_id, pattern, is_successful)
            .await?)
    }

    async fn merge_industry(
        &self,
        industry: &str,
        qualification_score: f64,
        is_successful: bool,
    ) -> Result<()> {
        Ok(self
            .writer
            .merge_industry(industry, qualification_score, is_successful)
            .await?)
    }

    async fn merge_company_size(
        &self,
        industry: &str,
        size: &str,
        is_successful: bool,
    ) -> Result<()> {
        Ok(self
            .writer
            .merge_company_size(industry, size, is_successful)
            .await?)
    }

    async fn merge_strategy(
        &self,
        conversation_id: &str,
        strategy: &StrategyUpsert,
    ) -> Result<()> {
        Ok(self
            .writer
            .merge_strategy(
                conversation_id,
                &strategy.strategy_id,
                &strategy.strategy_type,
                &strategy.industry,
                strategy.company_size.as_deref(),
                &strategy.components.join(","),
                strategy.qualification_score,
            )
            .await?)
    }

    async fn similar_successful_leads(&self, industry: &str) -> Result<Vec<SimilarLead>> {
        Ok(self.reader.similar_successful_leads(industry).await?)
    }

    async fn strategies_for(
        &self,
        industry: &str,
        company_size: Option<&str>,
    ) -> Result<Vec<StrategyRecord>> {
        Ok(self.reader.strategies_for(industry, company_size).await?)
    }

    async fn objections_with_handling(&self, industry: &str) -> Result<Vec<ObjectionInsight>> {
        Ok(self.reader.objections_with_handling(industry).await?)
    }

    async fn industry_insights(&self, industry: &str) -> Result<Option<IndustryInsights>> {
        Ok(self.reader.industry_insights(industry).await?)
    }

    async fn successful_patterns(&self, industry: &str) -> Result<Vec<PatternStats>> {
        Ok(self.reader.successful_patterns(industry).await?)
    }

    async fn effective_signals(&self, industry: &str) -> Result<Vec<SignalStats>> {
        Ok(self.reader.effective_signals(industry).await?)
    }
}

// ---------------------------------------------------------------------------
// ChromaStore — production VectorStore over one Chroma collection
// ---------------------------------------------------------------------------

pub struct ChromaStore {
    client: ChromaClient,
    collection_id: String,
}

impl ChromaStore {
    /// Connect to Chroma and get-or-create the named collection.
    pub async fn connect(base_url: &str, collection_name: &str) -> Result<Self> {
        let client = ChromaClient::new(base_url);
        let collection_id = client.get_or_create_collection(collection_name).await?;
        Ok(Self {
            client,
            collection_id,
        })
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn add_transcript(
        &self,
        conversation_id: &str,
        transcript: &str,
        metadata: Value,
    ) -> Result<()> {
        self.client
            .add(
                &self.collection_id,
                &[conversation_id.to_string()],
                &[transcript.to_string()],
                &[metadata],
            )
            .await?;
        Ok(())
    }

    async fn similar_transcripts(
        &self,
        query_text: &str,
        k: usize,
        industry: &str,
    ) -> Result<Vec<SemanticMatch>> {
        let filter = serde_json::json!({ "industry": industry });
        let result = self
            .client
            .query(&self.collection_id, query_text, k, Some(filter))
            .await?;

        let mut matches = Vec::with_capacity(result.ids.len());
        for (i, id) in result.ids.into_iter().enumerate() {
            let distance = result.distances.get(i).copied().unwrap_or(1.0);
            matches.push(SemanticMatch {
                conversation_id: id,
                similarity: 1.0 - distance,
                metadata: result.metadatas.get(i).cloned().unwrap_or(Value::Null),
                document: result.documents.get(i).cloned().flatten(),
            });
        }
        Ok(matches)
    }
}
