//! Ingestion pipeline: fold one completed call's outcome into the
//! knowledge graph and vector store.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use leadgraph_common::{
    objection_strategy_key, signal_strategy_key, CallOutcome, EngineError, KeyOrder, LearnReceipt,
};

use crate::patterns::extract_patterns;
use crate::traits::{GraphStore, StrategyUpsert, VectorStore};

/// Tunables for the ingestion pipeline.
#[derive(Debug, Clone, Default)]
pub struct LearnOptions {
    /// Ordering rule for buying-signal strategy keys. `Observed` is the
    /// historical default; `Sorted` merges equivalent signal sets.
    pub signal_key_order: KeyOrder,
}

/// The "Learn" side of the engine. One invocation per completed call.
///
/// Not idempotent by design: replaying the same payload counts as a new
/// occurrence everywhere. Deduplication belongs to the trigger layer.
pub struct LearnEngine {
    graph: Arc<dyn GraphStore>,
    vectors: Arc<dyn VectorStore>,
    options: LearnOptions,
}

impl LearnEngine {
    pub fn new(graph: Arc<dyn GraphStore>, vectors: Arc<dyn VectorStore>) -> Self {
        Self::with_options(graph, vectors, LearnOptions::default())
    }

    pub fn with_options(
        graph: Arc<dyn GraphStore>,
        vectors: Arc<dyn VectorStore>,
        options: LearnOptions,
    ) -> Self {
        Self {
            graph,
            vectors,
            options,
        }
    }

    /// Run the ordered ingestion steps for one call outcome.
    ///
    /// Any graph step failure aborts the whole call with the step index in
    /// the error so the trigger layer can replay it. The vector append is
    /// best-effort: logged on failure, never fatal.
    pub async fn learn_from_call(&self, outcome: &CallOutcome) -> Result<LearnReceipt, EngineError> {
        outcome.validate()?;

        // Step 1: success predicate.
        let is_successful = outcome.is_successful();
        let now = Utc::now();
        let conversation_id = outcome.conversation_id.as_str();

        // Step 2: Lead counters.
        self.graph
            .merge_lead(outcome, is_successful, now)
            .await
            .map_err(|e| EngineError::graph_write(2, conversation_id, e))?;

        // Step 3: write-once Conversation node.
        self.graph
            .create_conversation(outcome, is_successful, now)
            .await
            .map_err(|e| EngineError::graph_write(3, conversation_id, e))?;

        // Step 4: buying-signal aggregates.
        for signal in &outcome.buying_signals {
            self.graph
                .merge_buying_signal(conversation_id, signal, is_successful, now)
                .await
                .map_err(|e| EngineError::graph_write(4, conversation_id, e))?;
        }

        // Step 5: objection aggregates, plus handling strategies for the
        // ones that were overcome.
        for objection in &outcome.objections {
            self.graph
                .merge_objection(conversation_id, objection, now)
                .await
                .map_err(|e| EngineError::graph_write(5, conversation_id, e))?;

            if objection.was_overcome {
                if let Some(strategy) = objection
                    .handling_strategy
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
                {
                    self.graph
                        .merge_handling_strategy(&objection.objection_type, strategy)
                        .await
                        .map_err(|e| EngineError::graph_write(5, conversation_id, e))?;
                }
            }
        }

        // Step 6: structural patterns.
        let patterns = extract_patterns(&outcome.transcript, outcome.engagement_metrics.as_ref());
        for pattern in &patterns {
            self.graph
                .merge_pattern(conversation_id, pattern, is_successful)
                .await
                .map_err(|e| EngineError::graph_write(6, conversation_id, e))?;
        }

        // Step 7: industry rollup and company-size edge.
        self.graph
            .merge_industry(&outcome.industry, outcome.qualification_score, is_successful)
            .await
            .map_err(|e| EngineError::graph_write(7, conversation_id, e))?;

        if let Some(size) = outcome.company_size.as_deref().filter(|s| !s.is_empty()) {
            self.graph
                .merge_company_size(&outcome.industry, size, is_successful)
                .await
                .map_err(|e| EngineError::graph_write(7, conversation_id, e))?;
        }

        // Step 8: embed successful transcripts for semantic recall.
        // Non-critical side effect: a vector outage must not fail learning.
        if is_successful && !outcome.transcript.is_empty() {
            let metadata = json!({
                "industry": outcome.industry,
                "companySize": outcome.company_size.clone().unwrap_or_default(),
                "qualificationScore": outcome.qualification_score,
                "buyingSignals": signal_types(outcome).join(","),
                "duration": outcome.duration,
            });
            if let Err(e) = self
                .vectors
                .add_transcript(conversation_id, &outcome.transcript, metadata)
                .await
            {
                let err = EngineError::vector_write(conversation_id, e);
                warn!(
                    error = %err,
                    "Vector store append failed; continuing without embedding"
                );
            }
        }

        // Step 9: derived strategies, successful conversations only.
        if is_successful {
            self.merge_strategies(outcome, conversation_id).await?;
        }

        info!(
            conversation_id,
            lead_id = outcome.lead_id.as_str(),
            industry = outcome.industry.as_str(),
            is_successful,
            signals = outcome.buying_signals.len(),
            objections = outcome.objections.len(),
            patterns = patterns.len(),
            "Learned from call"
        );

        Ok(LearnReceipt {
            conversation_id: conversation_id.to_string(),
        })
    }

    async fn merge_strategies(
        &self,
        outcome: &CallOutcome,
        conversation_id: &str,
    ) -> Result<(), EngineError> {
        let signals = signal_types(outcome);
        if !signals.is_empty() {
            let key = signal_strategy_key(
                &outcome.industry,
                outcome.company_size.as_deref(),
                &signals,
                self.options.signal_key_order,
            );
            let components = match self.options.signal_key_order {
                KeyOrder::Observed => signals.clone(),
                KeyOrder::Sorted => {
                    let mut sorted = signals.clone();
                    sorted.sort_unstable();
                    sorted
                }
            };
            self.graph
                .merge_strategy(
                    conversation_id,
                    &StrategyUpsert {
                        strategy_id: key,
                        strategy_type: "buying-signals".to_string(),
                        industry: outcome.industry.clone(),
                        company_size: outcome.company_size.clone(),
                        components,
                        qualification_score: outcome.qualification_score,
                    },
                )
                .await
                .map_err(|e| EngineError::graph_write(9, conversation_id, e))?;
        }

        let mut overcome: Vec<String> = outcome
            .objections
            .iter()
            .filter(|o| o.was_overcome)
            .map(|o| o.objection_type.clone())
            .collect();
        if !overcome.is_empty() {
            let key = objection_strategy_key(&outcome.industry, &overcome);
            overcome.sort_unstable();
            self.graph
                .merge_strategy(
                    conversation_id,
                    &StrategyUpsert {
                        strategy_id: key,
                        strategy_type: "objection-handling".to_string(),
                        industry: outcome.industry.clone(),
                        company_size: None,
                        components: overcome,
                        qualification_score: outcome.qualification_score,
                    },
                )
                .await
                .map_err(|e| EngineError::graph_write(9, conversation_id, e))?;
        }

        Ok(())
    }
}

fn signal_types(outcome: &CallOutcome) -> Vec<String> {
    outcome
        .buying_signals
        .iter()
        .map(|s| s.signal_type.clone())
        .collect()
}
