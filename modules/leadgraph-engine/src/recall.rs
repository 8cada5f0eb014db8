//! Retrieval engine: answer "what do we know that can help with this lead?"
//!
//! Graph sub-queries are authoritative; a failure there is fatal. The
//! semantic sub-query is a bonus signal; a vector outage degrades to an
//! empty result list. Sub-query results are merged only at the
//! recommendation-synthesis layer by fixed category precedence, never by a
//! blended score.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, warn};

use leadgraph_common::{EngineError, Knowledge, LeadProfile, Priority, Recommendation};

use crate::traits::{GraphStore, VectorStore};

/// Semantic neighbors fetched per retrieval.
const SEMANTIC_NEIGHBORS: usize = 5;

/// The "Recall" side of the engine. Read-only.
pub struct RecallEngine {
    graph: Arc<dyn GraphStore>,
    vectors: Arc<dyn VectorStore>,
}

impl RecallEngine {
    pub fn new(graph: Arc<dyn GraphStore>, vectors: Arc<dyn VectorStore>) -> Self {
        Self { graph, vectors }
    }

    /// Assemble the knowledge bundle for a new lead.
    ///
    /// `deadline` is a caller-supplied soft budget: once it expires, the
    /// remaining sub-queries are abandoned and whatever was assembled so far
    /// is returned. No deadline means run everything.
    pub async fn retrieve_knowledge(
        &self,
        lead: &LeadProfile,
        deadline: Option<Duration>,
    ) -> Result<Knowledge, EngineError> {
        lead.validate()?;

        let started = Instant::now();
        let expired = |label: &str| {
            let hit = deadline.is_some_and(|d| started.elapsed() >= d);
            if hit {
                debug!(lead_id = lead.lead_id.as_str(), label, "Retrieval budget expired");
            }
            hit
        };

        let industry = lead.industry.as_str();
        let mut knowledge = Knowledge::default();

        if !expired("similar_leads") {
            knowledge.similar_leads = self
                .graph
                .similar_successful_leads(industry)
                .await
                .map_err(|e| EngineError::graph_read("similar_successful_leads", e))?;
        }

        if !expired("strategies") {
            knowledge.successful_strategies = self
                .graph
                .strategies_for(industry, lead.company_size.as_deref())
                .await
                .map_err(|e| EngineError::graph_read("strategies_for", e))?;
        }

        if !expired("objections") {
            knowledge.relevant_objections = self
                .graph
                .objections_with_handling(industry)
                .await
                .map_err(|e| EngineError::graph_read("objections_with_handling", e))?;
        }

        if !expired("industry_insights") {
            knowledge.industry_insights = self
                .graph
                .industry_insights(industry)
                .await
                .map_err(|e| EngineError::graph_read("industry_insights", e))?;
        }

        if !expired("patterns") {
            knowledge.conversation_patterns = self
                .graph
                .successful_patterns(industry)
                .await
                .map_err(|e| EngineError::graph_read("successful_patterns", e))?;
        }

        if !expired("signals") {
            knowledge.effective_signals = self
                .graph
                .effective_signals(industry)
                .await
                .map_err(|e| EngineError::graph_read("effective_signals", e))?;
        }

        if !lead.previous_interactions.is_empty() && !expired("semantic") {
            let query_text = lead.previous_interactions.join("\n");
            match self
                .vectors
                .similar_transcripts(&query_text, SEMANTIC_NEIGHBORS, industry)
                .await
            {
                Ok(matches) => knowledge.semantic_results = matches,
                Err(e) => {
                    let err = EngineError::vector_read(e);
                    warn!(
                        lead_id = lead.lead_id.as_str(),
                        industry,
                        error = %err,
                        "Semantic sub-query failed; continuing with graph knowledge only"
                    );
                }
            }
        }

        knowledge.recommendations = synthesize_recommendations(&knowledge);
        Ok(knowledge)
    }
}

/// Build the ordered recommendation list: one record per populated
/// sub-query category, in fixed precedence.
fn synthesize_recommendations(knowledge: &Knowledge) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if let Some(insights) = &knowledge.industry_insights {
        recs.push(Recommendation {
            rec_type: "industry-insight".to_string(),
            priority: Priority::Medium,
            message: format!(
                "{} calls in {} close at {}% with an average qualification score of {:.1}",
                insights.total_calls,
                insights.industry,
                pct(insights.success_rate),
                insights.avg_qualification_score,
            ),
            data: json!(insights),
        });
    }

    if let Some(top) = knowledge.successful_strategies.first() {
        recs.push(Recommendation {
            rec_type: "strategy".to_string(),
            priority: Priority::High,
            message: format!(
                "Proven {} approach: {} ({}% confidence over {} uses)",
                top.strategy_type,
                top.components.join(", "),
                pct(top.confidence),
                top.total_uses,
            ),
            data: json!(top),
        });
    }

    if let Some(top) = knowledge.relevant_objections.first() {
        let handling = top
            .handling_strategies
            .first()
            .map(|h| format!(" Best handling: \"{}\" ({} uses)", h.strategy, h.uses))
            .unwrap_or_default();
        recs.push(Recommendation {
            rec_type: "objection-prep".to_string(),
            priority: Priority::High,
            message: format!(
                "Expect \"{}\" ({} occurrences, {}% overcome).{}",
                top.objection_type,
                top.total_occurrences,
                pct(top.overcome_rate),
                handling,
            ),
            data: json!(knowledge.relevant_objections),
        });
    }

    if let Some(top) = knowledge.conversation_patterns.first() {
        recs.push(Recommendation {
            rec_type: "conversation-pattern".to_string(),
            priority: Priority::Medium,
            message: format!(
                "Successful calls here show the {} pattern ({}% success rate)",
                top.pattern_type,
                pct(top.success_rate),
            ),
            data: json!(knowledge.conversation_patterns),
        });
    }

    if !knowledge.effective_signals.is_empty() {
        let names: Vec<&str> = knowledge
            .effective_signals
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        let top_rate = knowledge.effective_signals[0].success_rate;
        recs.push(Recommendation {
            rec_type: "buying-signals".to_string(),
            priority: Priority::High,
            message: format!(
                "Listen for: {} (top signal closes at {}%)",
                names.join(", "),
                pct(top_rate),
            ),
            data: json!(knowledge.effective_signals),
        });
    }

    if !knowledge.semantic_results.is_empty() {
        let top = &knowledge.semantic_results[0];
        recs.push(Recommendation {
            rec_type: "similar-conversations".to_string(),
            priority: Priority::Medium,
            message: format!(
                "{} similar successful conversations on record (top similarity {:.2})",
                knowledge.semantic_results.len(),
                top.similarity,
            ),
            data: json!(knowledge.semantic_results),
        });
    }

    recs
}

/// Rate as a whole percentage, nearest integer.
fn pct(rate: f64) -> i64 {
    (rate * 100.0).round() as i64
}
