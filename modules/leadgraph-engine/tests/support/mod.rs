//! In-memory doubles for the GraphStore and VectorStore seams.
//!
//! MemoryGraph mirrors the aggregate-counter semantics of the Cypher
//! upserts; MemoryVectors mirrors the Chroma collection. Both have a
//! kill switch for fault-injection tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use leadgraph_common::{
    BuyingSignal, CallOutcome, ConversationPattern, HandlingOption, IndustryInsights, Objection,
    ObjectionInsight, PatternStats, SemanticMatch, SignalStats, SimilarLead, StrategyRecord,
};
use leadgraph_engine::{GraphStore, StrategyUpsert, VectorStore};

// --- Node records ---

#[derive(Debug, Clone, Default)]
pub struct LeadRec {
    pub industry: String,
    pub total_calls: i64,
    pub successful_calls: i64,
    pub success_rate: f64,
}

#[derive(Debug, Clone)]
pub struct ConvRec {
    pub lead_id: String,
    pub is_successful: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SignalRec {
    pub total_occurrences: i64,
    pub successful_occurrences: i64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectionRec {
    pub total_occurrences: i64,
    pub overcome_count: i64,
    pub overcome_rate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct HandlingRec {
    pub success_count: i64,
    pub total_uses: i64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PatternRec {
    pub pattern_type: String,
    pub weight: f64,
    pub total_occurrences: i64,
    pub successful_occurrences: i64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct IndustryRec {
    pub total_calls: i64,
    pub successful_calls: i64,
    pub success_rate: f64,
    pub avg_qualification_score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct StrategyRec {
    pub strategy_type: String,
    pub industry: String,
    pub company_size: Option<String>,
    pub components: Vec<String>,
    pub success_count: i64,
    pub total_uses: i64,
    pub confidence: f64,
    pub avg_qualification_score: f64,
}

#[derive(Default)]
pub struct GraphState {
    pub leads: HashMap<String, LeadRec>,
    pub conversations: HashMap<String, ConvRec>,
    pub signals: HashMap<String, SignalRec>,
    pub exhibited_signal: Vec<(String, String)>,
    pub objections: HashMap<String, ObjectionRec>,
    pub had_objection: Vec<(String, String)>,
    pub handling: HashMap<String, HandlingRec>,
    pub overcome_by: HashMap<(String, String), i64>,
    pub patterns: HashMap<String, PatternRec>,
    pub exhibited_pattern: Vec<(String, String)>,
    pub industries: HashMap<String, IndustryRec>,
    pub company_sizes: HashMap<(String, String), (i64, i64)>,
    pub strategies: HashMap<String, StrategyRec>,
}

#[derive(Default)]
pub struct MemoryGraph {
    pub state: Mutex<GraphState>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    /// Seed a Strategy node directly, bypassing the pipeline. Used to set
    /// up confidence values the success-gated upsert can never produce.
    pub fn seed_strategy(&self, strategy_id: &str, industry: &str, confidence: f64) {
        let mut state = self.state.lock().unwrap();
        state.strategies.insert(
            strategy_id.to_string(),
            StrategyRec {
                strategy_type: "buying-signals".to_string(),
                industry: industry.to_string(),
                company_size: None,
                components: vec!["seeded".to_string()],
                success_count: (confidence * 10.0).round() as i64,
                total_uses: 10,
                confidence,
                avg_qualification_score: 75.0,
            },
        );
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("graph store unreachable");
        }
        Ok(())
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("graph store unreachable");
        }
        Ok(())
    }

    /// Industry of the lead that owns a conversation.
    fn conversation_industry(state: &GraphState, conversation_id: &str) -> Option<String> {
        let conv = state.conversations.get(conversation_id)?;
        let lead = state.leads.get(&conv.lead_id)?;
        Some(lead.industry.clone())
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn merge_lead(
        &self,
        outcome: &CallOutcome,
        is_successful: bool,
        _now: DateTime<Utc>,
    ) -> Result<()> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        let lead = state
            .leads
            .entry(outcome.lead_id.clone())
            .or_insert_with(|| LeadRec {
                industry: outcome.industry.clone(),
                ..Default::default()
            });
        lead.total_calls += 1;
        if is_successful {
            lead.successful_calls += 1;
        }
        lead.success_rate = lead.successful_calls as f64 / lead.total_calls as f64;
        Ok(())
    }

    async fn create_conversation(
        &self,
        outcome: &CallOutcome,
        is_successful: bool,
        _now: DateTime<Utc>,
    ) -> Result<()> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        // Write-once node: a replayed conversation_id leaves it untouched.
        state
            .conversations
            .entry(outcome.conversation_id.clone())
            .or_insert(ConvRec {
                lead_id: outcome.lead_id.clone(),
                is_successful,
            });
        Ok(())
    }

    async fn merge_buying_signal(
        &self,
        conversation_id: &str,
        signal: &BuyingSignal,
        is_successful: bool,
        _now: DateTime<Utc>,
    ) -> Result<()> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        let rec = state.signals.entry(signal.signal_type.clone()).or_default();
        rec.total_occurrences += 1;
        if is_successful {
            rec.successful_occurrences += 1;
        }
        rec.success_rate = rec.successful_occurrences as f64 / rec.total_occurrences as f64;
        state
            .exhibited_signal
            .push((conversation_id.to_string(), signal.signal_type.clone()));
        Ok(())
    }

    async fn merge_objection(
        &self,
        conversation_id: &str,
        objection: &Objection,
        _now: DateTime<Utc>,
    ) -> Result<()> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        let rec = state
            .objections
            .entry(objection.objection_type.clone())
            .or_default();
        rec.total_occurrences += 1;
        if objection.was_overcome {
            rec.overcome_count += 1;
        }
        rec.overcome_rate = rec.overcome_count as f64 / rec.total_occurrences as f64;
        state
            .had_objection
            .push((conversation_id.to_string(), objection.objection_type.clone()));
        Ok(())
    }

    async fn merge_handling_strategy(&self, objection_type: &str, strategy: &str) -> Result<()> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        let rec = state.handling.entry(strategy.to_string()).or_default();
        rec.total_uses += 1;
        rec.success_count += 1;
        rec.success_rate = rec.success_count as f64 / rec.total_uses as f64;
        *state
            .overcome_by
            .entry((objection_type.to_string(), strategy.to_string()))
            .or_insert(0) += 1;
        Ok(())
    }

    async fn merge_pattern(
        &self,
        conversation_id: &str,
        pattern: &ConversationPattern,
        is_successful: bool,
    ) -> Result<()> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        let rec = state
            .patterns
            .entry(pattern.pattern_id.clone())
            .or_insert_with(|| PatternRec {
                pattern_type: pattern.pattern_type.clone(),
                weight: pattern.weight,
                ..Default::default()
            });
        rec.total_occurrences += 1;
        if is_successful {
            rec.successful_occurrences += 1;
        }
        rec.success_rate = rec.successful_occurrences as f64 / rec.total_occurrences as f64;
        state
            .exhibited_pattern
            .push((conversation_id.to_string(), pattern.pattern_id.clone()));
        Ok(())
    }

    async fn merge_industry(
        &self,
        industry: &str,
        qualification_score: f64,
        is_successful: bool,
    ) -> Result<()> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        let rec = state.industries.entry(industry.to_string()).or_default();
        rec.total_calls += 1;
        if is_successful {
            rec.successful_calls += 1;
        }
        rec.success_rate = rec.successful_calls as f64 / rec.total_calls as f64;
        let n = rec.total_calls as f64;
        rec.avg_qualification_score =
            (rec.avg_qualification_score * (n - 1.0) + qualification_score) / n;
        Ok(())
    }

    async fn merge_company_size(
        &self,
        industry: &str,
        size: &str,
        is_successful: bool,
    ) -> Result<()> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        let entry = state
            .company_sizes
            .entry((industry.to_string(), size.to_string()))
            .or_insert((0, 0));
        entry.0 += 1;
        if is_successful {
            entry.1 += 1;
        }
        Ok(())
    }

    async fn merge_strategy(
        &self,
        _conversation_id: &str,
        strategy: &StrategyUpsert,
    ) -> Result<()> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        let rec = state
            .strategies
            .entry(strategy.strategy_id.clone())
            .or_insert_with(|| StrategyRec {
                strategy_type: strategy.strategy_type.clone(),
                industry: strategy.industry.clone(),
                company_size: strategy.company_size.clone(),
                components: strategy.components.clone(),
                ..Default::default()
            });
        rec.total_uses += 1;
        rec.success_count += 1;
        rec.confidence = rec.success_count as f64 / rec.total_uses as f64;
        let n = rec.total_uses as f64;
        rec.avg_qualification_score =
            (rec.avg_qualification_score * (n - 1.0) + strategy.qualification_score) / n;
        Ok(())
    }

    async fn similar_successful_leads(&self, industry: &str) -> Result<Vec<SimilarLead>> {
        self.check_read()?;
        let state = self.state.lock().unwrap();
        let mut leads: Vec<SimilarLead> = state
            .leads
            .iter()
            .filter(|(_, l)| l.industry == industry && l.success_rate > 0.5 && l.total_calls >= 3)
            .map(|(id, l)| {
                let successful = state
                    .conversations
                    .values()
                    .filter(|c| c.lead_id == *id && c.is_successful)
                    .count() as i64;
                SimilarLead {
                    lead_id: id.clone(),
                    industry: l.industry.clone(),
                    success_rate: l.success_rate,
                    total_calls: l.total_calls,
                    successful_conversations: successful,
                }
            })
            .collect();
        leads.sort_by(|a, b| {
            b.success_rate
                .partial_cmp(&a.success_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.successful_conversations.cmp(&a.successful_conversations))
        });
        leads.truncate(5);
        Ok(leads)
    }

    async fn strategies_for(
        &self,
        industry: &str,
        company_size: Option<&str>,
    ) -> Result<Vec<StrategyRecord>> {
        self.check_read()?;
        let state = self.state.lock().unwrap();
        let mut strategies: Vec<StrategyRecord> = state
            .strategies
            .iter()
            .filter(|(_, s)| {
                s.industry == industry
                    && s.confidence > 0.6
                    && company_size.is_none_or(|size| s.company_size.as_deref() == Some(size))
            })
            .map(|(id, s)| StrategyRecord {
                strategy_id: id.clone(),
                strategy_type: s.strategy_type.clone(),
                industry: s.industry.clone(),
                company_size: s.company_size.clone(),
                components: s.components.clone(),
                success_count: s.success_count,
                total_uses: s.total_uses,
                confidence: s.confidence,
                avg_qualification_score: s.avg_qualification_score,
            })
            .collect();
        strategies.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.success_count.cmp(&a.success_count))
        });
        strategies.truncate(10);
        Ok(strategies)
    }

    async fn objections_with_handling(&self, industry: &str) -> Result<Vec<ObjectionInsight>> {
        self.check_read()?;
        let state = self.state.lock().unwrap();
        let mut seen: Vec<String> = Vec::new();
        for (conv_id, objection_type) in &state.had_objection {
            if Self::conversation_industry(&state, conv_id).as_deref() == Some(industry)
                && !seen.contains(objection_type)
            {
                seen.push(objection_type.clone());
            }
        }

        let mut insights: Vec<ObjectionInsight> = seen
            .into_iter()
            .filter_map(|objection_type| {
                let rec = state.objections.get(&objection_type)?;
                let mut handling: Vec<HandlingOption> = state
                    .overcome_by
                    .iter()
                    .filter(|((obj, _), _)| *obj == objection_type)
                    .map(|((_, strategy), uses)| HandlingOption {
                        strategy: strategy.clone(),
                        uses: *uses,
                        success_rate: state
                            .handling
                            .get(strategy)
                            .map(|h| h.success_rate)
                            .unwrap_or(0.0),
                    })
                    .collect();
                handling.sort_by(|a, b| b.uses.cmp(&a.uses));
                handling.truncate(3);
                Some(ObjectionInsight {
                    objection_type,
                    total_occurrences: rec.total_occurrences,
                    overcome_rate: rec.overcome_rate,
                    handling_strategies: handling,
                })
            })
            .collect();
        insights.sort_by(|a, b| b.total_occurrences.cmp(&a.total_occurrences));
        insights.truncate(5);
        Ok(insights)
    }

    async fn industry_insights(&self, industry: &str) -> Result<Option<IndustryInsights>> {
        self.check_read()?;
        let state = self.state.lock().unwrap();
        Ok(state.industries.get(industry).map(|rec| IndustryInsights {
            industry: industry.to_string(),
            success_rate: rec.success_rate,
            avg_qualification_score: rec.avg_qualification_score,
            total_calls: rec.total_calls,
        }))
    }

    async fn successful_patterns(&self, industry: &str) -> Result<Vec<PatternStats>> {
        self.check_read()?;
        let state = self.state.lock().unwrap();
        let mut seen: Vec<String> = Vec::new();
        for (conv_id, pattern_id) in &state.exhibited_pattern {
            let on_successful = state
                .conversations
                .get(conv_id)
                .is_some_and(|c| c.is_successful);
            if on_successful
                && Self::conversation_industry(&state, conv_id).as_deref() == Some(industry)
                && !seen.contains(pattern_id)
            {
                seen.push(pattern_id.clone());
            }
        }

        let mut patterns: Vec<PatternStats> = seen
            .into_iter()
            .filter_map(|pattern_id| {
                let rec = state.patterns.get(&pattern_id)?;
                (rec.success_rate > 0.6).then(|| PatternStats {
                    pattern_id,
                    pattern_type: rec.pattern_type.clone(),
                    success_rate: rec.success_rate,
                    total_occurrences: rec.total_occurrences,
                    weight: rec.weight,
                })
            })
            .collect();
        patterns.sort_by(|a, b| {
            b.success_rate
                .partial_cmp(&a.success_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.total_occurrences.cmp(&a.total_occurrences))
        });
        patterns.truncate(10);
        Ok(patterns)
    }

    async fn effective_signals(&self, industry: &str) -> Result<Vec<SignalStats>> {
        self.check_read()?;
        let state = self.state.lock().unwrap();
        let mut seen: Vec<String> = Vec::new();
        for (conv_id, signal) in &state.exhibited_signal {
            let on_successful = state
                .conversations
                .get(conv_id)
                .is_some_and(|c| c.is_successful);
            if on_successful
                && Self::conversation_industry(&state, conv_id).as_deref() == Some(industry)
                && !seen.contains(signal)
            {
                seen.push(signal.clone());
            }
        }

        let mut signals: Vec<SignalStats> = seen
            .into_iter()
            .filter_map(|name| {
                let rec = state.signals.get(&name)?;
                Some(SignalStats {
                    name,
                    success_rate: rec.success_rate,
                    total_occurrences: rec.total_occurrences,
                })
            })
            .collect();
        signals.sort_by(|a, b| {
            b.success_rate
                .partial_cmp(&a.success_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.total_occurrences.cmp(&a.total_occurrences))
        });
        signals.truncate(10);
        Ok(signals)
    }
}

// --- MemoryVectors ---

pub struct StoredDoc {
    pub id: String,
    pub text: String,
    pub metadata: Value,
}

#[derive(Default)]
pub struct MemoryVectors {
    pub docs: Mutex<Vec<StoredDoc>>,
    fail: AtomicBool,
}

impl MemoryVectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn doc_count(&self) -> usize {
        self.docs.lock().unwrap().len()
    }
}

#[async_trait]
impl VectorStore for MemoryVectors {
    async fn add_transcript(
        &self,
        conversation_id: &str,
        transcript: &str,
        metadata: Value,
    ) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("vector store unreachable");
        }
        self.docs.lock().unwrap().push(StoredDoc {
            id: conversation_id.to_string(),
            text: transcript.to_string(),
            metadata,
        });
        Ok(())
    }

    async fn similar_transcripts(
        &self,
        _query_text: &str,
        k: usize,
        industry: &str,
    ) -> Result<Vec<SemanticMatch>> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("vector store unreachable");
        }
        let docs = self.docs.lock().unwrap();
        Ok(docs
            .iter()
            .filter(|d| d.metadata["industry"] == industry)
            .take(k)
            .enumerate()
            .map(|(i, d)| SemanticMatch {
                conversation_id: d.id.clone(),
                similarity: 0.95 - 0.05 * i as f64,
                metadata: d.metadata.clone(),
                document: Some(d.text.clone()),
            })
            .collect())
    }
}
