use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::EngineError;

/// Qualification score at or above which a call counts as successful even
/// when the stated outcome is not "qualified".
pub const SUCCESS_SCORE_THRESHOLD: f64 = 70.0;

/// A call is successful when it qualified outright or scored high enough.
pub fn is_successful(outcome: &str, qualification_score: f64) -> bool {
    outcome == "qualified" || qualification_score >= SUCCESS_SCORE_THRESHOLD
}

// --- Ingestion input ---

/// A detected buying signal inside one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyingSignal {
    #[serde(rename = "type")]
    pub signal_type: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub context: String,
}

fn default_confidence() -> f64 {
    0.5
}

/// An objection raised by the lead, with the strategy used (if any) and
/// whether it was overcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objection {
    #[serde(rename = "type")]
    pub objection_type: String,
    #[serde(default)]
    pub handling_strategy: Option<String>,
    #[serde(default)]
    pub was_overcome: bool,
}

/// Structural engagement metrics produced by the transcription pipeline.
/// Every field is optional; missing fields simply suppress the
/// corresponding extracted pattern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMetrics {
    pub talk_ratio: Option<f64>,
    pub phases: Option<serde_json::Map<String, Value>>,
    pub avg_response_time: Option<f64>,
    pub interruptions: Option<i64>,
}

/// The full outcome bundle for one completed, scored call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOutcome {
    pub lead_id: String,
    pub conversation_id: String,
    #[serde(default)]
    pub transcript: String,
    pub outcome: String,
    #[serde(default)]
    pub qualification_score: f64,
    #[serde(default)]
    pub buying_signals: Vec<BuyingSignal>,
    #[serde(default)]
    pub objections: Vec<Objection>,
    #[serde(default)]
    pub duration: f64,
    pub industry: String,
    #[serde(default)]
    pub company_size: Option<String>,
    #[serde(default)]
    pub engagement_metrics: Option<EngagementMetrics>,
}

impl CallOutcome {
    /// Boundary validation: reject malformed payloads before any store access.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.lead_id.trim().is_empty() {
            return Err(EngineError::Validation("leadId is required".into()));
        }
        if self.conversation_id.trim().is_empty() {
            return Err(EngineError::Validation("conversationId is required".into()));
        }
        if self.industry.trim().is_empty() {
            return Err(EngineError::Validation("industry is required".into()));
        }
        Ok(())
    }

    pub fn is_successful(&self) -> bool {
        is_successful(&self.outcome, self.qualification_score)
    }
}

/// Receipt returned by the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnReceipt {
    pub conversation_id: String,
}

// --- Patterns ---

/// A structural conversation pattern derived from transcript + metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPattern {
    pub pattern_id: String,
    #[serde(rename = "type")]
    pub pattern_type: String,
    pub features: Value,
    pub weight: f64,
}

// --- Retrieval input ---

/// Attributes of the lead about to be called.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadProfile {
    pub lead_id: String,
    pub industry: String,
    #[serde(default)]
    pub company_size: Option<String>,
    #[serde(default)]
    pub known_objections: Vec<String>,
    #[serde(default)]
    pub previous_interactions: Vec<String>,
}

impl LeadProfile {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.lead_id.trim().is_empty() {
            return Err(EngineError::Validation("leadId is required".into()));
        }
        if self.industry.trim().is_empty() {
            return Err(EngineError::Validation("industry is required".into()));
        }
        Ok(())
    }
}

// --- Retrieval output ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarLead {
    pub lead_id: String,
    pub industry: String,
    pub success_rate: f64,
    pub total_calls: i64,
    pub successful_conversations: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyRecord {
    pub strategy_id: String,
    #[serde(rename = "type")]
    pub strategy_type: String,
    pub industry: String,
    pub company_size: Option<String>,
    /// Serialized signal or objection set the strategy was derived from.
    pub components: Vec<String>,
    pub success_count: i64,
    pub total_uses: i64,
    pub confidence: f64,
    pub avg_qualification_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlingOption {
    pub strategy: String,
    pub uses: i64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectionInsight {
    pub objection_type: String,
    pub total_occurrences: i64,
    pub overcome_rate: f64,
    /// Up to the top three handling strategies by usage count.
    pub handling_strategies: Vec<HandlingOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndustryInsights {
    pub industry: String,
    pub success_rate: f64,
    pub avg_qualification_score: f64,
    pub total_calls: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternStats {
    pub pattern_id: String,
    #[serde(rename = "type")]
    pub pattern_type: String,
    pub success_rate: f64,
    pub total_occurrences: i64,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalStats {
    pub name: String,
    pub success_rate: f64,
    pub total_occurrences: i64,
}

/// One nearest-neighbor transcript from the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticMatch {
    pub conversation_id: String,
    /// 1 − distance, as reported by the vector index.
    pub similarity: f64,
    pub metadata: Value,
    pub document: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
        }
    }
}

/// One actionable recommendation synthesized from the retrieval sub-queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub rec_type: String,
    pub priority: Priority,
    pub message: String,
    pub data: Value,
}

/// Everything we know that can help with a new lead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Knowledge {
    pub similar_leads: Vec<SimilarLead>,
    pub successful_strategies: Vec<StrategyRecord>,
    pub relevant_objections: Vec<ObjectionInsight>,
    pub industry_insights: Option<IndustryInsights>,
    pub conversation_patterns: Vec<PatternStats>,
    pub effective_signals: Vec<SignalStats>,
    pub semantic_results: Vec<SemanticMatch>,
    pub recommendations: Vec<Recommendation>,
}

// --- Analytics ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub total_conversations: i64,
    pub successful_conversations: i64,
    pub overall_success_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndustryStanding {
    pub industry: String,
    pub total_calls: i64,
    pub success_rate: f64,
    pub avg_qualification_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectionStanding {
    pub objection_type: String,
    pub total_occurrences: i64,
    pub overcome_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyStanding {
    pub strategy_id: String,
    #[serde(rename = "type")]
    pub strategy_type: String,
    pub industry: String,
    pub total_uses: i64,
    pub confidence: f64,
}

/// One calendar day of learning progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLearning {
    pub date: String,
    pub total_conversations: i64,
    pub successful_conversations: i64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub overview: AnalyticsOverview,
    pub top_industries: Vec<IndustryStanding>,
    pub top_signals: Vec<SignalStats>,
    pub top_patterns: Vec<PatternStats>,
    pub top_objections: Vec<ObjectionStanding>,
    pub top_strategies: Vec<StrategyStanding>,
    pub learning_curve: Vec<DailyLearning>,
}
