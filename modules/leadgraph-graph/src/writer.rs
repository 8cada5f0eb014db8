use chrono::{DateTime, Utc};
use neo4rs::query;
use tracing::debug;

use leadgraph_common::{BuyingSignal, CallOutcome, ConversationPattern, Objection};

use crate::GraphClient;

/// Write-side wrapper for the knowledge graph. Used by the ingestion
/// pipeline only.
///
/// Every counter mutation is a single MERGE statement that increments and
/// recomputes the derived rate in one transaction, so two concurrent calls
/// touching the same aggregate node cannot lose an update.
pub struct KnowledgeWriter {
    client: GraphClient,
}

impl KnowledgeWriter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Merge the Lead node: seed counters on create, increment on match,
    /// recompute success_rate either way.
    pub async fn merge_lead(
        &self,
        outcome: &CallOutcome,
        is_successful: bool,
        now: DateTime<Utc>,
    ) -> Result<(), neo4rs::Error> {
        let q = query(
            "MERGE (l:Lead {lead_id: $lead_id})
             ON CREATE SET
                l.industry = $industry,
                l.company_size = $company_size,
                l.total_calls = 0,
                l.successful_calls = 0,
                l.first_seen_at = datetime($now)
             SET l.total_calls = l.total_calls + 1,
                 l.successful_calls = l.successful_calls + CASE WHEN $successful THEN 1 ELSE 0 END,
                 l.success_rate = toFloat(l.successful_calls + CASE WHEN $successful THEN 1 ELSE 0 END) / (l.total_calls + 1),
                 l.last_contacted_at = datetime($now)",
        )
        .param("lead_id", outcome.lead_id.as_str())
        .param("industry", outcome.industry.as_str())
        .param(
            "company_size",
            outcome.company_size.clone().unwrap_or_default(),
        )
        .param("successful", is_successful)
        .param("now", format_datetime(&now));

        self.client.graph.run(q).await?;
        debug!(lead_id = outcome.lead_id.as_str(), "Lead merged");
        Ok(())
    }

    /// Merge the write-once Conversation node and link it to its Lead.
    /// Properties are set on create only; a replayed conversation_id re-links
    /// and leaves the node untouched while the surrounding counter steps
    /// count the replay again.
    pub async fn create_conversation(
        &self,
        outcome: &CallOutcome,
        is_successful: bool,
        now: DateTime<Utc>,
    ) -> Result<(), neo4rs::Error> {
        let q = query(
            "MATCH (l:Lead {lead_id: $lead_id})
             MERGE (c:Conversation {conversation_id: $conversation_id})
             ON CREATE SET
                c.lead_id = $lead_id,
                c.outcome = $outcome,
                c.qualification_score = $score,
                c.duration = $duration,
                c.timestamp = datetime($now),
                c.is_successful = $successful
             MERGE (l)-[:HAD_CONVERSATION]->(c)",
        )
        .param("lead_id", outcome.lead_id.as_str())
        .param("conversation_id", outcome.conversation_id.as_str())
        .param("outcome", outcome.outcome.as_str())
        .param("score", outcome.qualification_score)
        .param("duration", outcome.duration)
        .param("successful", is_successful)
        .param("now", format_datetime(&now));

        self.client.graph.run(q).await?;
        Ok(())
    }

    /// Merge a BuyingSignal aggregate and the EXHIBITED_SIGNAL edge from the
    /// conversation that exhibited it.
    pub async fn merge_buying_signal(
        &self,
        conversation_id: &str,
        signal: &BuyingSignal,
        is_successful: bool,
        now: DateTime<Utc>,
    ) -> Result<(), neo4rs::Error> {
        let q = query(
            "MATCH (c:Conversation {conversation_id: $conversation_id})
             MERGE (s:BuyingSignal {name: $name})
             ON CREATE SET s.total_occurrences = 0, s.successful_occurrences = 0
             SET s.total_occurrences = s.total_occurrences + 1,
                 s.successful_occurrences = s.successful_occurrences + CASE WHEN $successful THEN 1 ELSE 0 END,
                 s.success_rate = toFloat(s.successful_occurrences + CASE WHEN $successful THEN 1 ELSE 0 END) / (s.total_occurrences + 1)
             MERGE (c)-[r:EXHIBITED_SIGNAL]->(s)
             ON CREATE SET
                 r.confidence = $confidence,
                 r.context = $context,
                 r.timestamp = datetime($now)",
        )
        .param("conversation_id", conversation_id)
        .param("name", signal.signal_type.as_str())
        .param("successful", is_successful)
        .param("confidence", signal.confidence)
        .param("context", signal.context.as_str())
        .param("now", format_datetime(&now));

        self.client.graph.run(q).await?;
        Ok(())
    }

    /// Merge an Objection aggregate and the HAD_OBJECTION edge.
    pub async fn merge_objection(
        &self,
        conversation_id: &str,
        objection: &Objection,
        now: DateTime<Utc>,
    ) -> Result<(), neo4rs::Error> {
        let q = query(
            "MATCH (c:Conversation {conversation_id: $conversation_id})
             MERGE (o:Objection {objection_type: $objection_type})
             ON CREATE SET o.total_occurrences = 0, o.overcome_count = 0
             SET o.total_occurrences = o.total_occurrences + 1,
                 o.overcome_count = o.overcome_count + CASE WHEN $overcome THEN 1 ELSE 0 END,
                 o.overcome_rate = toFloat(o.overcome_count + CASE WHEN $overcome THEN 1 ELSE 0 END) / (o.total_occurrences + 1)
             MERGE (c)-[r:HAD_OBJECTION]->(o)
             ON CREATE SET
                 r.handling_strategy = $handling_strategy,
                 r.was_overcome = $overcome,
                 r.timestamp = datetime($now)",
        )
        .param("conversation_id", conversation_id)
        .param("objection_type", objection.objection_type.as_str())
        .param("overcome", objection.was_overcome)
        .param(
            "handling_strategy",
            objection.handling_strategy.clone().unwrap_or_default(),
        )
        .param("now", format_datetime(&now));

        self.client.graph.run(q).await?;
        Ok(())
    }

    /// Merge a HandlingStrategy aggregate and the OVERCOME_BY edge.
    /// Only called when the objection was overcome, so every recorded use
    /// is a successful one.
    pub async fn merge_handling_strategy(
        &self,
        objection_type: &str,
        strategy: &str,
    ) -> Result<(), neo4rs::Error> {
        let q = query(
            "MATCH (o:Objection {objection_type: $objection_type})
             MERGE (h:HandlingStrategy {strategy: $strategy})
             ON CREATE SET h.success_count = 0, h.total_uses = 0
             SET h.total_uses = h.total_uses + 1,
                 h.success_count = h.success_count + 1,
                 h.success_rate = toFloat(h.success_count + 1) / (h.total_uses + 1)
             MERGE (o)-[r:OVERCOME_BY]->(h)
             ON CREATE SET r.uses = 1
             ON MATCH SET r.uses = r.uses + 1",
        )
        .param("objection_type", objection_type)
        .param("strategy", strategy);

        self.client.graph.run(q).await?;
        Ok(())
    }

    /// Merge a ConversationPattern aggregate and the EXHIBITED_PATTERN edge.
    /// The weight is a static relevance hint, set on create only.
    pub async fn merge_pattern(
        &self,
        conversation_id: &str,
        pattern: &ConversationPattern,
        is_successful: bool,
    ) -> Result<(), neo4rs::Error> {
        let q = query(
            "MATCH (c:Conversation {conversation_id: $conversation_id})
             MERGE (p:ConversationPattern {pattern_id: $pattern_id})
             ON CREATE SET
                 p.type = $type,
                 p.features = $features,
                 p.weight = $weight,
                 p.total_occurrences = 0,
                 p.successful_occurrences = 0
             SET p.total_occurrences = p.total_occurrences + 1,
                 p.successful_occurrences = p.successful_occurrences + CASE WHEN $successful THEN 1 ELSE 0 END,
                 p.success_rate = toFloat(p.successful_occurrences + CASE WHEN $successful THEN 1 ELSE 0 END) / (p.total_occurrences + 1)
             MERGE (c)-[:EXHIBITED_PATTERN]->(p)",
        )
        .param("conversation_id", conversation_id)
        .param("pattern_id", pattern.pattern_id.as_str())
        .param("type", pattern.pattern_type.as_str())
        .param("features", pattern.features.to_string())
        .param("weight", pattern.weight)
        .param("successful", is_successful);

        self.client.graph.run(q).await?;
        Ok(())
    }

    /// Merge the Industry aggregate: counters, success rate, and the online
    /// running mean of qualification scores. The incremented total is the n
    /// of the running mean, which keeps the mean order-independent.
    pub async fn merge_industry(
        &self,
        industry: &str,
        qualification_score: f64,
        is_successful: bool,
    ) -> Result<(), neo4rs::Error> {
        let q = query(
            "MERGE (i:Industry {name: $industry})
             ON CREATE SET i.total_calls = 0, i.successful_calls = 0, i.avg_qualification_score = 0.0
             SET i.total_calls = i.total_calls + 1,
                 i.successful_calls = i.successful_calls + CASE WHEN $successful THEN 1 ELSE 0 END,
                 i.success_rate = toFloat(i.successful_calls + CASE WHEN $successful THEN 1 ELSE 0 END) / (i.total_calls + 1),
                 i.avg_qualification_score = (i.avg_qualification_score * i.total_calls + $score) / (i.total_calls + 1)",
        )
        .param("industry", industry)
        .param("successful", is_successful)
        .param("score", qualification_score);

        self.client.graph.run(q).await?;
        Ok(())
    }

    /// Merge the CompanySize node and the INCLUDES_SIZE edge, which carries
    /// its own counters.
    pub async fn merge_company_size(
        &self,
        industry: &str,
        size: &str,
        is_successful: bool,
    ) -> Result<(), neo4rs::Error> {
        let q = query(
            "MATCH (i:Industry {name: $industry})
             MERGE (cs:CompanySize {size: $size})
             MERGE (i)-[r:INCLUDES_SIZE]->(cs)
             ON CREATE SET r.total_calls = 0, r.successful_calls = 0
             SET r.total_calls = r.total_calls + 1,
                 r.successful_calls = r.successful_calls + CASE WHEN $successful THEN 1 ELSE 0 END,
                 r.success_rate = toFloat(r.successful_calls + CASE WHEN $successful THEN 1 ELSE 0 END) / (r.total_calls + 1)",
        )
        .param("industry", industry)
        .param("size", size)
        .param("successful", is_successful);

        self.client.graph.run(q).await?;
        Ok(())
    }

    /// Merge a derived Strategy node. Only reached for successful
    /// conversations, so success_count and total_uses move together and
    /// confidence is recomputed from both.
    #[allow(clippy::too_many_arguments)]
    pub async fn merge_strategy(
        &self,
        conversation_id: &str,
        strategy_id: &str,
        strategy_type: &str,
        industry: &str,
        company_size: Option<&str>,
        components: &str,
        qualification_score: f64,
    ) -> Result<(), neo4rs::Error> {
        let q = query(
            "MATCH (c:Conversation {conversation_id: $conversation_id})
             MERGE (s:Strategy {strategy_id: $strategy_id})
             ON CREATE SET
                 s.type = $type,
                 s.industry = $industry,
                 s.company_size = $company_size,
                 s.components = $components,
                 s.success_count = 0,
                 s.total_uses = 0,
                 s.avg_qualification_score = 0.0
             SET s.total_uses = s.total_uses + 1,
                 s.success_count = s.success_count + 1,
                 s.confidence = toFloat(s.success_count + 1) / (s.total_uses + 1),
                 s.avg_qualification_score = (s.avg_qualification_score * s.total_uses + $score) / (s.total_uses + 1)
             MERGE (c)-[:USED_STRATEGY]->(s)",
        )
        .param("conversation_id", conversation_id)
        .param("strategy_id", strategy_id)
        .param("type", strategy_type)
        .param("industry", industry)
        .param("company_size", company_size.unwrap_or_default())
        .param("components", components)
        .param("score", qualification_score);

        self.client.graph.run(q).await?;
        Ok(())
    }
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Public version of format_datetime for use by other modules.
pub fn format_datetime_pub(dt: &DateTime<Utc>) -> String {
    format_datetime(dt)
}
