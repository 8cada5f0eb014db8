use neo4rs::query;

use leadgraph_common::{
    HandlingOption, IndustryInsights, ObjectionInsight, PatternStats, SignalStats, SimilarLead,
    StrategyRecord,
};

use crate::GraphClient;

/// Result caps per retrieval sub-query.
const TOP_SIMILAR_LEADS: i64 = 5;
const TOP_STRATEGIES: i64 = 10;
const TOP_OBJECTIONS: i64 = 5;
const TOP_HANDLING_PER_OBJECTION: i64 = 3;
const TOP_PATTERNS: i64 = 10;
const TOP_SIGNALS: i64 = 10;

/// Minimum lead success rate / call volume to count as a similar lead.
const SIMILAR_LEAD_MIN_RATE: f64 = 0.5;
const SIMILAR_LEAD_MIN_CALLS: i64 = 3;

/// Strategies and patterns below this confidence/success rate are noise.
const STRATEGY_MIN_CONFIDENCE: f64 = 0.6;
const PATTERN_MIN_SUCCESS_RATE: f64 = 0.6;

/// Read-only wrapper for the knowledge graph. Used by the retrieval engine.
pub struct KnowledgeReader {
    client: GraphClient,
}

impl KnowledgeReader {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Leads of the same industry with a solid track record, ranked by
    /// success rate then by number of successful conversations.
    pub async fn similar_successful_leads(
        &self,
        industry: &str,
    ) -> Result<Vec<SimilarLead>, neo4rs::Error> {
        let q = query(
            "MATCH (l:Lead {industry: $industry})
             WHERE l.success_rate > $min_rate AND l.total_calls >= $min_calls
             OPTIONAL MATCH (l)-[:HAD_CONVERSATION]->(c:Conversation {is_successful: true})
             WITH l, count(c) AS successful_conversations
             RETURN l.lead_id AS lead_id, l.industry AS industry,
                    l.success_rate AS success_rate, l.total_calls AS total_calls,
                    successful_conversations
             ORDER BY l.success_rate DESC, successful_conversations DESC
             LIMIT $limit",
        )
        .param("industry", industry)
        .param("min_rate", SIMILAR_LEAD_MIN_RATE)
        .param("min_calls", SIMILAR_LEAD_MIN_CALLS)
        .param("limit", TOP_SIMILAR_LEADS);

        let mut leads = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            leads.push(SimilarLead {
                lead_id: row.get("lead_id").unwrap_or_default(),
                industry: row.get("industry").unwrap_or_default(),
                success_rate: row.get("success_rate").unwrap_or(0.0),
                total_calls: row.get("total_calls").unwrap_or(0),
                successful_conversations: row.get("successful_conversations").unwrap_or(0),
            });
        }
        Ok(leads)
    }

    /// Proven strategies for the industry, constrained to the company size
    /// when one is known. Strict `>` on the confidence floor.
    pub async fn strategies_for(
        &self,
        industry: &str,
        company_size: Option<&str>,
    ) -> Result<Vec<StrategyRecord>, neo4rs::Error> {
        let cypher = match company_size {
            Some(_) => {
                "MATCH (s:Strategy {industry: $industry})
                 WHERE s.confidence > $min_confidence AND s.company_size = $company_size
                 RETURN s.strategy_id AS strategy_id, s.type AS type, s.industry AS industry,
                        s.company_size AS company_size, s.components AS components,
                        s.success_count AS success_count, s.total_uses AS total_uses,
                        s.confidence AS confidence, s.avg_qualification_score AS avg_score
                 ORDER BY s.confidence DESC, s.success_count DESC
                 LIMIT $limit"
            }
            None => {
                "MATCH (s:Strategy {industry: $industry})
                 WHERE s.confidence > $min_confidence
                 RETURN s.strategy_id AS strategy_id, s.type AS type, s.industry AS industry,
                        s.company_size AS company_size, s.components AS components,
                        s.success_count AS success_count, s.total_uses AS total_uses,
                        s.confidence AS confidence, s.avg_qualification_score AS avg_score
                 ORDER BY s.confidence DESC, s.success_count DESC
                 LIMIT $limit"
            }
        };

        let mut q = query(cypher)
            .param("industry", industry)
            .param("min_confidence", STRATEGY_MIN_CONFIDENCE)
            .param("limit", TOP_STRATEGIES);
        if let Some(size) = company_size {
            q = q.param("company_size", size);
        }

        let mut strategies = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            let size: String = row.get("company_size").unwrap_or_default();
            let components: String = row.get("components").unwrap_or_default();
            strategies.push(StrategyRecord {
                strategy_id: row.get("strategy_id").unwrap_or_default(),
                strategy_type: row.get("type").unwrap_or_default(),
                industry: row.get("industry").unwrap_or_default(),
                company_size: if size.is_empty() { None } else { Some(size) },
                components: split_components(&components),
                success_count: row.get("success_count").unwrap_or(0),
                total_uses: row.get("total_uses").unwrap_or(0),
                confidence: row.get("confidence").unwrap_or(0.0),
                avg_qualification_score: row.get("avg_score").unwrap_or(0.0),
            });
        }
        Ok(strategies)
    }

    /// Objections observed in this industry, each paired with its most-used
    /// handling strategies.
    pub async fn objections_with_handling(
        &self,
        industry: &str,
    ) -> Result<Vec<ObjectionInsight>, neo4rs::Error> {
        let q = query(
            "MATCH (:Lead {industry: $industry})-[:HAD_CONVERSATION]->(:Conversation)-[:HAD_OBJECTION]->(o:Objection)
             WITH DISTINCT o
             RETURN o.objection_type AS objection_type,
                    o.total_occurrences AS total_occurrences,
                    o.overcome_rate AS overcome_rate
             ORDER BY o.total_occurrences DESC
             LIMIT $limit",
        )
        .param("industry", industry)
        .param("limit", TOP_OBJECTIONS);

        let mut objections = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            objections.push(ObjectionInsight {
                objection_type: row.get("objection_type").unwrap_or_default(),
                total_occurrences: row.get("total_occurrences").unwrap_or(0),
                overcome_rate: row.get("overcome_rate").unwrap_or(0.0),
                handling_strategies: Vec::new(),
            });
        }

        // Second hop per objection: top handling strategies by usage count.
        for objection in &mut objections {
            objection.handling_strategies =
                self.top_handling_strategies(&objection.objection_type).await?;
        }

        Ok(objections)
    }

    async fn top_handling_strategies(
        &self,
        objection_type: &str,
    ) -> Result<Vec<HandlingOption>, neo4rs::Error> {
        let q = query(
            "MATCH (o:Objection {objection_type: $objection_type})-[r:OVERCOME_BY]->(h:HandlingStrategy)
             RETURN h.strategy AS strategy, r.uses AS uses, h.success_rate AS success_rate
             ORDER BY r.uses DESC
             LIMIT $limit",
        )
        .param("objection_type", objection_type)
        .param("limit", TOP_HANDLING_PER_OBJECTION);

        let mut options = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            options.push(HandlingOption {
                strategy: row.get("strategy").unwrap_or_default(),
                uses: row.get("uses").unwrap_or(0),
                success_rate: row.get("success_rate").unwrap_or(0.0),
            });
        }
        Ok(options)
    }

    /// Snapshot of the Industry aggregate, if we have seen it before.
    pub async fn industry_insights(
        &self,
        industry: &str,
    ) -> Result<Option<IndustryInsights>, neo4rs::Error> {
        let q = query(
            "MATCH (i:Industry {name: $industry})
             RETURN i.name AS name, i.success_rate AS success_rate,
                    i.avg_qualification_score AS avg_score, i.total_calls AS total_calls",
        )
        .param("industry", industry);

        let mut stream = self.client.graph.execute(q).await?;
        if let Some(row) = stream.next().await? {
            return Ok(Some(IndustryInsights {
                industry: row.get("name").unwrap_or_default(),
                success_rate: row.get("success_rate").unwrap_or(0.0),
                avg_qualification_score: row.get("avg_score").unwrap_or(0.0),
                total_calls: row.get("total_calls").unwrap_or(0),
            }));
        }
        Ok(None)
    }

    /// Patterns exhibited on successful conversations of this industry with
    /// a success rate above the floor.
    pub async fn successful_patterns(
        &self,
        industry: &str,
    ) -> Result<Vec<PatternStats>, neo4rs::Error> {
        let q = query(
            "MATCH (:Lead {industry: $industry})-[:HAD_CONVERSATION]->(c:Conversation {is_successful: true})-[:EXHIBITED_PATTERN]->(p:ConversationPattern)
             WHERE p.success_rate > $min_rate
             WITH p, count(c) AS appearances
             RETURN p.pattern_id AS pattern_id, p.type AS type,
                    p.success_rate AS success_rate, p.total_occurrences AS total_occurrences,
                    p.weight AS weight
             ORDER BY p.success_rate DESC, appearances DESC
             LIMIT $limit",
        )
        .param("industry", industry)
        .param("min_rate", PATTERN_MIN_SUCCESS_RATE)
        .param("limit", TOP_PATTERNS);

        let mut patterns = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            patterns.push(PatternStats {
                pattern_id: row.get("pattern_id").unwrap_or_default(),
                pattern_type: row.get("type").unwrap_or_default(),
                success_rate: row.get("success_rate").unwrap_or(0.0),
                total_occurrences: row.get("total_occurrences").unwrap_or(0),
                weight: row.get("weight").unwrap_or(0.0),
            });
        }
        Ok(patterns)
    }

    /// Buying signals exhibited on successful conversations of this
    /// industry, ranked by global success rate then local appearances.
    pub async fn effective_signals(
        &self,
        industry: &str,
    ) -> Result<Vec<SignalStats>, neo4rs::Error> {
        let q = query(
            "MATCH (:Lead {industry: $industry})-[:HAD_CONVERSATION]->(c:Conversation {is_successful: true})-[:EXHIBITED_SIGNAL]->(s:BuyingSignal)
             WITH s, count(c) AS appearances
             RETURN s.name AS name, s.success_rate AS success_rate,
                    s.total_occurrences AS total_occurrences
             ORDER BY s.success_rate DESC, appearances DESC
             LIMIT $limit",
        )
        .param("industry", industry)
        .param("limit", TOP_SIGNALS);

        let mut signals = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            signals.push(SignalStats {
                name: row.get("name").unwrap_or_default(),
                success_rate: row.get("success_rate").unwrap_or(0.0),
                total_occurrences: row.get("total_occurrences").unwrap_or(0),
            });
        }
        Ok(signals)
    }
}

fn split_components(joined: &str) -> Vec<String> {
    if joined.is_empty() {
        return Vec::new();
    }
    joined.split(',').map(str::to_string).collect()
}
