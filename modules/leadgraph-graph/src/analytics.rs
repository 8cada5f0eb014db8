use neo4rs::query;

use leadgraph_common::{
    AnalyticsOverview, AnalyticsReport, DailyLearning, IndustryStanding, ObjectionStanding,
    PatternStats, SignalStats, StrategyStanding,
};

use crate::GraphClient;

/// Aggregates below these floors are too thin to report on.
const MIN_SIGNAL_OCCURRENCES: i64 = 5;
const MIN_PATTERN_OCCURRENCES: i64 = 5;
const MIN_STRATEGY_USES: i64 = 3;

const TOP_INDUSTRIES: i64 = 10;
const TOP_SIGNALS: i64 = 10;
const TOP_PATTERNS: i64 = 10;
const TOP_OBJECTIONS: i64 = 10;
const TOP_STRATEGIES: i64 = 15;
const LEARNING_CURVE_DAYS: i64 = 30;

/// Stateless read-only rollups over the knowledge graph, for dashboards.
pub struct AnalyticsReader {
    client: GraphClient,
}

impl AnalyticsReader {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Run every rollup and bundle them into one report.
    pub async fn report(&self) -> Result<AnalyticsReport, neo4rs::Error> {
        Ok(AnalyticsReport {
            overview: self.overview().await?,
            top_industries: self.top_industries().await?,
            top_signals: self.top_signals().await?,
            top_patterns: self.top_patterns().await?,
            top_objections: self.top_objections().await?,
            top_strategies: self.top_strategies().await?,
            learning_curve: self.learning_curve().await?,
        })
    }

    pub async fn overview(&self) -> Result<AnalyticsOverview, neo4rs::Error> {
        let q = query(
            "MATCH (c:Conversation)
             RETURN count(c) AS total,
                    sum(CASE WHEN c.is_successful THEN 1 ELSE 0 END) AS successful",
        );

        let mut stream = self.client.graph.execute(q).await?;
        if let Some(row) = stream.next().await? {
            let total: i64 = row.get("total").unwrap_or(0);
            let successful: i64 = row.get("successful").unwrap_or(0);
            let rate = if total > 0 {
                successful as f64 / total as f64
            } else {
                0.0
            };
            return Ok(AnalyticsOverview {
                total_conversations: total,
                successful_conversations: successful,
                overall_success_rate: rate,
            });
        }
        Ok(AnalyticsOverview::default())
    }

    pub async fn top_industries(&self) -> Result<Vec<IndustryStanding>, neo4rs::Error> {
        let q = query(
            "MATCH (i:Industry)
             RETURN i.name AS name, i.total_calls AS total_calls,
                    i.success_rate AS success_rate,
                    i.avg_qualification_score AS avg_score
             ORDER BY i.success_rate DESC
             LIMIT $limit",
        )
        .param("limit", TOP_INDUSTRIES);

        let mut industries = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            industries.push(IndustryStanding {
                industry: row.get("name").unwrap_or_default(),
                total_calls: row.get("total_calls").unwrap_or(0),
                success_rate: row.get("success_rate").unwrap_or(0.0),
                avg_qualification_score: row.get("avg_score").unwrap_or(0.0),
            });
        }
        Ok(industries)
    }

    pub async fn top_signals(&self) -> Result<Vec<SignalStats>, neo4rs::Error> {
        let q = query(
            "MATCH (s:BuyingSignal)
             WHERE s.total_occurrences >= $min_occurrences
             RETURN s.name AS name, s.success_rate AS success_rate,
                    s.total_occurrences AS total_occurrences
             ORDER BY s.success_rate DESC
             LIMIT $limit",
        )
        .param("min_occurrences", MIN_SIGNAL_OCCURRENCES)
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

    pub async fn top_patterns(&self) -> Result<Vec<PatternStats>, neo4rs::Error> {
        let q = query(
            "MATCH (p:ConversationPattern)
             WHERE p.total_occurrences >= $min_occurrences
             RETURN p.pattern_id AS pattern_id, p.type AS type,
                    p.success_rate AS success_rate,
                    p.total_occurrences AS total_occurrences, p.weight AS weight
             ORDER BY p.success_rate DESC
             LIMIT $limit",
        )
        .param("min_occurrences", MIN_PATTERN_OCCURRENCES)
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

    pub async fn top_objections(&self) -> Result<Vec<ObjectionStanding>, neo4rs::Error> {
        let q = query(
            "MATCH (o:Objection)
             RETURN o.objection_type AS objection_type,
                    o.total_occurrences AS total_occurrences,
                    o.overcome_rate AS overcome_rate
             ORDER BY o.total_occurrences DESC
             LIMIT $limit",
        )
        .param("limit", TOP_OBJECTIONS);

        let mut objections = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            objections.push(ObjectionStanding {
                objection_type: row.get("objection_type").unwrap_or_default(),
                total_occurrences: row.get("total_occurrences").unwrap_or(0),
                overcome_rate: row.get("overcome_rate").unwrap_or(0.0),
            });
        }
        Ok(objections)
    }

    pub async fn top_strategies(&self) -> Result<Vec<StrategyStanding>, neo4rs::Error> {
        let q = query(
            "MATCH (s:Strategy)
             WHERE s.total_uses >= $min_uses
             RETURN s.strategy_id AS strategy_id, s.type AS type,
                    s.industry AS industry, s.total_uses AS total_uses,
                    s.confidence AS confidence
             ORDER BY s.confidence DESC
             LIMIT $limit",
        )
        .param("min_uses", MIN_STRATEGY_USES)
        .param("limit", TOP_STRATEGIES);

        let mut strategies = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            strategies.push(StrategyStanding {
                strategy_id: row.get("strategy_id").unwrap_or_default(),
                strategy_type: row.get("type").unwrap_or_default(),
                industry: row.get("industry").unwrap_or_default(),
                total_uses: row.get("total_uses").unwrap_or(0),
                confidence: row.get("confidence").unwrap_or(0.0),
            });
        }
        Ok(strategies)
    }

    /// Daily success rate over the last 30 distinct calendar dates present
    /// in the data, oldest first.
    pub async fn learning_curve(&self) -> Result<Vec<DailyLearning>, neo4rs::Error> {
        let q = query(
            "MATCH (c:Conversation)
             WITH date(c.timestamp) AS day, count(c) AS total,
                  sum(CASE WHEN c.is_successful THEN 1 ELSE 0 END) AS successful
             RETURN toString(day) AS date, total, successful
             ORDER BY day DESC
             LIMIT $limit",
        )
        .param("limit", LEARNING_CURVE_DAYS);

        let mut days = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            let total: i64 = row.get("total").unwrap_or(0);
            let successful: i64 = row.get("successful").unwrap_or(0);
            days.push(DailyLearning {
                date: row.get("date").unwrap_or_default(),
                total_conversations: total,
                successful_conversations: successful,
                success_rate: if total > 0 {
                    successful as f64 / total as f64
                } else {
                    0.0
                },
            });
        }

        // Chronological order for charting.
        days.reverse();
        Ok(days)
    }
}
