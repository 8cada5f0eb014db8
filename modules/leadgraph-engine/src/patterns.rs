//! Structural conversation-pattern extraction.
//!
//! Pure function over transcript + engagement metrics. Missing metric
//! fields suppress the corresponding pattern; nothing here errors.

use serde_json::json;

use leadgraph_common::{ConversationPattern, EngagementMetrics};

// Bucketing thresholds. These are load-bearing: pattern ids derive from the
// bucket names and counters accumulate under them.
const TALK_RATIO_AGENT_DOMINATED: f64 = 0.6;
const TALK_RATIO_LEAD_DOMINATED: f64 = 0.4;
const RESPONSE_TIME_QUICK_SECS: f64 = 2.0;
const RESPONSE_TIME_SLOW_SECS: f64 = 5.0;
const HIGH_INTERRUPTION_COUNT: i64 = 3;

const WEIGHT_TALK_RATIO: f64 = 0.3;
const WEIGHT_QUESTIONS: f64 = 0.2;
const WEIGHT_PHASES: f64 = 0.25;
const WEIGHT_RESPONSE_TIME: f64 = 0.15;
const WEIGHT_INTERRUPTIONS: f64 = 0.1;

/// Derive zero or more structural patterns from a transcript and its
/// engagement metrics.
pub fn extract_patterns(
    transcript: &str,
    metrics: Option<&EngagementMetrics>,
) -> Vec<ConversationPattern> {
    let mut patterns = Vec::new();
    let metrics = metrics.cloned().unwrap_or_default();

    if let Some(ratio) = metrics.talk_ratio {
        let bucket = if ratio > TALK_RATIO_AGENT_DOMINATED {
            "agent-dominated"
        } else if ratio < TALK_RATIO_LEAD_DOMINATED {
            "lead-dominated"
        } else {
            "balanced-conversation"
        };
        patterns.push(ConversationPattern {
            pattern_id: format!("talk-ratio:{bucket}"),
            pattern_type: "talk-ratio".to_string(),
            features: json!({ "bucket": bucket, "talkRatio": ratio }),
            weight: WEIGHT_TALK_RATIO,
        });
    }

    let question_count = transcript.matches('?').count();
    if question_count > 0 {
        patterns.push(ConversationPattern {
            pattern_id: "question-engagement".to_string(),
            pattern_type: "question-engagement".to_string(),
            features: json!({ "questionCount": question_count }),
            weight: WEIGHT_QUESTIONS,
        });
    }

    if let Some(phases) = &metrics.phases {
        let phase_count = phases.len();
        patterns.push(ConversationPattern {
            pattern_id: format!("multi-phase-engagement:{phase_count}"),
            pattern_type: "multi-phase-engagement".to_string(),
            features: json!({
                "phaseCount": phase_count,
                "phases": phases.keys().collect::<Vec<_>>(),
            }),
            weight: WEIGHT_PHASES,
        });
    }

    if let Some(avg) = metrics.avg_response_time {
        let bucket = if avg < RESPONSE_TIME_QUICK_SECS {
            "quick-response"
        } else if avg > RESPONSE_TIME_SLOW_SECS {
            "slow-response"
        } else {
            "normal-response"
        };
        patterns.push(ConversationPattern {
            pattern_id: format!("response-timing:{bucket}"),
            pattern_type: "response-timing".to_string(),
            features: json!({ "bucket": bucket, "avgResponseTime": avg }),
            weight: WEIGHT_RESPONSE_TIME,
        });
    }

    if let Some(interruptions) = metrics.interruptions {
        let bucket = if interruptions > HIGH_INTERRUPTION_COUNT {
            "high-interruption"
        } else {
            "low-interruption"
        };
        patterns.push(ConversationPattern {
            pattern_id: format!("interruption-level:{bucket}"),
            pattern_type: "interruption-level".to_string(),
            features: json!({ "bucket": bucket, "interruptions": interruptions }),
            weight: WEIGHT_INTERRUPTIONS,
        });
    }

    patterns
}
