use crate::error::Result;
use crate::matcher::Matcher;
use crate::model::Decision;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalCase {
    pub case_id: String,
    pub question: String,
    /// `None` (JSON `null`) expects the fallback message.
    pub expected_response: Option<String>,
    #[serde(default)]
    pub expected_decision: Option<Decision>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalOutcome {
    pub case_id: String,
    pub passed: bool,
    pub decision: Decision,
    pub response: String,
    pub semantic_score: Option<f32>,
    pub fuzzy_score: Option<f32>,
    pub latency_ms: f64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f32,
    pub outcomes: Vec<EvalOutcome>,
}

impl EvalSummary {
    pub fn meets(&self, required_pass_rate: f32) -> bool {
        self.pass_rate >= required_pass_rate
    }

    pub fn total_latency_ms(&self) -> f64 {
        self.outcomes.iter().map(|o| o.latency_ms).sum()
    }
}

pub fn read_eval_cases(path: &Path) -> Result<Vec<EvalCase>> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

fn case_passed(case: &EvalCase, decision: Decision, response: &str, fallback: &str) -> bool {
    let expected = case.expected_response.as_deref().unwrap_or(fallback);
    if response != expected {
        return false;
    }
    if case.expected_response.is_none() && decision != Decision::Fallback {
        return false;
    }
    case.expected_decision.map_or(true, |d| d == decision)
}

/// Runs every case through `matcher`. A case whose match errors counts as failed.
pub fn evaluate_cases(matcher: &Matcher, cases: &[EvalCase]) -> EvalSummary {
    let fallback = matcher.config().fallback_message.as_str();
    let mut outcomes = Vec::with_capacity(cases.len());

    for case in cases {
        let start = Instant::now();
        let result = matcher.match_query(&case.question);
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let outcome = match result {
            Ok(m) => EvalOutcome {
                case_id: case.case_id.clone(),
                passed: case_passed(case, m.decision, &m.response, fallback),
                decision: m.decision,
                response: m.response,
                semantic_score: m.semantic.map(|b| b.score),
                fuzzy_score: m.fuzzy.map(|b| b.score),
                latency_ms,
                error: None,
            },
            Err(err) => EvalOutcome {
                case_id: case.case_id.clone(),
                passed: false,
                decision: Decision::Fallback,
                response: String::new(),
                semantic_score: None,
                fuzzy_score: None,
                latency_ms,
                error: Some(err.to_string()),
            },
        };
        outcomes.push(outcome);
    }

    let total = outcomes.len();
    let passed = outcomes.iter().filter(|o| o.passed).count();
    let failed = total.saturating_sub(passed);
    let pass_rate = if total == 0 {
        0.0
    } else {
        passed as f32 / total as f32
    };

    EvalSummary {
        total,
        passed,
        failed,
        pass_rate,
        outcomes,
    }
}
