//! Domain types for the judging pipeline.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Criterion
// =============================================================================

/// A named, weighted axis of evaluation with descriptive guidance text.
///
/// Supplied per run by the caller, pre-filtered to enabled entries upstream.
/// Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    /// Unique identifier within a run.
    pub name: String,
    /// Guidance text interpolated into the evaluation prompt.
    pub description: String,
    /// Positive real weight.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Criterion {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            weight: 1.0,
        }
    }

    pub fn weighted(
        name: impl Into<String>,
        description: impl Into<String>,
        weight: f64,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            weight,
        }
    }
}

/// The stock criteria set used when the caller supplies none.
pub fn default_criteria() -> Vec<Criterion> {
    vec![
        Criterion::weighted(
            "Composition",
            "Evaluate the rule of thirds, framing, balance, and leading lines.",
            1.0,
        ),
        Criterion::weighted(
            "Technical_Quality",
            "Assess focus, exposure, sharpness, and noise levels.",
            1.2,
        ),
        Criterion::weighted(
            "Creativity",
            "Judge the unique perspective, artistic vision, and originality.",
            0.9,
        ),
        Criterion::weighted(
            "Nature_Relevance",
            "Consider the connection to nature, authenticity, and storytelling.",
            1.1,
        ),
    ]
}

// =============================================================================
// Evaluation result
// =============================================================================

/// Per-criterion outcome: one score and one rationale, produced exactly once
/// per criterion per run. Degraded evaluations carry the fallback score and
/// an error-annotated rationale instead of failing the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub criterion_name: String,
    /// Clamped to [0.0, 10.0].
    pub score: f64,
    /// Non-empty; a fixed sentinel when the model gave no usable feedback.
    pub rationale: String,
}

// =============================================================================
// Judgement state
// =============================================================================

/// Pipeline stage. Advances monotonically; each stage runs exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Input,
    Evaluated,
    Scored,
    Completed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Evaluated => "evaluated",
            Stage::Scored => "scored",
            Stage::Completed => "completed",
        }
    }
}

/// The run's aggregate, threaded stage-by-stage through the pipeline and
/// handed to the caller at `completed`. The raw image payload is deliberately
/// not part of this type.
///
/// Invariant after the evaluation stage: `scores` and `rationales` hold an
/// entry for every input criterion name, and nothing else.
#[derive(Debug, Clone, Serialize)]
pub struct PhotoJudgement {
    pub filename: String,
    pub scores: HashMap<String, f64>,
    pub rationales: HashMap<String, String>,
    /// Two-decimal rounded weighted average; may be revised once by synthesis.
    pub overall_score: f64,
    /// Empty until the final stage.
    pub overall_reasoning: String,
    pub stage: Stage,
}

impl PhotoJudgement {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            scores: HashMap::new(),
            rationales: HashMap::new(),
            overall_score: 0.0,
            overall_reasoning: String::new(),
            stage: Stage::Input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_ordering_is_monotonic() {
        assert!(Stage::Input < Stage::Evaluated);
        assert!(Stage::Evaluated < Stage::Scored);
        assert!(Stage::Scored < Stage::Completed);
    }

    #[test]
    fn stage_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Stage::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[test]
    fn criterion_weight_defaults_to_one() {
        let c: Criterion =
            serde_json::from_str(r#"{"name":"Composition","description":"..."}"#).unwrap();
        assert!((c.weight - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn default_criteria_set() {
        let criteria = default_criteria();
        assert_eq!(criteria.len(), 4);
        assert_eq!(criteria[0].name, "Composition");
        assert!((criteria[1].weight - 1.2).abs() < 1e-9);
    }

    #[test]
    fn new_judgement_starts_at_input() {
        let j = PhotoJudgement::new("bird.jpg");
        assert_eq!(j.stage, Stage::Input);
        assert!(j.scores.is_empty());
        assert!(j.overall_reasoning.is_empty());
    }
}
