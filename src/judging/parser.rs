//! Parsing of free-text model completions into scores and rationales.
//!
//! Model output is untrusted input. Everything that crosses this boundary is
//! line-prefix matched, defaulted when absent, and clamped into range. The
//! one condition that surfaces as an error is a present-but-unparsable score
//! value; the evaluator maps that to its top-level fallback result.

use thiserror::Error;

/// Score substituted when the completion carries no `SCORE:` line, and the
/// score of every fallback evaluation result.
pub const DEFAULT_SCORE: f64 = 5.0;

/// Rationale substituted when the completion carries no `RATIONALE:` line.
pub const FALLBACK_RATIONALE: &str = "No detailed feedback available.";

/// Valid score range. Everything the model produces is clamped into this
/// closed interval before it reaches the aggregator.
pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 10.0;

/// A `SCORE:` line was present but its value did not parse as a number.
#[derive(Debug, Error)]
#[error("invalid score value {value:?}: {source}")]
pub struct InvalidScore {
    pub value: String,
    #[source]
    pub source: std::num::ParseFloatError,
}

/// Score plus rationale extracted from one evaluation completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEvaluation {
    pub score: f64,
    pub rationale: String,
}

/// Clamp a raw score into `[SCORE_MIN, SCORE_MAX]`.
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(SCORE_MIN, SCORE_MAX)
}

fn value_after_prefix<'a>(line: &'a str, prefix: &str) -> &'a str {
    line[prefix.len()..].trim()
}

fn first_line_with_prefix<'a>(raw: &'a str, prefix: &str) -> Option<&'a str> {
    raw.lines().find(|line| line.starts_with(prefix))
}

/// Extract `(score, rationale)` from an evaluation completion.
///
/// The first `SCORE:`-prefixed line supplies the score (defaulting to
/// [`DEFAULT_SCORE`] when no such line exists); the first
/// `RATIONALE:`-prefixed line supplies the rationale (defaulting to
/// [`FALLBACK_RATIONALE`]). The score is clamped regardless of what the
/// model produced.
pub fn parse_evaluation(raw: &str) -> Result<ParsedEvaluation, InvalidScore> {
    let score = match first_line_with_prefix(raw, "SCORE:") {
        Some(line) => {
            let value = value_after_prefix(line, "SCORE:");
            value.parse::<f64>().map_err(|source| InvalidScore {
                value: value.to_string(),
                source,
            })?
        }
        None => DEFAULT_SCORE,
    };

    let rationale = match first_line_with_prefix(raw, "RATIONALE:") {
        Some(line) => value_after_prefix(line, "RATIONALE:").to_string(),
        None => FALLBACK_RATIONALE.to_string(),
    };

    Ok(ParsedEvaluation {
        score: clamp_score(score),
        rationale,
    })
}

/// The synthesis completion when score revision is in play.
///
/// Parsing is lenient in both directions: a missing or malformed
/// `FINAL_SCORE:` means the preliminary score stands, and a missing
/// `RATIONALE:` means the whole completion is the narrative.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalVerdict {
    pub score: Option<f64>,
    pub rationale: Option<String>,
}

/// Extract the head judge's final verdict from a synthesis completion.
pub fn parse_final_verdict(raw: &str) -> FinalVerdict {
    let score = first_line_with_prefix(raw, "FINAL_SCORE:")
        .and_then(|line| value_after_prefix(line, "FINAL_SCORE:").parse::<f64>().ok())
        .map(clamp_score);

    let rationale = first_line_with_prefix(raw, "RATIONALE:")
        .map(|line| value_after_prefix(line, "RATIONALE:").to_string())
        .filter(|r| !r.is_empty());

    FinalVerdict { score, rationale }
}
