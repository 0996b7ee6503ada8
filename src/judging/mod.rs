//! Judging core: response parsing, per-criterion evaluation, weighted
//! aggregation, and reasoning synthesis.
//!
//! Component layering, leaf-first:
//! - `parser` — turns untrusted free-text completions into scores/rationales
//! - `evaluator` — one model call per criterion, guaranteed fallback
//! - `aggregate` — weighted average of per-criterion scores
//! - `synthesis` — final narrative verdict, optional score revision
//!
//! The state machine that sequences these lives in `crate::pipeline`.

pub mod aggregate;
pub mod evaluator;
pub mod parser;
pub mod synthesis;
pub mod types;

pub use aggregate::aggregate;
pub use evaluator::{evaluate_criterion, ModelCallOptions};
pub use parser::{
    clamp_score, parse_evaluation, parse_final_verdict, FinalVerdict, InvalidScore,
    ParsedEvaluation, DEFAULT_SCORE, FALLBACK_RATIONALE,
};
pub use synthesis::{feedback_digest, synthesize_reasoning, ScoreRevision, SynthesisOutcome};
pub use types::{default_criteria, Criterion, EvaluationResult, PhotoJudgement, Stage};
