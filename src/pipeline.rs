//! Photo judging pipeline: evaluate → score → synthesize.
//!
//! The three-stage cycle:
//! 1. **Evaluate** — one vision model call per criterion, all in flight at
//!    once (fan-out), wait for every result (fan-in barrier)
//! 2. **Score** — deterministic weighted aggregation of the per-criterion
//!    scores into a preliminary overall score
//! 3. **Synthesize** — a second model call turns the aggregate plus all
//!    rationales into the final narrative verdict, optionally revising the
//!    score
//!
//! Stages run in fixed order, each exactly once, `input → evaluated →
//! scored → completed`. A run that fails mid-flight is abandoned; the caller
//! gets a single error naming the failing stage, never a partial judgement.

use std::sync::Arc;
use std::time::Duration;

use futures::future;
use futures::stream::{self, StreamExt};

use crate::gateway::{ChatModel, ImageData, ModelClient, ProviderError};
use crate::judging::evaluator::{evaluate_criterion, ModelCallOptions};
use crate::judging::synthesis::{synthesize_reasoning, ScoreRevision};
use crate::judging::types::{Criterion, PhotoJudgement, Stage};
use crate::judging::{aggregate, default_criteria};
use crate::prompts::{
    validate_template, MissingPlaceholder, DEFAULT_EVALUATION_PROMPT, DEFAULT_REASONING_PROMPT,
    EVALUATION_PLACEHOLDERS, REASONING_PLACEHOLDERS,
};

/// Default judging model (vision-capable, cheap, fast).
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash-lite";

// =============================================================================
// Request
// =============================================================================

/// Everything one judging run needs. Validated upstream except for the
/// template placeholders and the criteria-empty precondition, which the
/// pipeline checks itself before spending any model calls.
#[derive(Debug, Clone)]
pub struct JudgingRequest {
    /// Display name carried through to the result; not read from disk here.
    pub filename: String,
    /// The photograph, already validated as an image by the caller.
    pub image: ImageData,
    /// Ordered, pre-filtered to enabled entries by the collaborator.
    pub criteria: Vec<Criterion>,
    /// Domain-specific judging guidance; may be absent.
    pub competition_rules: Option<String>,
    /// Must contain `{criterion_name}` and `{criterion_description}`.
    pub evaluation_prompt_template: String,
    /// Must contain `{overall_score}`, `{rules}`, `{feedback_summary}`.
    pub reasoning_prompt_template: String,
}

impl JudgingRequest {
    /// Request with the stock criteria and builtin templates.
    pub fn new(filename: impl Into<String>, image: ImageData) -> Self {
        Self {
            filename: filename.into(),
            image,
            criteria: default_criteria(),
            competition_rules: None,
            evaluation_prompt_template: DEFAULT_EVALUATION_PROMPT.text.to_string(),
            reasoning_prompt_template: DEFAULT_REASONING_PROMPT.text.to_string(),
        }
    }

    pub fn criteria(mut self, criteria: Vec<Criterion>) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn rules(mut self, rules: impl Into<String>) -> Self {
        self.competition_rules = Some(rules.into());
        self
    }

    pub fn evaluation_template(mut self, template: impl Into<String>) -> Self {
        self.evaluation_prompt_template = template.into();
        self
    }

    pub fn reasoning_template(mut self, template: impl Into<String>) -> Self {
        self.reasoning_prompt_template = template.into();
        self
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// What to do when a run arrives with no criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyCriteriaPolicy {
    /// Fail fast rather than silently producing a meaningless zero result.
    #[default]
    Reject,
    /// Proceed; the aggregator's zero-weight policy yields overall 0.0.
    ZeroScore,
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model used for both evaluation and synthesis calls.
    pub model: ChatModel,
    /// Sampling temperature for per-criterion evaluations.
    pub evaluation_temperature: f32,
    /// Sampling temperature for the synthesis call.
    pub synthesis_temperature: f32,
    /// Generation cap per evaluation (a score line plus 2-3 sentences).
    pub max_evaluation_tokens: u32,
    /// Generation cap for the narrative verdict.
    pub max_synthesis_tokens: u32,
    /// Per-call timeout for evaluations; a timeout degrades to the fallback
    /// result like any other evaluator failure.
    pub evaluation_timeout: Duration,
    /// Timeout for the synthesis call; fatal to the run when exceeded.
    pub synthesis_timeout: Duration,
    /// Fan-out bound for the evaluation stage. `None` puts every criterion
    /// in flight at once.
    pub max_concurrent_evaluations: Option<usize>,
    /// Whether synthesis may overwrite the aggregated score.
    pub score_revision: ScoreRevision,
    /// Empty-criteria precondition policy.
    pub empty_criteria: EmptyCriteriaPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: ChatModel::openrouter(DEFAULT_MODEL),
            evaluation_temperature: 0.3,
            synthesis_temperature: 0.3,
            max_evaluation_tokens: 512,
            max_synthesis_tokens: 1024,
            evaluation_timeout: Duration::from_secs(45),
            synthesis_timeout: Duration::from_secs(60),
            max_concurrent_evaluations: None,
            score_revision: ScoreRevision::default(),
            empty_criteria: EmptyCriteriaPolicy::default(),
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// A judging run failed. Exactly one variant per failure mode; the stage the
/// run died in is recoverable via [`JudgingError::failed_stage`].
#[derive(Debug, thiserror::Error)]
pub enum JudgingError {
    #[error("no judging criteria supplied")]
    EmptyCriteria,
    #[error("invalid prompt template: {0}")]
    InvalidTemplate(#[from] MissingPlaceholder),
    #[error("reasoning synthesis failed: {source}")]
    Synthesis {
        #[source]
        source: ProviderError,
    },
}

impl JudgingError {
    /// The stage the run was in when it failed.
    pub fn failed_stage(&self) -> Stage {
        match self {
            JudgingError::EmptyCriteria => Stage::Input,
            JudgingError::InvalidTemplate(_) => Stage::Input,
            JudgingError::Synthesis { .. } => Stage::Scored,
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// The judging pipeline. Holds the injected model client and configuration;
/// individual runs share nothing mutable, so one pipeline value serves any
/// number of concurrent runs.
pub struct JudgingPipeline {
    client: Arc<dyn ModelClient>,
    config: PipelineConfig,
}

impl JudgingPipeline {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self::with_config(client, PipelineConfig::default())
    }

    pub fn with_config(client: Arc<dyn ModelClient>, config: PipelineConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full judging pipeline on one photograph.
    pub async fn judge_photo(
        &self,
        request: &JudgingRequest,
    ) -> Result<PhotoJudgement, JudgingError> {
        validate_template(
            "evaluation",
            &request.evaluation_prompt_template,
            EVALUATION_PLACEHOLDERS,
        )?;
        validate_template(
            "reasoning",
            &request.reasoning_prompt_template,
            REASONING_PLACEHOLDERS,
        )?;
        if request.criteria.is_empty() && self.config.empty_criteria == EmptyCriteriaPolicy::Reject
        {
            return Err(JudgingError::EmptyCriteria);
        }

        let judgement = PhotoJudgement::new(&request.filename);
        let judgement = self.run_evaluation(request, judgement).await;
        let judgement = Self::run_scoring(&request.criteria, judgement);
        let judgement = self.run_synthesis(request, judgement).await?;

        debug_assert_eq!(judgement.stage, Stage::Completed);
        Ok(judgement)
    }

    /// Judge several photographs concurrently. Runs are fully independent:
    /// each gets its own judgement state, and one photo's failure neither
    /// cancels nor corrupts its siblings. Results come back in input order.
    pub async fn judge_batch(
        &self,
        requests: &[JudgingRequest],
    ) -> Vec<Result<PhotoJudgement, JudgingError>> {
        future::join_all(requests.iter().map(|request| self.judge_photo(request))).await
    }

    /// `input → evaluated`: fan out one evaluation per criterion and wait
    /// for all of them. Each task produces exactly one result for its own
    /// criterion; the barrier below is the only synchronization needed.
    async fn run_evaluation(
        &self,
        request: &JudgingRequest,
        mut judgement: PhotoJudgement,
    ) -> PhotoJudgement {
        let call = ModelCallOptions {
            model: self.config.model.clone(),
            temperature: self.config.evaluation_temperature,
            max_tokens: self.config.max_evaluation_tokens,
            timeout: self.config.evaluation_timeout,
        };
        let limit = self
            .config
            .max_concurrent_evaluations
            .unwrap_or(request.criteria.len())
            .max(1);
        let client = self.client.as_ref();

        let results = stream::iter(&request.criteria)
            .map(|criterion| {
                let call = call.clone();
                async move {
                    evaluate_criterion(
                        client,
                        &request.image,
                        criterion,
                        &request.evaluation_prompt_template,
                        &call,
                    )
                    .await
                }
            })
            .buffer_unordered(limit)
            .collect::<Vec<_>>()
            .await;

        for result in results {
            judgement
                .rationales
                .insert(result.criterion_name.clone(), result.rationale);
            judgement.scores.insert(result.criterion_name, result.score);
        }

        debug_assert_eq!(judgement.scores.len(), request.criteria.len());
        debug_assert!(request
            .criteria
            .iter()
            .all(|c| judgement.scores.contains_key(&c.name)
                && judgement.rationales.contains_key(&c.name)));

        judgement.stage = Stage::Evaluated;
        judgement
    }

    /// `evaluated → scored`: pure, deterministic aggregation.
    fn run_scoring(criteria: &[Criterion], mut judgement: PhotoJudgement) -> PhotoJudgement {
        judgement.overall_score = aggregate(criteria, &judgement.scores);
        judgement.stage = Stage::Scored;
        judgement
    }

    /// `scored → completed`: the one call whose failure kills the run.
    async fn run_synthesis(
        &self,
        request: &JudgingRequest,
        mut judgement: PhotoJudgement,
    ) -> Result<PhotoJudgement, JudgingError> {
        let call = ModelCallOptions {
            model: self.config.model.clone(),
            temperature: self.config.synthesis_temperature,
            max_tokens: self.config.max_synthesis_tokens,
            timeout: self.config.synthesis_timeout,
        };

        let outcome = synthesize_reasoning(
            self.client.as_ref(),
            &request.criteria,
            &judgement,
            request.competition_rules.as_deref(),
            &request.reasoning_prompt_template,
            &call,
            self.config.score_revision,
        )
        .await
        .map_err(|source| JudgingError::Synthesis { source })?;

        judgement.overall_reasoning = outcome.overall_reasoning;
        judgement.overall_score = outcome.overall_score;
        judgement.stage = Stage::Completed;
        Ok(judgement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.model.model_id(), DEFAULT_MODEL);
        assert_eq!(config.score_revision, ScoreRevision::Revise);
        assert_eq!(config.empty_criteria, EmptyCriteriaPolicy::Reject);
        assert_eq!(config.max_concurrent_evaluations, None);
    }

    #[test]
    fn errors_name_their_stage() {
        assert_eq!(JudgingError::EmptyCriteria.failed_stage(), Stage::Input);
        let synth = JudgingError::Synthesis {
            source: ProviderError::config("x"),
        };
        assert_eq!(synth.failed_stage(), Stage::Scored);
    }

    #[test]
    fn request_builder_defaults() {
        let request = JudgingRequest::new("bird.jpg", ImageData::jpeg(vec![1]));
        assert_eq!(request.criteria.len(), 4);
        assert!(request
            .evaluation_prompt_template
            .contains("{criterion_name}"));
        assert!(request.reasoning_prompt_template.contains("{rules}"));
        assert!(request.competition_rules.is_none());
    }
}
