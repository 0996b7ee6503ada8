#![forbid(unsafe_code)]

//! # photojudge
//!
//! Judge photographs with a vision LLM, without trusting the LLM.
//!
//! A photograph is scored against a configurable set of weighted criteria:
//! one model call per criterion runs concurrently, each free-text completion
//! is parsed defensively (defaulted when absent, clamped into [0, 10], never
//! fatal), the per-criterion scores are combined into a weighted overall
//! score, and a second model call synthesizes the final narrative verdict,
//! optionally revising the score as head judge. A failed criterion degrades
//! to a fallback result instead of aborting the run; only a failed synthesis
//! kills a judgement.
//!
//! The model client is an injected trait object, so the whole pipeline runs
//! against test doubles with no network.

pub mod gateway;
pub mod judging;
pub mod pipeline;
pub mod prompts;

pub use gateway::{
    Attribution, ChatModel, ChatRequest, ChatResponse, ImageData, Message, ModelClient,
    NoopUsageSink, ProviderError, ProviderGateway, StderrUsageSink, UsageSink,
};
pub use judging::{
    default_criteria, Criterion, EvaluationResult, PhotoJudgement, ScoreRevision, Stage,
};
pub use pipeline::{
    EmptyCriteriaPolicy, JudgingError, JudgingPipeline, JudgingRequest, PipelineConfig,
    DEFAULT_MODEL,
};
