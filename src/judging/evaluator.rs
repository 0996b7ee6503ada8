//! Per-criterion evaluation: one model call, one guaranteed result.

use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use crate::gateway::{Attribution, ChatModel, ChatRequest, ImageData, Message, ModelClient};
use crate::prompts::{render_evaluation, EVALUATION_USER_INSTRUCTION};

use super::parser::{parse_evaluation, DEFAULT_SCORE};
use super::types::{Criterion, EvaluationResult};

/// Knobs for a single model invocation.
#[derive(Debug, Clone)]
pub struct ModelCallOptions {
    pub model: ChatModel,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Evaluate one photograph against one criterion.
///
/// Invokes the model exactly once; this is the unit of concurrency for the
/// fan-out stage, and there is no retry. Any failure (provider error,
/// timeout, unparsable score) degrades to a fallback result carrying
/// [`DEFAULT_SCORE`] and an error-annotated rationale: one criterion's
/// failure must never abort the whole judgement.
pub async fn evaluate_criterion(
    client: &dyn ModelClient,
    image: &ImageData,
    criterion: &Criterion,
    template: &str,
    call: &ModelCallOptions,
) -> EvaluationResult {
    let system = render_evaluation(template, &criterion.name, &criterion.description);
    let request = ChatRequest::new(
        call.model.clone(),
        vec![
            Message::system(system),
            Message::user_with_image(EVALUATION_USER_INSTRUCTION, image),
        ],
        Attribution::new("judging::evaluate"),
    )
    .temperature(call.temperature)
    .max_tokens(call.max_tokens);

    let response = match timeout(call.timeout, client.complete(request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            warn!(criterion = %criterion.name, error = %err, "criterion evaluation failed");
            return fallback_result(criterion, err);
        }
        Err(_) => {
            warn!(criterion = %criterion.name, after = ?call.timeout, "criterion evaluation timed out");
            return fallback_result(
                criterion,
                format!("timeout after {:?}", call.timeout),
            );
        }
    };

    match parse_evaluation(&response.content) {
        Ok(parsed) => EvaluationResult {
            criterion_name: criterion.name.clone(),
            score: parsed.score,
            rationale: parsed.rationale,
        },
        Err(err) => {
            warn!(criterion = %criterion.name, error = %err, "unparsable evaluation completion");
            fallback_result(criterion, err)
        }
    }
}

fn fallback_result(criterion: &Criterion, detail: impl std::fmt::Display) -> EvaluationResult {
    EvaluationResult {
        criterion_name: criterion.name.clone(),
        score: DEFAULT_SCORE,
        rationale: format!("Error during evaluation of {}: {detail}", criterion.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_embeds_failure_detail() {
        let criterion = Criterion::new("Composition", "framing");
        let result = fallback_result(&criterion, "connection reset");
        assert_eq!(result.criterion_name, "Composition");
        assert!((result.score - DEFAULT_SCORE).abs() < 1e-9);
        assert_eq!(
            result.rationale,
            "Error during evaluation of Composition: connection reset"
        );
    }
}
