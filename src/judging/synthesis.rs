//! Final reasoning synthesis: one model call that turns the per-criterion
//! feedback into a narrative verdict, and (policy permitting) revises the
//! overall score.

use tokio::time::timeout;
use tracing::warn;

use crate::gateway::{Attribution, ChatRequest, Message, ModelClient, ProviderError};
use crate::prompts::render_reasoning;

use super::aggregate::round2;
use super::evaluator::ModelCallOptions;
use super::parser::parse_final_verdict;
use super::types::{Criterion, PhotoJudgement};

/// Whether the synthesis stage may overwrite the aggregated score.
///
/// The synthesizer is the single authority permitted to do so; the
/// aggregator's output is explicitly preliminary under `Revise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreRevision {
    /// Parse `FINAL_SCORE:` from the completion and adopt it when present.
    #[default]
    Revise,
    /// The aggregated score stands; the whole completion is the narrative.
    Keep,
}

/// What synthesis produced: the narrative plus the (possibly revised) score.
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub overall_reasoning: String,
    pub overall_score: f64,
}

/// Concatenate one feedback line per criterion, in input criteria order:
/// `- <name> (Score: <score>): <rationale>`.
pub fn feedback_digest(criteria: &[Criterion], judgement: &PhotoJudgement) -> String {
    criteria
        .iter()
        .map(|criterion| {
            let score = judgement
                .scores
                .get(&criterion.name)
                .copied()
                .unwrap_or(0.0);
            let rationale = judgement
                .rationales
                .get(&criterion.name)
                .map(String::as_str)
                .unwrap_or("");
            format!("- {} (Score: {score}): {rationale}", criterion.name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run the synthesis call. Failure here, including timeout, is fatal to
/// the judging run; there is no fallback narrative and no retry.
pub async fn synthesize_reasoning(
    client: &dyn ModelClient,
    criteria: &[Criterion],
    judgement: &PhotoJudgement,
    rules: Option<&str>,
    template: &str,
    call: &ModelCallOptions,
    revision: ScoreRevision,
) -> Result<SynthesisOutcome, ProviderError> {
    let digest = feedback_digest(criteria, judgement);
    let prompt = render_reasoning(template, judgement.overall_score, rules, &digest);

    let request = ChatRequest::new(
        call.model.clone(),
        vec![Message::user(prompt)],
        Attribution::new("judging::synthesize"),
    )
    .temperature(call.temperature)
    .max_tokens(call.max_tokens);

    let response = match timeout(call.timeout, client.complete(request)).await {
        Ok(result) => result?,
        Err(_) => return Err(ProviderError::timeout(call.timeout)),
    };

    match revision {
        ScoreRevision::Keep => Ok(SynthesisOutcome {
            overall_reasoning: response.content,
            overall_score: judgement.overall_score,
        }),
        ScoreRevision::Revise => {
            let verdict = parse_final_verdict(&response.content);
            if verdict.score.is_none() {
                warn!(
                    filename = %judgement.filename,
                    "synthesis completion carried no FINAL_SCORE; keeping preliminary score"
                );
            }
            let overall_score = verdict
                .score
                .map(round2)
                .unwrap_or(judgement.overall_score);
            let overall_reasoning = verdict.rationale.unwrap_or(response.content);
            Ok(SynthesisOutcome {
                overall_reasoning,
                overall_score,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judgement_with(scores: &[(&str, f64, &str)]) -> PhotoJudgement {
        let mut judgement = PhotoJudgement::new("test.jpg");
        for (name, score, rationale) in scores {
            judgement.scores.insert(name.to_string(), *score);
            judgement
                .rationales
                .insert(name.to_string(), rationale.to_string());
        }
        judgement
    }

    #[test]
    fn digest_follows_criteria_order() {
        let criteria = vec![
            Criterion::new("B_second", ""),
            Criterion::new("A_first", ""),
        ];
        let judgement = judgement_with(&[
            ("A_first", 8.0, "crisp"),
            ("B_second", 6.5, "flat light"),
        ]);

        let digest = feedback_digest(&criteria, &judgement);
        let lines: Vec<&str> = digest.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "- B_second (Score: 6.5): flat light");
        assert_eq!(lines[1], "- A_first (Score: 8): crisp");
    }

    #[test]
    fn digest_tolerates_missing_entries() {
        let criteria = vec![Criterion::new("Ghost", "")];
        let judgement = judgement_with(&[]);
        let digest = feedback_digest(&criteria, &judgement);
        assert_eq!(digest, "- Ghost (Score: 0): ");
    }
}
