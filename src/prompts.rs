//! Prompt templates for photo judging.
//!
//! Domain logic for rendering the per-criterion evaluation prompt and the
//! final reasoning prompt. Provider-agnostic. Callers may supply their own
//! template text; the builtins below are the defaults the CLI ships with.

use thiserror::Error;

// =============================================================================
// Placeholders
// =============================================================================

/// Placeholders the evaluation template must contain.
pub const EVALUATION_PLACEHOLDERS: &[&str] = &["{criterion_name}", "{criterion_description}"];

/// Placeholders the reasoning template must contain.
pub const REASONING_PLACEHOLDERS: &[&str] = &["{overall_score}", "{rules}", "{feedback_summary}"];

/// Fixed instruction for the user turn that carries the photograph.
pub const EVALUATION_USER_INSTRUCTION: &str = "Please evaluate this photograph.";

/// Substituted for `{rules}` when no competition rules are supplied.
pub const RULES_FALLBACK: &str = "general photography principles";

/// A template is missing one of its required placeholders.
#[derive(Debug, Error)]
#[error("{kind} template is missing placeholder {placeholder}")]
pub struct MissingPlaceholder {
    pub kind: &'static str,
    pub placeholder: &'static str,
}

/// Check that `template` contains every placeholder in `required`.
pub fn validate_template(
    kind: &'static str,
    template: &str,
    required: &[&'static str],
) -> Result<(), MissingPlaceholder> {
    for placeholder in required {
        if !template.contains(placeholder) {
            return Err(MissingPlaceholder { kind, placeholder });
        }
    }
    Ok(())
}

// =============================================================================
// Rendering
// =============================================================================

/// Fill the evaluation template for one criterion. The result is the system
/// instruction; the image travels in the user turn.
pub fn render_evaluation(template: &str, criterion_name: &str, criterion_description: &str) -> String {
    template
        .replace("{criterion_name}", criterion_name)
        .replace("{criterion_description}", criterion_description)
}

/// Fill the reasoning template with the preliminary score, the competition
/// rules (or the generic fallback), and the per-criterion feedback digest.
pub fn render_reasoning(
    template: &str,
    overall_score: f64,
    rules: Option<&str>,
    feedback_summary: &str,
) -> String {
    let rules = match rules {
        Some(r) if !r.trim().is_empty() => r,
        _ => RULES_FALLBACK,
    };
    template
        .replace("{overall_score}", &format!("{overall_score}"))
        .replace("{rules}", rules)
        .replace("{feedback_summary}", feedback_summary)
}

// =============================================================================
// Builtin templates
// =============================================================================

/// A named builtin prompt template.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub slug: &'static str,
    pub text: &'static str,
}

pub const EVALUATION_V1: PromptTemplate = PromptTemplate {
    slug: "evaluation_v1",
    text: r#"You are an expert photography judge. Evaluate this photograph for {criterion_name}.

{criterion_description}

Provide:
1. A score from 0.0 to 10.0
2. A brief rationale (2-3 sentences)

Format your response as:
SCORE: [number]
RATIONALE: [explanation]"#,
};

/// Reasoning template without score revision: the completion is the final
/// narrative verbatim and the aggregated score stands.
pub const REASONING_SUMMARY_V1: PromptTemplate = PromptTemplate {
    slug: "summary_v1",
    text: r#"You are the head judge of a photography competition. You have received feedback from your panel of judges on a photograph. Your task is to synthesize this feedback into a final, coherent summary for the photographer.

The photograph received an overall score of {overall_score}/10.
The competition rules emphasize: {rules}

Here is the detailed feedback from the panel:
{feedback_summary}

Based on all of this, please provide a final summary. Explain what is good about the photo, how it could be improved, and how well it fits the competition's specific rules. Address the photographer directly in a helpful and encouraging tone."#,
};

/// Reasoning template with score revision: the model answers in
/// `FINAL_SCORE:` / `RATIONALE:` format and may overrule the preliminary
/// aggregate.
pub const REASONING_HEAD_JUDGE_V1: PromptTemplate = PromptTemplate {
    slug: "head_judge_v1",
    text: r#"You are the head judge of a photography competition. You have received feedback and scores from your panel of judges on a photograph. Your task is to synthesize this feedback and provide one final, authoritative assessment.

The photograph received a *preliminary* calculated score of {overall_score}/10 based on the panel's feedback.
The competition rules emphasize: {rules}

Here is the detailed feedback from the panel:
{feedback_summary}

Based on a holistic review of the photo's strengths and weaknesses, and considering the competition rules, you must now provide your final judgment. Decide if the preliminary score is accurate or if it needs adjustment. An adjustment might be warranted if the individual scores don't fully capture a significant flaw or an outstanding quality that transcends the individual criteria.

Your final output MUST be in the following format. Do not add any other text outside of this structure:
FINAL_SCORE: [Your final score out of 10. This can be the same as the preliminary score or a new one you deem more appropriate.]
RATIONALE: [Your final summary for the photographer in maximum 60 words. Explain the final score. Be concise, clear and neutral. Explain what is good about the photo, how it could be improved, and how well it fits the competition's specific rules. If you adjusted the score from the preliminary one, briefly explain why.]"#,
};

pub const PROMPTS: &[PromptTemplate] = &[EVALUATION_V1, REASONING_SUMMARY_V1, REASONING_HEAD_JUDGE_V1];

pub const DEFAULT_EVALUATION_PROMPT: PromptTemplate = EVALUATION_V1;
pub const DEFAULT_REASONING_PROMPT: PromptTemplate = REASONING_HEAD_JUDGE_V1;

pub fn prompt_by_slug(slug: &str) -> Option<PromptTemplate> {
    PROMPTS.iter().find(|t| t.slug == slug).copied()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_render() {
        let rendered = render_evaluation(
            EVALUATION_V1.text,
            "Composition",
            "Rule of thirds, framing, balance.",
        );
        assert!(rendered.contains("Evaluate this photograph for Composition"));
        assert!(rendered.contains("Rule of thirds"));
        assert!(!rendered.contains("{criterion_name}"));
        assert!(!rendered.contains("{criterion_description}"));
    }

    #[test]
    fn reasoning_render_with_rules() {
        let rendered = render_reasoning(
            REASONING_HEAD_JUDGE_V1.text,
            7.25,
            Some("wildlife only"),
            "- Composition (Score: 7): fine",
        );
        assert!(rendered.contains("7.25/10"));
        assert!(rendered.contains("wildlife only"));
        assert!(rendered.contains("- Composition (Score: 7): fine"));
    }

    #[test]
    fn reasoning_render_falls_back_when_rules_absent() {
        let rendered = render_reasoning(REASONING_SUMMARY_V1.text, 5.0, None, "digest");
        assert!(rendered.contains(RULES_FALLBACK));

        let rendered = render_reasoning(REASONING_SUMMARY_V1.text, 5.0, Some("   "), "digest");
        assert!(rendered.contains(RULES_FALLBACK));
    }

    #[test]
    fn builtin_templates_carry_their_placeholders() {
        validate_template("evaluation", EVALUATION_V1.text, EVALUATION_PLACEHOLDERS).unwrap();
        validate_template(
            "reasoning",
            REASONING_SUMMARY_V1.text,
            REASONING_PLACEHOLDERS,
        )
        .unwrap();
        validate_template(
            "reasoning",
            REASONING_HEAD_JUDGE_V1.text,
            REASONING_PLACEHOLDERS,
        )
        .unwrap();
    }

    #[test]
    fn validate_rejects_missing_placeholder() {
        let err = validate_template("evaluation", "no placeholders here", EVALUATION_PLACEHOLDERS)
            .unwrap_err();
        assert_eq!(err.placeholder, "{criterion_name}");
    }

    #[test]
    fn prompt_lookup() {
        assert!(prompt_by_slug("evaluation_v1").is_some());
        assert!(prompt_by_slug("head_judge_v1").is_some());
        assert!(prompt_by_slug("nonexistent").is_none());
    }
}
