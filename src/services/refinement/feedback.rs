// Prompts and refinement feedback
// The refiner sees the current draft plus concrete, measurable targets
// derived from the stylometric deviations and the judges' remarks.

use crate::models::{AnalysisResult, MetricDeviation, Severity};

pub const DEFAULT_GENERATION_SYSTEM_PROMPT: &str = "You are a skilled human writer. Write natural, varied prose: \
mix short and long sentences, prefer concrete wording, use contractions where they sound natural, \
and avoid stock transitions and formulaic summaries. Return only the requested text.";

pub const REFINEMENT_SYSTEM_PROMPT: &str = "You revise drafts so they read as written by a person. \
Keep the meaning, facts and approximate length of the draft. Apply the feedback precisely. \
Return only the revised text with no commentary.";

const MAX_FLAGGED_IN_FEEDBACK: usize = 5;

fn describe_metric(metric: &str) -> &str {
    match metric {
        "typeTokenRatio" => "vocabulary variety (type-token ratio)",
        "sentenceLengthStdDev" => "sentence length variation (std dev, words)",
        "yulesK" => "word repetition (Yule's K)",
        "hapaxRatio" => "share of words used only once",
        "commaRatio" => "commas per 100 words",
        other => other,
    }
}

fn deviation_line(d: &MetricDeviation) -> String {
    let direction = if d.actual < d.expected { "raise" } else { "lower" };
    let urgency = match d.severity {
        Severity::High => " (major)",
        Severity::Medium => "",
        Severity::Low => " (minor)",
    };
    format!(
        "- {} {} from {:.2} toward {:.2}{}",
        direction,
        describe_metric(&d.metric),
        d.actual,
        d.expected,
        urgency
    )
}

/// Feedback block for the refiner from the latest analysis.
pub fn build_refinement_feedback(analysis: &AnalysisResult, top_n: usize) -> String {
    let mut sections = Vec::new();

    if let Some(ref style) = analysis.stylometric_match {
        let lines: Vec<String> = style.deviations.iter().take(top_n).map(deviation_line).collect();
        if !lines.is_empty() {
            sections.push(format!(
                "Match the reference style more closely (similarity {:.0}/100):\n{}",
                style.similarity,
                lines.join("\n")
            ));
        }
    }

    if let Some(ref judge) = analysis.external_judge {
        let mut line = format!(
            "An external detector rated the draft {:.0}% machine-written.",
            judge.fake_percentage
        );
        if let Some(ref feedback) = judge.feedback {
            line.push_str(&format!(" Detector notes: {}", feedback.trim()));
        }
        sections.push(line);
    }

    let flagged: Vec<String> = analysis
        .flagged_sentences
        .iter()
        .take(MAX_FLAGGED_IN_FEEDBACK)
        .map(|f| {
            if f.reason.is_empty() {
                format!("- \"{}\"", f.text)
            } else {
                format!("- \"{}\" ({})", f.text, f.reason)
            }
        })
        .collect();
    if !flagged.is_empty() {
        sections.push(format!("Rewrite these sentences:\n{}", flagged.join("\n")));
    }

    if sections.is_empty() {
        sections.push(
            "Vary sentence rhythm and word choice so the text reads less uniform.".to_string(),
        );
    }

    sections.join("\n\n")
}

pub fn build_refinement_prompt(draft: &str, feedback: &str) -> String {
    format!(
        "Revise the draft below.\n\nFeedback:\n{}\n\nDraft:\n{}",
        feedback, draft
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExternalJudgeResult, FlaggedSentence, StylometricMatch};

    fn deviation(metric: &str, expected: f64, actual: f64, severity: Severity) -> MetricDeviation {
        MetricDeviation {
            metric: metric.to_string(),
            expected,
            actual,
            deviation_pct: 50.0,
            severity,
        }
    }

    #[test]
    fn test_feedback_includes_all_sources() {
        let mut analysis = AnalysisResult::fallback();
        analysis.stylometric_match = Some(StylometricMatch {
            similarity: 61.0,
            deviations: vec![
                deviation("sentenceLengthStdDev", 8.0, 2.0, Severity::High),
                deviation("commaRatio", 4.0, 6.0, Severity::Medium),
            ],
        });
        analysis.external_judge = Some(ExternalJudgeResult {
            fake_percentage: 72.0,
            ai_words: None,
            feedback: Some("uniform rhythm".to_string()),
        });
        analysis.flagged_sentences = vec![FlaggedSentence {
            text: "In conclusion, technology matters.".to_string(),
            reason: "stock phrase".to_string(),
        }];

        let feedback = build_refinement_feedback(&analysis, 3);
        assert!(feedback.contains("raise sentence length variation"));
        assert!(feedback.contains("lower commas per 100 words"));
        assert!(feedback.contains("72% machine-written"));
        assert!(feedback.contains("uniform rhythm"));
        assert!(feedback.contains("In conclusion, technology matters."));
    }

    #[test]
    fn test_feedback_respects_top_n() {
        let mut analysis = AnalysisResult::fallback();
        analysis.stylometric_match = Some(StylometricMatch {
            similarity: 40.0,
            deviations: vec![
                deviation("yulesK", 100.0, 200.0, Severity::High),
                deviation("hapaxRatio", 0.7, 0.4, Severity::High),
            ],
        });
        let feedback = build_refinement_feedback(&analysis, 1);
        assert!(feedback.contains("Yule's K"));
        assert!(!feedback.contains("used only once"));
    }

    #[test]
    fn test_feedback_never_empty() {
        let feedback = build_refinement_feedback(&AnalysisResult::fallback(), 3);
        assert!(!feedback.is_empty());
    }
}
