// LLM Analyzer
// Prompting and boundary validation for the internal analyzer capability.
// Raw model output is parsed into a tagged Result immediately: either a
// schema-valid AnalysisResult or HumanizeError::Parse.

use serde::Deserialize;

use crate::models::{AnalysisResult, DetectionRisk, FlaggedSentence, RiskLevel};
use crate::services::errors::{HumanizeError, HumanizeResult};
use crate::services::fusion::risk_level;

/// System prompt for the internal humanness analysis
pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are an expert reviewer of writing style. Judge how human the given text reads.

Return JSON only, with these fields:
- detectionRisk: {"level": "low" | "medium" | "high", "score": 0-100, higher = more human}
- perplexityScore: 0-100, higher = less predictable word choice
- burstinessScore: 0-100, higher = more variation in sentence length and rhythm
- flaggedSentences: array of {"text": sentence, "reason": short explanation} for sentences that read as machine-written

Return only the JSON object, no other text."#;

pub fn build_analysis_prompt(text: &str) -> String {
    format!("Analyze the following text and return the JSON result:\n\n{}", text)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDetectionRisk {
    #[serde(default)]
    level: Option<String>,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFlaggedSentence {
    #[serde(alias = "sentence")]
    text: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    detection_risk: RawDetectionRisk,
    #[serde(alias = "perplexity")]
    perplexity_score: f64,
    #[serde(alias = "burstiness")]
    burstiness_score: f64,
    #[serde(default)]
    flagged_sentences: Vec<RawFlaggedSentence>,
}

/// Extract the outermost JSON object from model output
pub fn extract_json(content: &str) -> HumanizeResult<&str> {
    let content = content.trim();
    if content.starts_with('{') {
        return Ok(content);
    }
    match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if end > start => Ok(&content[start..=end]),
        (Some(_), _) => Err(HumanizeError::Parse("unterminated JSON object".to_string())),
        _ => Err(HumanizeError::Parse("no JSON object in response".to_string())),
    }
}

fn check_scale(field: &str, value: f64) -> HumanizeResult<f64> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(HumanizeError::Parse(format!(
            "{} must be within 0-100, got {}",
            field, value
        )))
    }
}

fn parse_level(level: Option<&str>, score: f64) -> HumanizeResult<RiskLevel> {
    match level.map(|l| l.trim().to_ascii_lowercase()) {
        None => Ok(risk_level(score)),
        Some(l) => match l.as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "" => Ok(risk_level(score)),
            other => Err(HumanizeError::Parse(format!("unknown risk level '{}'", other))),
        },
    }
}

/// Validate analyzer output against the AnalysisResult schema.
pub fn parse_analysis(content: &str) -> HumanizeResult<AnalysisResult> {
    let json_str = extract_json(content)?;
    let raw: RawAnalysis = serde_json::from_str(json_str)
        .map_err(|e| HumanizeError::Parse(format!("JSON parse error: {}", e)))?;

    let score = check_scale("detectionRisk.score", raw.detection_risk.score)?;
    let level = parse_level(raw.detection_risk.level.as_deref(), score)?;

    Ok(AnalysisResult {
        detection_risk: DetectionRisk { level, score },
        perplexity_score: check_scale("perplexityScore", raw.perplexity_score)?,
        burstiness_score: check_scale("burstinessScore", raw.burstiness_score)?,
        flagged_sentences: raw
            .flagged_sentences
            .into_iter()
            .filter(|f| !f.text.trim().is_empty())
            .map(|f| FlaggedSentence {
                text: f.text.trim().to_string(),
                reason: f.reason.unwrap_or_default(),
            })
            .collect(),
        external_judge: None,
        stylometric_match: None,
        degraded: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_analysis() {
        let content = r#"{"detectionRisk": {"level": "medium", "score": 72},
            "perplexityScore": 65, "burstinessScore": 40,
            "flaggedSentences": [{"text": "In conclusion, it is important.", "reason": "stock phrase"}]}"#;
        let result = parse_analysis(content).unwrap();
        assert_eq!(result.detection_risk.level, RiskLevel::Medium);
        assert_eq!(result.score(), 72.0);
        assert_eq!(result.flagged_sentences.len(), 1);
        assert!(!result.degraded);
    }

    #[test]
    fn test_parse_wrapped_in_prose() {
        let content = "Sure! Here it is:\n```json\n{\"detectionRisk\": {\"score\": 88}, \"perplexity\": 70, \"burstiness\": 60}\n```";
        let result = parse_analysis(content).unwrap();
        assert_eq!(result.detection_risk.level, RiskLevel::Low);
        assert!(result.flagged_sentences.is_empty());
    }

    #[test]
    fn test_rejects_missing_fields() {
        let err = parse_analysis(r#"{"detectionRisk": {"score": 50}}"#).unwrap_err();
        assert!(matches!(err, HumanizeError::Parse(_)));
    }

    #[test]
    fn test_rejects_out_of_range_score() {
        let content = r#"{"detectionRisk": {"score": 140}, "perplexityScore": 1, "burstinessScore": 1}"#;
        assert!(matches!(parse_analysis(content), Err(HumanizeError::Parse(_))));
    }

    #[test]
    fn test_rejects_unknown_level() {
        let content = r#"{"detectionRisk": {"level": "extreme", "score": 40}, "perplexityScore": 1, "burstinessScore": 1}"#;
        assert!(matches!(parse_analysis(content), Err(HumanizeError::Parse(_))));
    }

    #[test]
    fn test_rejects_non_json() {
        assert!(matches!(parse_analysis("I cannot help with that."), Err(HumanizeError::Parse(_))));
        assert!(matches!(parse_analysis("{ broken"), Err(HumanizeError::Parse(_))));
    }
}
