// Humanizer Data Models
// Profiles, comparisons, analysis results and workflow records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============ Stylometric Profile ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LexicalMetrics {
    pub type_token_ratio: f64,
    pub avg_word_length: f64,
    pub hapax_ratio: f64,
    pub yules_k: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SentenceMetrics {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Percentage of sentences under 10 words.
    pub short_pct: f64,
    /// Percentage of sentences over 25 words.
    pub long_pct: f64,
}

/// Commas, semicolons and dashes are per 100 words; questions and
/// exclamations are per 100 sentences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PunctuationMetrics {
    pub comma: f64,
    pub semicolon: f64,
    pub dash: f64,
    pub question: f64,
    pub exclamation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReadabilityMetrics {
    pub flesch_reading_ease: f64,
    pub avg_syllables_per_word: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LinguisticPatterns {
    /// Share of words that are apostrophe contractions (0-1).
    pub contraction_ratio: f64,
    /// Percentage of sentences opening with a coordinating conjunction.
    pub conjunction_start_pct: f64,
    pub interrogative_pct: f64,
    /// Share of sentences with an auxiliary + past participle construction (0-1).
    pub passive_voice_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StylometricProfile {
    pub word_count: usize,
    pub sentence_count: usize,
    pub lexical: LexicalMetrics,
    pub sentences: SentenceMetrics,
    pub punctuation: PunctuationMetrics,
    pub readability: ReadabilityMetrics,
    pub patterns: LinguisticPatterns,
}

impl StylometricProfile {
    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }
}

// ============ Profile Comparison ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDeviation {
    pub metric: String,
    pub expected: f64,
    pub actual: f64,
    pub deviation_pct: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileComparison {
    pub similarity: f64,
    pub deviations: Vec<MetricDeviation>,
}

// ============ Analysis Result ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRisk {
    pub level: RiskLevel,
    /// 0-100, higher means more human-like.
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedSentence {
    pub text: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalJudgeResult {
    pub fake_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_words: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl ExternalJudgeResult {
    pub fn human_score(&self) -> f64 {
        100.0 - self.fake_percentage.clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylometricMatch {
    pub similarity: f64,
    pub deviations: Vec<MetricDeviation>,
}

impl From<ProfileComparison> for StylometricMatch {
    fn from(c: ProfileComparison) -> Self {
        Self {
            similarity: c.similarity,
            deviations: c.deviations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub detection_risk: DetectionRisk,
    pub perplexity_score: f64,
    pub burstiness_score: f64,
    #[serde(default)]
    pub flagged_sentences: Vec<FlaggedSentence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_judge: Option<ExternalJudgeResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stylometric_match: Option<StylometricMatch>,
    /// Set when any part of this result came from a fallback default.
    #[serde(default)]
    pub degraded: bool,
}

impl AnalysisResult {
    /// Neutral result substituted when the internal analyzer branch fails.
    pub fn fallback() -> Self {
        Self {
            detection_risk: DetectionRisk {
                level: RiskLevel::Medium,
                score: DEFAULT_FALLBACK_SCORE,
            },
            perplexity_score: DEFAULT_FALLBACK_SCORE,
            burstiness_score: DEFAULT_FALLBACK_SCORE,
            flagged_sentences: vec![],
            external_judge: None,
            stylometric_match: None,
            degraded: true,
        }
    }

    pub fn score(&self) -> f64 {
        self.detection_risk.score
    }
}

pub const DEFAULT_FALLBACK_SCORE: f64 = 50.0;

// ============ Workflow Steps ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub id: String,
    pub label: String,
    pub status: StepStatus,
    #[serde(default)]
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// ============ Refinement Run ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDocument {
    pub text: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl ReferenceDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RefineRequest {
    /// What the generator should write.
    pub prompt: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub references: Vec<ReferenceDocument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    TargetMet,
    MaxIterationsReached,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementOutcome {
    pub run_id: String,
    pub status: RunStatus,
    pub text: String,
    pub analysis: AnalysisResult,
    pub iterations: u32,
    pub below_target: bool,
    pub target_score: f64,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

fn default_weight() -> f64 { 1.0 }
