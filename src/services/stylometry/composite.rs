// Composite Profile Builder
// Merges reference-document profiles into one target profile: weighted means
// for every scalar, global min/max for sentence-length bounds.

use crate::models::{
    LexicalMetrics, LinguisticPatterns, PunctuationMetrics, ReadabilityMetrics, ReferenceDocument,
    SentenceMetrics, StylometricProfile,
};
use tracing::info;

use super::analyzer::StylometricAnalyzer;

pub struct CompositeProfileBuilder<'a> {
    analyzer: &'a StylometricAnalyzer,
}

impl<'a> CompositeProfileBuilder<'a> {
    pub fn new(analyzer: &'a StylometricAnalyzer) -> Self {
        Self { analyzer }
    }

    /// Equal-weight composite of the given texts.
    pub fn build<S: AsRef<str>>(&self, texts: &[S]) -> StylometricProfile {
        let docs: Vec<(&str, f64)> = texts.iter().map(|t| (t.as_ref(), 1.0)).collect();
        self.build_from(&docs)
    }

    /// Composite of reference documents using their relative weights.
    pub fn build_weighted(&self, docs: &[ReferenceDocument]) -> StylometricProfile {
        let pairs: Vec<(&str, f64)> = docs.iter().map(|d| (d.text.as_str(), d.weight)).collect();
        self.build_from(&pairs)
    }

    fn build_from(&self, docs: &[(&str, f64)]) -> StylometricProfile {
        if docs.is_empty() {
            return StylometricProfile::default();
        }

        let profiles: Vec<_> = docs.iter().map(|(text, _)| self.analyzer.analyze(text)).collect();

        // Unusable weights are ignored; if none remain every document counts equally.
        let mut weights: Vec<f64> = docs
            .iter()
            .map(|(_, w)| if w.is_finite() && *w > 0.0 { *w } else { 0.0 })
            .collect();
        if weights.iter().all(|w| *w == 0.0) {
            weights = vec![1.0; docs.len()];
        }
        let total: f64 = weights.iter().sum();

        let mean = |f: &dyn Fn(&StylometricProfile) -> f64| -> f64 {
            profiles
                .iter()
                .zip(weights.iter())
                .map(|(p, w)| f(p.as_ref()) * w)
                .sum::<f64>()
                / total
        };

        // Bounds come from documents that actually have sentences.
        let with_sentences: Vec<_> = profiles.iter().filter(|p| p.sentence_count > 0).collect();
        let global_min = with_sentences
            .iter()
            .map(|p| p.sentences.min)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
            .unwrap_or(0.0);
        let global_max = with_sentences
            .iter()
            .map(|p| p.sentences.max)
            .fold(0.0, f64::max);

        let composite = StylometricProfile {
            word_count: mean(&|p| p.word_count as f64).round() as usize,
            sentence_count: mean(&|p| p.sentence_count as f64).round() as usize,
            lexical: LexicalMetrics {
                type_token_ratio: mean(&|p| p.lexical.type_token_ratio),
                avg_word_length: mean(&|p| p.lexical.avg_word_length),
                hapax_ratio: mean(&|p| p.lexical.hapax_ratio),
                yules_k: mean(&|p| p.lexical.yules_k),
            },
            sentences: SentenceMetrics {
                mean: mean(&|p| p.sentences.mean),
                std_dev: mean(&|p| p.sentences.std_dev),
                min: global_min,
                max: global_max,
                short_pct: mean(&|p| p.sentences.short_pct),
                long_pct: mean(&|p| p.sentences.long_pct),
            },
            punctuation: PunctuationMetrics {
                comma: mean(&|p| p.punctuation.comma),
                semicolon: mean(&|p| p.punctuation.semicolon),
                dash: mean(&|p| p.punctuation.dash),
                question: mean(&|p| p.punctuation.question),
                exclamation: mean(&|p| p.punctuation.exclamation),
            },
            readability: ReadabilityMetrics {
                flesch_reading_ease: mean(&|p| p.readability.flesch_reading_ease),
                avg_syllables_per_word: mean(&|p| p.readability.avg_syllables_per_word),
            },
            patterns: LinguisticPatterns {
                contraction_ratio: mean(&|p| p.patterns.contraction_ratio),
                conjunction_start_pct: mean(&|p| p.patterns.conjunction_start_pct),
                interrogative_pct: mean(&|p| p.patterns.interrogative_pct),
                passive_voice_ratio: mean(&|p| p.patterns.passive_voice_ratio),
            },
        };

        info!(
            documents = docs.len(),
            ttr = composite.lexical.type_token_ratio,
            sentence_mean = composite.sentences.mean,
            "[STYLOMETRY] composite target profile built"
        );
        composite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::stylometry::analyzer::compute_profile;

    const SHORT: &str = "Dogs bark loudly.";
    const LONG: &str = "When the evening finally settled over the quiet harbor town, the old \
                        fishermen gathered near the pier to mend their nets and trade stories \
                        about storms they had survived together.";

    #[test]
    fn test_empty_list_is_zero_profile() {
        let analyzer = StylometricAnalyzer::default();
        let builder = CompositeProfileBuilder::new(&analyzer);
        let empty: [&str; 0] = [];
        assert_eq!(builder.build(&empty), StylometricProfile::default());
    }

    #[test]
    fn test_mean_between_and_global_bounds() {
        let analyzer = StylometricAnalyzer::default();
        let builder = CompositeProfileBuilder::new(&analyzer);
        let short = compute_profile(SHORT);
        let long = compute_profile(LONG);
        assert_eq!(short.word_count, 3);
        assert_eq!(long.word_count, 30);

        let composite = builder.build(&[SHORT, LONG]);
        assert!(composite.sentences.mean > short.sentences.mean);
        assert!(composite.sentences.mean < long.sentences.mean);
        assert_eq!(composite.sentences.min, 3.0);
        assert_eq!(composite.sentences.max, 30.0);
    }

    #[test]
    fn test_single_text_matches_its_profile() {
        let analyzer = StylometricAnalyzer::default();
        let builder = CompositeProfileBuilder::new(&analyzer);
        let composite = builder.build(&[LONG]);
        assert_eq!(composite, compute_profile(LONG));
    }

    #[test]
    fn test_weights_shift_the_mean() {
        let analyzer = StylometricAnalyzer::default();
        let builder = CompositeProfileBuilder::new(&analyzer);
        let equal = builder.build(&[SHORT, LONG]);
        let weighted = builder.build_weighted(&[
            ReferenceDocument { text: SHORT.to_string(), weight: 1.0 },
            ReferenceDocument { text: LONG.to_string(), weight: 3.0 },
        ]);
        assert!(weighted.sentences.mean > equal.sentences.mean);
    }

    #[test]
    fn test_invalid_weights_fall_back_to_equal() {
        let analyzer = StylometricAnalyzer::default();
        let builder = CompositeProfileBuilder::new(&analyzer);
        let equal = builder.build(&[SHORT, LONG]);
        let weighted = builder.build_weighted(&[
            ReferenceDocument { text: SHORT.to_string(), weight: 0.0 },
            ReferenceDocument { text: LONG.to_string(), weight: f64::NAN },
        ]);
        assert_eq!(weighted, equal);
    }

    #[test]
    fn test_empty_documents_do_not_pull_min_to_zero() {
        let analyzer = StylometricAnalyzer::default();
        let builder = CompositeProfileBuilder::new(&analyzer);
        let composite = builder.build(&["", LONG]);
        assert_eq!(composite.sentences.min, 30.0);
    }
}
