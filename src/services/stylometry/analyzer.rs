// Stylometric Analyzer
// Extracts a quantitative fingerprint (lexical, sentence, punctuation,
// readability and linguistic-pattern metrics) from raw text.
//
// Every ratio guards its denominator: empty input yields an all-zero profile.

use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::models::{
    LexicalMetrics, LinguisticPatterns, PunctuationMetrics, ReadabilityMetrics, SentenceMetrics,
    StylometricProfile,
};
use crate::services::text_processor::{count_syllables, split_sentences, tokenize_words, CLOSERS};

use super::cache::ProfileCache;

const SHORT_SENTENCE_WORDS: usize = 10;
const LONG_SENTENCE_WORDS: usize = 25;

const COORDINATING_CONJUNCTIONS: [&str; 7] = ["for", "and", "nor", "but", "or", "yet", "so"];

fn contraction_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\p{L}+'(t|s|re|ve|ll|d|m)$").expect("contraction regex")
    })
}

fn passive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(am|is|are|was|were|be|been|being|get|gets|got|gotten)\s+(\w+ly\s+)?(\w+ed|\w+en|made|done|built|held|kept|left|lost|paid|said|seen|sent|set|sold|taught|told|thought|found|brought|bought|caught|put|read|run|won)\b",
        )
        .expect("passive regex")
    })
}

fn dash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\u{2014}|\u{2013}|-{2,}|(?:^|\s)-(?:\s|$)").expect("dash regex"))
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

fn first_word_lower(sentence: &str) -> Option<String> {
    tokenize_words(sentence).into_iter().next().map(|w| w.to_lowercase())
}

/// Compute a profile without touching any cache.
pub fn compute_profile(text: &str) -> StylometricProfile {
    let words = tokenize_words(text);
    if words.is_empty() {
        return StylometricProfile::default();
    }
    let sentences = split_sentences(text);

    let n_words = words.len() as f64;
    let n_sentences = sentences.len() as f64;

    let lexical = lexical_metrics(&words);

    let sentence_lengths: Vec<usize> = sentences
        .iter()
        .map(|s| tokenize_words(s).len())
        .collect();
    let sentence_metrics = sentence_metrics(&sentence_lengths);

    let questions = sentences.iter().filter(|s| s.contains('?')).count() as f64;
    let exclamations = sentences.iter().filter(|s| s.contains('!')).count() as f64;
    let punctuation = PunctuationMetrics {
        comma: ratio(text.matches(',').count() as f64, n_words) * 100.0,
        semicolon: ratio(text.matches(';').count() as f64, n_words) * 100.0,
        dash: ratio(dash_re().find_iter(text).count() as f64, n_words) * 100.0,
        question: ratio(questions, n_sentences) * 100.0,
        exclamation: ratio(exclamations, n_sentences) * 100.0,
    };

    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();
    let avg_syllables = ratio(syllables as f64, n_words);
    let flesch = if n_sentences > 0.0 {
        (206.835 - 1.015 * (n_words / n_sentences) - 84.6 * avg_syllables).clamp(0.0, 100.0)
    } else {
        0.0
    };

    let patterns = linguistic_patterns(&words, &sentences);

    StylometricProfile {
        word_count: words.len(),
        sentence_count: sentences.len(),
        lexical,
        sentences: sentence_metrics,
        punctuation,
        readability: ReadabilityMetrics {
            flesch_reading_ease: flesch,
            avg_syllables_per_word: avg_syllables,
        },
        patterns,
    }
}

fn lexical_metrics(words: &[String]) -> LexicalMetrics {
    let n = words.len() as f64;
    let mut freq: HashMap<String, usize> = HashMap::new();
    for w in words {
        *freq.entry(w.to_lowercase()).or_insert(0) += 1;
    }
    let unique = freq.len() as f64;
    let hapax = freq.values().filter(|&&f| f == 1).count() as f64;
    let sum_sq: f64 = freq.values().map(|&f| (f * f) as f64).sum();
    let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();

    LexicalMetrics {
        type_token_ratio: ratio(unique, n),
        avg_word_length: ratio(total_chars as f64, n),
        hapax_ratio: ratio(hapax, unique),
        // Yule's K: 10^4 * (sum f^2 - N) / N^2
        yules_k: if n > 0.0 { 10_000.0 * (sum_sq - n) / (n * n) } else { 0.0 },
    }
}

fn sentence_metrics(lengths: &[usize]) -> SentenceMetrics {
    if lengths.is_empty() {
        return SentenceMetrics::default();
    }
    let n = lengths.len() as f64;
    let mean = lengths.iter().sum::<usize>() as f64 / n;
    let variance = lengths
        .iter()
        .map(|&l| (l as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let short = lengths.iter().filter(|&&l| l < SHORT_SENTENCE_WORDS).count() as f64;
    let long = lengths.iter().filter(|&&l| l > LONG_SENTENCE_WORDS).count() as f64;

    SentenceMetrics {
        mean,
        std_dev: variance.sqrt(),
        min: lengths.iter().copied().min().unwrap_or(0) as f64,
        max: lengths.iter().copied().max().unwrap_or(0) as f64,
        short_pct: short / n * 100.0,
        long_pct: long / n * 100.0,
    }
}

/// Question mark as the sentence terminal, ignoring trailing quotes and brackets.
/// A wh-opener alone ("How odd.") does not make a question.
fn is_question(sentence: &str) -> bool {
    sentence
        .trim_end()
        .trim_end_matches(&CLOSERS[..])
        .ends_with('?')
}

fn linguistic_patterns(words: &[String], sentences: &[String]) -> LinguisticPatterns {
    let contractions = words.iter().filter(|w| contraction_re().is_match(w)).count() as f64;
    let n_sentences = sentences.len() as f64;

    let mut conjunction_starts = 0usize;
    let mut interrogatives = 0usize;
    let mut passives = 0usize;
    for sentence in sentences {
        let opener = first_word_lower(sentence);
        let opener = opener.as_deref().unwrap_or("");
        if COORDINATING_CONJUNCTIONS.contains(&opener) {
            conjunction_starts += 1;
        }
        if is_question(sentence) {
            interrogatives += 1;
        }
        if passive_re().is_match(sentence) {
            passives += 1;
        }
    }

    LinguisticPatterns {
        contraction_ratio: ratio(contractions, words.len() as f64),
        conjunction_start_pct: ratio(conjunction_starts as f64, n_sentences) * 100.0,
        interrogative_pct: ratio(interrogatives as f64, n_sentences) * 100.0,
        passive_voice_ratio: ratio(passives as f64, n_sentences),
    }
}

/// Cache-backed analyzer. Cheap to clone; clones share the cache.
#[derive(Debug, Clone, Default)]
pub struct StylometricAnalyzer {
    cache: Arc<ProfileCache>,
}

impl StylometricAnalyzer {
    pub fn new(cache: Arc<ProfileCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ProfileCache> {
        &self.cache
    }

    pub fn analyze(&self, text: &str) -> Arc<StylometricProfile> {
        self.cache.get_or_compute(text, |t| {
            let profile = compute_profile(t);
            debug!(
                words = profile.word_count,
                sentences = profile.sentence_count,
                ttr = profile.lexical.type_token_ratio,
                "[STYLOMETRY] profile computed"
            );
            profile
        })
    }
}
