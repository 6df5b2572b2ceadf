// Profile Comparator
// Diffs a target profile against an actual one: similarity score plus the
// top deviating metrics ranked by magnitude.

use std::cmp::Ordering;

use crate::models::{MetricDeviation, ProfileComparison, Severity, StylometricProfile};

/// Below this deviation (%) a metric is a low-severity miss.
pub const MEDIUM_SEVERITY_PCT: f64 = 15.0;
/// Above this deviation (%) a metric is a high-severity miss.
pub const HIGH_SEVERITY_PCT: f64 = 40.0;
pub const DEFAULT_TOP_N: usize = 3;
/// Floor for the expected value when it is zero or tiny.
const EPSILON: f64 = 0.01;

struct MetricSpec {
    name: &'static str,
    weight: f64,
    extract: fn(&StylometricProfile) -> f64,
}

fn type_token_ratio(p: &StylometricProfile) -> f64 {
    p.lexical.type_token_ratio
}

fn sentence_std_dev(p: &StylometricProfile) -> f64 {
    p.sentences.std_dev
}

fn yules_k(p: &StylometricProfile) -> f64 {
    p.lexical.yules_k
}

fn hapax_ratio(p: &StylometricProfile) -> f64 {
    p.lexical.hapax_ratio
}

fn comma_ratio(p: &StylometricProfile) -> f64 {
    p.punctuation.comma
}

/// Compared metrics in reporting order. The sensitivity weight only breaks
/// ranking ties between equal deviations; similarity is an unweighted mean.
const METRICS: [MetricSpec; 5] = [
    MetricSpec { name: "typeTokenRatio", weight: 1.0, extract: type_token_ratio },
    MetricSpec { name: "sentenceLengthStdDev", weight: 1.2, extract: sentence_std_dev },
    MetricSpec { name: "yulesK", weight: 0.8, extract: yules_k },
    MetricSpec { name: "hapaxRatio", weight: 0.8, extract: hapax_ratio },
    MetricSpec { name: "commaRatio", weight: 0.6, extract: comma_ratio },
];

pub fn severity_for(deviation_pct: f64) -> Severity {
    if deviation_pct > HIGH_SEVERITY_PCT {
        Severity::High
    } else if deviation_pct >= MEDIUM_SEVERITY_PCT {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn deviation_pct(expected: f64, actual: f64) -> f64 {
    (actual - expected).abs() / expected.abs().max(EPSILON) * 100.0
}

#[derive(Debug, Clone, Copy)]
pub struct ProfileComparator {
    top_n: usize,
}

impl Default for ProfileComparator {
    fn default() -> Self {
        Self { top_n: DEFAULT_TOP_N }
    }
}

impl ProfileComparator {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    pub fn compare(&self, target: &StylometricProfile, actual: &StylometricProfile) -> ProfileComparison {
        let mut total_pct = 0.0;
        let mut ranked: Vec<(f64, MetricDeviation)> = Vec::with_capacity(METRICS.len());

        for spec in METRICS.iter() {
            let expected = (spec.extract)(target);
            let observed = (spec.extract)(actual);
            let pct = deviation_pct(expected, observed);
            total_pct += pct;

            if pct > 0.0 {
                ranked.push((
                    spec.weight,
                    MetricDeviation {
                        metric: spec.name.to_string(),
                        expected,
                        actual: observed,
                        deviation_pct: pct,
                        severity: severity_for(pct),
                    },
                ));
            }
        }

        let mean_deviation = total_pct / METRICS.len() as f64;

        ranked.sort_by(|(wa, a), (wb, b)| {
            b.deviation_pct
                .partial_cmp(&a.deviation_pct)
                .unwrap_or(Ordering::Equal)
                .then(wb.partial_cmp(wa).unwrap_or(Ordering::Equal))
        });
        let deviations: Vec<MetricDeviation> = ranked
            .into_iter()
            .take(self.top_n)
            .map(|(_, d)| d)
            .collect();

        ProfileComparison {
            similarity: (100.0 - mean_deviation).max(0.0),
            deviations,
        }
    }
}
