// Refinement Controller
// generate -> analyze (internal + external, concurrent) -> fuse -> decide -> refine
// Iterations run strictly in sequence. Only the analysis phase is
// concurrent: both branches share one deadline and each may fail on its
// own without failing the run.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{
    AnalysisResult, DetectionRisk, ExternalJudgeResult, RefineRequest, RefinementOutcome,
    RunStatus, StepStatus, StylometricProfile,
};
use crate::services::capabilities::{
    DetectionOutcome, ExternalDetector, ReferenceLibrary, StepObserver, TextAnalyzer,
    TextGenerator,
};
use crate::services::config_store::RefineConfig;
use crate::services::errors::{HumanizeError, HumanizeResult};
use crate::services::fusion::{fuse, risk_level};
use crate::services::llm_analyzer::{build_analysis_prompt, ANALYSIS_SYSTEM_PROMPT};
use crate::services::stylometry::{
    CompositeProfileBuilder, ProfileCache, ProfileComparator, StylometricAnalyzer,
};

use super::feedback::{
    build_refinement_feedback, build_refinement_prompt, DEFAULT_GENERATION_SYSTEM_PROMPT,
    REFINEMENT_SYSTEM_PROMPT,
};
use super::retry::{retry_with_backoff, RetryPolicy};
use super::workflow::StepLog;

/// External collaborators for one controller. The refiner falls back to
/// the generator; a missing detector or library simply skips that input.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub refiner: Option<Arc<dyn TextGenerator>>,
    pub analyzer: Option<Arc<dyn TextAnalyzer>>,
    pub detector: Option<Arc<dyn ExternalDetector>>,
    pub library: Option<Arc<dyn ReferenceLibrary>>,
}

/// Run-private loop state. Never shared between runs.
struct IterationState {
    current_text: String,
    current_analysis: AnalysisResult,
    iteration: u32,
    best_text: String,
    best_analysis: AnalysisResult,
    last_external: Option<ExternalJudgeResult>,
}

impl IterationState {
    fn new(text: String, analysis: AnalysisResult) -> Self {
        let last_external = analysis.external_judge.clone();
        Self {
            best_text: text.clone(),
            best_analysis: analysis.clone(),
            current_text: text,
            current_analysis: analysis,
            iteration: 0,
            last_external,
        }
    }

    fn accept(&mut self, text: String, analysis: AnalysisResult) {
        if analysis.external_judge.is_some() {
            self.last_external = analysis.external_judge.clone();
        }
        // ties keep the earlier text
        if analysis.score() > self.best_analysis.score() {
            self.best_text = text.clone();
            self.best_analysis = analysis.clone();
        }
        self.current_text = text;
        self.current_analysis = analysis;
    }
}

pub struct RefinementController {
    capabilities: Capabilities,
    stylometry: StylometricAnalyzer,
    comparator: ProfileComparator,
    config: RefineConfig,
    retry: RetryPolicy,
}

impl RefinementController {
    pub fn new(capabilities: Capabilities, cache: Arc<ProfileCache>, config: RefineConfig) -> Self {
        Self {
            capabilities,
            stylometry: StylometricAnalyzer::new(cache),
            comparator: ProfileComparator::new(config.top_deviations),
            retry: RetryPolicy::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &RefineConfig {
        &self.config
    }

    /// Execute one refinement run. Returns the final outcome, possibly
    /// below target, or the single fatal error that stopped the run.
    pub async fn run(
        &self,
        request: &RefineRequest,
        observer: &dyn StepObserver,
    ) -> HumanizeResult<RefinementOutcome> {
        let run_id = Uuid::new_v4().to_string();
        let mut log = StepLog::new(observer);
        info!(run_id = %run_id, "[REFINE] run started");

        let (generator, refiner, analyzer) = match self.resolve_capabilities(request) {
            Ok(caps) => caps,
            Err(e) => {
                log.note("Setup", StepStatus::Error, None, e.to_string());
                warn!(run_id = %run_id, "[REFINE] run failed: {}", e);
                return Err(e);
            }
        };

        let target = self.build_target(request, &mut log).await;

        let draft = self.generate(generator.as_ref(), request, &mut log).await?;
        let analysis = self
            .analyze(analyzer.as_ref(), &draft, target.as_ref(), None, 0, &mut log)
            .await?;
        let mut state = IterationState::new(draft, analysis);

        let status = loop {
            let score = state.current_analysis.score();
            if score >= self.config.target_score {
                info!(run_id = %run_id, score = score, iteration = state.iteration, "[REFINE] target met");
                break RunStatus::TargetMet;
            }
            if state.iteration >= self.config.max_iterations {
                info!(
                    run_id = %run_id,
                    best_score = state.best_analysis.score(),
                    "[REFINE] max iterations reached"
                );
                break RunStatus::MaxIterationsReached;
            }

            state.iteration += 1;
            let refined = self.refine(refiner.as_ref(), &state, &mut log).await?;
            let Some(refined) = refined else {
                // guard discarded the rewrite; decide again on the same analysis
                continue;
            };

            let analysis = self
                .analyze(
                    analyzer.as_ref(),
                    &refined,
                    target.as_ref(),
                    state.last_external.as_ref(),
                    state.iteration,
                    &mut log,
                )
                .await?;
            state.accept(refined, analysis);
        };

        let (text, analysis) = match status {
            RunStatus::TargetMet => (state.current_text, state.current_analysis),
            RunStatus::MaxIterationsReached => (state.best_text, state.best_analysis),
        };
        let below_target = analysis.score() < self.config.target_score;

        log.note(
            "Complete",
            if below_target { StepStatus::Warning } else { StepStatus::Success },
            None,
            format!(
                "score {:.0} after {} refinement(s){}",
                analysis.score(),
                state.iteration,
                if below_target { ", below target" } else { "" }
            ),
        );

        Ok(RefinementOutcome {
            run_id,
            status,
            text,
            analysis,
            iterations: state.iteration,
            below_target,
            target_score: self.config.target_score,
            steps: log.into_steps(),
        })
    }

    fn resolve_capabilities(
        &self,
        request: &RefineRequest,
    ) -> HumanizeResult<(Arc<dyn TextGenerator>, Arc<dyn TextGenerator>, Arc<dyn TextAnalyzer>)> {
        if request.prompt.trim().is_empty() {
            return Err(HumanizeError::Validation("prompt is empty".to_string()));
        }
        let generator = self
            .capabilities
            .generator
            .clone()
            .ok_or_else(|| HumanizeError::Validation("no generator configured".to_string()))?;
        let analyzer = self
            .capabilities
            .analyzer
            .clone()
            .ok_or_else(|| HumanizeError::Validation("no analyzer configured".to_string()))?;
        let refiner = self
            .capabilities
            .refiner
            .clone()
            .unwrap_or_else(|| generator.clone());
        Ok((generator, refiner, analyzer))
    }

    /// Composite target profile from the request's references, or from a
    /// library snapshot when the request carries none.
    async fn build_target(
        &self,
        request: &RefineRequest,
        log: &mut StepLog<'_>,
    ) -> Option<StylometricProfile> {
        let step = log.begin("Reference profile", None, "");

        let documents = if !request.references.is_empty() {
            request.references.clone()
        } else if let Some(library) = self.capabilities.library.as_ref() {
            match library.snapshot().await {
                Ok(docs) => docs,
                Err(e) => {
                    warn!("[REFINE] reference library unavailable: {}", e);
                    log.warn(&step, format!("reference library unavailable: {}", e));
                    return None;
                }
            }
        } else {
            Vec::new()
        };

        if documents.is_empty() {
            log.succeed(&step, "no references, style matching skipped");
            return None;
        }

        let profile = CompositeProfileBuilder::new(&self.stylometry).build_weighted(&documents);
        if profile.is_empty() {
            log.warn(&step, "references contain no usable text");
            return None;
        }
        log.succeed(
            &step,
            format!(
                "{} reference(s), mean sentence length {:.1}",
                documents.len(),
                profile.sentences.mean
            ),
        );
        Some(profile)
    }

    async fn generate(
        &self,
        generator: &dyn TextGenerator,
        request: &RefineRequest,
        log: &mut StepLog<'_>,
    ) -> HumanizeResult<String> {
        let step = log.begin("Generate", generator.model_id(), "");
        let system = request
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_GENERATION_SYSTEM_PROMPT);
        let prompt = request.prompt.as_str();
        let temperature = self.config.generation_temperature;

        let result = retry_with_backoff(&self.retry, "generate", || async move {
            let text = generator.generate(system, prompt, temperature).await?;
            if text.trim().is_empty() {
                return Err(HumanizeError::Provider("generator returned empty text".to_string()));
            }
            Ok(text)
        })
        .await;

        match result {
            Ok((text, attempt)) => {
                log.succeed(
                    &step,
                    format!("{} chars, attempt {}", text.chars().count(), attempt),
                );
                Ok(text)
            }
            Err(e) => {
                log.fail(&step, e.to_string());
                warn!("[REFINE] generation failed: {}", e);
                Err(e)
            }
        }
    }

    /// Returns the refined text, or None when the anti-truncation guard
    /// discarded it.
    async fn refine(
        &self,
        refiner: &dyn TextGenerator,
        state: &IterationState,
        log: &mut StepLog<'_>,
    ) -> HumanizeResult<Option<String>> {
        let queued = log.pending("Refine", format!("iteration {}", state.iteration));
        let step = log.start(queued, refiner.model_id(), "");

        let feedback = build_refinement_feedback(&state.current_analysis, self.config.top_deviations);
        let user = build_refinement_prompt(&state.current_text, &feedback);
        let user = user.as_str();
        let temperature = self.config.refinement_temperature;

        let result = retry_with_backoff(&self.retry, "refine", || async move {
            refiner.generate(REFINEMENT_SYSTEM_PROMPT, user, temperature).await
        })
        .await;

        let refined = match result {
            Ok((text, _)) => text,
            Err(e) => {
                log.fail(&step, e.to_string());
                warn!("[REFINE] refinement failed: {}", e);
                return Err(e);
            }
        };

        let before = state.current_text.chars().count();
        let after = refined.trim().chars().count();
        if (after as f64) < before as f64 * self.config.min_length_ratio {
            warn!(
                iteration = state.iteration,
                before = before,
                after = after,
                "[REFINE] refinement discarded as truncated"
            );
            log.warn(
                &step,
                format!(
                    "discarded: {} chars vs {} before (min ratio {})",
                    after, before, self.config.min_length_ratio
                ),
            );
            return Ok(None);
        }

        log.succeed(&step, format!("{} chars", after));
        Ok(Some(refined.trim().to_string()))
    }

    /// One analysis round. Branch failures degrade to defaults; only a
    /// fatal (configuration) error from the internal analyzer is returned.
    async fn analyze(
        &self,
        analyzer: &dyn TextAnalyzer,
        text: &str,
        target: Option<&StylometricProfile>,
        previous_external: Option<&ExternalJudgeResult>,
        iteration: u32,
        log: &mut StepLog<'_>,
    ) -> HumanizeResult<AnalysisResult> {
        let detector_source = self
            .capabilities
            .detector
            .as_ref()
            .and_then(|d| d.source_id());
        let details = match detector_source {
            Some(ref source) => format!("iteration {}, detector {}", iteration, source),
            None => format!("iteration {}", iteration),
        };
        let step = log.begin("Analyze", analyzer.model_id(), details);
        let deadline = self.config.analysis_timeout();
        let prompt = build_analysis_prompt(text);

        let internal = analyzer.analyze(ANALYSIS_SYSTEM_PROMPT, &prompt);
        let external = async {
            match self.capabilities.detector.as_ref() {
                Some(detector) => detector.detect(text).await,
                None => Ok(DetectionOutcome::NotApplicable),
            }
        };

        let (internal, external) =
            match tokio::time::timeout(deadline, async { tokio::join!(internal, external) }).await {
                Ok(pair) => pair,
                Err(_) => (
                    Err(HumanizeError::Timeout(deadline)),
                    Err(HumanizeError::Timeout(deadline)),
                ),
            };

        let mut problems = Vec::new();

        let mut analysis = match internal {
            Ok(a) => a,
            Err(e) if e.is_fatal() => {
                log.fail(&step, e.to_string());
                return Err(e);
            }
            Err(e) => {
                problems.push(format!("internal analyzer: {}", e));
                AnalysisResult::fallback()
            }
        };

        let live_external = match external {
            Ok(DetectionOutcome::Judged(judged)) => Some(judged),
            Ok(DetectionOutcome::NotApplicable) => None,
            Ok(DetectionOutcome::Rejected(message)) => {
                problems.push(format!("external detector rejected: {}", message));
                None
            }
            Err(e) => {
                problems.push(format!("external detector: {}", e));
                None
            }
        };

        let internal_score = analysis.score();
        let fused = fuse(internal_score, live_external.as_ref(), previous_external);
        analysis.detection_risk = DetectionRisk {
            level: risk_level(fused),
            score: fused,
        };
        analysis.external_judge = live_external;
        analysis.degraded = analysis.degraded || !problems.is_empty();

        if let Some(target) = target {
            let actual = self.stylometry.analyze(text);
            let comparison = self.comparator.compare(target, &actual);
            analysis.stylometric_match = Some(comparison.into());
        }

        let similarity = analysis
            .stylometric_match
            .as_ref()
            .map(|m| format!(", style similarity {:.0}", m.similarity))
            .unwrap_or_default();
        let summary = format!(
            "internal {:.0}, fused {:.0}{}",
            internal_score, fused, similarity
        );

        if problems.is_empty() {
            log.succeed(&step, summary);
        } else {
            warn!(iteration = iteration, "[REFINE] degraded analysis: {}", problems.join("; "));
            log.warn(&step, format!("{}; degraded: {}", summary, problems.join("; ")));
        }

        Ok(analysis)
    }
}
