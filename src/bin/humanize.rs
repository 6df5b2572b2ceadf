use anyhow::{bail, Context, Result};
use humanizer_lib::init_logging;
use humanizer_lib::models::{RefineRequest, StepStatus, WorkflowStep};
use humanizer_lib::services::{
    load_or_default, Capabilities, ChatProvider, DirectoryLibrary, ExternalDetector, HttpDetector,
    ProfileCache, ReferenceLibrary, RefinementController, StepObserver, TextAnalyzer,
    TextGenerator, TracingObserver,
};
use std::sync::Arc;
use std::time::Duration;

const USAGE: &str = "Usage:\n  humanize <prompt-file> [--refs <dir>] [--target <score>] [--max-iter <n>] \
[--system <file>] [--out <json_path>]\n\nProviders come from the config file (generator / refiner / analyzer as \
`name[:model]`); API keys from <NAME>_API_KEY or the config file.";

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

fn status_tag(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "..",
        StepStatus::Running => ">>",
        StepStatus::Success => "ok",
        StepStatus::Warning => "!!",
        StepStatus::Error => "xx",
    }
}

/// Prints each step to stdout and forwards it to tracing.
struct ConsoleObserver;

impl StepObserver for ConsoleObserver {
    fn on_step(&self, step: &WorkflowStep) {
        TracingObserver.on_step(step);
        if step.status == StepStatus::Running && step.details.is_empty() {
            println!("[{}] {}", status_tag(step.status), step.label);
        } else {
            println!("[{}] {}: {}", status_tag(step.status), step.label, step.details);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    init_logging();

    let prompt = std::fs::read_to_string(&args[1])
        .with_context(|| format!("read prompt file {}", args[1]))?;
    let system_prompt = match parse_arg_value(&args, "--system") {
        Some(path) => Some(
            std::fs::read_to_string(&path).with_context(|| format!("read system prompt {}", path))?,
        ),
        None => None,
    };

    let config = load_or_default();
    let mut refine = config.refine.clone();
    if let Some(v) = parse_arg_value(&args, "--target") {
        refine.target_score = v.parse().with_context(|| format!("invalid --target '{}'", v))?;
    }
    if let Some(v) = parse_arg_value(&args, "--max-iter") {
        refine.max_iterations = v.parse().with_context(|| format!("invalid --max-iter '{}'", v))?;
    }
    if !(0.0..=100.0).contains(&refine.target_score) {
        bail!("target score must be within 0-100");
    }

    let Some(generator_spec) = config.generator.clone() else {
        bail!("no generator configured; set \"generator\": \"name:model\" in the config file");
    };
    let generator = Arc::new(ChatProvider::from_config(&generator_spec, &config));
    let refiner = config
        .refiner
        .as_deref()
        .map(|spec| Arc::new(ChatProvider::from_config(spec, &config)) as Arc<dyn TextGenerator>);
    let analyzer_spec = config.analyzer.clone().unwrap_or_else(|| generator_spec.clone());
    let analyzer = Arc::new(ChatProvider::from_config(&analyzer_spec, &config));
    let library = parse_arg_value(&args, "--refs")
        .map(|dir| Arc::new(DirectoryLibrary::new(dir)) as Arc<dyn ReferenceLibrary>);

    let capabilities = Capabilities {
        generator: Some(generator as Arc<dyn TextGenerator>),
        refiner,
        analyzer: Some(analyzer as Arc<dyn TextAnalyzer>),
        detector: Some(Arc::new(HttpDetector::from_config(&config)) as Arc<dyn ExternalDetector>),
        library,
    };
    let cache = Arc::new(ProfileCache::new(
        config.cache.capacity,
        Duration::from_secs(config.cache.ttl_secs),
    ));
    let controller = RefinementController::new(capabilities, cache, refine);

    let request = RefineRequest {
        prompt,
        system_prompt,
        references: Vec::new(),
    };

    println!("Prompt: {}", preview(&request.prompt, 80));
    println!(
        "Target: {} | max iterations: {}",
        controller.config().target_score,
        controller.config().max_iterations
    );

    let outcome = controller.run(&request, &ConsoleObserver).await?;

    println!();
    println!(
        "Status: {:?} | score {:.0} | iterations {}{}",
        outcome.status,
        outcome.analysis.score(),
        outcome.iterations,
        if outcome.below_target { " (below target)" } else { "" }
    );
    if let Some(ref style) = outcome.analysis.stylometric_match {
        println!("Style similarity: {:.0}", style.similarity);
    }
    println!();
    println!("{}", outcome.text);

    if let Some(out_path) = parse_arg_value(&args, "--out") {
        let json = serde_json::to_string_pretty(&outcome).context("serialize outcome")?;
        std::fs::write(&out_path, json).with_context(|| format!("write {}", out_path))?;
        println!("\nWrote JSON: {}", out_path);
    }

    Ok(())
}
