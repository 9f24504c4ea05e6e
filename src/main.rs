use anyhow::{Context, Result};
use serde_json::Value;
use stagehand::cli::commands::{RunCommand, StateCommand, ValidateCommand};
use stagehand::cli::output::*;
use stagehand::cli::{Cli, Command};
use stagehand::controllers::{Controller, StopPolicy};
use stagehand::runtime::{PipelineRegistry, PipelineRunner, RunnerOptions};
use stagehand::system::OsSystem;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::State(cmd) => show_state(cmd)?,
    }

    Ok(())
}

fn load_data(path: &str) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline file {path}"))?;
    serde_yaml::from_str(&text).context("Failed to parse pipeline file")
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    let data = load_data(&cmd.file)?;
    let stop_policy = if cmd.strict_stop {
        StopPolicy::Strict
    } else {
        StopPolicy::Tolerant
    };
    let runner = PipelineRunner::with_options(
        PipelineRegistry::with_defaults(),
        RunnerOptions { stop_policy },
    );
    let (pipeline, context) = runner
        .load(&data, Arc::new(OsSystem::new()))
        .context("Failed to compile pipeline")?;

    println!("{} Loaded pipeline: {}", INFO, style(pipeline.name()).bold());

    for (key, value) in &cmd.set {
        context.set_variable(key, Value::String(value.clone()));
        println!(
            "{} Variable override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _subscription = pipeline.on_changed(Arc::new(move |event| {
        tx.send(event).ok();
    }));

    if let Err(error) = pipeline.start() {
        println!("{} {}", CROSS, style(&error).red());
        std::process::exit(1);
    }

    let name = pipeline.name().to_string();
    while let Some(event) = rx.recv().await {
        println!("{}", format_event(&name, event));
        if event.is_terminal() {
            break;
        }
    }

    if pipeline.is_failed() {
        if let Some(error) = pipeline.error() {
            println!("  {}", style(error).red());
        }
        std::process::exit(1);
    }
    if matches!(pipeline.state(), stagehand::ControllerState::Cancelled) {
        std::process::exit(1);
    }
    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    let data = load_data(&cmd.file)?;
    let runner = PipelineRunner::default();
    match runner.parse_pipeline(&data) {
        Ok(model) => {
            let jobs: usize = model.stages.iter().map(|stage| stage.jobs.len()).sum();
            let steps: usize = model
                .stages
                .iter()
                .flat_map(|stage| &stage.jobs)
                .map(|job| job.steps.len())
                .sum();
            println!("{} Pipeline file is valid!", CHECK);
            println!("  Name: {}", style(&model.name).bold());
            println!("  Stages: {}", style(model.stages.len()).cyan());
            println!("  Jobs: {}", style(jobs).cyan());
            println!("  Steps: {}", style(steps).cyan());
            Ok(())
        }
        Err(error) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(error).red());
            std::process::exit(1);
        }
    }
}

fn show_state(cmd: &StateCommand) -> Result<()> {
    let data = load_data(&cmd.file)?;
    let runner = PipelineRunner::default();
    // Compile against an inert backend; nothing runs.
    let (pipeline, _context) = runner
        .load(&data, Arc::new(stagehand::StubSystem::new()))
        .context("Failed to compile pipeline")?;
    let dto = pipeline.to_state();
    println!("{}", render_state_tree(&dto));
    println!("{}", serde_json::to_string_pretty(&dto)?);
    Ok(())
}
