//! Scaffolding pipeline CLI.
//!
//! Applies a pipeline definition to a target directory, one checkpointed step
//! at a time. Re-running after a failure resumes after the last completed step.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use scaffold::core::guard::{Options, parse_assignment};
use scaffold::error::ScaffoldError;
use scaffold::exit_codes;
use scaffold::io::checkpoint::{CheckpointSink, GitCheckpoint, NoCheckpoint};
use scaffold::io::commands::ShellCommandRunner;
use scaffold::io::config::{ScaffoldConfig, load_config};
use scaffold::io::init::{ScaffoldPaths, init_state_dir};
use scaffold::io::pipeline_file::{load_pipeline, templates_dir};
use scaffold::io::run_state::load_or_new_run_state;
use scaffold::io::templates::{DirTemplates, NoTemplates, TemplateProvider};
use scaffold::io::workspace::Workspace;
use scaffold::logging;
use scaffold::pipeline::{Collaborators, PipelineRunner, RunReport, SkipReason, StepStatus};

#[derive(Parser)]
#[command(
    name = "scaffold",
    version,
    about = "Apply declarative, resumable scaffolding pipelines"
)]
struct Cli {
    /// Log step progress to stderr (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a pipeline to a target directory, skipping already checkpointed steps.
    Apply(ApplyArgs),
    /// Validate a pipeline definition without touching any files.
    Check {
        /// Pipeline definition (TOML).
        pipeline: PathBuf,
    },
    /// Show which steps of a pipeline are done in a target directory.
    Status {
        /// Pipeline definition (TOML).
        pipeline: PathBuf,
        /// Target project directory.
        target: PathBuf,
    },
}

#[derive(clap::Args)]
struct ApplyArgs {
    /// Pipeline definition (TOML).
    pipeline: PathBuf,
    /// Target project directory.
    target: PathBuf,
    /// Set a run option used by step guards and templates (repeatable).
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
    /// Compute every step's changes without writing, running commands, or committing.
    #[arg(long)]
    dry_run: bool,
    /// Do not create a git commit after each step.
    #[arg(long)]
    no_checkpoint: bool,
    /// Config file (default: <TARGET>/.scaffold/config.toml).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Template directory (default: the pipeline's `templates`, next to the pipeline file).
    #[arg(long, value_name = "DIR")]
    templates: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    logging::init(if cli.verbose { "scaffold=info" } else { "warn" });
    let code = match run(cli) {
        Ok(()) => exit_codes::OK,
        Err(err) => report_error(&err),
    };
    process::exit(code);
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Apply(args) => cmd_apply(&args),
        Command::Check { pipeline } => cmd_check(&pipeline),
        Command::Status { pipeline, target } => cmd_status(&pipeline, &target),
    }
}

fn report_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ScaffoldError>() {
        Some(scaffold_err) => match scaffold_err.step() {
            Some(step) => {
                eprintln!("scaffold: step {step:?} failed");
                eprintln!("{scaffold_err}");
                eprintln!("fix the cause and re-run to resume from this step");
                exit_codes::STEP_FAILED
            }
            None => {
                eprintln!("scaffold: {scaffold_err}");
                exit_codes::INVALID
            }
        },
        None => {
            eprintln!("scaffold: {err:#}");
            exit_codes::INVALID
        }
    }
}

fn cmd_apply(args: &ApplyArgs) -> Result<()> {
    let pipeline = load_pipeline(&args.pipeline)?;
    if !args.target.is_dir() {
        bail!("target {} is not a directory", args.target.display());
    }
    let paths = ScaffoldPaths::new(&args.target);
    let config_path = args.config.as_ref().unwrap_or(&paths.config_path);
    let cfg = load_config(config_path)?;
    let options = merge_options(&cfg, &args.set)?;

    let dir_templates;
    let templates: &dyn TemplateProvider = match args
        .templates
        .clone()
        .or_else(|| templates_dir(&pipeline, &args.pipeline))
    {
        Some(root) => {
            dir_templates = DirTemplates::new(root);
            &dir_templates
        }
        None => &NoTemplates,
    };

    let git_sink;
    let checkpoint: &dyn CheckpointSink =
        if cfg.checkpoint.enabled && !args.no_checkpoint && !args.dry_run {
            git_sink = GitCheckpoint::new(&args.target, cfg.checkpoint.message_prefix.clone());
            git_sink.ensure_ready(cfg.checkpoint.require_clean, &ScaffoldPaths::ignored_prefix())?;
            &git_sink
        } else {
            &NoCheckpoint
        };
    let commands = ShellCommandRunner::from_config(&cfg);

    let mut state = load_or_new_run_state(&paths.run_state_path, &pipeline.name, &args.target)?;
    let hooks = Collaborators {
        commands: &commands,
        checkpoint,
        templates,
    };
    let mut runner = PipelineRunner::new(Workspace::new(&args.target, args.dry_run), &options, hooks);
    if !args.dry_run {
        init_state_dir(&args.target)?;
        runner = runner.with_state_path(&paths.run_state_path);
    }

    let report = runner.run(&pipeline, &mut state)?;
    print_report(&report);
    Ok(())
}

fn cmd_check(pipeline_path: &Path) -> Result<()> {
    let pipeline = load_pipeline(pipeline_path)?;
    println!("{}: {} steps", pipeline.name, pipeline.steps.len());
    Ok(())
}

fn cmd_status(pipeline_path: &Path, target: &Path) -> Result<()> {
    let pipeline = load_pipeline(pipeline_path)?;
    let paths = ScaffoldPaths::new(target);
    let state = load_or_new_run_state(&paths.run_state_path, &pipeline.name, target)
        .with_context(|| format!("status for {}", target.display()))?;
    for step in &pipeline.steps {
        let mark = if state.is_completed(&step.name) {
            "done"
        } else {
            "pending"
        };
        println!("{mark:<8}{}", step.name);
    }
    Ok(())
}

/// Config `[options]` overlaid with `--set` assignments.
fn merge_options(cfg: &ScaffoldConfig, assignments: &[String]) -> Result<Options> {
    let mut options = cfg.options.clone();
    for raw in assignments {
        let (key, value) = parse_assignment(raw).map_err(|msg| anyhow!(msg))?;
        options.insert(key, value);
    }
    Ok(options)
}

fn print_report(report: &RunReport) {
    for step in &report.steps {
        match &step.status {
            StepStatus::Applied { files, commands } => println!(
                "applied  {} ({} files, {} commands)",
                step.name,
                files.len(),
                commands
            ),
            StepStatus::Planned { files } => {
                println!("planned  {}", step.name);
                for file in files {
                    println!("           {}", file.display());
                }
            }
            StepStatus::Skipped(SkipReason::Completed) => {
                println!("skipped  {} (already completed)", step.name);
            }
            StepStatus::Skipped(SkipReason::Guard) => {
                println!("skipped  {} (guard)", step.name);
            }
        }
    }
}
