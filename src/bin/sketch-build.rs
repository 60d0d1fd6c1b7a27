//! sketch-build: run a make target of a sketch project and stream its output.
//!
//! Exits with the build tool's exit code, 1 when the build failed without
//! one, and 130 when interrupted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sketch_tasks::logging::init_logging_with_default;
use sketch_tasks::{BuildConfig, BuildTask, TaskNotification, TaskQueue, TaskState};

const EXIT_INTERRUPTED: i32 = 130;

/// Build a sketch project with make
#[derive(Parser)]
#[command(name = "sketch-build")]
#[command(about = "Run a make target of a sketch project", long_about = None)]
#[command(version)]
struct Cli {
    /// Project directory
    #[arg(default_value = ".")]
    project: PathBuf,

    /// Make target (Release, Debug, RunRelease, RunDebug, clean, ...)
    #[arg(default_value = "Release")]
    target: String,

    /// TOML build configuration
    #[arg(long, short = 'c', env = "SKETCH_BUILD_CONFIG")]
    config: Option<PathBuf>,

    /// Parallel jobs
    #[arg(long, short = 'j')]
    jobs: Option<usize>,

    /// Show recipe commands (drops `-s`)
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Toolchain root path
    #[arg(long)]
    toolchain_root: Option<String>,

    /// C compiler override
    #[arg(long)]
    cc: Option<String>,

    /// C++ compiler override
    #[arg(long)]
    cxx: Option<String>,

    /// Platform variant tag
    #[arg(long)]
    platform_variant: Option<String>,

    /// Enable makefile debug tracing
    #[arg(long)]
    makefile_debug: bool,

    /// Print notifications as JSON lines instead of plain text
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn build_config(&self) -> Result<BuildConfig> {
        let mut config = match &self.config {
            Some(path) => BuildConfig::load(path)?,
            None => BuildConfig::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;

        if let Some(jobs) = self.jobs {
            config = config.with_processor_count(jobs);
        }
        if self.verbose {
            config = config.with_silent(false);
        }
        if let Some(root) = &self.toolchain_root {
            config = config.with_toolchain_root(root.as_str());
        }
        if let Some(cc) = &self.cc {
            config = config.with_cc(cc.as_str());
        }
        if let Some(cxx) = &self.cxx {
            config = config.with_cxx(cxx.as_str());
        }
        if let Some(variant) = &self.platform_variant {
            config = config.with_platform_variant(variant.as_str());
        }
        if self.makefile_debug {
            config = config.with_debug(true);
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging_with_default("warn");

    let cli = Cli::parse();
    let config = cli.build_config().context("invalid build configuration")?;

    let task = BuildTask::new(&config, cli.project.as_path(), cli.target.as_str());
    let task_id = task.id().to_string();
    tracing::info!(task_id = %task_id, args = ?task.args(), "Starting build");

    let queue = TaskQueue::new();
    let mut rx = queue.subscribe();
    let handle = queue.enqueue(task)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            signal = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "Could not listen for Ctrl-C");
                    continue;
                }
                eprintln!("Interrupted, stopping build...");
                if let Err(e) = queue.cancel(&task_id) {
                    tracing::debug!(error = %e, "Build already finished");
                }
            }
            notification = rx.recv() => {
                let Some(notification) = notification else { break };
                if cli.json {
                    println!("{}", serde_json::to_string(&notification)?);
                }
                match notification {
                    TaskNotification::Line(line) => {
                        if !cli.json {
                            println!("{}", line.text);
                        }
                    },
                    TaskNotification::Terminal(_) => break,
                }
            }
        }
    }

    let event = handle.await.context("build worker panicked")?;

    let code = match event.state {
        TaskState::Cancelled => EXIT_INTERRUPTED,
        TaskState::Completed => event.exit_code.unwrap_or(1),
        _ => {
            if let Some(error) = &event.error {
                eprintln!("Build failed: {}", error.message);
            }
            event.exit_code.filter(|code| *code != 0).unwrap_or(1)
        },
    };

    std::process::exit(code);
}
