//! Command-line entry point for fedora-artifacts

use clap::Parser;
use fedora_artifacts::{Config, Error, Event, PipelineContext, PipelineReport, ReleaseSpec};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Download and extract Fedora container artifacts
#[derive(Debug, Parser)]
#[command(name = "fedora-artifacts", version, about)]
struct Cli {
    /// Release to fetch: a number such as 40, "rawhide", or a branch label
    #[arg(value_name = "VERSION")]
    release: String,

    /// Directory where artifacts are downloaded and extracted
    #[arg(long, value_name = "PATH")]
    output_dir: Option<PathBuf>,

    /// Download only the minimal base image
    #[arg(long)]
    mini: bool,

    /// Number of concurrent download workers [default: 5]
    #[arg(long, value_name = "NUM", value_parser = clap::value_parser!(u16).range(1..))]
    workers: Option<u16>,

    /// Use the branched compose channel instead of the version in URLs
    #[arg(long)]
    branched: bool,

    /// JSON config file; command-line flags take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Compose root URL
    #[arg(long, value_name = "URL")]
    mirror: Option<String>,

    /// Architecture to fetch (repeatable); the first is used with --mini
    #[arg(long = "arch", value_name = "ARCH")]
    architectures: Vec<String>,

    /// Keep archives after extracting them
    #[arg(long)]
    keep_archives: bool,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECS")]
    connect_timeout: Option<u64>,

    /// Read timeout in seconds (headers and each body chunk)
    #[arg(long, value_name = "SECS")]
    read_timeout: Option<u64>,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Merge flags over the optional config file
    fn to_config(&self) -> fedora_artifacts::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };

        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = usize::from(workers);
        }
        if let Some(mirror) = &self.mirror {
            config.mirror_url = mirror.clone();
        }
        if !self.architectures.is_empty() {
            config.architectures = self.architectures.clone();
        }
        if self.keep_archives {
            config.keep_archives = true;
        }
        if let Some(secs) = self.connect_timeout {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.read_timeout {
            config.read_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    fn level_filter(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

fn init_logging(level: LevelFilter) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_summary(report: &PipelineReport) {
    eprintln!(
        "{} of {} artifacts succeeded ({} bytes downloaded)",
        report.succeeded, report.total_tasks, report.bytes_downloaded
    );
    for failure in &report.failed {
        eprintln!(
            "FAILED [{}] {}: {}",
            failure.stage, failure.task.url, failure.error
        );
    }
}

async fn run(cli: Cli) -> fedora_artifacts::Result<PipelineReport> {
    let spec = ReleaseSpec::new(cli.release.clone(), cli.mini, cli.branched)?;
    let ctx = PipelineContext::new(cli.to_config()?)?;
    fedora_artifacts::cancel_on_signal(ctx.cancel_token());

    let mut events = ctx.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let Event::Progress { url, bytes, total } = event {
                match total {
                    Some(total) if total > 0 => {
                        tracing::debug!(url = %url, bytes, total, "{}%", bytes * 100 / total)
                    }
                    _ => tracing::debug!(url = %url, bytes, "progress"),
                }
            }
        }
    });

    ctx.acquire(&spec).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.level_filter());
    let json = cli.json;

    match run(cli).await {
        Ok(report) => {
            print_summary(&report);
            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(out) => println!("{out}"),
                    Err(e) => tracing::error!(error = %e, "failed to serialize report"),
                }
            }
            if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e @ Error::Config { .. }) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}
