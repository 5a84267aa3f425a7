//! Shipmate CLI - Release orchestration across multiple GitHub repositories

use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod display;
mod error;
mod exit_codes;
mod gate;
mod logging;

use error::CliError;

#[derive(Parser)]
#[command(name = "shipmate")]
#[command(version)]
#[command(about = "Tag, monitor and release a set of repositories together", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Release configuration file
    #[arg(short, long, global = true, env = "SHIPMATE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// GitHub personal access token
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve, tag and publish every configured repository
    Tag {
        /// Monitor the triggered workflows and check container images afterwards
        #[arg(long)]
        verify: bool,
    },

    /// Publish new tags at the commits of each repository's old-tag
    Retag,

    /// Check that every configured container image exists under a tag
    VerifyContainers {
        /// Image tag to look for
        #[arg(long)]
        tag: String,
    },

    /// Follow CI workflow runs until they all finish
    MonitorWorkflows {
        /// Runs triggered by this tag
        #[arg(long, conflicts_with = "time")]
        tag: Option<String>,

        /// Runs created within five minutes of this time (UTC)
        #[arg(long, value_parser = parse_time)]
        time: Option<DateTime<Utc>>,
    },

    /// Update, package and publish the Helm chart for a tag
    Release {
        /// Application tag written into the chart
        #[arg(long)]
        tag: String,

        /// Chart version (SemVer)
        #[arg(long)]
        chart_version: String,

        /// Push the release after confirmation
        #[arg(long)]
        publish: bool,
    },
}

/// Accept `YYYY-MM-DDTHH:MM:SS` as UTC, or RFC 3339 with an offset
fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| format!("expected YYYY-MM-DDTHH:MM:SS or RFC 3339, got '{}'", value))
}

fn run(cli: Cli) -> error::Result<()> {
    let config = cli.config.ok_or_else(|| {
        CliError::validation(
            "No configuration file given",
            Some("Pass --config or set SHIPMATE_CONFIG".to_string()),
        )
    })?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::internal(format!("failed to start runtime: {}", e)))?;

    match cli.command {
        Commands::Tag { verify } => {
            runtime.block_on(commands::tag::run(&config, cli.token, verify))
        }
        Commands::Retag => runtime.block_on(commands::retag::run(&config, cli.token)),
        Commands::VerifyContainers { tag } => {
            runtime.block_on(commands::verify_containers::run(&config, &tag))
        }
        Commands::MonitorWorkflows { tag, time } => runtime.block_on(commands::monitor::run(
            &config,
            cli.token,
            tag.as_deref(),
            time,
        )),
        Commands::Release {
            tag,
            chart_version,
            publish,
        } => commands::release::run(&config, &tag, &chart_version, publish),
    }
}

fn main() {
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = if err.use_stderr() {
                exit_codes::ERROR
            } else {
                exit_codes::SUCCESS
            };
            std::process::exit(code);
        }
    };

    logging::init(cli.debug);

    let code = match run(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}
