//! pr-labeler CLI
//!
//! Command line tool and GitHub Action entry point for labeling pull requests

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pr_labeler::{
    config::{
        load_pattern_mapping_from_file, load_pull_number_from_event_file, parse_bool_input,
        DEFAULT_CONFIGURATION_PATH,
    },
    label_pull_request,
    matcher::resolve_labels,
    ActionOutputs, Error, Result, SyncConfig, SyncResult,
};

/// pr-labeler CLI
///
/// Label pull requests based on the files they change
#[derive(Parser)]
#[command(
    name = "pr-labeler",
    version,
    about = "Label pull requests based on the files they change",
    long_about = "Matches the files changed by a pull request against glob patterns per label \
    and adds (or, in sync mode, removes) labels with the minimal set of API calls. \
    Reads GitHub Actions inputs from the environment when run inside a workflow."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// GitHub access token
    #[arg(
        short = 't',
        long = "repo-token",
        env = "INPUT_REPO-TOKEN",
        hide_env_values = true,
        global = true
    )]
    repo_token: Option<String>,

    /// Target repository (owner/repo format)
    #[arg(short = 'r', long, env = "GITHUB_REPOSITORY", global = true)]
    repository: Option<String>,

    /// Pull request number (read from the event payload if omitted)
    #[arg(long = "pr", global = true)]
    pull_number: Option<u64>,

    /// Webhook event payload file
    #[arg(long, env = "GITHUB_EVENT_PATH", global = true)]
    event_path: Option<PathBuf>,

    /// Labeler configuration file path
    #[arg(
        short = 'c',
        long,
        env = "INPUT_CONFIGURATION-PATH",
        default_value = DEFAULT_CONFIGURATION_PATH,
        global = true
    )]
    configuration_path: String,

    /// Git ref to read the configuration at
    #[arg(long = "ref", env = "GITHUB_SHA", global = true)]
    config_ref: Option<String>,

    /// Read the configuration from the working tree instead of the API
    #[arg(long, global = true)]
    local_config: bool,

    /// GitHub API root
    #[arg(long, env = "GITHUB_API_URL", global = true)]
    api_url: Option<String>,

    /// Remove labels whose patterns no longer match (`--sync-labels` or `--sync-labels=<BOOL>`)
    #[arg(
        long,
        env = "INPUT_SYNC-LABELS",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        global = true
    )]
    sync_labels: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Label the pull request
    Sync,

    /// Preview label changes without applying them
    Preview,

    /// Print the labels a set of paths would receive
    Match {
        /// Changed file paths (read from stdin if omitted)
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Some(Commands::Match { ref paths }) => run_match(&cli.configuration_path, paths),
        Some(Commands::Preview) => run_sync(&cli, true).await,
        Some(Commands::Sync) | None => run_sync(&cli, false).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red(), e);
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize logging to stderr, keeping stdout for outputs
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "pr_labeler=debug"
    } else {
        "pr_labeler=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

/// Execute labeling
async fn run_sync(cli: &Cli, dry_run: bool) -> Result<()> {
    let access_token = get_access_token(cli.repo_token.clone())?;
    let repository = require_repository(cli.repository.clone())?;
    let sync_labels = resolve_sync_labels(cli.sync_labels.as_deref())?;

    let Some(pull_number) = resolve_pull_number(cli.pull_number, cli.event_path.as_deref())?
    else {
        tracing::warn!("Could not get pull request number from context, exiting");
        return Ok(());
    };

    let config = SyncConfig {
        access_token,
        repository,
        pull_number,
        configuration_path: cli.configuration_path.clone(),
        config_ref: cli.config_ref.clone(),
        local_config: cli.local_config,
        api_url: cli
            .api_url
            .clone()
            .filter(|url| !url.trim().is_empty()),
        sync_labels,
        dry_run,
    };

    if cli.verbose {
        eprintln!(
            "{} Labeling pull request: {}#{}",
            "•".blue(),
            config.repository.cyan(),
            config.pull_number
        );

        if config.dry_run {
            eprintln!(
                "{} Running in dry-run mode (no changes will be made)",
                "!".yellow()
            );
        }
    }

    let result = label_pull_request(&config).await?;
    display_sync_result(&mut std::io::stderr().lock(), &result, cli.verbose)?;

    ActionOutputs::from_sync_result(&result).emit()
}

/// Execute match command
fn run_match(configuration_path: &str, paths: &[String]) -> Result<()> {
    let mapping = load_pattern_mapping_from_file(configuration_path)?;

    let paths = if paths.is_empty() {
        read_paths(std::io::stdin().lock())?
    } else {
        paths.to_vec()
    };

    for label in resolve_labels(&mapping, &paths) {
        println!("{}", label);
    }

    Ok(())
}

/// Display labeling results
///
/// Written to stderr by `run_sync` so stdout only carries the action outputs.
fn display_sync_result<W: Write>(out: &mut W, result: &SyncResult, verbose: bool) -> Result<()> {
    if result.dry_run && result.has_changes() {
        writeln!(out, "\n{} Label preview (dry-run mode):", "📋".to_string().blue())?;
    } else if result.has_changes() {
        writeln!(out, "\n{} Labels updated:", "✓".green())?;
    } else {
        writeln!(out, "\n{} No changes required", "✓".green())?;
    }

    writeln!(
        out,
        "  📁 Changed files: {}",
        result.changed_files.to_string().white()
    )?;
    writeln!(
        out,
        "  ➕ Added: {}",
        result.labels_added().len().to_string().green()
    )?;
    writeln!(
        out,
        "  ➖ Removed: {}",
        result.labels_removed().len().to_string().red()
    )?;

    if verbose {
        writeln!(out, "\n{} Label details:", "📋".blue())?;
        for label in result.labels_added() {
            writeln!(out, "  {} {}", "+".green(), label.cyan())?;
        }
        for label in result.labels_removed() {
            writeln!(out, "  {} {}", "-".red(), label.red())?;
        }
        writeln!(out, "  {} {}", "=".white(), result.all_labels_output().dimmed())?;
    }

    Ok(())
}

/// Require a repository argument
fn require_repository(repo: Option<String>) -> Result<String> {
    repo.ok_or_else(|| Error::MissingInput("repository (use -r or set GITHUB_REPOSITORY)".into()))
}

/// Get access token
fn get_access_token(arg_token: Option<String>) -> Result<String> {
    arg_token
        .filter(|token| !token.trim().is_empty())
        .or_else(|| std::env::var("GITHUB_TOKEN").ok())
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| Error::MissingInput("repo-token".into()))
}

/// Resolve the sync-labels input, defaulting to false when unset or blank
fn resolve_sync_labels(value: Option<&str>) -> Result<bool> {
    match value {
        Some(value) if !value.trim().is_empty() => parse_bool_input("sync-labels", value),
        _ => Ok(false),
    }
}

/// Resolve the pull request number from the flag or the event payload
fn resolve_pull_number(arg: Option<u64>, event_path: Option<&Path>) -> Result<Option<u64>> {
    if arg.is_some() {
        return Ok(arg);
    }

    match event_path {
        Some(path) => load_pull_number_from_event_file(path),
        None => Ok(None),
    }
}

/// Read newline-separated paths, skipping blank lines
fn read_paths<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            paths.push(trimmed.to_string());
        }
    }
    Ok(paths)
}
