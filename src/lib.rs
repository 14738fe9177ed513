//! # pr-labeler
//!
//! Label GitHub pull requests from the paths they change
//!
//! ## Features
//! - Glob patterns per label (`*`, `**`, `?`, classes, braces)
//! - Minimal add/remove label changes
//! - Sync mode to drop labels whose patterns no longer match
//! - Dry-run mode

pub mod config;
pub mod error;
pub mod github;
pub mod matcher;
pub mod output;
pub mod sync;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use github::{ConfigSource, GitHubClient, LabelSink, PullRequestRef, PullRequestSource};
pub use matcher::{matches, resolve_labels, GlobPattern, LabelSet, PatternMapping};
pub use output::ActionOutputs;
pub use sync::{reconcile, reconcile_managed, LabelDiff, LabelSyncer, SyncOptions, SyncResult};

/// Main functionality of pr-labeler
///
/// Labels one pull request through the GitHub API.
///
/// # Examples
///
/// ```rust,no_run
/// use pr_labeler::SyncConfig;
///
/// #[tokio::main]
/// async fn main() -> pr_labeler::Result<()> {
///     let config = SyncConfig {
///         access_token: "your_github_token".to_string(),
///         repository: "owner/repo".to_string(),
///         pull_number: 42,
///         configuration_path: ".github/labeler.yml".to_string(),
///         config_ref: None,
///         local_config: false,
///         api_url: None,
///         sync_labels: false,
///         dry_run: false,
///     };
///
///     let result = pr_labeler::label_pull_request(&config).await?;
///
///     println!("new-labels={}", result.new_labels_output());
///     Ok(())
/// }
/// ```
pub async fn label_pull_request(config: &SyncConfig) -> Result<SyncResult> {
    config.validate()?;

    let (owner, repo) = config.parse_repository()?;
    let client = match config.api_url.as_deref() {
        Some(api_url) => GitHubClient::with_api_url(&config.access_token, &owner, &repo, api_url)?,
        None => GitHubClient::new(&config.access_token, &owner, &repo)?,
    }
    .with_config_ref(config.config_ref.clone());
    let pr = client.pull_request(config.pull_number);

    let options = SyncOptions {
        configuration_path: config.configuration_path.clone(),
        sync_labels: config.sync_labels,
        dry_run: config.dry_run,
    };

    if config.local_config {
        let source = config::FileConfigSource::new(".");
        LabelSyncer::new(&source, &client, &client, options)
            .sync_labels(&pr)
            .await
    } else {
        LabelSyncer::new(&client, &client, &client, options)
            .sync_labels(&pr)
            .await
    }
}
