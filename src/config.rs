//! Configuration Management
//!
//! Labeler configuration decoding, action inputs and event payload handling

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::github::ConfigSource;
use crate::matcher::PatternMapping;

/// Configuration path used when none is supplied
pub const DEFAULT_CONFIGURATION_PATH: &str = ".github/labeler.yml";

/// Sync Configuration
///
/// pr-labeler execution configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// GitHub access token
    pub access_token: String,

    /// Target repository (owner/repo format)
    pub repository: String,

    /// Pull request number
    pub pull_number: u64,

    /// Path of the labeler configuration file
    pub configuration_path: String,

    /// Git ref the configuration is read at (default branch if None)
    pub config_ref: Option<String>,

    /// Read the configuration from the local working tree instead of the API
    pub local_config: bool,

    /// GitHub API root (api.github.com if None)
    pub api_url: Option<String>,

    /// Remove labels whose patterns no longer match
    pub sync_labels: bool,

    /// Dry-run mode (don't make actual changes)
    pub dry_run: bool,
}

impl SyncConfig {
    /// Validate configuration
    ///
    /// # Errors
    /// - If repository format is invalid
    /// - If access token is empty
    /// - If the configuration path or pull request number is empty
    pub fn validate(&self) -> Result<()> {
        if self.access_token.trim().is_empty() {
            return Err(Error::MissingInput("repo-token".to_string()));
        }

        if self.configuration_path.trim().is_empty() {
            return Err(Error::MissingInput("configuration-path".to_string()));
        }

        if self.pull_number == 0 {
            return Err(Error::invalid_input("Pull request number must be positive"));
        }

        parse_repository(&self.repository)?;

        Ok(())
    }

    /// Get repository owner and name
    pub fn parse_repository(&self) -> Result<(String, String)> {
        parse_repository(&self.repository)
    }
}

/// Parse repository string into owner and name
///
/// # Arguments
/// - `repo`: Repository string in "owner/repo" format
///
/// # Errors
/// Returns an error if the format is invalid
pub fn parse_repository(repo: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = repo.split('/').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(Error::InvalidRepositoryFormat(repo.to_string()));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

/// Parse a boolean action input
///
/// Accepts the YAML 1.2 core schema spellings GitHub Actions uses:
/// `true`, `True`, `TRUE`, `false`, `False`, `FALSE`.
///
/// # Arguments
/// - `name`: Input name, used in the error message
/// - `value`: Raw input value
///
/// # Errors
/// Returns an error for any other spelling
pub fn parse_bool_input(name: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "true" | "True" | "TRUE" => Ok(true),
        "false" | "False" | "FALSE" => Ok(false),
        other => Err(Error::invalid_input(format!(
            "Input '{name}' does not meet YAML 1.2 \"Core Schema\" specification: {other} \
             (support value: true | True | TRUE | false | False | FALSE)"
        ))),
    }
}

/// Decode labeler configuration content into a pattern mapping
///
/// Each top-level key is a label; its value is either a single glob pattern
/// or a list of glob patterns.
///
/// # Arguments
/// - `content`: Raw YAML content
///
/// # Errors
/// If the YAML is malformed, has the wrong shape, or holds an invalid pattern
pub fn parse_pattern_mapping(content: &str) -> Result<PatternMapping> {
    if content.trim().is_empty() {
        return Err(Error::config_validation("Configuration file is empty"));
    }

    let raw: Value = serde_yaml::from_str(content)?;
    if !raw.is_mapping() {
        return Err(Error::config_validation(
            "Configuration must be a mapping of label names to glob patterns",
        ));
    }

    let entries: IndexMap<String, Value> = serde_yaml::from_value(raw)?;
    let mut mapping = PatternMapping::new();

    for (label, value) in entries {
        let patterns = patterns_for_label(&label, value)?;
        mapping.insert(&label, &patterns)?;
    }

    Ok(mapping)
}

/// Normalize a label's configured value into a list of patterns
fn patterns_for_label(label: &str, value: Value) -> Result<Vec<String>> {
    let shape_error = || {
        Error::config_validation(format!(
            "Label '{label}': expected a glob pattern or a list of glob patterns"
        ))
    };

    match value {
        Value::String(pattern) => Ok(vec![pattern]),
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(pattern) => Ok(pattern),
                _ => Err(shape_error()),
            })
            .collect(),
        _ => Err(shape_error()),
    }
}

/// Load a pattern mapping from a YAML file
///
/// # Arguments
/// - `path`: Path to the configuration file
///
/// # Errors
/// If file reading or parsing fails
pub fn load_pattern_mapping_from_file<P: AsRef<Path>>(path: P) -> Result<PatternMapping> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Error::ConfigNotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    parse_pattern_mapping(&content)
}

/// Configuration source reading from a local checkout
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    root: PathBuf,
}

impl FileConfigSource {
    /// Create a source rooted at the given directory
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn fetch_config(&self, path: &str) -> Result<String> {
        let full_path = self.root.join(path);
        match tokio::fs::read_to_string(&full_path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::ConfigNotFound(full_path.display().to_string()))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// Subset of a GitHub webhook event payload
#[derive(Debug, Deserialize)]
struct EventPayload {
    pull_request: Option<PullRequestPayload>,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    number: u64,
}

/// Extract the pull request number from an event payload
///
/// # Returns
/// `None` when the event is not about a pull request
///
/// # Errors
/// If the payload is not valid JSON
pub fn pull_number_from_event(content: &str) -> Result<Option<u64>> {
    let payload: EventPayload = serde_json::from_str(content)?;
    Ok(payload.pull_request.map(|pr| pr.number))
}

/// Read the pull request number from the event payload file
///
/// # Arguments
/// - `path`: Path of the event payload (`GITHUB_EVENT_PATH`)
///
/// # Errors
/// If the file cannot be read or parsed
pub fn load_pull_number_from_event_file<P: AsRef<Path>>(path: P) -> Result<Option<u64>> {
    let content = std::fs::read_to_string(path)?;
    pull_number_from_event(&content)
}
