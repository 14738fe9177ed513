//! Label Synchronization Functionality
//!
//! Reconciles the labels implied by a pull request's changes with the labels it carries

use crate::config::parse_pattern_mapping;
use crate::error::{Error, Result};
use crate::github::{ConfigSource, LabelSink, PullRequestRef, PullRequestSource};
use crate::matcher::{resolve_labels, LabelSet};

/// Join labels into the comma-separated form used for reported outputs
///
/// An empty list renders as an empty string.
pub fn format_label_list<S: AsRef<str>>(labels: &[S]) -> String {
    labels
        .iter()
        .map(|label| label.as_ref())
        .collect::<Vec<&str>>()
        .join(",")
}

/// Label Difference
///
/// Minimal changes turning the current label set into the desired one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelDiff {
    /// Desired labels not yet on the pull request, in configuration order
    pub labels_to_add: Vec<String>,

    /// Current labels no longer desired (sync mode only), in platform order
    pub labels_to_remove: Vec<String>,

    /// Labels on the pull request once the changes are applied
    pub final_labels: Vec<String>,
}

impl LabelDiff {
    /// Whether any label needs to be added or removed
    pub fn has_changes(&self) -> bool {
        !self.labels_to_add.is_empty() || !self.labels_to_remove.is_empty()
    }
}

/// Compute the label changes for a pull request
///
/// With `sync` on, every current label outside `desired` is removed.
///
/// # Arguments
/// - `desired`: Labels selected by the changed files
/// - `current`: Labels currently on the pull request
/// - `sync`: Whether labels outside `desired` are removed
///
/// # Returns
/// Labels to add and remove, plus the resulting label set
pub fn reconcile(desired: &LabelSet, current: &LabelSet, sync: bool) -> LabelDiff {
    diff_labels(desired, current, None, sync)
}

/// Compute the label changes, only ever removing labels the configuration manages
///
/// Labels added by hand (not named in the configuration) survive sync mode.
///
/// # Arguments
/// - `desired`: Labels selected by the changed files
/// - `current`: Labels currently on the pull request
/// - `managed`: Every label named in the configuration
/// - `sync`: Whether managed labels outside `desired` are removed
pub fn reconcile_managed(
    desired: &LabelSet,
    current: &LabelSet,
    managed: &LabelSet,
    sync: bool,
) -> LabelDiff {
    diff_labels(desired, current, Some(managed), sync)
}

fn diff_labels(
    desired: &LabelSet,
    current: &LabelSet,
    managed: Option<&LabelSet>,
    sync: bool,
) -> LabelDiff {
    let labels_to_add: Vec<String> = desired
        .iter()
        .filter(|label| !current.contains(*label))
        .cloned()
        .collect();

    let labels_to_remove: Vec<String> = if sync {
        current
            .iter()
            .filter(|label| !desired.contains(*label))
            .filter(|label| managed.map_or(true, |managed| managed.contains(*label)))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    let final_labels = current
        .iter()
        .filter(|label| !labels_to_remove.contains(label))
        .chain(labels_to_add.iter())
        .cloned()
        .collect();

    LabelDiff {
        labels_to_add,
        labels_to_remove,
        final_labels,
    }
}

/// Synchronization options
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Path of the labeler configuration file
    pub configuration_path: String,

    /// Remove labels whose patterns no longer match
    pub sync_labels: bool,

    /// Dry-run mode (don't make actual changes)
    pub dry_run: bool,
}

/// Synchronization result
#[derive(Debug, Clone)]
pub struct SyncResult {
    /// Pull request the labels were computed for
    pub pull_request: PullRequestRef,

    /// Labels selected by the changed files
    pub desired: Vec<String>,

    /// Number of changed files inspected
    pub changed_files: usize,

    /// Applied (or planned, in dry-run mode) changes
    pub diff: LabelDiff,

    /// Whether this is a dry run
    pub dry_run: bool,
}

impl SyncResult {
    /// Labels newly added to the pull request
    pub fn labels_added(&self) -> &[String] {
        &self.diff.labels_to_add
    }

    /// Labels removed from the pull request
    pub fn labels_removed(&self) -> &[String] {
        &self.diff.labels_to_remove
    }

    /// Full label set after the run
    pub fn final_labels(&self) -> &[String] {
        &self.diff.final_labels
    }

    /// Whether changes will occur
    pub fn has_changes(&self) -> bool {
        self.diff.has_changes()
    }

    /// Value of the `new-labels` output
    pub fn new_labels_output(&self) -> String {
        format_label_list(self.labels_added())
    }

    /// Value of the `all-labels` output
    pub fn all_labels_output(&self) -> String {
        format_label_list(self.final_labels())
    }
}

/// Label Synchronization Engine
///
/// Labels a pull request according to the files it changes
pub struct LabelSyncer<'a> {
    config_source: &'a dyn ConfigSource,
    pull_requests: &'a dyn PullRequestSource,
    label_sink: &'a dyn LabelSink,
    options: SyncOptions,
}

impl<'a> LabelSyncer<'a> {
    /// Create a new label synchronization engine
    ///
    /// # Arguments
    /// - `config_source`: Where the labeler configuration is read from
    /// - `pull_requests`: Where changed files and current labels are read from
    /// - `label_sink`: Where label changes are sent
    /// - `options`: Synchronization options
    pub fn new(
        config_source: &'a dyn ConfigSource,
        pull_requests: &'a dyn PullRequestSource,
        label_sink: &'a dyn LabelSink,
        options: SyncOptions,
    ) -> Self {
        Self {
            config_source,
            pull_requests,
            label_sink,
            options,
        }
    }

    /// Synchronize labels
    ///
    /// # Returns
    /// Synchronization result
    ///
    /// # Errors
    /// - If the configuration is missing or malformed
    /// - If changed files or current labels cannot be fetched
    /// - If any add or remove call fails; every call is still attempted
    pub async fn sync_labels(&self, pr: &PullRequestRef) -> Result<SyncResult> {
        let content = self
            .config_source
            .fetch_config(&self.options.configuration_path)
            .await?;
        let mapping = parse_pattern_mapping(&content)?;
        tracing::debug!(
            path = %self.options.configuration_path,
            labels = mapping.len(),
            "Loaded labeler configuration"
        );

        let changed_files = self.pull_requests.changed_files(pr).await?;
        tracing::debug!(pr = %pr, files = changed_files.len(), "Fetched changed files");

        let current: LabelSet = self
            .pull_requests
            .current_labels(pr)
            .await?
            .into_iter()
            .collect();

        let desired = resolve_labels(&mapping, &changed_files);
        let diff = reconcile_managed(
            &desired,
            &current,
            &mapping.label_names(),
            self.options.sync_labels,
        );
        tracing::info!(
            pr = %pr,
            add = ?diff.labels_to_add,
            remove = ?diff.labels_to_remove,
            "Computed label changes"
        );

        if !self.options.dry_run {
            self.apply(pr, &diff).await?;
        }

        Ok(SyncResult {
            pull_request: pr.clone(),
            desired: desired.into_iter().collect(),
            changed_files: changed_files.len(),
            diff,
            dry_run: self.options.dry_run,
        })
    }

    /// Issue the add and remove calls for a diff
    ///
    /// Adds go out as one batched call, removals as one call per label.
    async fn apply(&self, pr: &PullRequestRef, diff: &LabelDiff) -> Result<()> {
        let mut errors = Vec::new();

        if !diff.labels_to_add.is_empty() {
            match self.label_sink.add_labels(pr, &diff.labels_to_add).await {
                Ok(()) => tracing::info!(pr = %pr, labels = ?diff.labels_to_add, "Added labels"),
                Err(e) => {
                    tracing::error!(pr = %pr, error = %e, "Failed to add labels");
                    errors.push(e);
                }
            }
        }

        for label in &diff.labels_to_remove {
            match self.label_sink.remove_label(pr, label).await {
                Ok(()) => tracing::info!(pr = %pr, label = %label, "Removed label"),
                Err(e) => {
                    tracing::error!(pr = %pr, label = %label, error = %e, "Failed to remove label");
                    errors.push(e);
                }
            }
        }

        match errors.first() {
            None => Ok(()),
            Some(first) => Err(Error::LabelOperations {
                count: errors.len(),
                first: first.to_string(),
            }),
        }
    }
}
