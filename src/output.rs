//! Action Outputs
//!
//! Reporting of the `new-labels` and `all-labels` outputs

use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::sync::SyncResult;

/// Delimiter used for values that span several lines
const OUTPUT_DELIMITER: &str = "PR_LABELER_EOF";

/// Named outputs, written in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutputs {
    entries: Vec<(String, String)>,
}

impl ActionOutputs {
    /// Create an empty output set
    pub fn new() -> Self {
        Self::default()
    }

    /// Outputs reported after labeling a pull request
    pub fn from_sync_result(result: &SyncResult) -> Self {
        let mut outputs = Self::new();
        outputs.set("new-labels", result.new_labels_output());
        outputs.set("all-labels", result.all_labels_output());
        outputs
    }

    /// Record an output value
    pub fn set<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        self.entries.push((name.into(), value.into()));
    }

    /// Iterate outputs in the order they were set
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Write outputs in the `$GITHUB_OUTPUT` file format
    ///
    /// Single-line values use `name=value`, multi-line values the heredoc form.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        for (name, value) in self.iter() {
            if value.contains('\n') {
                writeln!(writer, "{name}<<{OUTPUT_DELIMITER}")?;
                writeln!(writer, "{value}")?;
                writeln!(writer, "{OUTPUT_DELIMITER}")?;
            } else {
                writeln!(writer, "{name}={value}")?;
            }
        }
        Ok(())
    }

    /// Append outputs to a `$GITHUB_OUTPUT` file
    ///
    /// # Errors
    /// If the file cannot be opened or written
    pub fn append_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)?;
        self.write_to(file)
    }

    /// Report outputs to the runner, or to stdout outside GitHub Actions
    pub fn emit(&self) -> Result<()> {
        match std::env::var_os("GITHUB_OUTPUT") {
            Some(path) if !path.is_empty() => self.append_to_file(path),
            _ => {
                tracing::debug!("GITHUB_OUTPUT not set, writing outputs to stdout");
                self.write_to(std::io::stdout().lock())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::PullRequestRef;
    use crate::sync::LabelDiff;

    fn render(outputs: &ActionOutputs) -> String {
        let mut buffer = Vec::new();
        outputs.write_to(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_outputs_from_sync_result() {
        let result = SyncResult {
            pull_request: PullRequestRef::new("owner", "repo", 1),
            desired: vec!["touched-a-pdf-file".to_string()],
            changed_files: 1,
            diff: LabelDiff {
                labels_to_add: vec!["touched-a-pdf-file".to_string()],
                labels_to_remove: Vec::new(),
                final_labels: vec![
                    "oldskool_label".to_string(),
                    "touched-a-pdf-file".to_string(),
                ],
            },
            dry_run: false,
        };

        let outputs = ActionOutputs::from_sync_result(&result);
        assert_eq!(
            render(&outputs),
            "new-labels=touched-a-pdf-file\nall-labels=oldskool_label,touched-a-pdf-file\n"
        );
    }

    #[test]
    fn test_empty_value_renders_empty() {
        let mut outputs = ActionOutputs::new();
        outputs.set("new-labels", "");
        assert_eq!(render(&outputs), "new-labels=\n");
    }

    #[test]
    fn test_multiline_value_uses_delimiter() {
        let mut outputs = ActionOutputs::new();
        outputs.set("notes", "a\nb");
        assert_eq!(
            render(&outputs),
            "notes<<PR_LABELER_EOF\na\nb\nPR_LABELER_EOF\n"
        );
    }

    #[test]
    fn test_append_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output");
        std::fs::write(&path, "existing=1\n").unwrap();

        let mut outputs = ActionOutputs::new();
        outputs.set("new-labels", "a");
        outputs.set("all-labels", "a,b");
        outputs.append_to_file(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "existing=1\nnew-labels=a\nall-labels=a,b\n");
    }
}
