//! Pattern Matching
//!
//! Glob matching of changed file paths and resolution of the labels they imply

use std::borrow::Cow;

use globset::{GlobBuilder, GlobMatcher};
use indexmap::{IndexMap, IndexSet};

use crate::error::{Error, Result};

/// Ordered set of label names
pub type LabelSet = IndexSet<String>;

/// Compiled Glob Pattern
///
/// A glob matched against the full repository-relative path of a file.
/// `*` and `?` stop at `/`, `**` crosses any number of directories.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    matcher: GlobMatcher,
}

impl GlobPattern {
    /// Compile a glob pattern
    ///
    /// # Arguments
    /// - `pattern`: Glob expression (`*`, `**`, `?`, `[...]`, `{a,b}`)
    ///
    /// # Errors
    /// Returns the underlying `globset` error if the pattern is malformed
    pub fn new(pattern: &str) -> std::result::Result<Self, globset::Error> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .backslash_escape(true)
            .build()?;

        Ok(Self {
            source: pattern.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    /// Original pattern text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether an already normalized path matches this pattern
    fn is_match(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }
}

impl PartialEq for GlobPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Normalize a changed file path for matching
///
/// Converts `\` separators to `/` and strips a leading `./`.
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    let path: Cow<'_, str> = if path.contains('\\') {
        Cow::Owned(path.replace('\\', "/"))
    } else {
        Cow::Borrowed(path)
    };

    match path.strip_prefix("./") {
        Some(stripped) => Cow::Owned(stripped.to_string()),
        None => path,
    }
}

/// Check whether a single path matches a single pattern
///
/// Matching is anchored on the whole path: `*.pdf` matches `foo.pdf` but not
/// `docs/foo.pdf`, which needs `**/*.pdf`.
///
/// # Arguments
/// - `path`: Repository-relative file path
/// - `pattern`: Compiled glob pattern
pub fn matches(path: &str, pattern: &GlobPattern) -> bool {
    pattern.is_match(&normalize_path(path))
}

/// Label to Pattern Mapping
///
/// Labels keep the order they were declared in, which drives output ordering.
/// Every label holds at least one pattern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternMapping {
    labels: IndexMap<String, Vec<GlobPattern>>,
}

impl PatternMapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a label and compile its patterns
    ///
    /// # Arguments
    /// - `label`: Label name
    /// - `patterns`: Glob patterns, any of which selects the label
    ///
    /// # Errors
    /// - If the label name is empty or already present
    /// - If no patterns are given
    /// - If any pattern fails to compile
    pub fn insert<S: AsRef<str>>(&mut self, label: &str, patterns: &[S]) -> Result<()> {
        if label.trim().is_empty() {
            return Err(Error::config_validation("Label name cannot be empty"));
        }

        if self.labels.contains_key(label) {
            return Err(Error::config_validation(format!(
                "Label '{label}' is defined more than once"
            )));
        }

        if patterns.is_empty() {
            return Err(Error::config_validation(format!(
                "Label '{label}' must have at least one pattern"
            )));
        }

        let compiled = patterns
            .iter()
            .map(|pattern| {
                GlobPattern::new(pattern.as_ref()).map_err(|source| Error::InvalidPattern {
                    label: label.to_string(),
                    pattern: pattern.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.labels.insert(label.to_string(), compiled);
        Ok(())
    }

    /// Patterns configured for a label
    pub fn get(&self, label: &str) -> Option<&[GlobPattern]> {
        self.labels.get(label).map(Vec::as_slice)
    }

    /// Iterate labels and their patterns in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[GlobPattern])> {
        self.labels
            .iter()
            .map(|(label, patterns)| (label.as_str(), patterns.as_slice()))
    }

    /// Every configured label name, in declaration order
    pub fn label_names(&self) -> LabelSet {
        self.labels.keys().cloned().collect()
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no labels are configured
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Compute the labels implied by a set of changed files
///
/// A label is selected when any changed file matches any of its patterns.
/// The result follows the mapping's declaration order.
///
/// # Arguments
/// - `mapping`: Label to pattern mapping
/// - `changed_files`: Repository-relative paths changed by the pull request
///
/// # Returns
/// Desired label set
pub fn resolve_labels<S: AsRef<str>>(mapping: &PatternMapping, changed_files: &[S]) -> LabelSet {
    let paths: Vec<Cow<'_, str>> = changed_files
        .iter()
        .map(|file| normalize_path(file.as_ref()))
        .collect();

    mapping
        .iter()
        .filter(|(_, patterns)| {
            paths
                .iter()
                .any(|path| patterns.iter().any(|pattern| pattern.is_match(path)))
        })
        .map(|(label, _)| label.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glob(pattern: &str) -> GlobPattern {
        GlobPattern::new(pattern).unwrap()
    }

    fn mapping(entries: &[(&str, &[&str])]) -> PatternMapping {
        let mut mapping = PatternMapping::new();
        for (label, patterns) in entries {
            mapping.insert(label, *patterns).unwrap();
        }
        mapping
    }

    #[test]
    fn test_star_is_anchored_to_root() {
        assert!(matches("foo.pdf", &glob("*.pdf")));
        assert!(!matches("docs/foo.pdf", &glob("*.pdf")));
        assert!(!matches("foo.pdf.txt", &glob("*.pdf")));
    }

    #[test]
    fn test_double_star_crosses_directories() {
        let pattern = glob("**/*.pdf");
        assert!(matches("foo.pdf", &pattern));
        assert!(matches("docs/foo.pdf", &pattern));
        assert!(matches("a/b/c/foo.pdf", &pattern));

        let pattern = glob("src/**/*.rs");
        assert!(matches("src/main.rs", &pattern));
        assert!(matches("src/a/b/lib.rs", &pattern));
        assert!(!matches("tests/main.rs", &pattern));

        let pattern = glob("docs/**");
        assert!(matches("docs/guide/intro.md", &pattern));
        assert!(!matches("src/docs.rs", &pattern));
    }

    #[test]
    fn test_question_mark_and_classes() {
        assert!(matches("a1.txt", &glob("a?.txt")));
        assert!(!matches("a/.txt", &glob("a?.txt")));
        assert!(matches("v2.md", &glob("v[0-9].md")));
        assert!(!matches("vx.md", &glob("v[0-9].md")));
    }

    #[test]
    fn test_brace_alternation() {
        let pattern = glob("**/*.{yml,yaml}");
        assert!(matches(".github/workflows/ci.yml", &pattern));
        assert!(matches("config.yaml", &pattern));
        assert!(!matches("config.json", &pattern));
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!matches("FOO.PDF", &glob("*.pdf")));
    }

    #[test]
    fn test_dotfiles_match_wildcards() {
        assert!(matches(".env", &glob("*")));
        assert!(matches(".github/CODEOWNERS", &glob(".github/*")));
    }

    #[test]
    fn test_path_normalization() {
        assert_eq!(normalize_path("docs\\a.md"), "docs/a.md");
        assert_eq!(normalize_path("./foo.pdf"), "foo.pdf");
        assert_eq!(normalize_path("foo.pdf"), "foo.pdf");
        assert!(matches("docs\\a.md", &glob("docs/*.md")));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut mapping = PatternMapping::new();
        let result = mapping.insert("broken", &["src/[a-"]);
        assert!(matches!(result, Err(Error::InvalidPattern { .. })));
    }

    #[test]
    fn test_insert_validation() {
        let mut mapping = PatternMapping::new();
        let empty: &[&str] = &[];
        assert!(mapping.insert("docs", empty).is_err());
        assert!(mapping.insert("  ", &["*.md"]).is_err());

        mapping.insert("docs", &["*.md"]).unwrap();
        assert!(mapping.insert("docs", &["**/*.md"]).is_err());
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("docs").unwrap()[0].as_str(), "*.md");
    }

    #[test]
    fn test_resolve_labels_any_pattern_any_file() {
        let mapping = mapping(&[
            ("touched-a-pdf-file", &["*.pdf"]),
            ("docs", &["docs/**", "*.md"]),
            ("rust", &["**/*.rs"]),
        ]);

        let labels = resolve_labels(&mapping, &["foo.pdf"]);
        assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["touched-a-pdf-file"]);

        let labels = resolve_labels(&mapping, &["src/lib.rs", "README.md", "foo.pdf"]);
        assert_eq!(
            labels.iter().collect::<Vec<_>>(),
            vec!["touched-a-pdf-file", "docs", "rust"]
        );

        let labels = resolve_labels(&mapping, &["foo.txt"]);
        assert!(labels.is_empty());
    }

    #[test]
    fn test_resolve_labels_empty_files() {
        let mapping = mapping(&[("anything", &["**"])]);
        let files: Vec<String> = Vec::new();
        assert!(resolve_labels(&mapping, &files).is_empty());
    }

    #[test]
    fn test_resolve_labels_order_insensitive() {
        let mapping = mapping(&[("a", &["a/**"]), ("b", &["b/**"])]);

        let forward = resolve_labels(&mapping, &["a/1", "b/2", "a/1"]);
        let reverse = resolve_labels(&mapping, &["b/2", "a/1"]);
        assert_eq!(forward, reverse);
        assert_eq!(forward.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
