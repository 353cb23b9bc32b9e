// crates/orchestrator-regression/src/cooccurrence.rs
// ============================================================================
// Module: Co-occurrence Graph Builder
// Description: File<->commit bidirectional index built from `git log` output.
// Purpose: Give the regression selector a history of which test files moved
//          alongside which source files, incrementally updatable by watermark.
// Dependencies: globset, serde, serde_json, time, tokio::process
// ============================================================================

//! ## Overview
//! Classification is test-patterns-first, then source-extensions, so a file
//! like `auth_test.py` is a test even though `.py` is also a source
//! extension. Commits touching no source files carry no regression signal
//! and are dropped entirely rather than indexed. `built_at` is refreshed on
//! every build, including incremental ones -- matching the upstream
//! behaviour this was distilled from, rather than preserving the original
//! build's timestamp.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::process::Command;
use tracing::warn;

use crate::error::RegressionError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default source file extensions (dot-prefixed).
pub const DEFAULT_SOURCE_EXTENSIONS: &[&str] =
    &[".py", ".java", ".cc", ".go", ".rs", ".ts", ".js", ".bzl"];

/// Default test-file glob patterns, matched against the file's basename.
pub const DEFAULT_TEST_PATTERNS: &[&str] = &["*_test.*", "test_*.*", "*_spec.*"];

/// Timeout for the `git log` subprocess.
const GIT_LOG_TIMEOUT_SECS: u64 = 120;

// ============================================================================
// SECTION: Classification
// ============================================================================

/// How a single file path was classified for graph ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    /// Matches a source extension and no test pattern.
    Source,
    /// Matches a test pattern (checked before source extensions).
    Test,
    /// Matches neither; carries no regression signal.
    Ignored,
}

/// File classification rules: test patterns (checked first) and source
/// extensions.
#[derive(Debug, Clone)]
pub struct ClassificationConfig {
    /// Extensions (dot-prefixed) classified as source when no test pattern
    /// matches.
    pub source_extensions: Vec<String>,
    /// Basename glob patterns classified as test, checked before extensions.
    pub test_patterns: Vec<String>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            source_extensions: DEFAULT_SOURCE_EXTENSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            test_patterns: DEFAULT_TEST_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl ClassificationConfig {
    fn test_globset(&self) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.test_patterns {
            if let Ok(glob) = Glob::new(pattern) {
                builder.add(glob);
            }
        }
        builder.build().unwrap_or_else(|_| GlobSet::empty())
    }
}

/// Classifies a single file path as source, test, or ignored. Test patterns
/// are matched against the file's basename and take precedence over source
/// extensions.
#[must_use]
pub fn classify_file(filepath: &str, config: &ClassificationConfig) -> FileClass {
    let basename = Path::new(filepath)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filepath);

    if config.test_globset().is_match(basename) {
        return FileClass::Test;
    }

    if config
        .source_extensions
        .iter()
        .any(|ext| filepath.ends_with(ext.as_str()))
    {
        return FileClass::Source;
    }

    FileClass::Ignored
}

// ============================================================================
// SECTION: Git log parsing
// ============================================================================

/// A single parsed `git log` commit block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommit {
    /// Full commit hash.
    pub hash: String,
    /// `%aI` author-date ISO-8601 timestamp, as emitted by git (not
    /// reparsed here).
    pub timestamp: String,
    /// File paths touched by the commit, in `git log --name-only` order.
    pub files: Vec<String>,
}

/// Parses `git log --format="COMMIT %H %aI" --name-only` output into
/// structured commit blocks. Malformed header lines (fewer than three
/// whitespace-separated fields) are dropped along with any files already
/// accumulated under them.
#[must_use]
pub fn parse_git_log(output: &str) -> Vec<ParsedCommit> {
    let mut commits = Vec::new();
    let mut current: Option<ParsedCommit> = None;

    for raw_line in output.lines() {
        let line = raw_line.trim();

        if let Some(rest) = line.strip_prefix("COMMIT ") {
            if let Some(commit) = current.take() {
                commits.push(commit);
            }
            let mut parts = rest.splitn(2, ' ');
            let hash = parts.next();
            let timestamp = parts.next();
            current = match (hash, timestamp) {
                (Some(hash), Some(timestamp)) if !hash.is_empty() => Some(ParsedCommit {
                    hash: hash.to_string(),
                    timestamp: timestamp.to_string(),
                    files: Vec::new(),
                }),
                _ => None,
            };
        } else if !line.is_empty() {
            if let Some(commit) = current.as_mut() {
                commit.files.push(line.to_string());
            }
        }
    }

    if let Some(commit) = current.take() {
        commits.push(commit);
    }

    commits
}

// ============================================================================
// SECTION: Graph
// ============================================================================

/// A single `(commit, timestamp)` entry in a file's commit history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCommitEntry {
    /// Commit hash.
    pub commit: String,
    /// `%aI` timestamp of the commit.
    pub timestamp: String,
}

/// A single commit's classified file lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// `%aI` timestamp of the commit.
    pub timestamp: String,
    /// Source-classified files touched by the commit.
    pub source_files: Vec<String>,
    /// Test-classified files touched by the commit.
    pub test_files: Vec<String>,
}

/// Metadata describing how and when a graph was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// RFC 3339 timestamp of the most recent build (incremental or full).
    pub built_at: String,
    /// Watermark commit hash for the next incremental update, if any
    /// commit has ever been indexed.
    pub last_commit: Option<String>,
    /// Running total of commits folded into the graph across every build.
    pub total_commits_analyzed: u64,
    /// Source extensions used for classification.
    pub source_extensions: Vec<String>,
    /// Test glob patterns used for classification.
    pub test_patterns: Vec<String>,
}

/// The bidirectional file<->commit co-occurrence graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoOccurrenceGraph {
    /// Build metadata.
    pub metadata: GraphMetadata,
    /// File path to ordered list of commits that touched it.
    pub file_commits: BTreeMap<String, Vec<FileCommitEntry>>,
    /// Commit hash to its classified file lists.
    pub commit_files: BTreeMap<String, CommitRecord>,
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::new())
}

/// Builds (or incrementally updates) a co-occurrence graph from parsed
/// commit blocks. Commits already present in `existing`'s `commit_files`
/// are skipped; commits with zero source-classified files are dropped
/// entirely (they carry no regression signal). `last_commit` becomes the
/// first newly-processed commit in `commits`' order, falling back to the
/// existing watermark if nothing new was indexed.
#[must_use]
pub fn build_graph(
    commits: &[ParsedCommit],
    config: &ClassificationConfig,
    existing: Option<CoOccurrenceGraph>,
) -> CoOccurrenceGraph {
    let (mut file_commits, mut commit_files, total_analyzed, previous_last_commit) =
        match existing {
            Some(graph) => (
                graph.file_commits,
                graph.commit_files,
                graph.metadata.total_commits_analyzed,
                graph.metadata.last_commit,
            ),
            None => (BTreeMap::new(), BTreeMap::new(), 0, None),
        };

    let mut last_commit_hash: Option<String> = None;
    let mut new_commits_count: u64 = 0;

    for commit in commits {
        if commit_files.contains_key(&commit.hash) {
            continue;
        }

        let mut source_files = Vec::new();
        let mut test_files = Vec::new();
        for filepath in &commit.files {
            match classify_file(filepath, config) {
                FileClass::Source => source_files.push(filepath.clone()),
                FileClass::Test => test_files.push(filepath.clone()),
                FileClass::Ignored => {}
            }
        }

        if source_files.is_empty() {
            continue;
        }

        for filepath in source_files.iter().chain(test_files.iter()) {
            file_commits
                .entry(filepath.clone())
                .or_default()
                .push(FileCommitEntry {
                    commit: commit.hash.clone(),
                    timestamp: commit.timestamp.clone(),
                });
        }

        commit_files.insert(
            commit.hash.clone(),
            CommitRecord {
                timestamp: commit.timestamp.clone(),
                source_files,
                test_files,
            },
        );

        new_commits_count += 1;
        if last_commit_hash.is_none() {
            last_commit_hash = Some(commit.hash.clone());
        }
    }

    let last_commit = last_commit_hash.or(previous_last_commit);

    CoOccurrenceGraph {
        metadata: GraphMetadata {
            built_at: now_rfc3339(),
            last_commit,
            total_commits_analyzed: total_analyzed + new_commits_count,
            source_extensions: config.source_extensions.clone(),
            test_patterns: config.test_patterns.clone(),
        },
        file_commits,
        commit_files,
    }
}

/// Runs `git log --format="COMMIT %H %aI" --name-only -n<max_history>
/// [<since_commit>..HEAD]` in `repo_root`, bounded by a 120-second timeout.
///
/// # Errors
///
/// Returns [`RegressionError::GitLog`] if the process exits non-zero, and
/// [`RegressionError::Io`] if it cannot be spawned or its output read.
pub async fn run_git_log(
    repo_root: &Path,
    max_history: u32,
    since_commit: Option<&str>,
) -> Result<String, RegressionError> {
    let mut command = Command::new("git");
    command
        .arg("-C")
        .arg(repo_root)
        .arg("log")
        .arg("--format=COMMIT %H %aI")
        .arg("--name-only")
        .arg(format!("-n{max_history}"));
    if let Some(since) = since_commit {
        command.arg(format!("{since}..HEAD"));
    }

    let output = tokio::time::timeout(
        Duration::from_secs(GIT_LOG_TIMEOUT_SECS),
        command.output(),
    )
    .await
    .map_err(|_elapsed| RegressionError::Io {
        path: repo_root.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::TimedOut, "git log timed out"),
    })?
    .map_err(|source| RegressionError::Io {
        path: repo_root.display().to_string(),
        source,
    })?;

    if !output.status.success() {
        return Err(RegressionError::GitLog {
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Saves a graph as pretty-printed JSON, creating parent directories as
/// needed.
///
/// # Errors
///
/// Returns [`RegressionError::Io`] on any filesystem failure.
pub fn save_graph(graph: &CoOccurrenceGraph, output_path: &Path) -> Result<(), RegressionError> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| RegressionError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let body = serde_json::to_string_pretty(graph).unwrap_or_default();
    std::fs::write(output_path, body + "\n").map_err(|source| RegressionError::Io {
        path: output_path.display().to_string(),
        source,
    })
}

/// Loads a graph from JSON. Returns `None` on any failure -- missing file,
/// unreadable file, or malformed JSON -- matching the status-file
/// corruption policy rather than propagating an error.
#[must_use]
pub fn load_graph(input_path: &Path) -> Option<CoOccurrenceGraph> {
    let raw = std::fs::read_to_string(input_path).ok()?;
    serde_json::from_str(&raw).ok().or_else(|| {
        warn!(path = %input_path.display(), "co-occurrence graph file is corrupt, ignoring");
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_takes_precedence_over_source_extension() {
        let config = ClassificationConfig::default();
        assert_eq!(classify_file("auth_test.py", &config), FileClass::Test);
        assert_eq!(classify_file("auth.py", &config), FileClass::Source);
        assert_eq!(classify_file("README.md", &config), FileClass::Ignored);
    }

    #[test]
    fn parses_single_commit_block() {
        let log = "COMMIT abc123 2024-01-01T00:00:00+00:00\n\nsrc/a.py\ntests/a_test.py\n\n";
        let commits = parse_git_log(log);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].hash, "abc123");
        assert_eq!(commits[0].files, vec!["src/a.py", "tests/a_test.py"]);
    }

    #[test]
    fn parses_multiple_commit_blocks() {
        let log = "COMMIT a 2024-01-01T00:00:00+00:00\n\nsrc/a.py\n\nCOMMIT b 2024-01-02T00:00:00+00:00\n\nsrc/b.py\n\n";
        let commits = parse_git_log(log);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[1].hash, "b");
    }

    #[test]
    fn commits_with_no_source_files_are_dropped() {
        let config = ClassificationConfig::default();
        let commits = vec![ParsedCommit {
            hash: "a".to_string(),
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            files: vec!["README.md".to_string()],
        }];
        let graph = build_graph(&commits, &config, None);
        assert!(graph.commit_files.is_empty());
        assert_eq!(graph.metadata.total_commits_analyzed, 0);
    }

    #[test]
    fn incremental_build_skips_already_processed_commits() {
        let config = ClassificationConfig::default();
        let first = vec![ParsedCommit {
            hash: "a".to_string(),
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            files: vec!["src/a.py".to_string()],
        }];
        let graph1 = build_graph(&first, &config, None);
        assert_eq!(graph1.metadata.last_commit, Some("a".to_string()));
        assert_eq!(graph1.metadata.total_commits_analyzed, 1);

        let second = vec![
            ParsedCommit {
                hash: "a".to_string(),
                timestamp: "2024-01-01T00:00:00+00:00".to_string(),
                files: vec!["src/a.py".to_string()],
            },
            ParsedCommit {
                hash: "b".to_string(),
                timestamp: "2024-01-02T00:00:00+00:00".to_string(),
                files: vec!["src/b.py".to_string()],
            },
        ];
        let graph2 = build_graph(&second, &config, Some(graph1));
        assert_eq!(graph2.metadata.total_commits_analyzed, 2);
        assert_eq!(graph2.metadata.last_commit, Some("b".to_string()));
        assert_eq!(graph2.commit_files.len(), 2);
    }

    #[test]
    fn file_commits_index_both_source_and_test_files() {
        let config = ClassificationConfig::default();
        let commits = vec![ParsedCommit {
            hash: "a".to_string(),
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            files: vec!["src/a.py".to_string(), "tests/a_test.py".to_string()],
        }];
        let graph = build_graph(&commits, &config, None);
        assert!(graph.file_commits.contains_key("src/a.py"));
        assert!(graph.file_commits.contains_key("tests/a_test.py"));
    }

    #[test]
    fn load_graph_returns_none_on_missing_file() {
        let path = std::path::Path::new("/nonexistent/graph.json");
        assert!(load_graph(path).is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("graph.json");
        let config = ClassificationConfig::default();
        let graph = build_graph(
            &[ParsedCommit {
                hash: "a".to_string(),
                timestamp: "2024-01-01T00:00:00+00:00".to_string(),
                files: vec!["src/a.py".to_string()],
            }],
            &config,
            None,
        );
        save_graph(&graph, &path).expect("save succeeds");
        let loaded = load_graph(&path).expect("load succeeds");
        assert_eq!(loaded, graph);
    }
}
