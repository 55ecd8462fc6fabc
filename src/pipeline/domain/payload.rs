//! Stage-specific result payloads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Notes produced by the research stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchFindings {
    /// Free-form notes for later stages.
    pub notes: String,
}

/// Repository layout gathered by the context stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryContext {
    /// Relative paths of the files considered, in walk order.
    pub files: Vec<String>,
    /// Relative paths of dependency manifests found among them.
    pub manifests: Vec<String>,
    /// Whether `files` was cut short.
    pub truncated: bool,
}

/// One file written by the coding stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path relative to the working tree root.
    pub path: String,
    /// Full new file content.
    pub content: String,
    /// Short description of the change.
    #[serde(default)]
    pub description: String,
}

/// Changes produced by one coding attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChanges {
    /// Files written, in the order they were applied.
    pub changes: Vec<FileChange>,
}

impl CodeChanges {
    /// Returns the changed paths.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|change| change.path.as_str())
    }
}

/// Outcome of running the repository's test suite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    /// Detected framework name.
    pub framework: Option<String>,
    /// Command that was run.
    pub command: Option<String>,
    /// Number of test invocations.
    pub tests_run: u32,
    /// Invocations that passed.
    pub tests_passed: u32,
    /// Invocations that failed.
    pub tests_failed: u32,
    /// Exit code of the test command, absent when it never finished.
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr.
    pub output: String,
    /// Whether the test command exceeded its deadline.
    pub timed_out: bool,
}

impl TestReport {
    /// Returns `true` when nothing failed and the command finished.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.tests_failed == 0 && !self.timed_out
    }
}

/// Severity of a security finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational.
    Low,
    /// Worth a look.
    Medium,
    /// Likely exploitable.
    High,
    /// Leaked credential.
    Critical,
}

impl Severity {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One credential-shaped match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityFinding {
    /// Path relative to the scanned root.
    pub file: String,
    /// What was matched.
    pub description: String,
    /// How bad it is.
    pub severity: Severity,
}

/// Verdict of the security gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityReport {
    /// Every finding; empty means the gate passed.
    pub findings: Vec<SecurityFinding>,
}

impl SecurityReport {
    /// Returns `true` when there are no findings.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Reference to the submitted change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// Branch the change was pushed to.
    pub branch: String,
    /// Location of the change request.
    pub reference: String,
    /// Number of files submitted.
    pub files_submitted: usize,
}
