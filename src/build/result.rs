//! Build result types.
//!
//! Contains types for representing the outcome of transforms and whole builds.

use crate::build::AssetKind;
use std::path::PathBuf;
use std::time::Duration;

/// Status of a single transform run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// Transform wrote its outputs
    Success,
    /// Nothing to do (no sources, or every output already fresh)
    Skipped,
    /// Transform failed with error
    Failed(String),
}

impl BuildStatus {
    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success | BuildStatus::Skipped)
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, BuildStatus::Failed(_))
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildStatus::Success => write!(f, "success"),
            BuildStatus::Skipped => write!(f, "skipped"),
            BuildStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of running one asset transform.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub kind: AssetKind,
    pub status: BuildStatus,
    /// Files written under the destination root
    pub outputs: Vec<PathBuf>,
    /// Sources left alone because their output was fresh
    pub unchanged: usize,
    pub duration: Duration,
    /// Per-file problems that did not fail the transform
    pub warnings: Vec<String>,
    /// The failure must stop the run
    pub fatal: bool,
}

impl TransformResult {
    /// Create a result from what a transform wrote.
    ///
    /// No outputs means the run is reported as skipped.
    pub fn completed(kind: AssetKind, outputs: Vec<PathBuf>, duration: Duration) -> Self {
        let status = if outputs.is_empty() { BuildStatus::Skipped } else { BuildStatus::Success };
        Self { kind, status, outputs, unchanged: 0, duration, warnings: vec![], fatal: false }
    }

    /// Create a failed result.
    pub fn failed(kind: AssetKind, error: String, duration: Duration) -> Self {
        Self {
            kind,
            status: BuildStatus::Failed(error),
            outputs: vec![],
            unchanged: 0,
            duration,
            warnings: vec![],
            fatal: false,
        }
    }

    /// Mark a failure as one that must stop the run.
    pub fn as_fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    /// Add warnings to the result.
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Record how many sources were skipped as fresh.
    pub fn with_unchanged(mut self, unchanged: usize) -> Self {
        self.unchanged = unchanged;
        self
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// One-line log form.
    pub fn describe(&self) -> String {
        match &self.status {
            BuildStatus::Failed(err) => format!("{} failed: {}", self.kind, err),
            _ if self.unchanged > 0 => format!(
                "{}: {} written, {} unchanged in {:?}",
                self.kind,
                self.outputs.len(),
                self.unchanged,
                self.duration
            ),
            _ => format!("{}: {} written in {:?}", self.kind, self.outputs.len(), self.duration),
        }
    }
}

/// Result of a complete build phase.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Results for each transform, in the order they were registered
    pub results: Vec<TransformResult>,
    /// Total build duration
    pub total_duration: Duration,
    /// Error that must stop the run before the observe phase
    pub fatal: Option<String>,
}

impl BuildReport {
    /// Create a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transform result. The first fatal failure becomes the report's.
    pub fn add_result(&mut self, result: TransformResult) {
        if result.fatal && self.fatal.is_none() {
            self.fatal = Some(result.describe());
        }
        self.results.push(result);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Result for one asset kind.
    pub fn get(&self, kind: AssetKind) -> Option<&TransformResult> {
        self.results.iter().find(|r| r.kind == kind)
    }

    /// Get the number of failed transforms.
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Check if every transform succeeded and nothing fatal happened.
    pub fn is_success(&self) -> bool {
        self.fatal.is_none() && self.failed_count() == 0
    }

    /// Get all outputs produced.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.results.iter().flat_map(|r| r.outputs.iter()).collect()
    }

    /// Get all warnings.
    pub fn all_warnings(&self) -> Vec<&String> {
        self.results.iter().flat_map(|r| r.warnings.iter()).collect()
    }

    /// Format a summary of the build.
    pub fn summary(&self) -> String {
        let failed = self.failed_count();
        let total = self.results.len();
        let written = self.all_outputs().len();

        let mut lines = Vec::new();
        if failed > 0 {
            lines.push(format!(
                "Build finished with errors: {} of {} transforms failed, {} files written",
                failed, total, written
            ));
            for result in self.results.iter().filter(|r| r.status.is_failure()) {
                lines.push(format!("  - {}: {}", result.kind, result.status));
            }
        } else {
            lines.push(format!(
                "Build succeeded: {} transforms, {} files written in {:?}",
                total, written, self.total_duration
            ));
        }

        let warnings = self.all_warnings();
        if !warnings.is_empty() {
            lines.push(format!("Warnings ({}):", warnings.len()));
            for warning in warnings.iter().take(5) {
                lines.push(format!("  - {}", warning));
            }
            if warnings.len() > 5 {
                lines.push(format!("  ... and {} more", warnings.len() - 5));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_status_display() {
        assert_eq!(BuildStatus::Success.to_string(), "success");
        assert_eq!(BuildStatus::Skipped.to_string(), "skipped");
        assert_eq!(BuildStatus::Failed("error".to_string()).to_string(), "failed: error");
    }

    #[test]
    fn test_completed_without_outputs_is_skipped() {
        let result = TransformResult::completed(AssetKind::Font, vec![], Duration::ZERO);
        assert_eq!(result.status, BuildStatus::Skipped);
        assert!(result.is_success());

        let result =
            TransformResult::completed(AssetKind::Font, vec![PathBuf::from("a.woff")], Duration::ZERO);
        assert_eq!(result.status, BuildStatus::Success);
    }

    #[test]
    fn test_failed_result() {
        let result =
            TransformResult::failed(AssetKind::Style, "bad sass".to_string(), Duration::ZERO);
        assert!(!result.is_success());
        assert_eq!(result.describe(), "style failed: bad sass");
    }

    #[test]
    fn test_report_counts() {
        let mut report = BuildReport::new();
        report.add_result(TransformResult::completed(
            AssetKind::Html,
            vec![PathBuf::from("index.html")],
            Duration::ZERO,
        ));
        report.add_result(TransformResult::failed(
            AssetKind::Script,
            "error".to_string(),
            Duration::ZERO,
        ));

        assert_eq!(report.failed_count(), 1);
        assert!(!report.is_success());
        assert_eq!(report.all_outputs().len(), 1);
        assert!(report.get(AssetKind::Script).is_some());
        assert!(report.get(AssetKind::Image).is_none());
    }

    #[test]
    fn test_fatal_report_is_not_success() {
        let mut report = BuildReport::new();
        report.add_result(
            TransformResult::failed(AssetKind::Html, "cycle".to_string(), Duration::ZERO).as_fatal(),
        );
        assert_eq!(report.fatal.as_deref(), Some("html failed: cycle"));
        assert!(!report.is_success());
    }

    #[test]
    fn test_summary() {
        let mut report = BuildReport::new();
        report.add_result(
            TransformResult::completed(AssetKind::Image, vec![PathBuf::from("a.png")], Duration::ZERO)
                .with_warnings(vec!["bad.gif: decode failed".to_string()]),
        );
        let summary = report.with_duration(Duration::from_millis(10)).summary();
        assert!(summary.contains("Build succeeded"));
        assert!(summary.contains("1 files written"));
        assert!(summary.contains("bad.gif"));
    }
}
