//! Test outcome models produced by the JUnit parser.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Classified outcome of a single test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One test case result as seen in a report document.
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    /// Case name, prefixed with the names of enclosing suites
    pub name: String,
    pub status: TestStatus,
    /// Seconds; only meaningful for failures
    pub duration: f64,
    pub failure_text: String,
    /// system-out / system-err bodies joined with newlines
    pub output: String,
    /// Path of the report the case came from
    pub source: String,
}

/// A failed test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FailedTest {
    pub name: String,
    /// Duration in seconds
    pub duration: f64,
    pub text: String,
    pub source: String,
    pub output: String,
}

impl Eq for FailedTest {}

impl Ord for FailedTest {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.duration.total_cmp(&other.duration))
            .then_with(|| self.text.cmp(&other.text))
            .then_with(|| self.source.cmp(&other.source))
            .then_with(|| self.output.cmp(&other.output))
    }
}

impl PartialOrd for FailedTest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Aggregate of all test outcomes for a build.
///
/// All three sequences are kept sorted. Names repeated across merged reports
/// are kept, not deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SuiteResult {
    pub failed: Vec<FailedTest>,
    pub skipped: Vec<String>,
    pub passed: Vec<String>,
}

impl SuiteResult {
    /// Build a sorted result from classified outcomes.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = TestOutcome>) -> Self {
        let mut result = SuiteResult::default();
        for outcome in outcomes {
            result.push(outcome);
        }
        result.sort();
        result
    }

    /// Append an outcome without re-sorting.
    pub(crate) fn push(&mut self, outcome: TestOutcome) {
        match outcome.status {
            TestStatus::Passed => self.passed.push(outcome.name),
            TestStatus::Skipped => self.skipped.push(outcome.name),
            TestStatus::Failed => self.failed.push(FailedTest {
                name: outcome.name,
                duration: outcome.duration,
                text: outcome.failure_text,
                source: outcome.source,
                output: outcome.output,
            }),
        }
    }

    pub(crate) fn sort(&mut self) {
        self.failed.sort();
        self.skipped.sort();
        self.passed.sort();
    }

    /// Concatenate two results and restore ordering.
    pub fn merge(mut self, other: SuiteResult) -> SuiteResult {
        self.failed.extend(other.failed);
        self.skipped.extend(other.skipped);
        self.passed.extend(other.passed);
        self.sort();
        self
    }

    /// Number of outcomes across all three sequences.
    pub fn total(&self) -> usize {
        self.failed.len() + self.skipped.len() + self.passed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
