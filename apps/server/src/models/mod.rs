//! Domain models for build results.

pub mod build;
pub mod pr_table;
pub mod test_outcome;

// Re-export commonly used types
pub use build::{
    BuildDetails, BuildLog, BuildMetadata, BuildRecord, BuildView, PullRef, parse_pull_refs,
};
pub use pr_table::{JobHistory, PrInfo, PrRow, PrTable, PrView};
pub use test_outcome::{FailedTest, SuiteResult, TestOutcome, TestStatus};
