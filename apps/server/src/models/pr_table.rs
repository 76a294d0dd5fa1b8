//! Per-PR build table models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::BuildRecord;

/// Builds of one job, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobHistory {
    pub job: String,
    pub builds: Vec<BuildRecord>,
}

impl JobHistory {
    pub fn new(job: impl Into<String>, builds: Vec<BuildRecord>) -> Self {
        Self {
            job: job.into(),
            builds,
        }
    }
}

/// One job's row. Cells past the end of its history are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PrRow {
    pub job: String,
    pub cells: Vec<Option<BuildRecord>>,
}

/// Builds of every job for one pull request, aligned by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PrTable {
    pub max_builds: usize,
    pub headings: Vec<String>,
    pub rows: Vec<PrRow>,
}

/// PR number and `org/repo` recovered from a PR storage path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PrInfo {
    pub number: String,
    pub repo: String,
}

/// A PR's build table with the storage path it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PrView {
    pub pr: PrInfo,
    pub path: String,
    pub table: PrTable,
}
