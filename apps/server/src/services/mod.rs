//! Build result aggregation services.

pub mod build_details;
pub mod build_list;
pub mod build_numbers;
pub mod cache;
pub mod junit;
pub mod live_log;
pub mod log_digest;
pub mod pr_builds;
pub mod results;
pub mod storage;

pub use cache::ResultCache;
pub use live_log::LiveLogClient;
pub use results::BuildResults;
pub use storage::{ArtifactStore, LocalStore, MemoryStore, S3Store, TimeoutStore};
