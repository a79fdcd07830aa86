//! # org_steward core
//!
//! Administrative operations over a GitHub organization and its TeamCity
//! server. Every operation takes an authenticated client, reads or changes
//! the organization, and returns either a summary or a [`Table`] /
//! [`Workbook`] ready to be written as CSV.
//!
//! ## Failure handling
//!
//! Bulk operations work item by item. Each failure is classified by
//! [`Error::disposition`]: retryable failures have already been retried by
//! the client, skippable ones are logged and the run moves on, and aborting
//! ones (bad credentials, unusable input) stop the run.
//!
//! ## Concurrency
//!
//! Read-heavy reports fan out over a bounded number of concurrent requests,
//! [`DEFAULT_WORKERS`] unless the caller says otherwise. Mutating operations
//! run sequentially.

pub mod access;
pub mod apps;
pub mod backup;
pub mod batching;
pub mod errors;
pub mod git;
pub mod inactivity;
pub mod input;
pub mod inventory;
pub mod lockdown;
pub mod members;
pub mod protection;
pub mod relocate;
pub mod report;
pub mod secrets;
pub mod tables;
pub mod teamcity;
pub mod workflows;

#[cfg(test)]
mod test_support;

pub use backup::{run_backup, BackupOptions, BackupSummary, UploadTarget};
pub use batching::{batch_workbook, BatchLimits};
pub use errors::{Error, Result};
pub use input::{load_branch_plan, load_repo_list};
pub use lockdown::{lockdown_repositories, unarchive_repositories, LockdownSummary, UnarchiveSummary};
pub use protection::ProtectionSettings;
pub use relocate::{move_folder, snapshot_at, MoveOutcome, SnapshotOutcome, SnapshotTarget};
pub use report::{Table, Workbook};
pub use secrets::SecretScanner;

/// Concurrent requests used by read-only reports when not configured.
pub const DEFAULT_WORKERS: usize = 8;
