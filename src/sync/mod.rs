//! Incremental synchronization engine: identity keys, diff computation,
//! group assignment, and diff application.

pub mod apply;
pub mod diff;
pub mod groups;
pub mod identity;

pub use apply::{apply_diff, ApplyOutcome};
pub use diff::{compute_diff, DiffCounts, DiffSample, SourceDiff};
pub use identity::channel_key;
