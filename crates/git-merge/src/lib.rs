//! Merge preview: merge-base lookup, per-file conflict classification, and
//! a structured three-way content diff.
//!
//! This crate never writes an object, a ref, or the index — it only answers
//! "what would a merge of these two commits look like".

pub mod preview;
pub mod threeway;

pub use preview::{merge_preview, MergePreviewEntry, MergePreviewResult};
pub use threeway::{compute_three_way_diff, MergeRegion, RegionType, ThreeWayFileDiff};

use git_hash::ObjectId;

/// Classification of a path's (or whole-file's) three-way conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictType {
    /// No conflict: at most one side changed the path, or both sides agree.
    None,
    /// Both sides added the path independently, with different content.
    BothAdded,
    /// One side deleted the path while the other modified it.
    DeleteModify,
    /// Both sides modified the path, with different content.
    Conflicting,
}

/// Errors produced by merge-preview operations.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("expected {expected} object, got {actual} for {oid}")]
    UnexpectedObjectType {
        oid: ObjectId,
        expected: &'static str,
        actual: String,
    },

    #[error(transparent)]
    RevWalk(#[from] git_revwalk::RevWalkError),

    #[error(transparent)]
    Diff(#[from] git_diff::DiffError),

    #[error(transparent)]
    Odb(#[from] git_odb::OdbError),
}
