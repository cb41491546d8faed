//! Merge-base computation and directory-level blame.
//!
//! This crate provides the bidirectional, date-ordered BFS used to find a
//! merge base between two commits, and the parent-walk used to attribute
//! each entry of a directory to the commit that last changed it.

mod blame;
mod merge_base;

pub use blame::{get_file_blame, BlameEntry, MAX_BLAME_DEPTH};
pub use merge_base::merge_base;

use git_hash::ObjectId;

/// Errors produced by revision walking operations.
#[derive(Debug, thiserror::Error)]
pub enum RevWalkError {
    #[error("commit not found: {0}")]
    CommitNotFound(ObjectId),

    #[error("object is not a commit: {0}")]
    NotACommit(ObjectId),

    #[error("no common ancestor")]
    NoMergeBase,

    #[error(transparent)]
    Odb(#[from] git_odb::OdbError),

    #[error(transparent)]
    Repo(#[from] git_repository::RepoError),

    #[error(transparent)]
    Object(#[from] git_object::ObjectError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
