use std::path::PathBuf;

use git_hash::ObjectId;

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not a git repository (or any of the parent directories): {0}")]
    NotFound(PathBuf),

    #[error("invalid git directory: {path}: {reason}")]
    InvalidGitDir { path: PathBuf, reason: String },

    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("object {oid} is not a {expected}")]
    WrongObjectType {
        oid: ObjectId,
        expected: &'static str,
    },

    #[error("path not found in tree {tree}: {path}")]
    PathNotFound { tree: ObjectId, path: String },

    #[error("unsupported object type reachable from ref during load: {0}")]
    UnsupportedReachableObject(ObjectId),

    #[error(transparent)]
    Odb(#[from] git_odb::OdbError),

    #[error(transparent)]
    Ref(#[from] git_ref::RefError),

    #[error(transparent)]
    Index(#[from] git_index::IndexError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
