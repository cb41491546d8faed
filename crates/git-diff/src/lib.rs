//! Diff engine: Myers line diff, tree-to-tree diff with rename detection,
//! and working-tree status/diff.

pub mod algorithm;
pub mod binary;
pub mod rename;
pub mod tree;
pub mod worktree;

pub use tree::{diff_file_pair, diff_trees};
pub use worktree::{compute_working_tree_file_diff, compute_working_tree_status};

use bstr::BString;
use git_hash::ObjectId;
use git_object::FileMode;

/// Options controlling diff behavior.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Number of context lines around each hunk (default 3).
    pub context_lines: u32,
    /// Enable rename detection (exact-hash only).
    pub detect_renames: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            context_lines: 3,
            detect_renames: false,
        }
    }
}

/// A single changed path produced by a tree-to-tree diff.
///
/// Carries no hunk content — use [`tree::diff_file_pair`] or
/// [`algorithm::diff_lines`] to compute a [`FileDiff`] for a specific entry.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    /// Path in the new tree (or the old tree, for deletions).
    pub path: BString,
    /// Previous path, set only for renames.
    pub old_path: Option<BString>,
    pub status: DiffStatus,
    pub old_oid: Option<ObjectId>,
    pub new_oid: Option<ObjectId>,
    pub old_mode: Option<FileMode>,
    pub new_mode: Option<FileMode>,
    /// Set for submodule gitlink entries; content-based detection happens
    /// only when a [`FileDiff`] is actually computed for the path.
    pub is_binary: bool,
}

/// File-level change status for a [`DiffEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl DiffStatus {
    /// Single-character status code matching C git output.
    pub fn as_char(&self) -> char {
        match self {
            Self::Added => 'A',
            Self::Modified => 'M',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
        }
    }
}

impl std::fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Added => "A",
            Self::Modified => "M",
            Self::Deleted => "D",
            Self::Renamed => "R",
        })
    }
}

/// Content diff for a single file (or blob pair).
#[derive(Debug, Clone)]
pub struct FileDiff {
    pub old_oid: Option<ObjectId>,
    pub new_oid: Option<ObjectId>,
    pub is_binary: bool,
    /// Set when either side exceeded the size gate; `hunks` is empty.
    pub truncated: bool,
    pub hunks: Vec<DiffHunk>,
}

/// A contiguous region of changed lines, with surrounding context.
#[derive(Debug, Clone)]
pub struct DiffHunk {
    /// Start line in the old file (1-based).
    pub old_start: u32,
    /// Count of context + deleted lines.
    pub old_lines: u32,
    /// Start line in the new file (1-based).
    pub new_start: u32,
    /// Count of context + added lines.
    pub new_lines: u32,
    pub lines: Vec<DiffLine>,
}

/// A single line within a [`DiffHunk`].
#[derive(Debug, Clone)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub content: BString,
    /// 1-based line number in the old file; 0 for additions.
    pub old_line: u32,
    /// 1-based line number in the new file; 0 for deletions.
    pub new_line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    Context,
    Addition,
    Deletion,
}

/// Maximum number of blob bytes considered for content diffing (§4.11).
pub const MAX_DIFF_BLOB: usize = 512 * 1024;

/// Maximum number of DiffEntry a single tree diff will produce before
/// failing with [`DiffError::TooLarge`].
pub const MAX_TREE_DIFF_ENTRIES: usize = 500;

/// Error types for diff operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("failed to read object {oid}: {source}")]
    ObjectRead {
        oid: ObjectId,
        #[source]
        source: git_odb::OdbError,
    },

    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("expected {expected} object, got {actual} for {oid}")]
    UnexpectedObjectType {
        oid: ObjectId,
        expected: &'static str,
        actual: String,
    },

    #[error("tree diff produced more than {max} entries")]
    TooLarge { max: usize },

    #[error("working tree operation requires a non-bare repository")]
    BareRepository,

    #[error(transparent)]
    Repo(#[from] git_repository::RepoError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
