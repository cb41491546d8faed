//! Merge preview: merge-base lookup plus per-path conflict classification
//! over the base→ours and base→theirs tree diffs (§4.13).

use std::collections::BTreeMap;

use bstr::BString;
use git_diff::{DiffEntry, DiffStatus};
use git_hash::ObjectId;
use git_object::Object;
use git_repository::Repository;
use git_revwalk::RevWalkError;

use crate::{ConflictType, MergeError};

/// A single path changed on either side of a merge preview.
#[derive(Debug, Clone)]
pub struct MergePreviewEntry {
    pub path: BString,
    pub conflict_type: ConflictType,
    pub ours_oid: Option<ObjectId>,
    pub theirs_oid: Option<ObjectId>,
}

/// The result of previewing a merge of `ours` into `theirs` (or vice
/// versa — the preview is symmetric over which side is "current").
#[derive(Debug, Clone)]
pub struct MergePreviewResult {
    /// `None` for unrelated histories (no common ancestor).
    pub merge_base: Option<ObjectId>,
    pub entries: Vec<MergePreviewEntry>,
}

impl MergePreviewResult {
    pub fn conflict_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.conflict_type != ConflictType::None)
            .count()
    }
}

/// Preview a merge of `ours` and `theirs` without touching the index,
/// working tree, or object database.
pub fn merge_preview(
    repo: &Repository,
    ours: &ObjectId,
    theirs: &ObjectId,
) -> Result<MergePreviewResult, MergeError> {
    let merge_base = match git_revwalk::merge_base(repo, ours, theirs) {
        Ok(base) => Some(base),
        Err(RevWalkError::NoMergeBase) => None,
        Err(e) => return Err(MergeError::RevWalk(e)),
    };

    let base_tree = match merge_base {
        Some(base) => Some(commit_tree(repo, &base)?),
        None => None,
    };
    let ours_tree = commit_tree(repo, ours)?;
    let theirs_tree = commit_tree(repo, theirs)?;

    let diff_ours = git_diff::diff_trees(repo.odb(), base_tree.as_ref(), Some(&ours_tree))?;
    let diff_theirs = git_diff::diff_trees(repo.odb(), base_tree.as_ref(), Some(&theirs_tree))?;

    let mut by_path: BTreeMap<BString, (Option<DiffEntry>, Option<DiffEntry>)> = BTreeMap::new();
    for entry in diff_ours {
        by_path.entry(entry.path.clone()).or_insert((None, None)).0 = Some(entry);
    }
    for entry in diff_theirs {
        by_path.entry(entry.path.clone()).or_insert((None, None)).1 = Some(entry);
    }

    let entries = by_path
        .into_iter()
        .map(|(path, (ours_entry, theirs_entry))| {
            let conflict_type = classify(ours_entry.as_ref(), theirs_entry.as_ref());
            MergePreviewEntry {
                path,
                conflict_type,
                ours_oid: ours_entry.and_then(|e| e.new_oid),
                theirs_oid: theirs_entry.and_then(|e| e.new_oid),
            }
        })
        .collect();

    Ok(MergePreviewResult {
        merge_base,
        entries,
    })
}

fn classify(ours: Option<&DiffEntry>, theirs: Option<&DiffEntry>) -> ConflictType {
    match (ours, theirs) {
        (Some(_), None) | (None, Some(_)) | (None, None) => ConflictType::None,
        (Some(o), Some(t)) => {
            if o.new_oid == t.new_oid {
                return ConflictType::None;
            }
            match (o.status, t.status) {
                (DiffStatus::Added, DiffStatus::Added) => ConflictType::BothAdded,
                (DiffStatus::Deleted, DiffStatus::Modified)
                | (DiffStatus::Modified, DiffStatus::Deleted) => ConflictType::DeleteModify,
                _ => ConflictType::Conflicting,
            }
        }
    }
}

fn commit_tree(repo: &Repository, oid: &ObjectId) -> Result<ObjectId, MergeError> {
    let obj = repo
        .odb()
        .read(oid)?
        .ok_or(MergeError::ObjectNotFound(*oid))?;
    match obj {
        Object::Commit(c) => Ok(c.tree),
        other => Err(MergeError::UnexpectedObjectType {
            oid: *oid,
            expected: "commit",
            actual: other.object_type().to_string(),
        }),
    }
}
