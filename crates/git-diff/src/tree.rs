//! Tree-to-tree diff.
//!
//! Walks two tree objects in parallel (sorted by git's tree entry order),
//! identifying added, deleted, and modified entries. Recurses into nested
//! trees; a blob replacing a tree (or vice versa) is split into a delete
//! of every entry on one side and an add of every entry on the other.

use bstr::BString;
use git_hash::ObjectId;
use git_object::{FileMode, Object, Tree, TreeEntry};
use git_odb::ObjectDatabase;

use crate::{DiffEntry, DiffError, DiffStatus, MAX_TREE_DIFF_ENTRIES};

/// Diff two trees, producing a flat list of changed entries (renames not
/// yet detected — see [`crate::rename::detect_renames`]).
///
/// Either tree OID can be `None` to represent an empty tree (e.g. for the
/// root-commit case).
pub fn diff_trees(
    odb: &ObjectDatabase,
    old_tree: Option<&ObjectId>,
    new_tree: Option<&ObjectId>,
) -> Result<Vec<DiffEntry>, DiffError> {
    let old = match old_tree {
        Some(oid) => Some(read_tree(odb, oid)?),
        None => None,
    };
    let new = match new_tree {
        Some(oid) => Some(read_tree(odb, oid)?),
        None => None,
    };

    let old_entries = old.as_ref().map_or(&[][..], |t| &t.entries);
    let new_entries = new.as_ref().map_or(&[][..], |t| &t.entries);

    let mut entries = Vec::new();
    let prefix = BString::from("");
    diff_tree_entries(odb, old_entries, new_entries, &prefix, &mut entries)?;

    Ok(entries)
}

pub(crate) fn read_tree(odb: &ObjectDatabase, oid: &ObjectId) -> Result<Tree, DiffError> {
    let obj = odb
        .read(oid)
        .map_err(|e| DiffError::ObjectRead {
            oid: *oid,
            source: e,
        })?
        .ok_or(DiffError::ObjectNotFound(*oid))?;

    match obj {
        Object::Tree(tree) => Ok(tree),
        other => Err(DiffError::UnexpectedObjectType {
            oid: *oid,
            expected: "tree",
            actual: other.object_type().to_string(),
        }),
    }
}

/// Read blob data from the ODB.
pub(crate) fn read_blob(odb: &ObjectDatabase, oid: &ObjectId) -> Result<Vec<u8>, DiffError> {
    let obj = odb
        .read(oid)
        .map_err(|e| DiffError::ObjectRead {
            oid: *oid,
            source: e,
        })?
        .ok_or(DiffError::ObjectNotFound(*oid))?;

    match obj {
        Object::Blob(blob) => Ok(blob.data.to_vec()),
        other => Err(DiffError::UnexpectedObjectType {
            oid: *oid,
            expected: "blob",
            actual: other.object_type().to_string(),
        }),
    }
}

fn check_cap(entries: &[DiffEntry]) -> Result<(), DiffError> {
    if entries.len() > MAX_TREE_DIFF_ENTRIES {
        return Err(DiffError::TooLarge {
            max: MAX_TREE_DIFF_ENTRIES,
        });
    }
    Ok(())
}

/// Recursively diff two sets of sorted tree entries.
fn diff_tree_entries(
    odb: &ObjectDatabase,
    old_entries: &[TreeEntry],
    new_entries: &[TreeEntry],
    prefix: &BString,
    entries: &mut Vec<DiffEntry>,
) -> Result<(), DiffError> {
    let mut oi = 0;
    let mut ni = 0;

    while oi < old_entries.len() || ni < new_entries.len() {
        match (old_entries.get(oi), new_entries.get(ni)) {
            (Some(old_entry), Some(new_entry)) => {
                let cmp = TreeEntry::cmp_entries(old_entry, new_entry);
                match cmp {
                    std::cmp::Ordering::Less => {
                        collect_deleted(odb, old_entry, prefix, entries)?;
                        oi += 1;
                    }
                    std::cmp::Ordering::Greater => {
                        collect_added(odb, new_entry, prefix, entries)?;
                        ni += 1;
                    }
                    std::cmp::Ordering::Equal => {
                        collect_matched(odb, old_entry, new_entry, prefix, entries)?;
                        oi += 1;
                        ni += 1;
                    }
                }
            }
            (Some(old_entry), None) => {
                collect_deleted(odb, old_entry, prefix, entries)?;
                oi += 1;
            }
            (None, Some(new_entry)) => {
                collect_added(odb, new_entry, prefix, entries)?;
                ni += 1;
            }
            (None, None) => break,
        }
        check_cap(entries)?;
    }

    Ok(())
}

fn full_path(prefix: &BString, name: &BString) -> BString {
    if prefix.is_empty() {
        name.clone()
    } else {
        let mut p = prefix.clone();
        p.push(b'/');
        p.extend_from_slice(name);
        p
    }
}

fn is_gitlink(mode: FileMode) -> bool {
    mode.is_gitlink()
}

/// Collect a deleted entry, recursing into deleted trees as if the new
/// tree were empty.
fn collect_deleted(
    odb: &ObjectDatabase,
    entry: &TreeEntry,
    prefix: &BString,
    entries: &mut Vec<DiffEntry>,
) -> Result<(), DiffError> {
    let path = full_path(prefix, &entry.name);

    if entry.mode.is_tree() {
        let tree = read_tree(odb, &entry.oid)?;
        diff_tree_entries(odb, &tree.entries, &[], &path, entries)?;
    } else {
        entries.push(DiffEntry {
            path: path.clone(),
            old_path: None,
            status: DiffStatus::Deleted,
            old_oid: Some(entry.oid),
            new_oid: None,
            old_mode: Some(entry.mode),
            new_mode: None,
            is_binary: is_gitlink(entry.mode),
        });
    }
    Ok(())
}

/// Collect an added entry, recursing into added trees as if the old tree
/// were empty.
fn collect_added(
    odb: &ObjectDatabase,
    entry: &TreeEntry,
    prefix: &BString,
    entries: &mut Vec<DiffEntry>,
) -> Result<(), DiffError> {
    let path = full_path(prefix, &entry.name);

    if entry.mode.is_tree() {
        let tree = read_tree(odb, &entry.oid)?;
        diff_tree_entries(odb, &[], &tree.entries, &path, entries)?;
    } else {
        entries.push(DiffEntry {
            path: path.clone(),
            old_path: None,
            status: DiffStatus::Added,
            old_oid: None,
            new_oid: Some(entry.oid),
            old_mode: None,
            new_mode: Some(entry.mode),
            is_binary: is_gitlink(entry.mode),
        });
    }
    Ok(())
}

/// Collect an entry present on both sides: a no-op if content and mode are
/// identical, a recursive sub-diff if both sides are trees, a split
/// delete+add if the entry kind changed, or a single Modified entry.
fn collect_matched(
    odb: &ObjectDatabase,
    old_entry: &TreeEntry,
    new_entry: &TreeEntry,
    prefix: &BString,
    entries: &mut Vec<DiffEntry>,
) -> Result<(), DiffError> {
    let old_is_tree = old_entry.mode.is_tree();
    let new_is_tree = new_entry.mode.is_tree();

    if old_is_tree && new_is_tree {
        if old_entry.oid == new_entry.oid {
            return Ok(());
        }
        let path = full_path(prefix, &old_entry.name);
        let old_tree = read_tree(odb, &old_entry.oid)?;
        let new_tree = read_tree(odb, &new_entry.oid)?;
        diff_tree_entries(odb, &old_tree.entries, &new_tree.entries, &path, entries)?;
    } else if old_is_tree {
        // tree replaced by a blob: delete the tree's contents, add the blob
        let path = full_path(prefix, &old_entry.name);
        let old_tree = read_tree(odb, &old_entry.oid)?;
        diff_tree_entries(odb, &old_tree.entries, &[], &path, entries)?;
        collect_added(odb, new_entry, prefix, entries)?;
    } else if new_is_tree {
        // blob replaced by a tree: delete the blob, add the tree's contents
        collect_deleted(odb, old_entry, prefix, entries)?;
        let path = full_path(prefix, &new_entry.name);
        let new_tree = read_tree(odb, &new_entry.oid)?;
        diff_tree_entries(odb, &[], &new_tree.entries, &path, entries)?;
    } else if old_entry.oid != new_entry.oid || old_entry.mode != new_entry.mode {
        let path = full_path(prefix, &old_entry.name);
        entries.push(DiffEntry {
            path: path.clone(),
            old_path: None,
            status: DiffStatus::Modified,
            old_oid: Some(old_entry.oid),
            new_oid: Some(new_entry.oid),
            old_mode: Some(old_entry.mode),
            new_mode: Some(new_entry.mode),
            is_binary: is_gitlink(old_entry.mode) || is_gitlink(new_entry.mode),
        });
    }

    Ok(())
}

/// Compute a content-level [`crate::FileDiff`] for a single blob pair.
///
/// Either OID may be `None` to represent an empty blob (add/delete).
/// Applies the binary and size gates from §4.11.
pub fn diff_file_pair(
    odb: &ObjectDatabase,
    old_oid: Option<&ObjectId>,
    new_oid: Option<&ObjectId>,
    context_lines: u32,
) -> Result<crate::FileDiff, DiffError> {
    let old_data = match old_oid {
        Some(oid) => read_blob(odb, oid)?,
        None => Vec::new(),
    };
    let new_data = match new_oid {
        Some(oid) => read_blob(odb, oid)?,
        None => Vec::new(),
    };

    Ok(diff_blob_pair(
        old_oid.copied(),
        new_oid.copied(),
        &old_data,
        &new_data,
        context_lines,
    ))
}

/// Shared binary/size-gated content diff over two already-loaded blobs.
pub(crate) fn diff_blob_pair(
    old_oid: Option<ObjectId>,
    new_oid: Option<ObjectId>,
    old_data: &[u8],
    new_data: &[u8],
    context_lines: u32,
) -> crate::FileDiff {
    use crate::binary::is_binary;

    if old_data.len() > crate::MAX_DIFF_BLOB || new_data.len() > crate::MAX_DIFF_BLOB {
        return crate::FileDiff {
            old_oid,
            new_oid,
            is_binary: false,
            truncated: true,
            hunks: Vec::new(),
        };
    }

    let binary = is_binary(old_data) || is_binary(new_data);
    let hunks = if binary {
        Vec::new()
    } else {
        crate::algorithm::diff_lines(old_data, new_data, context_lines)
    };

    crate::FileDiff {
        old_oid,
        new_oid,
        is_binary: binary,
        truncated: false,
        hunks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_path_joins_with_slash() {
        let prefix = BString::from("dir");
        let name = BString::from("file.txt");
        assert_eq!(full_path(&prefix, &name), BString::from("dir/file.txt"));
    }

    #[test]
    fn full_path_empty_prefix_is_bare_name() {
        let prefix = BString::from("");
        let name = BString::from("file.txt");
        assert_eq!(full_path(&prefix, &name), BString::from("file.txt"));
    }

    #[test]
    fn is_gitlink_detects_commit_mode() {
        assert!(is_gitlink(FileMode::Gitlink));
        assert!(!is_gitlink(FileMode::Regular));
    }
}
