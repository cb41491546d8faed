//! Working-tree status and diff.
//!
//! Compares the index against HEAD (what's staged) and the working
//! directory against the index (what's unstaged), and produces a
//! content diff for a single path against HEAD.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bstr::{BStr, BString, ByteSlice};
use git_hash::ObjectId;
use git_index::{IgnoreStack, Stage};
use git_object::{FileMode, Object};
use git_odb::ObjectDatabase;
use git_repository::Repository;

use crate::tree::read_blob;
use crate::{DiffError, FileDiff};

/// Status of a path relative to HEAD, as recorded in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Added,
    Modified,
    Deleted,
}

/// Status of a tracked path's working-directory copy relative to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    Modified,
    Deleted,
}

/// Combined status of a single path across HEAD, the index, and the
/// working directory.
#[derive(Debug, Clone)]
pub struct WorkingTreeStatusEntry {
    pub path: BString,
    pub index_status: Option<IndexStatus>,
    pub work_status: Option<WorkStatus>,
    pub is_untracked: bool,
}

/// Compute the full working-tree status: staged changes (index vs HEAD),
/// unstaged changes (working directory vs index), and untracked files.
pub fn compute_working_tree_status(
    repo: &mut Repository,
) -> Result<Vec<WorkingTreeStatusEntry>, DiffError> {
    let work_tree = repo
        .work_tree()
        .ok_or(DiffError::BareRepository)?
        .to_path_buf();

    let head_map = flatten_head(repo)?;

    let index = repo.index()?;
    let mut index_map: BTreeMap<BString, (ObjectId, FileMode, git_index::StatData)> =
        BTreeMap::new();
    for entry in index.iter().filter(|e| e.stage == Stage::Normal) {
        index_map.insert(entry.path.clone(), (entry.oid, entry.mode, entry.stat));
    }

    let mut status: BTreeMap<BString, WorkingTreeStatusEntry> = BTreeMap::new();

    for (path, (oid, _mode, _stat)) in &index_map {
        let index_status = match head_map.get(path) {
            None => Some(IndexStatus::Added),
            Some((head_oid, _)) if head_oid != oid => Some(IndexStatus::Modified),
            Some(_) => None,
        };
        status.insert(
            path.clone(),
            WorkingTreeStatusEntry {
                path: path.clone(),
                index_status,
                work_status: None,
                is_untracked: false,
            },
        );
    }

    for path in head_map.keys() {
        if !index_map.contains_key(path) {
            status.insert(
                path.clone(),
                WorkingTreeStatusEntry {
                    path: path.clone(),
                    index_status: Some(IndexStatus::Deleted),
                    work_status: None,
                    is_untracked: false,
                },
            );
        }
    }

    for (path, (oid, _mode, stat)) in &index_map {
        let fs_path = work_tree.join(path.to_str_lossy().as_ref());
        let work_status = match std::fs::symlink_metadata(&fs_path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Some(WorkStatus::Deleted),
            Err(e) => return Err(DiffError::Io(e)),
            Ok(metadata) => {
                if metadata.len() as u32 != stat.size {
                    Some(WorkStatus::Modified)
                } else {
                    let content = std::fs::read(&fs_path)?;
                    let current_oid = hash_blob(&content);
                    if current_oid.as_ref() == Some(oid) {
                        None
                    } else {
                        Some(WorkStatus::Modified)
                    }
                }
            }
        };

        if let Some(work_status) = work_status {
            status
                .entry(path.clone())
                .or_insert_with(|| WorkingTreeStatusEntry {
                    path: path.clone(),
                    index_status: None,
                    work_status: None,
                    is_untracked: false,
                })
                .work_status = Some(work_status);
        }
    }

    let mut ignore = IgnoreStack::new();
    let exclude_path = repo.git_dir().join("info/exclude");
    ignore
        .add_file(&exclude_path, &work_tree)
        .map_err(|e| DiffError::Io(std::io::Error::other(e.to_string())))?;

    let mut untracked = Vec::new();
    walk_untracked(&work_tree, &work_tree, &index_map, &mut ignore, &mut untracked)?;

    for path in untracked {
        status.insert(
            path.clone(),
            WorkingTreeStatusEntry {
                path,
                index_status: None,
                work_status: None,
                is_untracked: true,
            },
        );
    }

    Ok(status.into_values().collect())
}

/// Compute a content diff for a single path's working-directory copy
/// against its blob in HEAD.
pub fn compute_working_tree_file_diff(
    repo: &Repository,
    path: &BStr,
    context_lines: u32,
) -> Result<FileDiff, DiffError> {
    let work_tree = repo.work_tree().ok_or(DiffError::BareRepository)?;

    let head_tree_oid = resolve_head_tree(repo)?;
    let head_entry = match head_tree_oid {
        Some(oid) => lookup_path(repo.odb(), &oid, path)?,
        None => None,
    };

    let old_oid = head_entry.map(|(oid, _)| oid);
    let old_data = match old_oid {
        Some(oid) => read_blob(repo.odb(), &oid)?,
        None => Vec::new(),
    };

    let fs_path = work_tree.join(path.to_str_lossy().as_ref());
    let new_data = match std::fs::read(&fs_path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(DiffError::Io(e)),
    };
    let new_oid = hash_blob(&new_data);

    Ok(crate::tree::diff_blob_pair(
        old_oid,
        new_oid,
        &old_data,
        &new_data,
        context_lines,
    ))
}

/// Hash working-tree content as a git blob object (not written to the ODB).
fn hash_blob(data: &[u8]) -> Option<ObjectId> {
    git_hash::hasher::Hasher::hash_object(git_hash::HashAlgorithm::Sha1, "blob", data).ok()
}

/// Resolve HEAD to a tree OID. Returns `None` for an unborn branch.
fn resolve_head_tree(repo: &Repository) -> Result<Option<ObjectId>, DiffError> {
    let head_oid = match repo.head_oid()? {
        Some(oid) => oid,
        None => return Ok(None),
    };

    let obj = repo
        .odb()
        .read(&head_oid)
        .map_err(|e| DiffError::ObjectRead {
            oid: head_oid,
            source: e,
        })?
        .ok_or(DiffError::ObjectNotFound(head_oid))?;

    match obj {
        Object::Commit(commit) => Ok(Some(commit.tree)),
        other => Err(DiffError::UnexpectedObjectType {
            oid: head_oid,
            expected: "commit",
            actual: other.object_type().to_string(),
        }),
    }
}

/// Flatten HEAD's tree into a `path -> (oid, mode)` map.
fn flatten_head(
    repo: &Repository,
) -> Result<BTreeMap<BString, (ObjectId, FileMode)>, DiffError> {
    let mut map = BTreeMap::new();
    if let Some(tree_oid) = resolve_head_tree(repo)? {
        flatten_tree(repo.odb(), &tree_oid, &BString::from(""), &mut map)?;
    }
    Ok(map)
}

fn flatten_tree(
    odb: &ObjectDatabase,
    oid: &ObjectId,
    prefix: &BString,
    out: &mut BTreeMap<BString, (ObjectId, FileMode)>,
) -> Result<(), DiffError> {
    let tree = crate::tree::read_tree(odb, oid)?;
    for entry in &tree.entries {
        let path = join_path(prefix, &entry.name);
        if entry.mode.is_tree() {
            flatten_tree(odb, &entry.oid, &path, out)?;
        } else {
            out.insert(path, (entry.oid, entry.mode));
        }
    }
    Ok(())
}

/// Resolve a single slash-separated path inside a tree.
fn lookup_path(
    odb: &ObjectDatabase,
    tree_oid: &ObjectId,
    path: &BStr,
) -> Result<Option<(ObjectId, FileMode)>, DiffError> {
    let mut current = *tree_oid;
    let components: Vec<&[u8]> = path.split(|&b| b == b'/').collect();

    for (i, component) in components.iter().enumerate() {
        let tree = crate::tree::read_tree(odb, &current)?;
        let found = tree.entries.iter().find(|e| &e.name[..] == *component);
        match found {
            None => return Ok(None),
            Some(entry) => {
                if i == components.len() - 1 {
                    return Ok(Some((entry.oid, entry.mode)));
                }
                if !entry.mode.is_tree() {
                    return Ok(None);
                }
                current = entry.oid;
            }
        }
    }
    Ok(None)
}

fn join_path(prefix: &BString, name: &BString) -> BString {
    if prefix.is_empty() {
        name.clone()
    } else {
        let mut p = prefix.clone();
        p.push(b'/');
        p.extend_from_slice(name);
        p
    }
}

/// Walk the working directory (skipping `.git`), collecting untracked files
/// not suppressed by ignore patterns. Tracked paths are never suppressed.
fn walk_untracked(
    root: &Path,
    dir: &Path,
    index_map: &BTreeMap<BString, (ObjectId, FileMode, git_index::StatData)>,
    ignore: &mut IgnoreStack,
    out: &mut Vec<BString>,
) -> Result<(), DiffError> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(DiffError::Io(e)),
    };

    let mut local_ignore = ignore.clone();
    let gitignore_path = dir.join(".gitignore");
    local_ignore
        .add_file(&gitignore_path, dir)
        .map_err(|e| DiffError::Io(std::io::Error::other(e.to_string())))?;

    let mut entries: Vec<PathBuf> = Vec::new();
    for entry in read_dir {
        entries.push(entry?.path());
    }
    entries.sort();

    for entry_path in entries {
        let file_name = entry_path.file_name().unwrap_or_default();
        if file_name == ".git" {
            continue;
        }

        let rel_path = entry_path
            .strip_prefix(root)
            .unwrap_or(&entry_path)
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/");
        let rel = BString::from(rel_path);

        let metadata = std::fs::symlink_metadata(&entry_path)?;
        if metadata.is_dir() {
            let mut dir_prefix = rel.clone();
            dir_prefix.push(b'/');
            let contains_tracked = index_map.keys().any(|p| p.starts_with(&dir_prefix[..]));
            if contains_tracked || !local_ignore.is_ignored(rel.as_bstr(), true) {
                walk_untracked(root, &entry_path, index_map, &mut local_ignore, out)?;
            }
            continue;
        }

        if index_map.contains_key(&rel) {
            continue;
        }

        if !local_ignore.is_ignored(rel.as_bstr(), false) {
            out.push(rel);
        }
    }

    Ok(())
}
