//! Directory-level blame: attribute each immediate child of a directory to
//! the commit that last changed it.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use bstr::{BStr, BString};
use git_hash::ObjectId;
use git_object::Object;
use git_repository::Repository;

use crate::RevWalkError;

/// Depth bound on the parent BFS (§4.15).
pub const MAX_BLAME_DEPTH: usize = 1000;

/// The commit that last touched a single directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlameEntry {
    pub commit: ObjectId,
}

/// Blame every immediate child of `dir_path` as it exists in `commit`.
///
/// Returns a map from entry name to the commit that introduced its current
/// content at that path. Entries unresolved within [`MAX_BLAME_DEPTH`]
/// parents default to `commit` itself.
pub fn get_file_blame(
    repo: &Repository,
    commit: &ObjectId,
    dir_path: &BStr,
) -> Result<BTreeMap<BString, BlameEntry>, RevWalkError> {
    let target = resolve_dir(repo, commit, dir_path)?.unwrap_or_default();

    let mut unblamed: HashMap<BString, ObjectId> = target.clone();
    let mut result: BTreeMap<BString, BlameEntry> = BTreeMap::new();

    let mut queue: VecDeque<(ObjectId, usize)> = VecDeque::new();
    let mut visited: HashSet<ObjectId> = HashSet::new();
    queue.push_back((*commit, 0));
    visited.insert(*commit);

    while let Some((current, depth)) = queue.pop_front() {
        if unblamed.is_empty() {
            break;
        }
        if depth >= MAX_BLAME_DEPTH {
            continue;
        }

        let current_dir = resolve_dir(repo, &current, dir_path)?;
        let commit_obj = read_commit(repo, &current)?;

        if commit_obj.parents.is_empty() {
            for name in unblamed.keys().cloned().collect::<Vec<_>>() {
                if current_dir.as_ref().is_some_and(|t| t.contains_key(&name)) {
                    result.insert(name.clone(), BlameEntry { commit: current });
                    unblamed.remove(&name);
                }
            }
            continue;
        }

        for parent in &commit_obj.parents {
            if unblamed.is_empty() {
                break;
            }
            let parent_dir = resolve_dir(repo, parent, dir_path)?;

            match &parent_dir {
                None => {
                    // Directory doesn't exist in this parent: introduced here.
                    for name in unblamed.keys().cloned().collect::<Vec<_>>() {
                        if current_dir.as_ref().is_some_and(|t| t.contains_key(&name)) {
                            result.insert(name.clone(), BlameEntry { commit: current });
                            unblamed.remove(&name);
                        }
                    }
                }
                Some(parent_entries) => {
                    for name in unblamed.keys().cloned().collect::<Vec<_>>() {
                        let cur = current_dir.as_ref().and_then(|t| t.get(&name));
                        let par = parent_entries.get(&name);
                        let changed_here = match (cur, par) {
                            (Some(_), None) => true,
                            (Some(c), Some(p)) => c != p,
                            _ => false,
                        };
                        if changed_here {
                            result.insert(name.clone(), BlameEntry { commit: current });
                            unblamed.remove(&name);
                        }
                    }
                }
            }

            if visited.insert(*parent) {
                queue.push_back((*parent, depth + 1));
            }
        }
    }

    for name in unblamed.keys() {
        result.insert(name.clone(), BlameEntry { commit: *commit });
    }

    Ok(result)
}

/// Resolve `dir_path` inside `commit`'s tree, returning the map of
/// immediate child name -> entry hash. `None` if the path doesn't exist.
fn resolve_dir(
    repo: &Repository,
    commit: &ObjectId,
    dir_path: &BStr,
) -> Result<Option<HashMap<BString, ObjectId>>, RevWalkError> {
    let commit_obj = read_commit(repo, commit)?;
    let mut current = commit_obj.tree;

    if !dir_path.is_empty() {
        for component in dir_path.split(|&b| b == b'/') {
            let tree = read_tree(repo, &current)?;
            let found = tree.entries.iter().find(|e| &e.name[..] == component);
            match found {
                Some(entry) if entry.mode.is_tree() => current = entry.oid,
                _ => return Ok(None),
            }
        }
    }

    let tree = read_tree(repo, &current)?;
    Ok(Some(
        tree.entries
            .iter()
            .map(|e| (e.name.clone(), e.oid))
            .collect(),
    ))
}

fn read_commit(repo: &Repository, oid: &ObjectId) -> Result<git_object::Commit, RevWalkError> {
    let obj = repo
        .odb()
        .read(oid)?
        .ok_or(RevWalkError::CommitNotFound(*oid))?;
    match obj {
        Object::Commit(c) => Ok(c),
        _ => Err(RevWalkError::NotACommit(*oid)),
    }
}

fn read_tree(repo: &Repository, oid: &ObjectId) -> Result<git_object::Tree, RevWalkError> {
    let obj = repo
        .odb()
        .read(oid)?
        .ok_or(RevWalkError::CommitNotFound(*oid))?;
    match obj {
        Object::Tree(t) => Ok(t),
        _ => Err(RevWalkError::NotACommit(*oid)),
    }
}
