//! Load-time traversal: pools every commit and tag reachable from any ref.
//!
//! Mirrors the BFS idiom `git-revwalk`'s merge-base search uses, but instead
//! of stopping at a target it drains the whole reachable set into a pool the
//! repository owns for its lifetime.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use git_hash::ObjectId;
use git_object::{Commit, Object, Tag};
use git_odb::ObjectDatabase;
use git_ref::{FilesRefStore, RefStore};
use git_utils::date::Signature;
use git_utils::mailmap::Mailmap;

use crate::error::RepoError;

/// Commits and tags discovered by the load-phase walk, keyed by hash.
pub(crate) struct LoadedGraph {
    pub commits: HashMap<ObjectId, Commit>,
    pub tags: HashMap<ObjectId, Tag>,
}

/// Walk every ref with an explicit stack, pooling each reachable commit and
/// tag by hash. A commit pushes its parents; a tag pushes its target. Trees
/// and blobs are never reachable from this walk — hitting one, or failing to
/// read any object on the stack, aborts the whole load.
pub(crate) fn load_reachable(
    odb: &ObjectDatabase,
    refs: &FilesRefStore,
    mailmap: Option<&Mailmap>,
) -> Result<LoadedGraph, RepoError> {
    let mut commits = HashMap::new();
    let mut tags = HashMap::new();
    let mut visited = HashSet::new();
    let mut stack = Vec::new();

    for reference in refs.iter(None)? {
        let reference = reference?;
        if let Some(oid) = refs.resolve_to_oid(reference.name())? {
            stack.push(oid);
        }
    }

    while let Some(oid) = stack.pop() {
        if !visited.insert(oid) {
            continue;
        }

        let object = odb.read(&oid)?.ok_or(RepoError::ObjectNotFound(oid))?;
        match object {
            Object::Commit(mut commit) => {
                if let Some(mailmap) = mailmap {
                    canonicalize(&mut commit.author, mailmap);
                    canonicalize(&mut commit.committer, mailmap);
                }
                stack.extend(commit.parents.iter().copied());
                commits.insert(oid, commit);
            }
            Object::Tag(mut tag) => {
                if let Some(mailmap) = mailmap {
                    if let Some(tagger) = tag.tagger.as_mut() {
                        canonicalize(tagger, mailmap);
                    }
                }
                stack.push(tag.target);
                tags.insert(oid, tag);
            }
            Object::Tree(_) | Object::Blob(_) => {
                return Err(RepoError::UnsupportedReachableObject(oid));
            }
        }
    }

    Ok(LoadedGraph { commits, tags })
}

fn canonicalize(signature: &mut Signature, mailmap: &Mailmap) {
    let (name, email) = mailmap.lookup(&signature.name, &signature.email);
    signature.name = name;
    signature.email = email;
}

/// Parse `.mailmap` at the work-tree root, if the repository has one and the
/// file exists. Bare repositories never have a mailmap.
pub(crate) fn load_mailmap(work_tree: Option<&Path>) -> Result<Option<Mailmap>, RepoError> {
    let Some(work_tree) = work_tree else {
        return Ok(None);
    };
    let path = work_tree.join(".mailmap");
    if !path.is_file() {
        return Ok(None);
    }
    Ok(Some(Mailmap::from_file(&path)?))
}
