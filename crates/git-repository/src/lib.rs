//! Repository discovery and central access for all git subsystems.

mod discover;
mod env;
mod error;
mod load;
mod worktree;

pub use error::RepoError;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use git_hash::ObjectId;
use git_index::Index;
use git_object::{Blob, Commit, Object, Tag, Tree};
use git_odb::ObjectDatabase;
use git_ref::{FilesRefStore, RefName, RefStore, Reference};
use git_utils::mailmap::Mailmap;

/// Type of repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryKind {
    /// Normal repo with a working tree.
    Normal,
    /// Bare repo (no working tree).
    Bare,
    /// Linked worktree sharing objects/refs with a main repo.
    LinkedWorktree,
}

/// Result of repository discovery before full opening.
#[derive(Debug)]
pub struct DiscoveredRepo {
    pub git_dir: PathBuf,
    pub work_tree: Option<PathBuf>,
    pub common_dir: PathBuf,
    pub kind: RepositoryKind,
}

/// The central repository struct tying all subsystems together.
impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("git_dir", &self.git_dir)
            .field("work_tree", &self.work_tree)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

pub struct Repository {
    /// Path to the .git directory.
    git_dir: PathBuf,
    /// Path to the working tree (None for bare repos).
    work_tree: Option<PathBuf>,
    /// Path to the common dir (for worktrees; same as git_dir for normal repos).
    common_dir: PathBuf,
    /// Object database.
    odb: ObjectDatabase,
    /// Reference store.
    refs: FilesRefStore,
    /// Index (lazy-loaded). None means not yet loaded.
    index: Option<Index>,
    /// Path to the index file.
    index_path: PathBuf,
    /// Repository kind.
    kind: RepositoryKind,
    /// Every commit reachable from any ref at load time, by hash.
    commits: HashMap<ObjectId, Commit>,
    /// Every tag object reachable from any ref at load time, by hash.
    tags: HashMap<ObjectId, Tag>,
    /// Commit `refs/stash` currently points at, if any. Without reflog
    /// support only the most recent stash entry is ever visible.
    stashes: Vec<ObjectId>,
    /// HEAD resolved to a commit, if any.
    head: Option<ObjectId>,
    /// Full ref name HEAD points to symbolically; empty when detached.
    head_ref: String,
    /// Whether HEAD is a direct hash rather than a symbolic ref.
    head_detached: bool,
    /// Parsed `.mailmap`, if the work tree has one.
    mailmap: Option<Mailmap>,
}

impl Repository {
    /// Open an existing repository at the given path.
    ///
    /// `path` should point to either the `.git` directory or the working tree root.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let path = path.as_ref();
        let discovered = if path.join("HEAD").is_file() && path.join("objects").is_dir() {
            // Path is a git dir (bare repo or .git directory)
            discover::open_git_dir(path)?
        } else if path.join(".git").exists() {
            // Path is a working tree root
            discover::open_git_dir_from_work_tree(path)?
        } else {
            return Err(RepoError::NotFound(path.to_path_buf()));
        };
        Self::from_discovered(discovered)
    }

    /// Discover a repository starting from the given directory, walking up.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self, RepoError> {
        let discovered = discover::discover_git_dir(start.as_ref())?;
        Self::from_discovered(discovered)
    }

    /// Build a Repository from a DiscoveredRepo.
    fn from_discovered(discovered: DiscoveredRepo) -> Result<Self, RepoError> {
        let env_overrides = env::EnvOverrides::from_env();
        Self::from_discovered_with_env(discovered, &env_overrides)
    }

    /// Build a Repository from a DiscoveredRepo with explicit environment overrides.
    fn from_discovered_with_env(
        discovered: DiscoveredRepo,
        env_overrides: &env::EnvOverrides,
    ) -> Result<Self, RepoError> {
        let DiscoveredRepo {
            git_dir,
            work_tree,
            common_dir,
            kind,
        } = discovered;

        // Apply env overrides for work tree
        let work_tree = if let Some(ref wt) = env_overrides.work_tree {
            Some(wt.clone())
        } else {
            work_tree
        };

        // Apply env override for common dir
        let common_dir = if let Some(ref cd) = env_overrides.common_dir {
            cd.clone()
        } else {
            common_dir
        };

        // Determine objects directory
        let objects_dir = if let Some(ref od) = env_overrides.object_directory {
            od.clone()
        } else {
            common_dir.join("objects")
        };

        let odb = ObjectDatabase::open(&objects_dir)?;

        // Set up ref store from common_dir (refs are shared in worktrees)
        let refs = FilesRefStore::new(&common_dir);

        // Determine index file path
        let index_path = if let Some(ref idx) = env_overrides.index_file {
            idx.clone()
        } else {
            git_dir.join("index")
        };

        let mailmap = load::load_mailmap(work_tree.as_deref())?;
        let graph = load::load_reachable(&odb, &refs, mailmap.as_ref())?;
        let stashes = resolve_stashes(&refs)?;
        let (head, head_ref, head_detached) = resolve_head(&refs)?;

        Ok(Repository {
            git_dir,
            work_tree,
            common_dir,
            odb,
            refs,
            index: None,
            index_path,
            kind,
            commits: graph.commits,
            tags: graph.tags,
            stashes,
            head,
            head_ref,
            head_detached,
            mailmap,
        })
    }

    // --- Path accessors ---

    /// Path to the .git directory.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Path to the working tree (None for bare repos).
    pub fn work_tree(&self) -> Option<&Path> {
        self.work_tree.as_deref()
    }

    /// Path to the common directory (shared in worktrees).
    pub fn common_dir(&self) -> &Path {
        &self.common_dir
    }

    /// Repository kind.
    pub fn kind(&self) -> RepositoryKind {
        self.kind
    }

    /// Is this a bare repository?
    pub fn is_bare(&self) -> bool {
        self.kind == RepositoryKind::Bare
    }

    // --- Subsystem accessors ---

    /// Access the object database.
    pub fn odb(&self) -> &ObjectDatabase {
        &self.odb
    }

    /// Access the reference store.
    pub fn refs(&self) -> &FilesRefStore {
        &self.refs
    }

    /// Access the index (lazy-loaded).
    pub fn index(&mut self) -> Result<&Index, RepoError> {
        if self.index.is_none() {
            self.load_index()?;
        }
        Ok(self.index.as_ref().unwrap())
    }

    /// Reload the index from disk, replacing any cached copy.
    pub fn reload_index(&mut self) -> Result<&Index, RepoError> {
        self.index = None;
        self.load_index()?;
        Ok(self.index.as_ref().unwrap())
    }

    fn load_index(&mut self) -> Result<(), RepoError> {
        let idx = if self.index_path.exists() {
            Index::read_from(&self.index_path)?
        } else {
            Index::new()
        };
        self.index = Some(idx);
        Ok(())
    }

    // --- Convenience methods ---

    /// Resolve HEAD to an OID.
    pub fn head_oid(&self) -> Result<Option<ObjectId>, RepoError> {
        let head_ref = RefName::new("HEAD").map_err(RepoError::from)?;
        let resolved = self.refs.resolve_to_oid(&head_ref)?;
        Ok(resolved)
    }

    /// Get the current branch name (None if detached HEAD).
    pub fn current_branch(&self) -> Result<Option<String>, RepoError> {
        let head_ref = RefName::new("HEAD").map_err(RepoError::from)?;
        match self.refs.resolve(&head_ref)? {
            Some(Reference::Symbolic { target, .. }) => {
                let name = target.as_str();
                // Strip refs/heads/ prefix if present
                let branch = name
                    .strip_prefix("refs/heads/")
                    .unwrap_or(name);
                Ok(Some(branch.to_string()))
            }
            Some(Reference::Direct { .. }) => Ok(None), // detached HEAD
            None => Ok(None),
        }
    }

    /// Check if this is on an unborn branch (no commits yet).
    pub fn is_unborn(&self) -> Result<bool, RepoError> {
        let head_ref = RefName::new("HEAD").map_err(RepoError::from)?;
        match self.refs.resolve(&head_ref)? {
            Some(Reference::Symbolic { target, .. }) => {
                // HEAD points to a symbolic ref; check if that ref exists
                let resolved = self.refs.resolve_to_oid(&target)?;
                Ok(resolved.is_none())
            }
            Some(Reference::Direct { .. }) => Ok(false),
            None => Ok(true),
        }
    }

    // --- §3 data model queries ---

    /// Every commit reachable from any ref at load time, by hash.
    pub fn commits(&self) -> &HashMap<ObjectId, Commit> {
        &self.commits
    }

    /// Local branches as short name (no `refs/heads/` prefix) to target OID.
    pub fn branches(&self) -> Result<HashMap<String, ObjectId>, RepoError> {
        let mut out = HashMap::new();
        for reference in self.refs.iter(Some("refs/heads/"))? {
            let reference = reference?;
            if let Some(oid) = self.refs.resolve_to_oid(reference.name())? {
                out.insert(short_name(reference.name().as_str(), "refs/heads/"), oid);
            }
        }
        Ok(out)
    }

    /// Tags as short name (no `refs/tags/` prefix) to their peeled target.
    ///
    /// Annotated tags resolve through the pooled tag object(s) to their
    /// ultimate commit; lightweight tags pass through unchanged.
    pub fn tags(&self) -> Result<HashMap<String, ObjectId>, RepoError> {
        let mut out = HashMap::new();
        for reference in self.refs.iter(Some("refs/tags/"))? {
            let reference = reference?;
            if let Some(oid) = self.refs.resolve_to_oid(reference.name())? {
                out.insert(short_name(reference.name().as_str(), "refs/tags/"), self.peel_tag(oid));
            }
        }
        Ok(out)
    }

    fn peel_tag(&self, mut oid: ObjectId) -> ObjectId {
        while let Some(tag) = self.tags.get(&oid) {
            oid = tag.target;
        }
        oid
    }

    /// Commit(s) `refs/stash` currently points at. Empty if there is no
    /// stash; at most one entry, since reflog history is out of scope.
    pub fn stashes(&self) -> &[ObjectId] {
        &self.stashes
    }

    /// HEAD resolved to a commit hash, if it resolves to one.
    pub fn head(&self) -> Option<ObjectId> {
        self.head
    }

    /// Full ref name HEAD points to symbolically; empty when detached.
    pub fn head_ref(&self) -> &str {
        &self.head_ref
    }

    /// Whether HEAD is a direct hash rather than a symbolic ref.
    pub fn head_detached(&self) -> bool {
        self.head_detached
    }

    /// Look up a pooled commit by hash.
    pub fn get_commit(&self, hash: &ObjectId) -> Result<&Commit, RepoError> {
        self.commits
            .get(hash)
            .ok_or(RepoError::ObjectNotFound(*hash))
    }

    /// Look up a pooled tag object by hash.
    pub fn get_tag(&self, hash: &ObjectId) -> Result<&Tag, RepoError> {
        self.tags.get(hash).ok_or(RepoError::ObjectNotFound(*hash))
    }

    /// Read a tree by hash (on-demand, passes through the object database's
    /// LRU cache rather than the load-time commit/tag pool).
    pub fn get_tree(&self, hash: &ObjectId) -> Result<Tree, RepoError> {
        match self.odb.read_cached(hash)? {
            Some(Object::Tree(tree)) => Ok(tree),
            Some(_) => Err(RepoError::WrongObjectType {
                oid: *hash,
                expected: "tree",
            }),
            None => Err(RepoError::ObjectNotFound(*hash)),
        }
    }

    /// Read a blob by hash (on-demand, via the object database's LRU cache).
    pub fn get_blob(&self, hash: &ObjectId) -> Result<Blob, RepoError> {
        match self.odb.read_cached(hash)? {
            Some(Object::Blob(blob)) => Ok(blob),
            Some(_) => Err(RepoError::WrongObjectType {
                oid: *hash,
                expected: "blob",
            }),
            None => Err(RepoError::ObjectNotFound(*hash)),
        }
    }

    /// Walk a slash-separated path of subdirectories starting at `tree`,
    /// returning the tree found at the end of the path.
    pub fn resolve_tree_at_path(&self, tree: &ObjectId, path: &str) -> Result<Tree, RepoError> {
        let mut current = self.get_tree(tree)?;
        for component in path.split('/').filter(|c| !c.is_empty()) {
            let entry = current
                .entries
                .iter()
                .find(|entry| {
                    let name_bytes: &[u8] = entry.name.as_ref();
                    name_bytes == component.as_bytes()
                })
                .ok_or_else(|| RepoError::PathNotFound {
                    tree: *tree,
                    path: path.to_string(),
                })?;
            if !entry.mode.is_tree() {
                return Err(RepoError::PathNotFound {
                    tree: *tree,
                    path: path.to_string(),
                });
            }
            current = self.get_tree(&entry.oid)?;
        }
        Ok(current)
    }
}

fn short_name(full: &str, prefix: &str) -> String {
    full.strip_prefix(prefix).unwrap_or(full).to_string()
}

/// Resolve `refs/stash` to its current commit, if the ref exists.
fn resolve_stashes(refs: &FilesRefStore) -> Result<Vec<ObjectId>, RepoError> {
    let stash_ref = RefName::new("refs/stash").map_err(RepoError::from)?;
    Ok(refs.resolve_to_oid(&stash_ref)?.into_iter().collect())
}

/// Resolve HEAD into (commit, symbolic target name, detached flag).
fn resolve_head(refs: &FilesRefStore) -> Result<(Option<ObjectId>, String, bool), RepoError> {
    let head_name = RefName::new("HEAD").map_err(RepoError::from)?;
    match refs.resolve(&head_name)? {
        Some(Reference::Symbolic { target, .. }) => {
            let oid = refs.resolve_to_oid(&target)?;
            Ok((oid, target.as_str().to_string(), false))
        }
        Some(Reference::Direct { target, .. }) => Ok((Some(target), String::new(), true)),
        None => Ok((None, String::new(), false)),
    }
}
