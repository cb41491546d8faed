//! Working-tree status/diff tests against a real C git checkout.

use std::process::{Command, Stdio};

use bstr::{BString, ByteSlice};
use git_diff::worktree::{compute_working_tree_file_diff, compute_working_tree_status, IndexStatus, WorkStatus};
use git_repository::Repository;

fn git(dir: &std::path::Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .unwrap();
    assert!(status.success(), "git {:?} failed", args);
}

fn setup_committed_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init"]);
    std::fs::write(dir.path().join("a.txt"), b"hello\n").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub").join("b.txt"), b"nested\n").unwrap();
    git(dir.path(), &["add", "-A"]);
    git(dir.path(), &["commit", "-m", "initial"]);
    dir
}

fn entry_for<'a>(
    entries: &'a [git_diff::worktree::WorkingTreeStatusEntry],
    path: &str,
) -> Option<&'a git_diff::worktree::WorkingTreeStatusEntry> {
    entries.iter().find(|e| e.path == BString::from(path))
}

#[test]
fn clean_checkout_has_no_changes() {
    let dir = setup_committed_repo();
    let mut repo = Repository::open(dir.path()).unwrap();

    let status = compute_working_tree_status(&mut repo).unwrap();
    assert!(status.is_empty(), "expected no status entries, got {status:?}");
}

#[test]
fn modified_file_detected_in_work_status() {
    let dir = setup_committed_repo();
    std::fs::write(dir.path().join("a.txt"), b"changed\n").unwrap();

    let mut repo = Repository::open(dir.path()).unwrap();
    let status = compute_working_tree_status(&mut repo).unwrap();

    let entry = entry_for(&status, "a.txt").expect("a.txt should have a status entry");
    assert_eq!(entry.work_status, Some(WorkStatus::Modified));
    assert_eq!(entry.index_status, None);
}

#[test]
fn deleted_working_copy_detected() {
    let dir = setup_committed_repo();
    std::fs::remove_file(dir.path().join("a.txt")).unwrap();

    let mut repo = Repository::open(dir.path()).unwrap();
    let status = compute_working_tree_status(&mut repo).unwrap();

    let entry = entry_for(&status, "a.txt").expect("a.txt should have a status entry");
    assert_eq!(entry.work_status, Some(WorkStatus::Deleted));
}

#[test]
fn staged_new_file_shows_added_index_status() {
    let dir = setup_committed_repo();
    std::fs::write(dir.path().join("new.txt"), b"new\n").unwrap();
    git(dir.path(), &["add", "new.txt"]);

    let mut repo = Repository::open(dir.path()).unwrap();
    let status = compute_working_tree_status(&mut repo).unwrap();

    let entry = entry_for(&status, "new.txt").expect("new.txt should have a status entry");
    assert_eq!(entry.index_status, Some(IndexStatus::Added));
    assert_eq!(entry.work_status, None);
    assert!(!entry.is_untracked);
}

#[test]
fn untracked_file_reported_and_not_double_counted() {
    let dir = setup_committed_repo();
    std::fs::write(dir.path().join("loose.txt"), b"stray\n").unwrap();

    let mut repo = Repository::open(dir.path()).unwrap();
    let status = compute_working_tree_status(&mut repo).unwrap();

    let entry = entry_for(&status, "loose.txt").expect("loose.txt should be untracked");
    assert!(entry.is_untracked);
    assert_eq!(entry.index_status, None);
    assert_eq!(entry.work_status, None);
}

#[test]
fn ignored_untracked_file_is_suppressed() {
    let dir = setup_committed_repo();
    std::fs::write(dir.path().join(".gitignore"), b"*.log\n").unwrap();
    std::fs::write(dir.path().join("debug.log"), b"log output\n").unwrap();

    let mut repo = Repository::open(dir.path()).unwrap();
    let status = compute_working_tree_status(&mut repo).unwrap();

    assert!(entry_for(&status, "debug.log").is_none());
    // The untracked .gitignore itself is still reported.
    assert!(entry_for(&status, ".gitignore").is_some());
}

#[test]
fn working_tree_file_diff_against_head() {
    let dir = setup_committed_repo();
    std::fs::write(dir.path().join("a.txt"), b"hello\nworld\n").unwrap();

    let repo = Repository::open(dir.path()).unwrap();
    let diff = compute_working_tree_file_diff(&repo, "a.txt".as_bytes().as_bstr(), 3).unwrap();

    assert!(!diff.is_binary);
    assert_eq!(diff.hunks.len(), 1);
}
