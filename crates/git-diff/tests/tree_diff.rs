//! Integration tests for tree-to-tree diffing, built against objects written
//! by real C git so the fixtures are byte-identical to what a repository
//! would actually contain.

use std::process::{Command, Stdio};

use bstr::BString;
use git_diff::{diff_file_pair, diff_trees, DiffStatus};
use git_hash::ObjectId;
use git_odb::ObjectDatabase;

fn git(dir: &std::path::Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_DIR", dir)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn hash_object(dir: &std::path::Path, content: &[u8]) -> String {
    let mut child = Command::new("git")
        .args(["hash-object", "-w", "--stdin"])
        .current_dir(dir)
        .env("GIT_DIR", dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    use std::io::Write;
    child.stdin.take().unwrap().write_all(content).unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success());
    String::from_utf8(out.stdout).unwrap().trim().to_string()
}

fn mktree(dir: &std::path::Path, entries: &[(&str, &str, &str)]) -> String {
    let mut input = String::new();
    for (mode, oid, name) in entries {
        let kind = match *mode {
            "040000" => "tree",
            "160000" => "commit",
            _ => "blob",
        };
        input.push_str(&format!("{mode} {kind} {oid}\t{name}\n"));
    }
    let mut child = Command::new("git")
        .args(["mktree"])
        .current_dir(dir)
        .env("GIT_DIR", dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    use std::io::Write;
    child.stdin.take().unwrap().write_all(input.as_bytes()).unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success());
    String::from_utf8(out.stdout).unwrap().trim().to_string()
}

struct Fixture {
    _dir: tempfile::TempDir,
    odb: ObjectDatabase,
    path: std::path::PathBuf,
}

fn setup() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "--bare"]);
    let path = dir.path().to_path_buf();
    let odb = ObjectDatabase::open(path.join("objects")).unwrap();
    Fixture { _dir: dir, odb, path }
}

fn oid(hex: &str) -> ObjectId {
    ObjectId::from_hex(hex).unwrap()
}

#[test]
fn detects_added_file() {
    let fx = setup();
    let blob = hash_object(&fx.path, b"hello\n");
    let new_tree = mktree(&fx.path, &[("100644", &blob, "a.txt")]);

    let entries = diff_trees(&fx.odb, None, Some(&oid(&new_tree))).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, DiffStatus::Added);
    assert_eq!(entries[0].path, BString::from("a.txt"));
}

#[test]
fn detects_modified_file() {
    let fx = setup();
    let v1 = hash_object(&fx.path, b"v1\n");
    let v2 = hash_object(&fx.path, b"v2\n");
    let old_tree = mktree(&fx.path, &[("100644", &v1, "a.txt")]);
    let new_tree = mktree(&fx.path, &[("100644", &v2, "a.txt")]);

    let entries = diff_trees(&fx.odb, Some(&oid(&old_tree)), Some(&oid(&new_tree))).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, DiffStatus::Modified);
}

#[test]
fn identical_tree_produces_no_entries() {
    let fx = setup();
    let v1 = hash_object(&fx.path, b"same\n");
    let tree = mktree(&fx.path, &[("100644", &v1, "a.txt")]);

    let entries = diff_trees(&fx.odb, Some(&oid(&tree)), Some(&oid(&tree))).unwrap();
    assert!(entries.is_empty());
}

#[test]
fn recurses_into_subtrees() {
    let fx = setup();
    let v1 = hash_object(&fx.path, b"nested\n");
    let subtree = mktree(&fx.path, &[("100644", &v1, "b.txt")]);
    let new_tree = mktree(&fx.path, &[("040000", &subtree, "dir")]);

    let entries = diff_trees(&fx.odb, None, Some(&oid(&new_tree))).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, BString::from("dir/b.txt"));
}

#[test]
fn gitlink_entry_marked_binary() {
    let fx = setup();
    // Any 40-hex value is a valid (if dangling) gitlink target.
    let sub_oid = "a".repeat(40);
    let new_tree = mktree(&fx.path, &[("160000", &sub_oid, "sub")]);

    let entries = diff_trees(&fx.odb, None, Some(&oid(&new_tree))).unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_binary);
}

#[test]
fn diff_file_pair_produces_hunks() {
    let fx = setup();
    let old_oid = hash_object(&fx.path, b"a\nb\nc\n");
    let new_oid = hash_object(&fx.path, b"a\nx\nc\n");

    let diff = diff_file_pair(&fx.odb, Some(&oid(&old_oid)), Some(&oid(&new_oid)), 3).unwrap();
    assert!(!diff.is_binary);
    assert!(!diff.truncated);
    assert_eq!(diff.hunks.len(), 1);
}

#[test]
fn tree_diff_cap_rejects_oversized_trees() {
    let fx = setup();
    let blob = hash_object(&fx.path, b"x\n");
    let entries: Vec<(String, String, String)> = (0..600)
        .map(|i| ("100644".to_string(), blob.clone(), format!("f{i}.txt")))
        .collect();
    let refs: Vec<(&str, &str, &str)> = entries
        .iter()
        .map(|(m, o, n)| (m.as_str(), o.as_str(), n.as_str()))
        .collect();
    let new_tree = mktree(&fx.path, &refs);

    let err = diff_trees(&fx.odb, None, Some(&oid(&new_tree))).unwrap_err();
    assert!(matches!(err, git_diff::DiffError::TooLarge { .. }));
}
