#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use gitbridge::audit::MemorySink;
use gitbridge::git::{Git, Repository};
use tempfile::TempDir;

/// Run git synchronously for test setup, panicking on failure
pub fn git(repo_path: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Run git synchronously and ignore its exit status
pub fn git_unchecked(repo_path: &Path, args: &[&str]) {
    Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .expect("Failed to run git");
}

/// Helper to create a test git repository whose branch is `main`
pub fn create_test_repo() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let repo_path = temp_dir.path().to_path_buf();

    git(&repo_path, &["init", "-q"]);
    git(&repo_path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    configure_identity(&repo_path);

    (temp_dir, repo_path)
}

/// Give the repository a committer identity and disable signing
pub fn configure_identity(repo_path: &Path) {
    git(repo_path, &["config", "user.name", "Test User"]);
    git(repo_path, &["config", "user.email", "test@example.com"]);
    git(repo_path, &["config", "commit.gpgsign", "false"]);
    git(repo_path, &["config", "tag.gpgsign", "false"]);
}

/// Helper to create a commit
pub fn create_commit(repo_path: &Path, file: &str, content: &str, message: &str) {
    let file_path = repo_path.join(file);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).expect("Failed to create directory");
    }
    fs::write(&file_path, content).expect("Failed to write file");

    git(repo_path, &["add", file]);
    git(repo_path, &["commit", "-q", "-m", message]);
}

/// Open `repo_path` with a sink that records every command line
pub fn open_repo(repo_path: &Path) -> (Repository, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let git = Git::new("git").with_sink(sink.clone());
    let repository = git.open(repo_path, repo_path.join(".git"));
    (repository, sink)
}

/// Leave `repo_path` in the middle of a conflicting merge on `file`
pub fn create_merge_conflict(repo_path: &Path, file: &str) {
    create_commit(repo_path, file, "base\n", "Base");
    git(repo_path, &["checkout", "-q", "-b", "topic"]);
    create_commit(repo_path, file, "topic side\n", "Topic change");
    git(repo_path, &["checkout", "-q", "main"]);
    create_commit(repo_path, file, "main side\n", "Main change");
    git_unchecked(repo_path, &["merge", "topic"]);
}
