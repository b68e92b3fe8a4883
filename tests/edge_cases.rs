mod helpers;

use gitbridge::audit::MemorySink;
use gitbridge::config::GitConfig;
use gitbridge::git::parser::{parse_commits, parse_name_status, parse_refs};
use gitbridge::git::{AddOptions, Git, GitErrorCode, StatusOptions};
use gitbridge::GitError;
use helpers::{create_commit, create_test_repo, git, open_repo};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

/// Test parsing completely empty git output
#[test]
fn test_parse_empty_outputs() {
    assert!(parse_commits("").is_empty());
    assert!(parse_refs("").is_empty());
    assert!(parse_name_status("").is_empty());
}

/// Test that a truncated rename record ends name-status parsing
#[test]
fn test_parse_truncated_rename() {
    let changes = parse_name_status("M\0kept.rs\0R100\0old.rs\0");
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].path, "kept.rs");
}

/// Test commits with empty messages
#[test]
fn test_parse_commits_empty_messages() {
    let hash = "a".repeat(40);
    let output = format!("{hash}\nJane\njane@example.com\n1700000000\n1700000000\n\n\0");

    let commits = parse_commits(&output);

    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].message, "");
    assert!(commits[0].parents.is_empty());
}

/// Test that long path lists are split across several invocations
#[tokio::test]
async fn test_add_many_paths_is_chunked() {
    let (_temp, repo_path) = create_test_repo();
    let paths: Vec<String> = (0..10).map(|i| format!("file_{}.txt", i)).collect();
    for path in &paths {
        fs::write(repo_path.join(path), "x").unwrap();
    }

    let sink = Arc::new(MemorySink::new());
    let git = Git::new("git")
        .with_config(&GitConfig {
            max_cli_length: 20,
            ..GitConfig::default()
        })
        .with_sink(sink.clone());
    let repo = git.open(&repo_path, repo_path.join(".git"));

    repo.add(&paths, &AddOptions::default()).await.unwrap();

    let adds: Vec<_> = sink
        .commands()
        .into_iter()
        .filter(|command| command.starts_with("add -A -- "))
        .collect();
    assert_eq!(adds.len(), 5);
    assert_eq!(adds[0], "add -A -- file_0.txt file_1.txt");

    let status = repo.status(&StatusOptions::default()).await.unwrap().status;
    assert_eq!(status.len(), 10);
    assert!(status.iter().all(|entry| entry.x == 'A'));
}

/// Test that clean spread over many directories removes every file
#[tokio::test]
async fn test_clean_many_directories() {
    let (_temp, repo_path) = create_test_repo();
    let mut paths = Vec::new();
    for dir in 0..6 {
        fs::create_dir(repo_path.join(format!("dir{}", dir))).unwrap();
        for file in 0..3 {
            let path = format!("dir{}/f{}.txt", dir, file);
            fs::write(repo_path.join(&path), "x").unwrap();
            paths.push(path);
        }
    }

    let git = Git::new("git").with_config(&GitConfig {
        clean_concurrency: 2,
        ..GitConfig::default()
    });
    let repo = git.open(&repo_path, repo_path.join(".git"));

    repo.clean(&paths).await.unwrap();

    assert!(paths.iter().all(|path| !repo_path.join(path).exists()));
}

/// Test that a failing clean batch does not stop the others
#[tokio::test]
async fn test_clean_failure_lets_other_batches_finish() {
    let (_temp, repo_path) = create_test_repo();
    let mut paths = vec!["../outside/escape.txt".to_string()];
    for dir in 0..4 {
        fs::create_dir(repo_path.join(format!("dir{}", dir))).unwrap();
        let path = format!("dir{}/f.txt", dir);
        fs::write(repo_path.join(&path), "x").unwrap();
        paths.push(path);
    }

    let git = Git::new("git").with_config(&GitConfig {
        clean_concurrency: 2,
        ..GitConfig::default()
    });
    let repo = git.open(&repo_path, repo_path.join(".git"));

    assert!(repo.clean(&paths).await.is_err());
    assert!(paths[1..].iter().all(|path| !repo_path.join(path).exists()));
}

/// Test unicode and space-containing paths in status
#[tokio::test]
async fn test_status_unicode_paths() {
    let (_temp, repo_path) = create_test_repo();
    create_commit(&repo_path, "données/été 2024.txt", "v1", "Initial");
    fs::write(repo_path.join("données/été 2024.txt"), "v2").unwrap();
    let (repo, _) = open_repo(&repo_path);

    let status = repo.status(&StatusOptions::default()).await.unwrap().status;

    assert_eq!(status.len(), 1);
    assert_eq!(status[0].path, "données/été 2024.txt");
}

/// Test decoding blob content in a legacy encoding
#[tokio::test]
async fn test_buffer_string_latin1() {
    let (_temp, repo_path) = create_test_repo();
    fs::write(repo_path.join("legacy.txt"), b"caf\xe9\n").unwrap();
    git(&repo_path, &["add", "legacy.txt"]);
    git(&repo_path, &["commit", "-q", "-m", "Legacy"]);
    let (repo, _) = open_repo(&repo_path);

    let text = repo
        .buffer_string("HEAD:legacy.txt", Some("latin1"), false)
        .await
        .unwrap();

    assert_eq!(text, "café\n");
}

/// Test that a byte-order mark is ignored when guessing is off
#[tokio::test]
async fn test_buffer_string_keeps_requested_encoding() {
    let (_temp, repo_path) = create_test_repo();
    fs::write(repo_path.join("marked.txt"), b"\xff\xfea\0").unwrap();
    git(&repo_path, &["add", "marked.txt"]);
    git(&repo_path, &["commit", "-q", "-m", "Marked"]);
    let (repo, _) = open_repo(&repo_path);

    let text = repo
        .buffer_string("HEAD:marked.txt", Some("latin1"), false)
        .await
        .unwrap();

    assert_eq!(text, "\u{ff}\u{fe}a\0");
}

/// Test that a byte-order mark beats the requested encoding
#[tokio::test]
async fn test_buffer_string_guesses_utf16() {
    let (_temp, repo_path) = create_test_repo();
    fs::write(repo_path.join("wide.txt"), b"\xff\xfeh\0i\0").unwrap();
    git(&repo_path, &["add", "wide.txt"]);
    git(&repo_path, &["commit", "-q", "-m", "Wide"]);
    let (repo, _) = open_repo(&repo_path);

    let text = repo.buffer_string("HEAD:wide.txt", Some("latin1"), true).await.unwrap();
    assert_eq!(text, "hi");

    let object_type = repo.detect_object_type("HEAD:wide.txt").await.unwrap();
    assert_eq!(object_type.mimetype, "text/plain");
    assert_eq!(object_type.encoding.as_deref(), Some("utf16le"));
}

/// Test status outside any repository
#[tokio::test]
async fn test_status_outside_repository() {
    let temp_dir = TempDir::new().unwrap();
    let (repo, _) = open_repo(temp_dir.path());

    let err = repo.status(&StatusOptions::default()).await.unwrap_err();

    assert_eq!(err.code(), Some(GitErrorCode::NotAGitRepository));
    let command = err.command_error().expect("status failure should carry details");
    assert_eq!(command.command.as_deref(), Some("status"));
    assert_eq!(command.exit_code, Some(128));
}

/// Test a git executable that does not exist
#[tokio::test]
async fn test_missing_executable() {
    let (_temp, repo_path) = create_test_repo();
    let repo = Git::new("/definitely/not/here/git").open(&repo_path, repo_path.join(".git"));

    let err = repo.status(&StatusOptions::default()).await.unwrap_err();

    assert!(matches!(err, GitError::ExecutableNotFound { .. }));
    assert!(err.is_enoent());
    assert_eq!(err.code(), Some(GitErrorCode::NotAGitRepository));
}

/// Test get_branch on a name that resolves to nothing
#[tokio::test]
async fn test_get_unknown_branch() {
    let (_temp, repo_path) = create_test_repo();
    create_commit(&repo_path, "a.txt", "a", "Initial");
    let (repo, _) = open_repo(&repo_path);

    assert!(repo.get_branch("does-not-exist").await.is_err());

    let main = repo.get_branch("main").await.unwrap();
    assert!(main.upstream.is_none());
    assert!(main.ahead.is_none());
}
