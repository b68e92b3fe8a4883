use serde::Serialize;

use crate::error::{AppError, GitError};
use crate::git::classifier::GitErrorCode;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFriendlyError {
    pub simple_message: String,
    pub suggestion: Option<String>,
    pub raw_error: String,
    pub code: Option<GitErrorCode>,
}

pub struct ErrorTranslator;

impl ErrorTranslator {
    /// Translate an AppError into a user-friendly error message
    pub fn translate_app_error(error: &AppError) -> UserFriendlyError {
        match error {
            AppError::Git(git_err) => Self::translate(git_err),
            AppError::Config(config_err) => UserFriendlyError {
                simple_message: "Configuration error occurred.".to_string(),
                suggestion: Some("Check your config file at ~/.config/gitbridge/config.toml".to_string()),
                raw_error: config_err.to_string(),
                code: None,
            },
            AppError::Io(io_err) => UserFriendlyError {
                simple_message: "I/O error occurred.".to_string(),
                suggestion: Some("Check file permissions and disk space".to_string()),
                raw_error: io_err.to_string(),
                code: None,
            },
        }
    }

    /// Translate a GitError into a user-friendly error message.
    ///
    /// The classified code wins; unclassified failures fall back to matching
    /// the error text.
    pub fn translate(error: &GitError) -> UserFriendlyError {
        let raw_error = match error.command_error() {
            Some(command) if !command.stderr().trim().is_empty() => command.stderr().trim().to_string(),
            _ => error.to_string(),
        };
        let code = error.code();

        let (simple_message, suggestion) = match error {
            GitError::ExecutableNotFound { .. } | GitError::GitNotFound => (
                "Git could not be found.".to_string(),
                Some("Install git or add its location to path_hints in the config file.".to_string()),
            ),
            GitError::GitVersionTooOld(_) => (
                "The installed git is too old.".to_string(),
                Some("Upgrade git to 2.20 or newer.".to_string()),
            ),
            GitError::Cancelled => ("The operation was cancelled.".to_string(), None),
            _ => match code.and_then(Self::describe_code) {
                Some((message, suggestion)) => (message.to_string(), suggestion.map(str::to_string)),
                None => Self::match_error_patterns(&raw_error),
            },
        };

        UserFriendlyError {
            simple_message,
            suggestion,
            raw_error,
            code,
        }
    }

    fn describe_code(code: GitErrorCode) -> Option<(&'static str, Option<&'static str>)> {
        use GitErrorCode::*;

        let described = match code {
            NotAGitRepository => (
                "Current directory is not a git repository.",
                Some("Initialize with: git init"),
            ),
            RepositoryIsLocked => (
                "Another git process is using this repository.",
                Some("Wait for it to finish, or remove .git/index.lock if no git process is running."),
            ),
            AuthenticationFailed => (
                "Authentication failed - check your credentials.",
                Some("Verify your SSH keys or personal access token."),
            ),
            BadConfigFile => (
                "A git configuration file could not be parsed.",
                Some("Fix the file named in the error, then retry."),
            ),
            RepositoryNotFound | CantAccessRemote => (
                "Remote repository not found.",
                Some("Check the remote URL with: git remote -v"),
            ),
            RemoteConnectionError => (
                "Could not connect to the remote repository.",
                Some("Check your network connection and access rights."),
            ),
            NoRemoteRepositorySpecified => (
                "No remote repository is configured.",
                Some("Add one with: git remote add origin <url>"),
            ),
            BranchNotFullyMerged => (
                "The branch is not fully merged.",
                Some("Merge it first, or force the deletion."),
            ),
            BranchAlreadyExists => (
                "A branch with that name already exists.",
                Some("Use a different name or delete the existing branch first."),
            ),
            InvalidBranchName => ("That is not a valid branch name.", None),
            NoRemoteReference => ("The remote branch does not exist.", None),
            NoUpstreamBranch => (
                "No remote branch is configured for tracking.",
                Some("Try: git push -u origin <branch-name>"),
            ),
            DirtyWorkTree | LocalChangesOverwritten => (
                "Operation would overwrite uncommitted changes.",
                Some("Commit or stash your changes first: git stash"),
            ),
            UnmergedChanges => (
                "There are unmerged files.",
                Some("Resolve the conflicts and stage the files before committing."),
            ),
            Conflict | StashConflict => (
                "Merge has conflicts that need to be resolved.",
                Some("Fix conflicts in the listed files, then git add and git commit."),
            ),
            NoUserNameConfigured => (
                "No git user name is configured.",
                Some("Set one with: git config --global user.name \"Your Name\""),
            ),
            NoUserEmailConfigured => (
                "No git user email is configured.",
                Some("Set one with: git config --global user.email you@example.com"),
            ),
            PushRejected => (
                "Local and remote branches have diverged.",
                Some("Pull changes first: git pull, or force push: git push --force (dangerous!)"),
            ),
            PermissionDenied => (
                "Permission denied.",
                Some("Check that you have write access to the remote."),
            ),
            NoPathFound | UnknownPath => (
                "File path not found in the repository.",
                Some("Check the file path and try again. Use 'git status' to see available files."),
            ),
            WrongCase => (
                "The path exists on disk with different letter case.",
                Some("Use the path exactly as git tracks it."),
            ),
            NoLocalChanges => ("There are no local changes to stash.", None),
            NoStashFound => ("No stash found.", None),
            PatchDoesNotApply => (
                "The patch does not apply to the current files.",
                None,
            ),
            CantLockRef => (
                "A reference could not be locked.",
                Some("Prune stale remote branches with: git remote prune origin"),
            ),
            CantRebaseMultipleBranches => (
                "Cannot rebase onto multiple branches.",
                Some("Configure a single upstream branch."),
            ),
            CantCreatePipe => return None,
        };

        Some(described)
    }

    /// Match common git error patterns and provide user-friendly messages
    fn match_error_patterns(error_text: &str) -> (String, Option<String>) {
        let lower = error_text.to_lowercase();

        // Detached HEAD
        if lower.contains("detached head") {
            return (
                "Not currently on any branch (detached HEAD state).".to_string(),
                Some("Create a new branch: git checkout -b <branch-name>".to_string()),
            );
        }

        // Nothing to commit
        if lower.contains("nothing to commit") || lower.contains("working tree clean") {
            return (
                "No changes to commit - working directory is clean.".to_string(),
                None,
            );
        }

        if lower.contains("pathspec") && lower.contains("did not match") {
            return (
                "File path not found in the repository.".to_string(),
                Some("Check the file path and try again. Use 'git status' to see available files.".to_string()),
            );
        }

        // Untracked files would be overwritten
        if lower.contains("untracked working tree files would be overwritten") {
            return (
                "Untracked files would be overwritten by this operation.".to_string(),
                Some("Move or remove the conflicting files, or commit them first.".to_string()),
            );
        }

        if lower.contains("rebase in progress") {
            return (
                "A rebase operation is currently in progress.".to_string(),
                Some("Continue with: git rebase --continue, or abort: git rebase --abort".to_string()),
            );
        }

        if lower.contains("merge in progress") {
            return (
                "A merge operation is currently in progress.".to_string(),
                Some("Complete the merge and commit, or abort: git merge --abort".to_string()),
            );
        }

        // No changes staged
        if lower.contains("no changes added to commit") {
            return (
                "No files staged for commit.".to_string(),
                Some("Stage files with: git add <file>".to_string()),
            );
        }

        // Default: return the error as-is with no suggestion
        (error_text.to_string(), None)
    }
}
