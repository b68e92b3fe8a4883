//! Maps git's free-form stderr text onto a closed set of error codes.
//!
//! Classification is two-phase. [`classify`] runs on every failed process
//! and only looks at stderr. [`classify_operation`] is applied afterwards by
//! facade operations whose failures are ambiguous without context (for
//! example `CONFLICT` means something different for a merge than for a stash
//! apply), and may inspect stdout as well.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Classified git failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GitErrorCode {
    NotAGitRepository,
    RepositoryIsLocked,
    AuthenticationFailed,
    BadConfigFile,
    CantCreatePipe,
    RepositoryNotFound,
    CantAccessRemote,
    BranchNotFullyMerged,
    NoRemoteReference,
    BranchAlreadyExists,
    InvalidBranchName,
    DirtyWorkTree,
    UnmergedChanges,
    NoUserNameConfigured,
    NoUserEmailConfigured,
    Conflict,
    PushRejected,
    RemoteConnectionError,
    NoUpstreamBranch,
    PermissionDenied,
    NoPathFound,
    NoLocalChanges,
    NoStashFound,
    LocalChangesOverwritten,
    StashConflict,
    PatchDoesNotApply,
    WrongCase,
    UnknownPath,
    CantLockRef,
    CantRebaseMultipleBranches,
    NoRemoteRepositorySpecified,
}

impl GitErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GitErrorCode::NotAGitRepository => "NotAGitRepository",
            GitErrorCode::RepositoryIsLocked => "RepositoryIsLocked",
            GitErrorCode::AuthenticationFailed => "AuthenticationFailed",
            GitErrorCode::BadConfigFile => "BadConfigFile",
            GitErrorCode::CantCreatePipe => "CantCreatePipe",
            GitErrorCode::RepositoryNotFound => "RepositoryNotFound",
            GitErrorCode::CantAccessRemote => "CantAccessRemote",
            GitErrorCode::BranchNotFullyMerged => "BranchNotFullyMerged",
            GitErrorCode::NoRemoteReference => "NoRemoteReference",
            GitErrorCode::BranchAlreadyExists => "BranchAlreadyExists",
            GitErrorCode::InvalidBranchName => "InvalidBranchName",
            GitErrorCode::DirtyWorkTree => "DirtyWorkTree",
            GitErrorCode::UnmergedChanges => "UnmergedChanges",
            GitErrorCode::NoUserNameConfigured => "NoUserNameConfigured",
            GitErrorCode::NoUserEmailConfigured => "NoUserEmailConfigured",
            GitErrorCode::Conflict => "Conflict",
            GitErrorCode::PushRejected => "PushRejected",
            GitErrorCode::RemoteConnectionError => "RemoteConnectionError",
            GitErrorCode::NoUpstreamBranch => "NoUpstreamBranch",
            GitErrorCode::PermissionDenied => "PermissionDenied",
            GitErrorCode::NoPathFound => "NoPathFound",
            GitErrorCode::NoLocalChanges => "NoLocalChanges",
            GitErrorCode::NoStashFound => "NoStashFound",
            GitErrorCode::LocalChangesOverwritten => "LocalChangesOverwritten",
            GitErrorCode::StashConflict => "StashConflict",
            GitErrorCode::PatchDoesNotApply => "PatchDoesNotApply",
            GitErrorCode::WrongCase => "WrongCase",
            GitErrorCode::UnknownPath => "UnknownPath",
            GitErrorCode::CantLockRef => "CantLockRef",
            GitErrorCode::CantRebaseMultipleBranches => "CantRebaseMultipleBranches",
            GitErrorCode::NoRemoteRepositorySpecified => "NoRemoteRepositorySpecified",
        }
    }
}

impl fmt::Display for GitErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which stream a contextual rule inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

struct Rule {
    pattern: Regex,
    stream: Stream,
    code: GitErrorCode,
}

impl Rule {
    fn new(pattern: &str, stream: Stream, code: GitErrorCode) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("classifier pattern must compile"),
            stream,
            code,
        }
    }

    fn matches(&self, stdout: &str, stderr: &str) -> bool {
        match self.stream {
            Stream::Stdout => self.pattern.is_match(stdout),
            Stream::Stderr => self.pattern.is_match(stderr),
        }
    }
}

fn stderr_rule(pattern: &str, code: GitErrorCode) -> Rule {
    Rule::new(pattern, Stream::Stderr, code)
}

fn stdout_rule(pattern: &str, code: GitErrorCode) -> Rule {
    Rule::new(pattern, Stream::Stdout, code)
}

// Order matters: the first matching rule wins.
static GENERIC_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use GitErrorCode::*;
    vec![
        stderr_rule(
            r"Another git process seems to be running in this repository|If no other git process is currently running",
            RepositoryIsLocked,
        ),
        stderr_rule(r"(?i)Authentication failed", AuthenticationFailed),
        stderr_rule(r"(?i)Not a git repository", NotAGitRepository),
        stderr_rule(r"bad config file", BadConfigFile),
        stderr_rule(
            r"cannot make pipe for command substitution|cannot create standard input pipe",
            CantCreatePipe,
        ),
        stderr_rule(r"Repository not found", RepositoryNotFound),
        stderr_rule(r"unable to access", CantAccessRemote),
        stderr_rule(r"branch '.+' is not fully merged", BranchNotFullyMerged),
        stderr_rule(r"Couldn't find remote ref", NoRemoteReference),
        stderr_rule(r"(?i)A branch named '.+' already exists", BranchAlreadyExists),
        stderr_rule(r"'.+' is not a valid branch name", InvalidBranchName),
        stderr_rule(r"Please,? commit your changes or stash them", DirtyWorkTree),
        stderr_rule(r"(?m)^error: failed to push some refs to\b", PushRejected),
    ]
});

/// Generic stderr classification applied to every failed git process.
///
/// Returns `None` when nothing matches; the exit-code based error stands.
pub fn classify(stderr: &str) -> Option<GitErrorCode> {
    GENERIC_RULES
        .iter()
        .find(|rule| rule.pattern.is_match(stderr))
        .map(|rule| rule.code)
}

/// Facade operations that re-classify failures with their own rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Checkout,
    Commit,
    Merge,
    Fetch,
    Pull,
    Rebase,
    Push,
    Blame,
    StashCreate,
    StashApply,
    StashDrop,
    Apply,
    Show,
}

static CHECKOUT_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![stderr_rule(
        r"Please,? commit your changes or stash them",
        GitErrorCode::DirtyWorkTree,
    )]
});

static COMMIT_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![stderr_rule(
        r"not possible because you have unmerged files",
        GitErrorCode::UnmergedChanges,
    )]
});

static MERGE_RULES: LazyLock<Vec<Rule>> =
    LazyLock::new(|| vec![stdout_rule(r"(?m)^CONFLICT ", GitErrorCode::Conflict)]);

static FETCH_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        stderr_rule(
            r"No remote repository specified\.",
            GitErrorCode::NoRemoteRepositorySpecified,
        ),
        stderr_rule(
            r"Could not read from remote repository",
            GitErrorCode::RemoteConnectionError,
        ),
    ]
});

static PULL_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use GitErrorCode::*;
    vec![
        stdout_rule(r"(?m)^CONFLICT \([^)]+\): \b", Conflict),
        stderr_rule(r"Please tell me who you are\.", NoUserNameConfigured),
        stderr_rule(r"Could not read from remote repository", RemoteConnectionError),
        stderr_rule(
            r"(?i)Pull is not possible because you have unmerged files|Cannot pull with rebase: You have unstaged changes|Your local changes to the following files would be overwritten|Please, commit your changes before you can merge",
            DirtyWorkTree,
        ),
        stderr_rule(r"(?i)cannot lock ref|unable to update local ref", CantLockRef),
        stderr_rule(
            r"(?i)cannot rebase onto multiple branches",
            CantRebaseMultipleBranches,
        ),
    ]
});

static REBASE_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        stdout_rule(r"(?m)^CONFLICT \([^)]+\): \b", GitErrorCode::Conflict),
        stderr_rule(
            r"(?i)cannot rebase onto multiple branches",
            GitErrorCode::CantRebaseMultipleBranches,
        ),
    ]
});

static PUSH_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use GitErrorCode::*;
    vec![
        stderr_rule(r"(?m)^error: failed to push some refs to\b", PushRejected),
        stderr_rule(r"Could not read from remote repository", RemoteConnectionError),
        stderr_rule(
            r"(?m)^fatal: The current branch .* has no upstream branch",
            NoUpstreamBranch,
        ),
        stderr_rule(r"Permission.*denied", PermissionDenied),
    ]
});

static BLAME_RULES: LazyLock<Vec<Rule>> =
    LazyLock::new(|| vec![stderr_rule(r"(?m)^fatal: no such path", GitErrorCode::NoPathFound)]);

static STASH_CREATE_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![stderr_rule(
        r"No local changes to save",
        GitErrorCode::NoLocalChanges,
    )]
});

static STASH_APPLY_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use GitErrorCode::*;
    vec![
        stderr_rule(r"No stash (?:entries )?found", NoStashFound),
        stderr_rule(
            r"error: Your local changes to the following files would be overwritten",
            LocalChangesOverwritten,
        ),
        stdout_rule(r"(?m)^CONFLICT", StashConflict),
    ]
});

static STASH_DROP_RULES: LazyLock<Vec<Rule>> =
    LazyLock::new(|| vec![stderr_rule(r"No stash (?:entries )?found", GitErrorCode::NoStashFound)]);

static APPLY_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![stderr_rule(
        r"patch does not apply",
        GitErrorCode::PatchDoesNotApply,
    )]
});

static SHOW_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![stderr_rule(
        r"exists on disk, but not in",
        GitErrorCode::WrongCase,
    )]
});

fn rules_for(operation: Operation) -> &'static [Rule] {
    match operation {
        Operation::Checkout => &CHECKOUT_RULES,
        Operation::Commit => &COMMIT_RULES,
        Operation::Merge => &MERGE_RULES,
        Operation::Fetch => &FETCH_RULES,
        Operation::Pull => &PULL_RULES,
        Operation::Rebase => &REBASE_RULES,
        Operation::Push => &PUSH_RULES,
        Operation::Blame => &BLAME_RULES,
        Operation::StashCreate => &STASH_CREATE_RULES,
        Operation::StashApply => &STASH_APPLY_RULES,
        Operation::StashDrop => &STASH_DROP_RULES,
        Operation::Apply => &APPLY_RULES,
        Operation::Show => &SHOW_RULES,
    }
}

/// Operation-specific re-classification of a failed process.
///
/// Returns `None` when no contextual rule applies, in which case the code
/// from [`classify`] (if any) should be kept.
pub fn classify_operation(operation: Operation, stdout: &str, stderr: &str) -> Option<GitErrorCode> {
    rules_for(operation)
        .iter()
        .find(|rule| rule.matches(stdout, stderr))
        .map(|rule| rule.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_repository() {
        let stderr = "fatal: Unable to create '/repo/.git/index.lock': File exists.\n\n\
                      Another git process seems to be running in this repository, e.g.";
        assert_eq!(classify(stderr), Some(GitErrorCode::RepositoryIsLocked));
    }

    #[test]
    fn test_authentication_failed_anywhere() {
        assert_eq!(
            classify("remote: Invalid username or password.\nfatal: Authentication failed for 'https://host/repo.git/'"),
            Some(GitErrorCode::AuthenticationFailed)
        );
        assert_eq!(
            classify("fatal: authentication FAILED"),
            Some(GitErrorCode::AuthenticationFailed)
        );
    }

    #[test]
    fn test_first_match_wins() {
        // Both the lock and the auth pattern are present; the lock rule comes first.
        let stderr = "Authentication failed\nAnother git process seems to be running in this repository";
        assert_eq!(classify(stderr), Some(GitErrorCode::RepositoryIsLocked));
    }

    #[test]
    fn test_branch_patterns() {
        assert_eq!(
            classify("error: The branch 'feature' is not fully merged."),
            Some(GitErrorCode::BranchNotFullyMerged)
        );
        assert_eq!(
            classify("fatal: A branch named 'feature' already exists."),
            Some(GitErrorCode::BranchAlreadyExists)
        );
        assert_eq!(
            classify("fatal: a branch named 'feature' already exists"),
            Some(GitErrorCode::BranchAlreadyExists)
        );
        assert_eq!(
            classify("fatal: 'a..b' is not a valid branch name."),
            Some(GitErrorCode::InvalidBranchName)
        );
    }

    #[test]
    fn test_push_rejected() {
        let stderr = "To github.com:org/repo.git\n ! [rejected]  main -> main (fetch first)\nerror: failed to push some refs to 'origin'";
        assert_eq!(classify(stderr), Some(GitErrorCode::PushRejected));
        assert_eq!(
            classify_operation(Operation::Push, "", "error: failed to push some refs to 'origin'"),
            Some(GitErrorCode::PushRejected)
        );
    }

    #[test]
    fn test_unclassified() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("warning: LF will be replaced by CRLF"), None);
    }

    #[test]
    fn test_conflict_depends_on_operation() {
        let stdout = "Auto-merging a.txt\nCONFLICT (content): Merge conflict in a.txt\n";
        assert_eq!(
            classify_operation(Operation::Merge, stdout, ""),
            Some(GitErrorCode::Conflict)
        );
        assert_eq!(
            classify_operation(Operation::StashApply, stdout, ""),
            Some(GitErrorCode::StashConflict)
        );
        assert_eq!(classify_operation(Operation::Push, stdout, ""), None);
    }

    #[test]
    fn test_pull_rules() {
        assert_eq!(
            classify_operation(
                Operation::Pull,
                "",
                "error: cannot lock ref 'refs/remotes/origin/main': is at abc but expected def"
            ),
            Some(GitErrorCode::CantLockRef)
        );
        assert_eq!(
            classify_operation(
                Operation::Pull,
                "",
                "error: Cannot pull with rebase: You have unstaged changes."
            ),
            Some(GitErrorCode::DirtyWorkTree)
        );
        assert_eq!(
            classify_operation(Operation::Pull, "", "*** Please tell me who you are.\n"),
            Some(GitErrorCode::NoUserNameConfigured)
        );
    }

    #[test]
    fn test_push_rules() {
        assert_eq!(
            classify_operation(
                Operation::Push,
                "",
                "fatal: The current branch feature has no upstream branch.\nTo push the current branch"
            ),
            Some(GitErrorCode::NoUpstreamBranch)
        );
        assert_eq!(
            classify_operation(Operation::Push, "", "git@host: Permission denied (publickey)."),
            Some(GitErrorCode::PermissionDenied)
        );
        assert_eq!(
            classify_operation(
                Operation::Push,
                "",
                "fatal: Could not read from remote repository."
            ),
            Some(GitErrorCode::RemoteConnectionError)
        );
    }

    #[test]
    fn test_stash_rules() {
        assert_eq!(
            classify_operation(Operation::StashApply, "", "error: No stash found."),
            Some(GitErrorCode::NoStashFound)
        );
        assert_eq!(
            classify_operation(Operation::StashDrop, "", "No stash entries found."),
            Some(GitErrorCode::NoStashFound)
        );
        assert_eq!(
            classify_operation(
                Operation::StashApply,
                "",
                "error: Your local changes to the following files would be overwritten by merge:"
            ),
            Some(GitErrorCode::LocalChangesOverwritten)
        );
        assert_eq!(
            classify_operation(Operation::StashCreate, "", "No local changes to save"),
            Some(GitErrorCode::NoLocalChanges)
        );
    }

    #[test]
    fn test_code_display_matches_serde_name() {
        let json = serde_json::to_string(&GitErrorCode::CantRebaseMultipleBranches).unwrap();
        assert_eq!(json, format!("\"{}\"", GitErrorCode::CantRebaseMultipleBranches));
    }
}
