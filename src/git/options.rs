//! Option and result types for [`crate::git::Repository`] operations.

use serde::Serialize;

use crate::git::cancel::CancellationToken;
use crate::git::parser::StatusEntry;

/// `git config` scope flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    Local,
    Global,
    System,
    Worktree,
}

impl ConfigScope {
    pub fn as_arg(&self) -> &'static str {
        match self {
            ConfigScope::Local => "--local",
            ConfigScope::Global => "--global",
            ConfigScope::System => "--system",
            ConfigScope::Worktree => "--worktree",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    /// Stage every tracked modification first
    pub all: bool,
    pub amend: bool,
    pub signoff: bool,
    /// GPG-sign (`-S`)
    pub sign_commit: bool,
    /// Allow a commit with no changes
    pub empty: bool,
    pub no_verify: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcePushMode {
    Force,
    ForceWithLease,
}

#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    pub remote: Option<String>,
    pub name: Option<String>,
    pub set_upstream: bool,
    pub follow_tags: bool,
    pub force: Option<ForcePushMode>,
    pub tags: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub remote: Option<String>,
    /// Only used together with `remote`
    pub refspec: Option<String>,
    pub all: bool,
    pub prune: bool,
    pub depth: Option<u32>,
    /// Marks the invocation as a background fetch for credential helpers
    pub silent: bool,
    pub cancellation: Option<CancellationToken>,
}

#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    pub rebase: bool,
    /// Remote and branch are only passed when both are set
    pub remote: Option<String>,
    pub branch: Option<String>,
    pub tags: bool,
    pub unshallow: bool,
    pub cancellation: Option<CancellationToken>,
}

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Defaults to 32
    pub max_entries: Option<usize>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LogFileOptions {
    /// Ignored when `reverse` is set
    pub max_entries: Option<usize>,
    /// Start point; with `reverse` the walk covers `hash..HEAD`
    pub hash: Option<String>,
    pub reverse: bool,
    pub sort_by_author_date: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefSort {
    #[default]
    Alphabetically,
    CommitterDate,
}

#[derive(Debug, Clone, Default)]
pub struct RefQuery {
    pub count: Option<usize>,
    pub sort: RefSort,
    /// Ref pattern such as `refs/heads`
    pub pattern: Option<String>,
    /// Only refs containing this commit
    pub contains: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BranchQuery {
    /// Include remote-tracking branches
    pub remote: bool,
    /// Pattern below `refs/`, e.g. `heads/feature*`
    pub pattern: Option<String>,
    pub count: Option<usize>,
    pub contains: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutOptions {
    pub track: bool,
    pub detached: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Only stage tracked files (`-u` instead of `-A`)
    pub update: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    /// Defaults to the configured status limit
    pub limit: Option<usize>,
    pub ignore_submodules: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResult {
    pub status: Vec<StatusEntry>,
    /// More entries existed than the limit allowed
    pub did_hit_limit: bool,
}

/// Result of an operation git may legitimately decline to do anything for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Completed,
    NoOp(NoOpReason),
}

impl Outcome {
    pub fn is_no_op(&self) -> bool {
        matches!(self, Outcome::NoOp(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoOpReason {
    /// Unmerged paths kept `reset` from touching them
    NeedsMerge,
    /// The working tree had nothing to check out
    NothingToCheckout,
    /// There was nothing to stash
    NoLocalChanges,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectDetails {
    pub mode: String,
    pub object: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectType {
    pub mimetype: String,
    /// Set when a byte-order mark announced the encoding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

impl ObjectType {
    pub fn is_text(&self) -> bool {
        self.mimetype.starts_with("text/")
    }
}
