//! Parsers for git's machine-readable output.
//!
//! Every parser is pure apart from [`StatusParser`], which keeps the
//! unconsumed tail of a live `status -z` stream between calls. Lines or
//! records that do not match the expected shape are dropped rather than
//! reported.

pub mod listing;
pub mod log;
pub mod refs;
pub mod status;
pub mod tree;

pub use listing::{
    ConfigEntry, DiffChange, DiffStatus, Remote, Stash, Submodule, parse_config_list,
    parse_gitmodules, parse_name_status, parse_remotes, parse_stash_list, parse_tracking_branches,
};
pub use log::{COMMIT_FORMAT, Commit, parse_commits};
pub use refs::{Branch, Ref, RefType, UpstreamRef, parse_ahead_behind, parse_refs, parse_upstream};
pub use status::{StatusEntry, StatusParser};
pub use tree::{LsFilesElement, LsTreeElement, parse_ls_files, parse_ls_tree};
