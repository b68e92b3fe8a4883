pub mod cancel;
pub mod chunk;
pub mod classifier;
pub mod encoding;
pub mod executor;
pub mod options;
pub mod parser;
pub mod repository;
pub mod version;

// Re-export commonly used types
pub use cancel::{CancellationSource, CancellationToken};
pub use classifier::{GitErrorCode, Operation, classify, classify_operation};
pub use executor::{CloneOptions, CommandOutput, ExecOptions, Git, RawOutput};
pub use options::{
    AddOptions, BranchQuery, CheckoutOptions, CommitOptions, ConfigScope, FetchOptions, ForcePushMode,
    LogFileOptions, LogOptions, NoOpReason, ObjectDetails, ObjectType, Outcome, PullOptions, PushOptions,
    RefQuery, RefSort, StatusOptions, StatusResult,
};
pub use parser::{Branch, Commit, Ref, RefType, StatusEntry, UpstreamRef};
pub use repository::Repository;
pub use version::{GitInstallation, GitVersion, find_git, find_specific_git};
