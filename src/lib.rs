pub mod audit;
pub mod config;
pub mod error;
pub mod error_translation;
pub mod git;

// Re-export commonly used types for convenience
pub use error::{AppError, CommandError, GitError, GitResult, Result};
pub use git::{Git, GitErrorCode, GitVersion, Outcome, Repository};
