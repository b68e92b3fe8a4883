use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::config::settings::ConfigError;
use crate::git::classifier::GitErrorCode;

/// A git process that ran and exited unsuccessfully, or a facade-level failure
/// that carries the same diagnostic fields.
///
/// The classified `code` is attached alongside the raw git output, never in
/// place of it, so callers can always fall back to `stderr`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub message: String,
    pub exit_code: Option<i32>,
    #[serde(rename = "gitErrorCode")]
    pub code: Option<GitErrorCode>,
    #[serde(rename = "gitCommand")]
    pub command: Option<String>,
    #[serde(rename = "gitArgs")]
    pub args: Vec<String>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: GitErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn stdout(&self) -> &str {
        self.stdout.as_deref().unwrap_or("")
    }

    pub fn stderr(&self) -> &str {
        self.stderr.as_deref().unwrap_or("")
    }

    /// Pretty JSON of the diagnostic fields, suitable for an output channel.
    pub fn details_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.message.clone())
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(command) = &self.command {
            write!(f, " (git {})", command)?;
        }
        if let Some(code) = self.code {
            write!(f, " [{}]", code)?;
        }
        let stderr = self.stderr().trim();
        if !stderr.is_empty() {
            write!(f, ": {}", stderr)?;
        }
        Ok(())
    }
}

/// Errors that can occur during git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("{0}")]
    Command(Box<CommandError>),

    #[error("Failed to execute git (ENOENT): {path}")]
    ExecutableNotFound { path: PathBuf },

    #[error("Cancelled")]
    Cancelled,

    #[error("Not a git repository")]
    NotARepository,

    #[error("Git installation not found")]
    GitNotFound,

    #[error("Path not known by git: {0}")]
    UnknownPath(String),

    #[error("Failed to parse git output: {0}")]
    ParseError(String),

    #[error("Git version {0} is too old. Minimum required: 2.20")]
    GitVersionTooOld(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl GitError {
    /// The classified error code, if any.
    ///
    /// A missing executable reports `NotAGitRepository`, matching how callers
    /// treat an unusable git installation.
    pub fn code(&self) -> Option<GitErrorCode> {
        match self {
            GitError::Command(err) => err.code,
            GitError::ExecutableNotFound { .. } => Some(GitErrorCode::NotAGitRepository),
            GitError::NotARepository => Some(GitErrorCode::NotAGitRepository),
            GitError::UnknownPath(_) => Some(GitErrorCode::UnknownPath),
            _ => None,
        }
    }

    /// Whether the git executable itself could not be spawned.
    pub fn is_enoent(&self) -> bool {
        matches!(self, GitError::ExecutableNotFound { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GitError::Cancelled)
    }

    pub fn command_error(&self) -> Option<&CommandError> {
        match self {
            GitError::Command(err) => Some(err),
            _ => None,
        }
    }

    pub fn stdout(&self) -> &str {
        self.command_error().map(CommandError::stdout).unwrap_or("")
    }

    pub fn stderr(&self) -> &str {
        self.command_error().map(CommandError::stderr).unwrap_or("")
    }

    /// Attach (or replace) the classified code on a command failure.
    ///
    /// Other variants are returned untouched.
    pub fn with_code(mut self, code: GitErrorCode) -> Self {
        if let GitError::Command(err) = &mut self {
            err.code = Some(code);
        }
        self
    }
}

impl From<CommandError> for GitError {
    fn from(err: CommandError) -> Self {
        GitError::Command(Box::new(err))
    }
}

/// Top-level application error that wraps all module-specific errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Alias kept for call sites that only deal in git failures
pub type Result<T> = GitResult<T>;

/// Result type for application-level operations
pub type AppResult<T> = std::result::Result<T, AppError>;
