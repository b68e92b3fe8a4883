use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{GitError, GitResult};

/// Minimum required git version
const MIN_GIT_VERSION: (u32, u32) = (2, 20);

/// A git executable that answered `--version`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitInstallation {
    pub path: PathBuf,
    /// Version text with the `git version ` prefix removed
    pub version: String,
}

impl GitInstallation {
    pub fn parsed_version(&self) -> GitResult<GitVersion> {
        GitVersion::parse(&format!("git version {}", self.version))
    }
}

/// Strip the `git version ` prefix from `git --version` output
pub fn parse_version_output(raw: &str) -> String {
    let raw = raw.trim();
    raw.strip_prefix("git version ").unwrap_or(raw).to_string()
}

/// Run `<path> --version` and report the installation when it succeeds
pub async fn find_specific_git<P: AsRef<Path>>(path: P) -> GitResult<GitInstallation> {
    let path = path.as_ref();
    debug!(path = %path.display(), "looking for git");

    let output = Command::new(path)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                GitError::ExecutableNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                GitError::IoError(err)
            }
        })?;

    if !output.status.success() {
        return Err(GitError::GitNotFound);
    }

    Ok(GitInstallation {
        path: path.to_path_buf(),
        version: parse_version_output(&String::from_utf8_lossy(&output.stdout)),
    })
}

/// Locate a working git: each hint in order, then the platform default.
pub async fn find_git(hints: &[PathBuf]) -> GitResult<GitInstallation> {
    for hint in hints {
        match find_specific_git(hint).await {
            Ok(installation) => return Ok(installation),
            Err(err) => debug!(path = %hint.display(), "git hint rejected: {}", err),
        }
    }

    for candidate in platform_candidates() {
        if let Ok(installation) = find_specific_git(&candidate).await {
            return Ok(installation);
        }
    }

    Err(GitError::GitNotFound)
}

#[cfg(windows)]
fn platform_candidates() -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = ["ProgramW6432", "ProgramFiles(x86)", "ProgramFiles"]
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .map(|base| PathBuf::from(base).join("Git").join("cmd").join("git.exe"))
        .collect();
    if let Some(local) = std::env::var_os("LocalAppData") {
        candidates.push(
            PathBuf::from(local)
                .join("Programs")
                .join("Git")
                .join("cmd")
                .join("git.exe"),
        );
    }
    candidates.push(PathBuf::from("git.exe"));
    candidates
}

#[cfg(not(windows))]
fn platform_candidates() -> Vec<PathBuf> {
    vec![PathBuf::from("git")]
}

/// Represents a git version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GitVersion {
    /// Parse git version from string like "git version 2.39.2"
    pub fn parse(version_str: &str) -> GitResult<Self> {
        // Expected format: "git version X.Y.Z" or "git version X.Y.Z.windows.1" etc.
        let parts: Vec<&str> = version_str.split_whitespace().collect();

        if parts.len() < 3 || parts[0] != "git" || parts[1] != "version" {
            return Err(GitError::ParseError(format!(
                "Unexpected git version format: {}",
                version_str
            )));
        }

        let version_nums = parts[2];
        let nums: Vec<&str> = version_nums.split('.').collect();

        if nums.len() < 2 {
            return Err(GitError::ParseError(format!(
                "Invalid version number format: {}",
                version_nums
            )));
        }

        let major = nums[0]
            .parse::<u32>()
            .map_err(|_| GitError::ParseError(format!("Invalid major version: {}", nums[0])))?;

        let minor = nums[1]
            .parse::<u32>()
            .map_err(|_| GitError::ParseError(format!("Invalid minor version: {}", nums[1])))?;

        let patch = if nums.len() >= 3 {
            nums[2]
                .parse::<u32>()
                .unwrap_or(0) // Allow patch version to have non-numeric suffixes
        } else {
            0
        };

        Ok(GitVersion {
            major,
            minor,
            patch,
        })
    }

    /// Check if this version meets minimum requirements
    pub fn is_supported(&self) -> bool {
        self.major > MIN_GIT_VERSION.0
            || (self.major == MIN_GIT_VERSION.0 && self.minor >= MIN_GIT_VERSION.1)
    }

    /// Fail with [`GitError::GitVersionTooOld`] below the minimum version
    pub fn ensure_supported(&self) -> GitResult<()> {
        if self.is_supported() {
            return Ok(());
        }
        Err(GitError::GitVersionTooOld(format!(
            "{} (need {}.{} or newer)",
            self, MIN_GIT_VERSION.0, MIN_GIT_VERSION.1
        )))
    }
}

impl std::fmt::Display for GitVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
