use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, trace};

use crate::audit::{NullSink, OutputSink};
use crate::config::GitConfig;
use crate::error::{CommandError, GitError, GitResult};
use crate::git::cancel::CancellationToken;
use crate::git::chunk::MAX_CLI_LENGTH;
use crate::git::classifier::classify;
use crate::git::encoding;
use crate::git::repository::Repository;
use crate::git::version::{GitInstallation, find_git};

/// Callback receiving stderr text as the process produces it
pub type StderrCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Callback receiving clone progress as a percentage
pub type ProgressCallback = Arc<dyn Fn(u32) + Send + Sync>;

/// Raw result of a git invocation; stdout is left undecoded
#[derive(Debug, Clone)]
pub struct RawOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Result of executing a git command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
}

/// Per-invocation settings
#[derive(Clone)]
pub struct ExecOptions {
    /// Working directory of the git process
    pub cwd: Option<PathBuf>,
    /// Environment merged over the inherited and `Git`-level environment
    pub env: BTreeMap<String, String>,
    /// Text piped to stdin; stdin is closed when absent
    pub input: Option<String>,
    /// Encoding label used to decode stdout
    pub encoding: Option<String>,
    pub cancellation: Option<CancellationToken>,
    pub on_stderr: Option<StderrCallback>,
    /// Whether the command line and stderr go to the output sink
    pub log: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            env: BTreeMap::new(),
            input: None,
            encoding: None,
            cancellation: None,
            on_stderr: None,
            log: true,
        }
    }
}

impl std::fmt::Debug for ExecOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecOptions")
            .field("cwd", &self.cwd)
            .field("env", &self.env)
            .field("input", &self.input.as_ref().map(String::len))
            .field("encoding", &self.encoding)
            .field("cancellation", &self.cancellation.is_some())
            .field("on_stderr", &self.on_stderr.is_some())
            .field("log", &self.log)
            .finish()
    }
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cwd<P: AsRef<Path>>(mut self, cwd: P) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_on_stderr(mut self, callback: StderrCallback) -> Self {
        self.on_stderr = Some(callback);
        self
    }

    pub fn quiet(mut self) -> Self {
        self.log = false;
        self
    }
}

/// Upper-case a leading Windows drive letter (`c:\` becomes `C:\`).
pub fn sanitize_path(path: &str) -> String {
    let bytes = path.as_bytes();
    if bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && &bytes[1..3] == b":\\" {
        let mut sanitized = String::with_capacity(path.len());
        sanitized.push(bytes[0].to_ascii_uppercase() as char);
        sanitized.push_str(&path[1..]);
        return sanitized;
    }
    path.to_string()
}

/// Handle to the git executable plus the settings shared by every invocation
#[derive(Clone)]
pub struct Git {
    path: PathBuf,
    version: String,
    env: BTreeMap<String, String>,
    sink: Arc<dyn OutputSink>,
    log_commands: bool,
    max_cli_length: usize,
    status_limit: usize,
    clean_concurrency: usize,
    default_encoding: String,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

impl Git {
    /// Create a handle for the given executable with default settings
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let defaults = GitConfig::default();
        Self {
            path: path.into(),
            version: String::new(),
            env: BTreeMap::new(),
            sink: Arc::new(NullSink),
            log_commands: defaults.log_commands,
            max_cli_length: MAX_CLI_LENGTH,
            status_limit: defaults.status_limit,
            clean_concurrency: defaults.clean_concurrency,
            default_encoding: defaults.default_encoding,
        }
    }

    /// Create a handle for a discovered installation
    pub fn from_installation(installation: GitInstallation) -> Self {
        Self::new(installation.path).with_version(installation.version)
    }

    /// Locate git using the configured hints and build a handle from the config
    pub async fn discover(config: &GitConfig, sink: Arc<dyn OutputSink>) -> GitResult<Self> {
        let installation = find_git(&config.path_hints).await?;
        Ok(Self::from_installation(installation)
            .with_config(config)
            .with_sink(sink))
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_config(mut self, config: &GitConfig) -> Self {
        self.env.extend(config.env.clone());
        self.log_commands = config.log_commands;
        self.max_cli_length = config.max_cli_length;
        self.status_limit = config.status_limit;
        self.clean_concurrency = config.clean_concurrency;
        self.default_encoding = config.default_encoding.clone();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn max_cli_length(&self) -> usize {
        self.max_cli_length
    }

    pub fn status_limit(&self) -> usize {
        self.status_limit
    }

    pub fn clean_concurrency(&self) -> usize {
        self.clean_concurrency
    }

    /// Send output to the diagnostic sink
    pub fn log(&self, output: &str) {
        self.sink.log(output);
    }

    /// Open a repository whose root and metadata directory are already known
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(&self, root: P, dot_git: Q) -> Repository {
        Repository::new(self.clone(), root, dot_git)
    }

    /// Spawn git with piped stdout/stderr and return the live child.
    ///
    /// Stdin is piped only when `options.input` is set.
    pub fn spawn(&self, args: &[&str], options: &ExecOptions) -> GitResult<Child> {
        let mut command = Command::new(&self.path);
        command
            .args(args)
            .envs(&self.env)
            .envs(&options.env)
            .env("GITBRIDGE_GIT_COMMAND", args.first().copied().unwrap_or(""))
            .env("LC_ALL", "en_US.UTF-8")
            .env("LANG", "en_US.UTF-8")
            .env("GIT_PAGER", "cat")
            .stdin(if options.input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &options.cwd {
            command.current_dir(sanitize_path(&cwd.to_string_lossy()));
        }

        if options.log && self.log_commands {
            self.log(&format!("> git {}\n", args.join(" ")));
        }

        debug!(command = args.first().copied().unwrap_or(""), "spawning git");

        command.spawn().map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                GitError::ExecutableNotFound {
                    path: self.path.clone(),
                }
            } else {
                GitError::IoError(err)
            }
        })
    }

    /// Spawn git in `cwd` for callers that consume stdout incrementally
    pub fn stream<P: AsRef<Path>>(&self, cwd: P, args: &[&str], options: ExecOptions) -> GitResult<Child> {
        self.spawn(args, &options.with_cwd(cwd))
    }

    /// Run git to completion and return the raw output, whatever the exit code.
    ///
    /// Exit, stdout-close and stderr-close are awaited together; when a
    /// cancellation token fires first the child is killed and the call fails
    /// with [`GitError::Cancelled`].
    pub async fn exec_raw(&self, args: &[&str], options: &ExecOptions) -> GitResult<RawOutput> {
        let cancellation = options.cancellation.clone().unwrap_or_default();
        if cancellation.is_cancelled() {
            return Err(GitError::Cancelled);
        }

        let mut child = self.spawn(args, options)?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(CommandError::new("Failed to get stdout or stderr from git process.").into());
        };
        let stdin = child.stdin.take();
        let input = options.input.clone();
        let on_stderr = options.on_stderr.clone();

        let outcome = {
            let collect = async {
                tokio::try_join!(
                    child.wait(),
                    read_to_end(stdout),
                    read_stderr(stderr, on_stderr.as_ref()),
                    write_input(stdin, input),
                )
            };

            tokio::select! {
                result = collect => Some(result),
                _ = cancellation.cancelled() => None,
            }
        };

        let Some(result) = outcome else {
            // Partial output is discarded; the process may already be gone.
            let _ = child.kill().await;
            return Err(GitError::Cancelled);
        };

        let (status, stdout, stderr, ()) = result?;
        let exit_code = status.code().unwrap_or(-1);
        trace!(exit_code, "git exited");

        if options.log && !stderr.is_empty() {
            self.log(&format!("{}\n", stderr));
        }

        Ok(RawOutput {
            exit_code,
            stdout,
            stderr,
        })
    }

    /// Run git, decode stdout, and fail on a non-zero exit.
    ///
    /// The failure carries the generic stderr classification.
    pub async fn run(&self, args: &[&str], options: &ExecOptions) -> GitResult<CommandOutput> {
        let raw = self.exec_raw(args, options).await?;

        let label = options
            .encoding
            .as_deref()
            .filter(|label| encoding::exists(label))
            .unwrap_or(&self.default_encoding);
        let stdout = encoding::decode(&raw.stdout, Some(label));

        if raw.exit_code != 0 {
            return Err(CommandError {
                message: "Failed to execute git".to_string(),
                exit_code: Some(raw.exit_code),
                code: classify(&raw.stderr),
                command: args.first().map(|arg| arg.to_string()),
                args: args.iter().map(|arg| arg.to_string()).collect(),
                stdout: Some(stdout),
                stderr: Some(raw.stderr),
            }
            .into());
        }

        Ok(CommandOutput {
            stdout,
            stderr: raw.stderr,
            exit_code: raw.exit_code,
            success: true,
        })
    }

    /// Run git in `cwd`
    pub async fn exec<P: AsRef<Path>>(&self, cwd: P, args: &[&str], options: ExecOptions) -> GitResult<CommandOutput> {
        self.run(args, &options.with_cwd(cwd)).await
    }

    pub async fn init<P: AsRef<Path>>(&self, path: P) -> GitResult<()> {
        self.exec(path, &["init"], ExecOptions::new()).await?;
        Ok(())
    }

    /// Clone `url` into a fresh folder under `options.parent_path`.
    ///
    /// Returns the folder the repository was cloned into.
    pub async fn clone_repository(&self, url: &str, options: CloneOptions) -> GitResult<PathBuf> {
        let base_folder_name = clone_folder_name(url);
        let mut folder_path = options.parent_path.join(&base_folder_name);
        let mut count = 1;
        while count < 20 && tokio::fs::try_exists(&folder_path).await.unwrap_or(false) {
            folder_path = options
                .parent_path
                .join(format!("{}-{}", base_folder_name, count));
            count += 1;
        }

        tokio::fs::create_dir_all(&options.parent_path).await?;

        let url_arg = if url.contains(' ') {
            url.replace(' ', "%20")
        } else {
            url.to_string()
        };
        let folder_arg = folder_path.to_string_lossy().into_owned();
        let mut args = vec!["clone", url_arg.as_str(), folder_arg.as_str(), "--progress"];
        if options.recursive {
            args.push("--recursive");
        }

        let mut exec_options = ExecOptions::new().with_cwd(&options.parent_path);
        if let Some(token) = options.cancellation {
            exec_options = exec_options.with_cancellation(token);
        }
        if let Some(progress) = options.progress {
            exec_options = exec_options.with_on_stderr(progress_reporter(progress));
        }

        match self.run(&args, &exec_options).await {
            Ok(_) => Ok(folder_path),
            Err(GitError::Command(mut err)) => {
                if let Some(stderr) = err.stderr.take() {
                    err.stderr = Some(clean_clone_stderr(&stderr));
                }
                Err(GitError::Command(err))
            }
            Err(err) => Err(err),
        }
    }

    /// Top-level working tree directory containing `path`
    pub async fn repository_root<P: AsRef<Path>>(&self, path: P) -> GitResult<PathBuf> {
        let output = self
            .exec(path, &["rev-parse", "--show-toplevel"], ExecOptions::new().quiet())
            .await?;
        // Trailing spaces can be part of the directory name
        let root = output
            .stdout
            .trim_start()
            .trim_end_matches(['\r', '\n']);
        if root.is_empty() {
            return Err(GitError::NotARepository);
        }
        Ok(PathBuf::from(root))
    }

    /// Absolute path of the repository metadata directory
    pub async fn repository_dot_git<P: AsRef<Path>>(&self, path: P) -> GitResult<PathBuf> {
        let path = path.as_ref();
        let output = self
            .exec(path, &["rev-parse", "--git-dir"], ExecOptions::new())
            .await?;
        let dot_git = PathBuf::from(output.stdout.trim());
        if dot_git.is_absolute() {
            Ok(dot_git)
        } else {
            Ok(path.join(dot_git))
        }
    }
}

/// Settings for [`Git::clone_repository`]
#[derive(Clone, Default)]
pub struct CloneOptions {
    pub parent_path: PathBuf,
    pub recursive: bool,
    pub cancellation: Option<CancellationToken>,
    pub progress: Option<ProgressCallback>,
}

/// Folder name git would pick for `url`, or `repository`
pub fn clone_folder_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() {
        "repository".to_string()
    } else {
        name.to_string()
    }
}

fn clean_clone_stderr(stderr: &str) -> String {
    let without_cloning: Vec<&str> = stderr
        .lines()
        .filter(|line| !line.starts_with("Cloning"))
        .collect();
    let joined = without_cloning.join("\n");
    let trimmed = joined.trim();
    let trimmed = match trimmed.strip_prefix("ERROR:") {
        Some(rest) => rest.trim_start(),
        None => trimmed,
    };
    trimmed.trim().to_string()
}

/// Tracks overall clone progress from git's per-phase percentages
#[derive(Debug, Default)]
pub struct CloneProgress {
    total: u32,
}

impl CloneProgress {
    /// Feed one stderr line; returns the new total when it changed
    pub fn update(&mut self, line: &str) -> Option<u32> {
        const PHASES: [(&str, u32, u32); 4] = [
            ("Counting objects:", 0, 10),
            ("Compressing objects:", 10, 10),
            ("Receiving objects:", 20, 40),
            ("Resolving deltas:", 60, 40),
        ];

        let lower = line.to_ascii_lowercase();
        let total = PHASES.iter().find_map(|(label, offset, weight)| {
            let index = lower.find(&label.to_ascii_lowercase())?;
            let rest = line[index + label.len()..].trim_start();
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            if !rest[digits.len()..].starts_with('%') {
                return None;
            }
            let percent = digits.parse::<u32>().ok()?.min(100);
            Some(offset + percent * weight / 100)
        })?;

        if total == self.total {
            return None;
        }
        self.total = total;
        Some(total)
    }
}

fn progress_reporter(progress: ProgressCallback) -> StderrCallback {
    let state = Mutex::new((String::new(), CloneProgress::default()));
    Arc::new(move |chunk: &str| {
        let mut guard = match state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let (buffer, tracker) = &mut *guard;
        buffer.push_str(chunk);
        while let Some(end) = buffer.find(['\r', '\n']) {
            let line: String = buffer.drain(..=end).collect();
            if let Some(total) = tracker.update(line.trim_end_matches(['\r', '\n'])) {
                progress(total);
            }
        }
    })
}

async fn read_to_end<R: AsyncRead + Unpin>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer).await?;
    Ok(buffer)
}

async fn read_stderr<R: AsyncRead + Unpin>(mut reader: R, on_stderr: Option<&StderrCallback>) -> io::Result<String> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        if let Some(callback) = on_stderr {
            callback(&String::from_utf8_lossy(&chunk[..read]));
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

async fn write_input(stdin: Option<ChildStdin>, input: Option<String>) -> io::Result<()> {
    let (Some(mut stdin), Some(input)) = (stdin, input) else {
        return Ok(());
    };

    // git may exit before reading stdin; its exit code tells the real story.
    match stdin.write_all(input.as_bytes()).await {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
        result => result?,
    }
    match stdin.shutdown().await {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemorySink;
    use crate::git::cancel::CancellationSource;
    use crate::git::classifier::GitErrorCode;
    use std::process::Command as StdCommand;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let repo_path = temp_dir.path().to_path_buf();

        StdCommand::new("git")
            .args(["init"])
            .current_dir(&repo_path)
            .output()
            .unwrap();

        (temp_dir, repo_path)
    }

    #[tokio::test]
    async fn test_exec_status() {
        let (_temp, repo_path) = create_test_repo();
        let git = Git::new("git");

        let output = git
            .exec(&repo_path, &["status", "--porcelain"], ExecOptions::new())
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn test_failed_command_is_classified() {
        let temp_dir = TempDir::new().unwrap();
        let git = Git::new("git").with_env("GIT_CEILING_DIRECTORIES", temp_dir.path().to_string_lossy());

        let err = git
            .exec(temp_dir.path(), &["status"], ExecOptions::new())
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some(GitErrorCode::NotAGitRepository));
        let command = err.command_error().unwrap();
        assert_eq!(command.command.as_deref(), Some("status"));
        assert_eq!(command.args, vec!["status"]);
        assert_ne!(command.exit_code, Some(0));
        assert!(!command.stderr().is_empty());
    }

    #[tokio::test]
    async fn test_log_empty_repo_fails() {
        let (_temp, repo_path) = create_test_repo();
        let git = Git::new("git");

        let result = git.exec(&repo_path, &["log", "--oneline"], ExecOptions::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_executable_is_enoent() {
        let git = Git::new("/definitely/not/here/git");
        let err = git.run(&["--version"], &ExecOptions::new()).await.unwrap_err();

        assert!(err.is_enoent());
        assert_eq!(err.code(), Some(GitErrorCode::NotAGitRepository));
    }

    #[tokio::test]
    async fn test_input_is_piped_to_stdin() {
        let (_temp, repo_path) = create_test_repo();
        let git = Git::new("git");

        let output = git
            .exec(
                &repo_path,
                &["hash-object", "--stdin"],
                ExecOptions::new().with_input("hello\n"),
            )
            .await
            .unwrap();

        assert_eq!(output.stdout.trim(), "ce013625030ba8dba906f756967f9e9ca394464a");
    }

    #[tokio::test]
    async fn test_command_line_and_stderr_are_logged() {
        let temp_dir = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let git = Git::new("git")
            .with_sink(sink.clone())
            .with_env("GIT_CEILING_DIRECTORIES", temp_dir.path().to_string_lossy());

        let _ = git.exec(temp_dir.path(), &["status", "-z"], ExecOptions::new()).await;

        assert_eq!(sink.commands(), vec!["status -z"]);
        assert_eq!(sink.lines().len(), 2);
    }

    #[tokio::test]
    async fn test_quiet_skips_sink() {
        let (_temp, repo_path) = create_test_repo();
        let sink = Arc::new(MemorySink::new());
        let git = Git::new("git").with_sink(sink.clone());

        git.exec(&repo_path, &["status"], ExecOptions::new().quiet())
            .await
            .unwrap();

        assert!(sink.lines().is_empty());
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_spawn() {
        let sink = Arc::new(MemorySink::new());
        let git = Git::new("git").with_sink(sink.clone());
        let source = CancellationSource::new();
        source.cancel();

        let err = git
            .run(&["--version"], &ExecOptions::new().with_cancellation(source.token()))
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(sink.lines().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_kills_running_process() {
        // Any executable works for the runner; `sleep` outlives the test.
        let runner = Git::new("sleep");
        let source = CancellationSource::new();
        let options = ExecOptions::new().with_cancellation(source.token());

        let handle = tokio::spawn(async move { runner.run(&["30"], &options).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        source.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("cancellation should finish the call")
            .unwrap();
        assert!(result.unwrap_err().is_cancelled());
    }

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("c:\\repo"), "C:\\repo");
        assert_eq!(sanitize_path("D:\\repo"), "D:\\repo");
        assert_eq!(sanitize_path("/home/repo"), "/home/repo");
        assert_eq!(sanitize_path("c:"), "c:");
    }

    #[test]
    fn test_clone_folder_name() {
        assert_eq!(clone_folder_name("https://github.com/org/project.git"), "project");
        assert_eq!(clone_folder_name("https://github.com/org/project/"), "project");
        assert_eq!(clone_folder_name("git@host:org/tool.git"), "tool");
        assert_eq!(clone_folder_name("C:\\repos\\local"), "local");
        assert_eq!(clone_folder_name("/"), "repository");
    }

    #[test]
    fn test_clean_clone_stderr() {
        let stderr = "Cloning into '/tmp/x'...\nERROR: Repository not found.\nfatal: Could not read";
        assert_eq!(clean_clone_stderr(stderr), "Repository not found.\nfatal: Could not read");
    }

    #[test]
    fn test_clone_progress() {
        let mut progress = CloneProgress::default();
        assert_eq!(progress.update("remote: Counting objects: 50% (5/10)"), Some(5));
        assert_eq!(progress.update("remote: Counting objects: 50% (5/10)"), None);
        assert_eq!(progress.update("Receiving objects: 100% (10/10), done."), Some(60));
        assert_eq!(progress.update("Resolving deltas:  50% (1/2)"), Some(80));
        assert_eq!(progress.update("Unpacking something"), None);
        assert_eq!(progress.update("Receiving objects: 99999999999% (1/1)"), None);
        assert_eq!(progress.update("Resolving deltas: 4294967295% (1/1)"), Some(100));
    }

    #[test]
    fn test_progress_reporter_handles_split_lines() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let reporter = progress_reporter({
            let seen = Arc::clone(&seen);
            Arc::new(move |total| seen.lock().unwrap().push(total))
        });

        reporter("Receiving obj");
        reporter("ects:  50% (1/2)\rReceiving objects: 100% (2/2)\n");

        assert_eq!(*seen.lock().unwrap(), vec![40, 60]);
    }
}
