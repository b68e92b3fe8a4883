use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use futures::stream::{self, StreamExt};
use regex::Regex;
use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tracing::debug;

use crate::error::{CommandError, GitError, GitResult};
use crate::git::chunk::split_in_chunks;
use crate::git::classifier::{GitErrorCode, Operation, classify, classify_operation};
use crate::git::encoding;
use crate::git::executor::{CommandOutput, ExecOptions, Git, sanitize_path};
use crate::git::options::{
    AddOptions, BranchQuery, CheckoutOptions, CommitOptions, ConfigScope, FetchOptions, ForcePushMode,
    LogFileOptions, LogOptions, NoOpReason, ObjectDetails, ObjectType, Outcome, PullOptions, PushOptions,
    RefQuery, RefSort, StatusOptions, StatusResult,
};
use crate::git::parser::{
    self, Branch, COMMIT_FORMAT, Commit, ConfigEntry, DiffChange, LsFilesElement, LsTreeElement, Ref,
    RefType, Remote, Stash, StatusParser, Submodule,
};

static NEEDS_MERGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)([^:]+: needs merge\n)+").expect("needs-merge pattern must compile"));

static UNKNOWN_PATHSPEC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"did not match any file\(s\) known to git").expect("pathspec pattern must compile")
});

static COMMENT_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*#.*$\n?").expect("comment pattern must compile"));

static UNSTAGED_PULL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Cannot pull with rebase: You have unstaged changes").expect("pull pattern must compile")
});

/// Bytes of an object inspected when guessing whether it is text
const OBJECT_SNIFF_LEN: u64 = 4100;

/// A working tree plus the [`Git`] handle used to operate on it
#[derive(Debug, Clone)]
pub struct Repository {
    git: Git,
    root: PathBuf,
    dot_git: PathBuf,
}

impl Repository {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(git: Git, root: P, dot_git: Q) -> Self {
        Self {
            git,
            root: root.as_ref().to_path_buf(),
            dot_git: dot_git.as_ref().to_path_buf(),
        }
    }

    /// Open the repository containing `start_path`
    pub async fn discover_from<P: AsRef<Path>>(git: &Git, start_path: P) -> GitResult<Self> {
        let root = git
            .repository_root(start_path)
            .await
            .map_err(|err| match err.code() {
                Some(GitErrorCode::NotAGitRepository) if !err.is_enoent() => GitError::NotARepository,
                _ => err,
            })?;
        let dot_git = git.repository_dot_git(&root).await?;
        Ok(git.open(root, dot_git))
    }

    pub fn git(&self) -> &Git {
        &self.git
    }

    /// Top-level directory of the working tree
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Repository metadata directory
    pub fn dot_git(&self) -> &Path {
        &self.dot_git
    }

    /// Run git in the repository root
    pub async fn exec(&self, args: &[&str], options: ExecOptions) -> GitResult<CommandOutput> {
        self.git.exec(&self.root, args, options).await
    }

    /// Spawn git in the repository root for incremental reading
    pub fn stream(&self, args: &[&str], options: ExecOptions) -> GitResult<Child> {
        self.git.stream(&self.root, args, options)
    }

    async fn run(&self, args: &[&str]) -> GitResult<CommandOutput> {
        self.exec(args, ExecOptions::new()).await
    }

    /// Run `args -- <paths>` once per batch, sequentially
    async fn run_chunked<S: AsRef<str>>(&self, args: &[&str], paths: &[S]) -> GitResult<()> {
        let sanitized: Vec<String> = paths.iter().map(|path| sanitize_path(path.as_ref())).collect();
        for chunk in split_in_chunks(&sanitized, self.git.max_cli_length()) {
            let chunk_args: Vec<&str> = args
                .iter()
                .copied()
                .chain(["--"])
                .chain(chunk.iter().copied())
                .collect();
            self.run(&chunk_args).await?;
        }
        Ok(())
    }

    // Configuration

    pub async fn config(&self, scope: Option<ConfigScope>, key: &str, value: Option<&str>) -> GitResult<String> {
        let mut args = vec!["config"];
        if let Some(scope) = scope {
            args.push(scope.as_arg());
        }
        args.push(key);
        if let Some(value) = value.filter(|value| !value.is_empty()) {
            args.push(value);
        }
        let output = self.run(&args).await?;
        Ok(output.stdout.trim().to_string())
    }

    pub async fn configs(&self, scope: Option<ConfigScope>) -> GitResult<Vec<ConfigEntry>> {
        let mut args = vec!["config"];
        if let Some(scope) = scope {
            args.push(scope.as_arg());
        }
        args.push("-l");
        let output = self.run(&args).await?;
        Ok(parser::parse_config_list(&output.stdout))
    }

    // History

    /// Recent commits; a repository without commits yields an empty list
    pub async fn log(&self, options: &LogOptions) -> GitResult<Vec<Commit>> {
        let max_entries = format!("-n{}", options.max_entries.unwrap_or(32));
        let format = format!("--format={}", COMMIT_FORMAT);
        let mut args = vec!["log", max_entries.as_str(), format.as_str(), "-z", "--"];
        if let Some(path) = &options.path {
            args.push(path);
        }
        self.log_lenient(&args).await
    }

    /// History of one file; untracked or new files yield an empty list
    pub async fn log_file(&self, path: &str, options: &LogFileOptions) -> GitResult<Vec<Commit>> {
        let format = format!("--format={}", COMMIT_FORMAT);
        let max_entries = options.max_entries.map(|max| format!("-n{}", max));
        let range = options.hash.as_ref().map(|hash| format!("{}..HEAD", hash));

        let mut args = vec!["log", format.as_str(), "-z"];
        if let Some(max_entries) = &max_entries
            && !options.reverse
        {
            args.push(max_entries);
        }
        if let Some(hash) = &options.hash {
            if options.reverse {
                // --ancestry-path needs a range ending at HEAD
                args.extend(["--reverse", "--ancestry-path"]);
                if let Some(range) = &range {
                    args.push(range);
                }
            } else {
                args.push(hash);
            }
        }
        if options.sort_by_author_date {
            args.push("--author-date-order");
        }
        let path = sanitize_path(path);
        args.extend(["--", path.as_str()]);

        self.log_lenient(&args).await
    }

    async fn log_lenient(&self, args: &[&str]) -> GitResult<Vec<Commit>> {
        let raw = self
            .git
            .exec_raw(args, &ExecOptions::new().with_cwd(&self.root))
            .await?;
        if raw.exit_code != 0 {
            debug!(exit_code = raw.exit_code, "log produced no history");
            return Ok(Vec::new());
        }
        Ok(parser::parse_commits(&encoding::decode(&raw.stdout, None)))
    }

    /// Commit `reference` points at
    pub async fn get_commit(&self, reference: &str) -> GitResult<Commit> {
        let format = format!("--format={}", COMMIT_FORMAT);
        let output = self.run(&["show", "-s", format.as_str(), "-z", reference]).await?;
        parser::parse_commits(&output.stdout)
            .into_iter()
            .next()
            .ok_or_else(|| GitError::ParseError("bad commit format".to_string()))
    }

    // Objects

    /// Raw content of `object` as shown by `git show --textconv`
    pub async fn buffer(&self, object: &str) -> GitResult<Vec<u8>> {
        let args = ["show", "--textconv", object];
        let raw = self
            .git
            .exec_raw(&args, &ExecOptions::new().with_cwd(&self.root))
            .await?;

        if raw.exit_code != 0 {
            return Err(CommandError {
                message: "Could not show object.".to_string(),
                exit_code: Some(raw.exit_code),
                code: classify_operation(Operation::Show, "", &raw.stderr),
                command: Some("show".to_string()),
                args: args.iter().map(|arg| arg.to_string()).collect(),
                stdout: None,
                stderr: Some(raw.stderr),
            }
            .into());
        }

        Ok(raw.stdout)
    }

    /// Content of `object` decoded as text.
    ///
    /// With `auto_guess_encoding` a byte-order mark overrides `encoding`.
    pub async fn buffer_string(
        &self,
        object: &str,
        encoding: Option<&str>,
        auto_guess_encoding: bool,
    ) -> GitResult<String> {
        let bytes = self.buffer(object).await?;

        let guessed = if auto_guess_encoding {
            encoding::detect_unicode_encoding(&bytes).map(|found| found.name())
        } else {
            None
        };
        let label = guessed
            .or(encoding)
            .filter(|label| encoding::exists(label))
            .unwrap_or("utf8");

        Ok(encoding::decode(&bytes, Some(label)))
    }

    /// Mode, object id and size of `path` in `treeish`, or in the index when `None`
    pub async fn object_details(&self, treeish: Option<&str>, path: &str) -> GitResult<ObjectDetails> {
        let Some(treeish) = treeish.filter(|treeish| !treeish.is_empty()) else {
            let element = self
                .ls_files(path)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| GitError::UnknownPath(path.to_string()))?;

            let cat_file = self.run(&["cat-file", "-s", &element.object]).await?;
            let size = cat_file
                .stdout
                .trim()
                .parse()
                .map_err(|_| GitError::ParseError(format!("Invalid object size: {}", cat_file.stdout.trim())))?;

            return Ok(ObjectDetails {
                mode: element.mode,
                object: element.object,
                size,
            });
        };

        let element = self
            .ls_tree(treeish, path)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GitError::UnknownPath(path.to_string()))?;

        Ok(ObjectDetails {
            mode: element.mode,
            object: element.object,
            // trees report "-"
            size: element.size.parse().unwrap_or(0),
        })
    }

    pub async fn ls_tree(&self, treeish: &str, path: &str) -> GitResult<Vec<LsTreeElement>> {
        let path = sanitize_path(path);
        let output = self.run(&["ls-tree", "-l", treeish, "--", &path]).await?;
        Ok(parser::parse_ls_tree(&output.stdout))
    }

    pub async fn ls_files(&self, path: &str) -> GitResult<Vec<LsFilesElement>> {
        let path = sanitize_path(path);
        let output = self.run(&["ls-files", "--stage", "--", &path]).await?;
        Ok(parser::parse_ls_files(&output.stdout))
    }

    /// The path as git spells it, matching `relative_path` case-insensitively
    pub async fn git_relative_path(&self, reference: Option<&str>, relative_path: &str) -> GitResult<String> {
        let lowercase = relative_path.to_lowercase();
        let dirname = match relative_path.rfind('/') {
            Some(index) => format!("{}/", &relative_path[..index]),
            None => "./".to_string(),
        };

        let files: Vec<String> = match reference.filter(|reference| !reference.is_empty()) {
            Some(reference) => self
                .ls_tree(reference, &dirname)
                .await?
                .into_iter()
                .map(|element| element.file)
                .collect(),
            None => self
                .ls_files(&dirname)
                .await?
                .into_iter()
                .map(|element| element.file)
                .collect(),
        };

        files
            .into_iter()
            .find(|file| file.to_lowercase() == lowercase)
            .ok_or_else(|| CommandError::new("Git relative path not found.").into())
    }

    /// Guess whether `object` is text from its first bytes
    pub async fn detect_object_type(&self, object: &str) -> GitResult<ObjectType> {
        let mut child = self.stream(&["show", "--textconv", object], ExecOptions::new())?;
        let Some(stdout) = child.stdout.take() else {
            return Err(CommandError::new("Can't open file from git").into());
        };

        let mut buffer = Vec::new();
        stdout.take(OBJECT_SNIFF_LEN).read_to_end(&mut buffer).await?;
        // The rest of the object is not needed
        let _ = child.kill().await;

        if !encoding::is_text(&buffer) {
            return Ok(ObjectType {
                mimetype: sniff_binary_mimetype(&buffer).to_string(),
                encoding: None,
            });
        }

        Ok(ObjectType {
            mimetype: "text/plain".to_string(),
            encoding: encoding::detect_unicode_encoding(&buffer).map(|found| unicode_label(found).to_string()),
        })
    }

    pub async fn hash_object(&self, data: &str) -> GitResult<String> {
        let output = self
            .exec(&["hash-object", "-w", "--stdin"], ExecOptions::new().with_input(data))
            .await?;
        Ok(output.stdout.trim().to_string())
    }

    // Diffs

    pub async fn apply(&self, patch: &str, reverse: bool) -> GitResult<()> {
        let mut args = vec!["apply", patch];
        if reverse {
            args.push("-R");
        }
        self.run(&args)
            .await
            .map_err(|err| reclassify(err, Operation::Apply))?;
        Ok(())
    }

    pub async fn diff(&self, cached: bool) -> GitResult<String> {
        let mut args = vec!["diff"];
        if cached {
            args.push("--cached");
        }
        Ok(self.run(&args).await?.stdout)
    }

    /// Working tree against the index, for one path
    pub async fn diff_with_head(&self, path: &str) -> GitResult<String> {
        let path = sanitize_path(path);
        Ok(self.run(&["diff", "--", &path]).await?.stdout)
    }

    /// Working tree against `reference`, for one path
    pub async fn diff_with(&self, reference: &str, path: &str) -> GitResult<String> {
        let path = sanitize_path(path);
        Ok(self.run(&["diff", reference, "--", &path]).await?.stdout)
    }

    /// Index against HEAD, for one path
    pub async fn diff_index_with_head(&self, path: &str) -> GitResult<String> {
        let path = sanitize_path(path);
        Ok(self.run(&["diff", "--cached", "--", &path]).await?.stdout)
    }

    /// Index against `reference`, for one path
    pub async fn diff_index_with(&self, reference: &str, path: &str) -> GitResult<String> {
        let path = sanitize_path(path);
        Ok(self.run(&["diff", "--cached", reference, "--", &path]).await?.stdout)
    }

    pub async fn diff_blobs(&self, object1: &str, object2: &str) -> GitResult<String> {
        Ok(self.run(&["diff", object1, object2]).await?.stdout)
    }

    /// Diff of one path between the merge base of `ref1` and `ref2`, and `ref2`
    pub async fn diff_between(&self, ref1: &str, ref2: &str, path: &str) -> GitResult<String> {
        let range = format!("{}...{}", ref1, ref2);
        let path = sanitize_path(path);
        Ok(self.run(&["diff", &range, "--", &path]).await?.stdout.trim().to_string())
    }

    /// Changed files between the merge base of `ref1` and `ref2`, and `ref2`
    pub async fn diff_files_between(&self, ref1: &str, ref2: &str) -> GitResult<Vec<DiffChange>> {
        let range = format!("{}...{}", ref1, ref2);
        self.diff_files(false, Some(&range)).await
    }

    /// Changed files, against the index or (with `cached`) HEAD, or against `reference`
    pub async fn diff_files(&self, cached: bool, reference: Option<&str>) -> GitResult<Vec<DiffChange>> {
        let mut args = vec!["diff", "--name-status", "-z", "--diff-filter=ADMR"];
        if cached {
            args.push("--cached");
        }
        if let Some(reference) = reference {
            args.push(reference);
        }
        let output = self.run(&args).await?;
        Ok(parser::parse_name_status(&output.stdout))
    }

    pub async fn merge_base(&self, ref1: &str, ref2: &str) -> GitResult<String> {
        let output = self.run(&["merge-base", ref1, ref2]).await?;
        Ok(output.stdout.trim().to_string())
    }

    // Index and working tree

    /// Stage `paths`, or everything when empty
    pub async fn add<S: AsRef<str>>(&self, paths: &[S], options: &AddOptions) -> GitResult<()> {
        let args = ["add", if options.update { "-u" } else { "-A" }];
        if paths.is_empty() {
            self.run(&["add", args[1], "--", "."]).await?;
            return Ok(());
        }
        self.run_chunked(&args, paths).await
    }

    pub async fn rm<S: AsRef<str>>(&self, paths: &[S]) -> GitResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        self.run_chunked(&["rm"], paths).await
    }

    /// Write `data` as the staged content of `path` without touching the working tree
    pub async fn stage(&self, path: &str, data: &str) -> GitResult<()> {
        let sanitized = sanitize_path(path);
        let output = self
            .exec(
                &["hash-object", "--stdin", "-w", "--path", &sanitized],
                ExecOptions::new().with_input(data),
            )
            .await?;
        let hash = output.stdout.trim().to_string();

        let treeish = match self.get_commit("HEAD").await {
            Ok(_) => Some("HEAD"),
            Err(_) => None,
        };

        let (mode, add) = match self.object_details(treeish, path).await {
            Ok(details) => (details.mode, false),
            Err(err) if err.code() == Some(GitErrorCode::UnknownPath) => ("100644".to_string(), true),
            Err(err) => return Err(err),
        };

        let mut args = vec!["update-index"];
        if add {
            args.push("--add");
        }
        args.extend(["--cacheinfo", mode.as_str(), hash.as_str(), path]);
        self.run(&args).await?;
        Ok(())
    }

    pub async fn checkout<S: AsRef<str>>(
        &self,
        treeish: Option<&str>,
        paths: &[S],
        options: &CheckoutOptions,
    ) -> GitResult<()> {
        let mut args = vec!["checkout", "-q"];
        if options.track {
            args.push("--track");
        }
        if options.detached {
            args.push("--detach");
        }
        if let Some(treeish) = treeish.filter(|treeish| !treeish.is_empty()) {
            args.push(treeish);
        }

        let result = if paths.is_empty() {
            self.run(&args).await.map(|_| ())
        } else {
            self.run_chunked(&args, paths).await
        };
        result.map_err(|err| reclassify(err, Operation::Checkout))
    }

    /// Remove untracked `paths`, grouped by directory and run with bounded parallelism
    pub async fn clean<S: AsRef<str>>(&self, paths: &[S]) -> GitResult<()> {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for path in paths {
            let path = sanitize_path(path.as_ref());
            let dirname = Path::new(&path)
                .parent()
                .map(|parent| parent.to_string_lossy().into_owned())
                .unwrap_or_default();
            groups.entry(dirname).or_default().push(path);
        }

        let max = self.git.max_cli_length();
        let batches: Vec<Vec<String>> = groups
            .values()
            .flat_map(|group| {
                split_in_chunks(group, max)
                    .into_iter()
                    .map(|chunk| chunk.into_iter().map(str::to_string).collect::<Vec<_>>())
            })
            .collect();

        // Every batch runs to completion before the first failure is reported
        let results: Vec<GitResult<CommandOutput>> = stream::iter(batches)
            .map(|batch| async move {
                let args: Vec<&str> = ["clean", "-f", "-q", "--"]
                    .into_iter()
                    .chain(batch.iter().map(String::as_str))
                    .collect();
                self.run(&args).await
            })
            .buffer_unordered(self.git.clean_concurrency())
            .collect()
            .await;

        results.into_iter().find_map(Result::err).map_or(Ok(()), Err)
    }

    /// Discard every working tree change, including untracked files
    pub async fn undo(&self) -> GitResult<Outcome> {
        self.run(&["clean", "-fd"]).await?;

        match self.run(&["checkout", "--", "."]).await {
            Ok(_) => Ok(Outcome::Completed),
            Err(err) if UNKNOWN_PATHSPEC_RE.is_match(err.stderr()) => Ok(Outcome::NoOp(NoOpReason::NothingToCheckout)),
            Err(err) => Err(err),
        }
    }

    pub async fn reset(&self, treeish: &str, hard: bool) -> GitResult<()> {
        self.run(&["reset", if hard { "--hard" } else { "--soft" }, treeish])
            .await?;
        Ok(())
    }

    /// Unstage `paths` (everything when empty) back to `treeish`.
    ///
    /// Before the first commit there is nothing to reset to, so entries are
    /// removed from the index instead.
    pub async fn revert<S: AsRef<str>>(&self, treeish: &str, paths: &[S]) -> GitResult<Outcome> {
        let branches = self.run(&["branch"]).await?;
        let args = if branches.stdout.is_empty() {
            vec!["rm", "--cached", "-r"]
        } else {
            vec!["reset", "-q", treeish]
        };

        let result = if paths.is_empty() {
            let all: Vec<&str> = args.iter().copied().chain(["--", "."]).collect();
            self.run(&all).await.map(|_| ())
        } else {
            self.run_chunked(&args, paths).await
        };

        match result {
            Ok(()) => Ok(Outcome::Completed),
            Err(err) if NEEDS_MERGE_RE.is_match(err.stdout()) => Ok(Outcome::NoOp(NoOpReason::NeedsMerge)),
            Err(err) => Err(err),
        }
    }

    pub async fn move_path(&self, from: &str, to: &str) -> GitResult<()> {
        self.run(&["mv", from, to]).await?;
        Ok(())
    }

    // Commits

    /// Commit the index; the message is piped through stdin.
    ///
    /// Amending without a message keeps the previous one.
    pub async fn commit(&self, message: Option<&str>, options: &CommitOptions) -> GitResult<()> {
        let message = message.filter(|message| !message.is_empty());

        // useConfigOnly stops git from guessing an identity
        let mut args = vec!["-c", "user.useConfigOnly=true", "commit", "--quiet", "--allow-empty-message"];
        if options.all {
            args.push("--all");
        }
        if options.amend && message.is_some() {
            args.push("--amend");
        }
        if options.amend && message.is_none() {
            args.extend(["--amend", "--no-edit"]);
        } else {
            args.extend(["--file", "-"]);
        }
        if options.signoff {
            args.push("--signoff");
        }
        if options.sign_commit {
            args.push("-S");
        }
        if options.empty {
            args.push("--allow-empty");
        }
        if options.no_verify {
            args.push("--no-verify");
        }

        let exec_options = if !options.amend || message.is_some() {
            ExecOptions::new().with_input(message.unwrap_or(""))
        } else {
            ExecOptions::new()
        };

        match self.exec(&args, exec_options).await {
            Ok(_) => Ok(()),
            Err(err) => Err(self.handle_commit_error(err).await),
        }
    }

    /// Explain a failed commit: unmerged files first, then a missing identity
    async fn handle_commit_error(&self, err: GitError) -> GitError {
        if let Some(code) = classify_operation(Operation::Commit, err.stdout(), err.stderr()) {
            return err.with_code(code);
        }

        if self.run(&["config", "--get-all", "user.name"]).await.is_err() {
            return err.with_code(GitErrorCode::NoUserNameConfigured);
        }

        if self.run(&["config", "--get-all", "user.email"]).await.is_err() {
            return err.with_code(GitErrorCode::NoUserEmailConfigured);
        }

        err
    }

    pub async fn rebase_abort(&self) -> GitResult<()> {
        self.run(&["rebase", "--abort"]).await?;
        Ok(())
    }

    pub async fn rebase_continue(&self) -> GitResult<()> {
        match self.run(&["rebase", "--continue"]).await {
            Ok(_) => Ok(()),
            Err(err) => Err(self.handle_commit_error(err).await),
        }
    }

    pub async fn cherry_pick(&self, commit_hash: &str) -> GitResult<()> {
        self.run(&["cherry-pick", commit_hash]).await?;
        Ok(())
    }

    pub async fn blame(&self, path: &str) -> GitResult<String> {
        let path = sanitize_path(path);
        let output = self
            .run(&["blame", &path])
            .await
            .map_err(|err| reclassify(err, Operation::Blame))?;
        Ok(output.stdout.trim().to_string())
    }

    // Branches, tags and refs

    /// Create a branch, optionally checking it out
    pub async fn branch(&self, name: &str, checkout: bool, reference: Option<&str>) -> GitResult<()> {
        let mut args = if checkout {
            vec!["checkout", "-q", "-b", name, "--no-track"]
        } else {
            vec!["branch", "-q", name]
        };
        if let Some(reference) = reference {
            args.push(reference);
        }
        self.run(&args).await?;
        Ok(())
    }

    pub async fn delete_branch(&self, name: &str, force: bool) -> GitResult<()> {
        self.run(&["branch", if force { "-D" } else { "-d" }, name])
            .await?;
        Ok(())
    }

    /// Rename the current branch
    pub async fn rename_branch(&self, name: &str) -> GitResult<()> {
        self.run(&["branch", "-m", name]).await?;
        Ok(())
    }

    pub async fn set_branch_upstream(&self, name: &str, upstream: &str) -> GitResult<()> {
        self.run(&["branch", "--set-upstream-to", upstream, name])
            .await?;
        Ok(())
    }

    pub async fn delete_ref(&self, reference: &str) -> GitResult<()> {
        self.run(&["update-ref", "-d", reference]).await?;
        Ok(())
    }

    pub async fn merge(&self, reference: &str) -> GitResult<()> {
        self.run(&["merge", reference])
            .await
            .map_err(|err| reclassify(err, Operation::Merge))?;
        Ok(())
    }

    /// Create a lightweight tag, or an annotated one when `message` is given
    pub async fn tag(&self, name: &str, message: Option<&str>) -> GitResult<()> {
        let args = match message.filter(|message| !message.is_empty()) {
            Some(message) => vec!["tag", "-a", name, "-m", message],
            None => vec!["tag", name],
        };
        self.run(&args).await?;
        Ok(())
    }

    pub async fn delete_tag(&self, name: &str) -> GitResult<()> {
        self.run(&["tag", "-d", name]).await?;
        Ok(())
    }

    /// The checked-out branch, or the detached commit
    pub async fn head(&self) -> GitResult<Ref> {
        if let Ok(output) = self.run(&["symbolic-ref", "--short", "HEAD"]).await {
            let name = output.stdout.trim();
            if !name.is_empty() {
                return Ok(Ref::head(name, None));
            }
        }

        let output = self.run(&["rev-parse", "HEAD"]).await?;
        let commit = output.stdout.trim();
        if commit.is_empty() {
            return Err(GitError::ParseError("Error parsing HEAD".to_string()));
        }

        Ok(Ref {
            ref_type: RefType::Head,
            name: None,
            commit: Some(commit.to_string()),
            remote: None,
        })
    }

    /// Local branches tracking `upstream_branch` (e.g. `origin/main`)
    pub async fn find_tracking_branches(&self, upstream_branch: &str) -> GitResult<Vec<Ref>> {
        let output = self
            .run(&[
                "for-each-ref",
                "--format",
                "%(refname:short)%00%(upstream:short)",
                "refs/heads",
            ])
            .await?;
        Ok(parser::parse_tracking_branches(&output.stdout, upstream_branch))
    }

    pub async fn refs(&self, query: &RefQuery) -> GitResult<Vec<Ref>> {
        let count = query.count.map(|count| format!("--count={}", count));

        let mut args = vec!["for-each-ref"];
        if let Some(count) = &count {
            args.push(count);
        }
        if query.sort == RefSort::CommitterDate {
            args.extend(["--sort", "-committerdate"]);
        }
        args.extend(["--format", "%(refname) %(objectname) %(*objectname)"]);
        if let Some(pattern) = &query.pattern {
            args.push(pattern);
        }
        if let Some(contains) = &query.contains {
            args.extend(["--contains", contains.as_str()]);
        }

        let output = self.run(&args).await?;
        Ok(parser::parse_refs(&output.stdout))
    }

    /// Heads, plus remote heads when asked; tags are never included
    pub async fn branches(&self, query: &BranchQuery) -> GitResult<Vec<Ref>> {
        let refs = self
            .refs(&RefQuery {
                count: query.count,
                sort: RefSort::Alphabetically,
                pattern: query.pattern.as_ref().map(|pattern| format!("refs/{}", pattern)),
                contains: query.contains.clone(),
            })
            .await?;

        Ok(refs
            .into_iter()
            .filter(|reference| reference.ref_type != RefType::Tag && (query.remote || reference.remote.is_none()))
            .collect())
    }

    /// Resolve a branch with its upstream and ahead/behind counts.
    ///
    /// Missing or unreadable upstream information leaves those fields empty
    /// instead of failing.
    pub async fn get_branch(&self, name: &str) -> GitResult<Branch> {
        if name == "HEAD" {
            return self.head().await.map(Branch::from);
        }

        let mut name = name.to_string();
        let mut result = self.run(&["rev-parse", &name]).await?;
        if result.stdout.is_empty() && name.starts_with('@') {
            let symbolic = self
                .run(&["rev-parse", "--symbolic-full-name", &name])
                .await?;
            name = symbolic.stdout.trim().to_string();
            result = self.run(&["rev-parse", &name]).await?;
        }

        let commit = result.stdout.trim();
        if commit.is_empty() {
            return Err(GitError::ParseError(format!("No such branch: {}", name)));
        }
        let reference = Ref::head(name.clone(), Some(commit.to_string()));

        match self.upstream_of(&name).await {
            Ok((upstream, ahead, behind)) => Ok(Branch {
                reference,
                upstream: Some(upstream),
                ahead: Some(ahead),
                behind: Some(behind),
            }),
            Err(err) => {
                debug!(branch = %name, "no upstream information: {}", err);
                Ok(Branch::from(reference))
            }
        }
    }

    async fn upstream_of(&self, name: &str) -> GitResult<(parser::UpstreamRef, usize, usize)> {
        let upstream_spec = format!("{}@{{u}}", name);
        let output = self
            .run(&["rev-parse", "--symbolic-full-name", &upstream_spec])
            .await?;
        let full_upstream = output.stdout.trim();
        let upstream = parser::parse_upstream(full_upstream)
            .ok_or_else(|| GitError::ParseError(format!("Could not parse upstream branch: {}", full_upstream)))?;

        let range = format!("{}...{}", name, full_upstream);
        let counts = self.run(&["rev-list", "--left-right", &range]).await?;
        let (ahead, behind) = parser::parse_ahead_behind(&counts.stdout);

        Ok((upstream, ahead, behind))
    }

    // Remotes

    pub async fn add_remote(&self, name: &str, url: &str) -> GitResult<()> {
        self.run(&["remote", "add", name, url]).await?;
        Ok(())
    }

    pub async fn remove_remote(&self, name: &str) -> GitResult<()> {
        self.run(&["remote", "remove", name]).await?;
        Ok(())
    }

    pub async fn rename_remote(&self, name: &str, new_name: &str) -> GitResult<()> {
        self.run(&["remote", "rename", name, new_name]).await?;
        Ok(())
    }

    pub async fn remotes(&self) -> GitResult<Vec<Remote>> {
        let output = self.run(&["remote", "--verbose"]).await?;
        Ok(parser::parse_remotes(&output.stdout))
    }

    pub async fn fetch(&self, options: &FetchOptions) -> GitResult<()> {
        let depth = options.depth.map(|depth| format!("--depth={}", depth));

        let mut args = vec!["fetch"];
        if let Some(remote) = &options.remote {
            args.push(remote);
            if let Some(refspec) = &options.refspec {
                args.push(refspec);
            }
        } else if options.all {
            args.push("--all");
        }
        if options.prune {
            args.push("--prune");
        }
        if let Some(depth) = &depth {
            args.push(depth);
        }

        let mut exec_options = ExecOptions::new();
        if let Some(token) = &options.cancellation {
            exec_options = exec_options.with_cancellation(token.clone());
        }
        if options.silent {
            exec_options = exec_options.with_env("GITBRIDGE_GIT_FETCH_SILENT", "true");
        }

        self.exec(&args, exec_options)
            .await
            .map_err(|err| reclassify(err, Operation::Fetch))?;
        Ok(())
    }

    pub async fn pull(&self, options: &PullOptions) -> GitResult<()> {
        let mut args = vec!["pull"];
        if options.tags {
            args.push("--tags");
        }
        if options.unshallow {
            args.push("--unshallow");
        }
        if options.rebase {
            args.push("-r");
        }
        if let (Some(remote), Some(branch)) = (&options.remote, &options.branch) {
            args.extend([remote.as_str(), branch.as_str()]);
        }

        let mut exec_options = ExecOptions::new();
        if let Some(token) = &options.cancellation {
            exec_options = exec_options.with_cancellation(token.clone());
        }

        match self.exec(&args, exec_options).await {
            Ok(_) => Ok(()),
            Err(err) => {
                let err = reclassify(err, Operation::Pull);
                if err.code() == Some(GitErrorCode::DirtyWorkTree) {
                    return Err(rewrite_stderr(err, |stderr| {
                        UNSTAGED_PULL_RE
                            .replace(stderr, "Cannot pull with rebase, you have unstaged changes")
                            .into_owned()
                    }));
                }
                Err(err)
            }
        }
    }

    pub async fn rebase(&self, branch: &str) -> GitResult<()> {
        self.run(&["rebase", branch])
            .await
            .map_err(|err| reclassify(err, Operation::Rebase))?;
        Ok(())
    }

    pub async fn push(&self, options: &PushOptions) -> GitResult<()> {
        let mut args = vec!["push"];
        match options.force {
            Some(ForcePushMode::ForceWithLease) => args.push("--force-with-lease"),
            Some(ForcePushMode::Force) => args.push("--force"),
            None => {}
        }
        if options.set_upstream {
            args.push("-u");
        }
        if options.follow_tags {
            args.push("--follow-tags");
        }
        if options.tags {
            args.push("--tags");
        }
        if let Some(remote) = &options.remote {
            args.push(remote);
        }
        if let Some(name) = &options.name {
            args.push(name);
        }

        self.run(&args)
            .await
            .map_err(|err| reclassify(err, Operation::Push))?;
        Ok(())
    }

    // Stashes

    /// Stash local changes; having nothing to stash is not an error
    pub async fn create_stash(&self, message: Option<&str>, include_untracked: bool) -> GitResult<Outcome> {
        let mut args = vec!["stash", "push"];
        if include_untracked {
            args.push("-u");
        }
        if let Some(message) = message.filter(|message| !message.is_empty()) {
            args.extend(["-m", message]);
        }

        match self.run(&args).await {
            Ok(output) => {
                // Newer git reports this on success
                let nothing_saved = classify_operation(Operation::StashCreate, "", &output.stdout)
                    .or_else(|| classify_operation(Operation::StashCreate, "", &output.stderr));
                if nothing_saved == Some(GitErrorCode::NoLocalChanges) {
                    return Ok(Outcome::NoOp(NoOpReason::NoLocalChanges));
                }
                Ok(Outcome::Completed)
            }
            Err(err) => {
                let err = reclassify(err, Operation::StashCreate);
                if err.code() == Some(GitErrorCode::NoLocalChanges) {
                    return Ok(Outcome::NoOp(NoOpReason::NoLocalChanges));
                }
                Err(err)
            }
        }
    }

    pub async fn pop_stash(&self, index: Option<usize>) -> GitResult<()> {
        self.pop_or_apply_stash("pop", index).await
    }

    pub async fn apply_stash(&self, index: Option<usize>) -> GitResult<()> {
        self.pop_or_apply_stash("apply", index).await
    }

    async fn pop_or_apply_stash(&self, subcommand: &str, index: Option<usize>) -> GitResult<()> {
        let stash = index.map(stash_ref);
        let mut args = vec!["stash", subcommand];
        if let Some(stash) = &stash {
            args.push(stash);
        }
        self.run(&args)
            .await
            .map_err(|err| reclassify(err, Operation::StashApply))?;
        Ok(())
    }

    pub async fn drop_stash(&self, index: Option<usize>) -> GitResult<()> {
        let stash = index.map(stash_ref);
        let mut args = vec!["stash", "drop"];
        if let Some(stash) = &stash {
            args.push(stash);
        }
        self.run(&args)
            .await
            .map_err(|err| reclassify(err, Operation::StashDrop))?;
        Ok(())
    }

    pub async fn stashes(&self) -> GitResult<Vec<Stash>> {
        let output = self.run(&["stash", "list"]).await?;
        Ok(parser::parse_stash_list(&output.stdout))
    }

    // Status

    /// Stream `git status -z -u`, stopping early once more than `limit`
    /// entries have been read.
    pub async fn status(&self, options: &StatusOptions) -> GitResult<StatusResult> {
        let limit = options.limit.unwrap_or(self.git.status_limit());
        let mut args = vec!["status", "-z", "-u"];
        if options.ignore_submodules {
            args.push("--ignore-submodules");
        }

        let mut child = self.stream(&args, ExecOptions::new().with_env("GIT_OPTIONAL_LOCKS", "0"))?;
        let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(CommandError::new("Failed to get stdout or stderr from git process.").into());
        };

        let stderr_task = tokio::spawn(async move {
            let mut buffer = Vec::new();
            stderr.read_to_end(&mut buffer).await?;
            Ok::<_, io::Error>(String::from_utf8_lossy(&buffer).into_owned())
        });

        let mut parser = StatusParser::new();
        let mut chunk = vec![0u8; 8192];
        loop {
            let read = stdout.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            parser.update(&chunk[..read]);

            if parser.len() > limit {
                debug!(limit, "status limit reached, stopping git");
                let _ = child.kill().await;
                stderr_task.abort();
                let mut status = parser.into_status();
                status.truncate(limit);
                return Ok(StatusResult {
                    status,
                    did_hit_limit: true,
                });
            }
        }

        let exit_status = child.wait().await?;
        let stderr = stderr_task.await.map_err(io::Error::other)??;

        if !exit_status.success() {
            return Err(CommandError {
                message: "Failed to execute git".to_string(),
                exit_code: Some(exit_status.code().unwrap_or(-1)),
                code: classify(&stderr),
                command: Some("status".to_string()),
                args: args.iter().map(|arg| arg.to_string()).collect(),
                stdout: None,
                stderr: Some(stderr),
            }
            .into());
        }

        Ok(StatusResult {
            status: parser.into_status(),
            did_hit_limit: false,
        })
    }

    // Messages

    /// Pending squash message, comment lines removed
    pub async fn squash_message(&self) -> Option<String> {
        self.read_message_file("SQUASH_MSG").await
    }

    /// Pending merge message, comment lines removed
    pub async fn merge_message(&self) -> Option<String> {
        self.read_message_file("MERGE_MSG").await
    }

    async fn read_message_file(&self, name: &str) -> Option<String> {
        let raw = tokio::fs::read_to_string(self.dot_git.join(name)).await.ok()?;
        Some(strip_commit_message_comments(&raw))
    }

    /// Contents of `commit.template`, or an empty string when unset or unreadable
    pub async fn commit_template(&self) -> String {
        let Ok(output) = self.run(&["config", "--get", "commit.template"]).await else {
            return String::new();
        };
        let configured = output.stdout.trim();
        if configured.is_empty() {
            return String::new();
        }

        let mut template_path = expand_home(configured, home_dir().as_deref());
        if template_path.is_relative() {
            template_path = self.root.join(template_path);
        }

        match tokio::fs::read_to_string(&template_path).await {
            Ok(raw) => strip_commit_message_comments(&raw),
            Err(err) => {
                debug!(path = %template_path.display(), "cannot read commit template: {}", err);
                String::new()
            }
        }
    }

    // Submodules

    pub async fn update_submodules<S: AsRef<str>>(&self, paths: &[S]) -> GitResult<()> {
        self.run_chunked(&["submodule", "update"], paths).await
    }

    /// Submodules declared in `.gitmodules`; none when the file is missing
    pub async fn submodules(&self) -> GitResult<Vec<Submodule>> {
        match tokio::fs::read_to_string(self.root.join(".gitmodules")).await {
            Ok(raw) => Ok(parser::parse_gitmodules(&raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Apply an operation's own rules on top of the generic classification
fn reclassify(err: GitError, operation: Operation) -> GitError {
    match classify_operation(operation, err.stdout(), err.stderr()) {
        Some(code) => err.with_code(code),
        None => err,
    }
}

fn rewrite_stderr(err: GitError, rewrite: impl FnOnce(&str) -> String) -> GitError {
    match err {
        GitError::Command(mut command) => {
            if let Some(stderr) = command.stderr.take() {
                command.stderr = Some(rewrite(&stderr));
            }
            GitError::Command(command)
        }
        other => other,
    }
}

fn stash_ref(index: usize) -> String {
    format!("stash@{{{}}}", index)
}

/// Drop `#` comment lines and surrounding whitespace
pub fn strip_commit_message_comments(message: &str) -> String {
    COMMENT_LINE_RE.replace_all(message, "").trim().to_string()
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// Expand `~/` and `~user/` the way git does for path settings
fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    let (Some(rest), Some(home)) = (path.strip_prefix('~'), home) else {
        return PathBuf::from(path);
    };
    let Some((user, tail)) = rest.split_once('/') else {
        return PathBuf::from(path);
    };

    let base = if user.is_empty() {
        home.to_path_buf()
    } else {
        home.parent().unwrap_or(home).join(user)
    };
    base.join(tail)
}

fn unicode_label(found: &'static encoding_rs::Encoding) -> &'static str {
    if found == encoding_rs::UTF_16LE {
        "utf16le"
    } else if found == encoding_rs::UTF_16BE {
        "utf16be"
    } else {
        "utf8"
    }
}

fn sniff_binary_mimetype(buffer: &[u8]) -> &'static str {
    const SIGNATURES: [(&[u8], &str); 7] = [
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF8", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1f\x8b", "application/gzip"),
        (b"\x7fELF", "application/x-elf"),
    ];

    SIGNATURES
        .iter()
        .find(|(magic, _)| buffer.starts_with(magic))
        .map_or("application/octet-stream", |(_, mimetype)| mimetype)
}
