use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use gitbridge::audit::{AuditLogger, NullSink, OutputSink, TracingSink};
use gitbridge::config::Config;
use gitbridge::error::AppResult;
use gitbridge::error_translation::ErrorTranslator;
use gitbridge::git::{BranchQuery, Git, GitVersion, LogOptions, RefQuery, RefSort, Repository, StatusOptions};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "gitbridge",
    version,
    about = "Structured views of a git repository",
    long_about = "Runs git against a repository and prints status, history, refs or branch \
    information as JSON."
)]
struct Cli {
    /// Directory inside the repository
    #[arg(short = 'C', long, default_value = ".")]
    path: PathBuf,

    /// Config file to use instead of ~/.config/gitbridge/config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Changed paths in the working tree and index
    Status {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        ignore_submodules: bool,
    },
    /// Recent commits
    Log {
        #[arg(short = 'n', long)]
        max_entries: Option<usize>,
        #[arg(index = 1)]
        path: Option<String>,
    },
    /// Heads, remote heads and tags
    Refs {
        #[arg(long)]
        count: Option<usize>,
        /// Newest commit first
        #[arg(long)]
        by_date: bool,
        #[arg(index = 1)]
        pattern: Option<String>,
    },
    /// A branch with its upstream and ahead/behind counts
    Branch {
        #[arg(index = 1, default_value = "HEAD")]
        name: String,
    },
    /// Local branches
    Branches {
        /// Include remote-tracking branches
        #[arg(short, long)]
        remote: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        let translated = ErrorTranslator::translate_app_error(&e);
        eprintln!("Error: {}", translated.simple_message);
        if let Some(suggestion) = translated.suggestion {
            eprintln!("  {}", suggestion);
        }
        eprintln!("  ({})", translated.raw_error);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_default()?,
    };

    let sink = output_sink(&config)?;
    let git = Git::discover(&config.git, sink).await?;
    GitVersion::parse(&format!("git version {}", git.version()))?.ensure_supported()?;

    let repository = Repository::discover_from(&git, &cli.path).await?;

    match cli.command {
        Commands::Status {
            limit,
            ignore_submodules,
        } => {
            let result = repository
                .status(&StatusOptions {
                    limit,
                    ignore_submodules,
                })
                .await?;
            print_json(&result)
        }
        Commands::Log { max_entries, path } => {
            let commits = repository.log(&LogOptions { max_entries, path }).await?;
            print_json(&commits)
        }
        Commands::Refs {
            count,
            by_date,
            pattern,
        } => {
            let sort = if by_date {
                RefSort::CommitterDate
            } else {
                RefSort::Alphabetically
            };
            let refs = repository
                .refs(&RefQuery {
                    count,
                    sort,
                    pattern,
                    contains: None,
                })
                .await?;
            print_json(&refs)
        }
        Commands::Branch { name } => {
            let branch = repository.get_branch(&name).await?;
            print_json(&branch)
        }
        Commands::Branches { remote } => {
            let branches = repository
                .branches(&BranchQuery {
                    remote,
                    ..BranchQuery::default()
                })
                .await?;
            print_json(&branches)
        }
    }
}

fn output_sink(config: &Config) -> AppResult<Arc<dyn OutputSink>> {
    if !config.audit.enabled {
        let sink: Arc<dyn OutputSink> = if config.git.log_commands {
            Arc::new(TracingSink)
        } else {
            Arc::new(NullSink)
        };
        return Ok(sink);
    }

    let logger = match &config.audit.path {
        Some(path) => AuditLogger::with_path(path)?,
        None => AuditLogger::new()?,
    };
    Ok(Arc::new(logger.with_max_size(config.audit.max_size_bytes)))
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    println!("{}", json);
    Ok(())
}
