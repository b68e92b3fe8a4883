use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::refs::Ref;

static SUBMODULE_SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*\[submodule "([^"]+)"\]\s*$"#).expect("section pattern must compile")
});

static PROPERTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\w+)\s*=\s*(.*)$").expect("property pattern must compile"));

static STASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^stash@\{(\d+)\}:(.+)$").expect("stash pattern must compile"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submodule {
    pub name: String,
    pub path: String,
    pub url: String,
}

#[derive(Debug, Default)]
struct PartialSubmodule {
    name: String,
    path: Option<String>,
    url: Option<String>,
}

impl PartialSubmodule {
    fn finish(self) -> Option<Submodule> {
        Some(Submodule {
            name: self.name,
            path: self.path?,
            url: self.url?,
        })
    }
}

/// Parse `.gitmodules`, keeping only sections with both `path` and `url`
pub fn parse_gitmodules(raw: &str) -> Vec<Submodule> {
    let mut result = Vec::new();
    let mut current: Option<PartialSubmodule> = None;

    for line in raw.lines() {
        if let Some(caps) = SUBMODULE_SECTION_RE.captures(line) {
            result.extend(current.take().and_then(PartialSubmodule::finish));
            current = Some(PartialSubmodule {
                name: caps[1].to_string(),
                ..Default::default()
            });
            continue;
        }

        let Some(submodule) = current.as_mut() else {
            continue;
        };
        let Some(caps) = PROPERTY_RE.captures(line) else {
            continue;
        };
        match &caps[1] {
            "path" => submodule.path = Some(caps[2].to_string()),
            "url" => submodule.url = Some(caps[2].to_string()),
            _ => {}
        }
    }

    result.extend(current.and_then(PartialSubmodule::finish));
    result
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stash {
    pub index: usize,
    pub description: String,
}

/// Parse `git stash list`
pub fn parse_stash_list(output: &str) -> Vec<Stash> {
    output
        .trim()
        .lines()
        .filter_map(|line| STASH_RE.captures(line))
        .filter_map(|caps| {
            Some(Stash {
                index: caps[1].parse().ok()?,
                description: caps[2].to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Remote {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_url: Option<String>,
    pub is_read_only: bool,
}

/// Parse `git remote --verbose`, merging the fetch and push lines of each remote.
///
/// A remote without a push URL, or whose push URL is `no_push`, is read-only.
pub fn parse_remotes(output: &str) -> Vec<Remote> {
    let mut remotes: Vec<Remote> = Vec::new();

    for line in output.trim().lines().filter(|line| !line.is_empty()) {
        let mut parts = line.split_whitespace();
        let (Some(name), Some(url)) = (parts.next(), parts.next()) else {
            continue;
        };
        let kind = parts.next().unwrap_or("").to_ascii_lowercase();

        let index = match remotes.iter().position(|remote| remote.name == name) {
            Some(index) => index,
            None => {
                remotes.push(Remote {
                    name: name.to_string(),
                    fetch_url: None,
                    push_url: None,
                    is_read_only: false,
                });
                remotes.len() - 1
            }
        };
        let remote = &mut remotes[index];

        if kind.contains("fetch") {
            remote.fetch_url = Some(url.to_string());
        } else if kind.contains("push") {
            remote.push_url = Some(url.to_string());
        } else {
            remote.fetch_url = Some(url.to_string());
            remote.push_url = Some(url.to_string());
        }

        remote.is_read_only = remote.push_url.as_deref().is_none_or(|url| url == "no_push");
    }

    remotes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiffStatus {
    Modified,
    Added,
    Deleted,
    Renamed,
}

/// One entry of `git diff --name-status -z`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffChange {
    pub status: DiffStatus,
    /// Path before the change
    pub original_path: String,
    /// Path after the change; differs from `original_path` only for renames
    pub path: String,
}

/// Parse `git diff --name-status -z --diff-filter=ADMR`.
///
/// Parsing stops at the first unknown status letter or truncated record.
pub fn parse_name_status(output: &str) -> Vec<DiffChange> {
    let entries: Vec<&str> = output.split('\0').collect();
    let mut result = Vec::new();
    let mut index = 0;

    while index + 1 < entries.len() {
        let change = entries[index];
        let original = entries[index + 1];
        index += 2;

        if change.is_empty() || original.is_empty() {
            break;
        }

        // Renames and copies carry a similarity score, e.g. R100
        let status = match change.as_bytes()[0] {
            b'M' => DiffStatus::Modified,
            b'A' => DiffStatus::Added,
            b'D' => DiffStatus::Deleted,
            b'R' => {
                let Some(renamed) = entries.get(index).filter(|path| !path.is_empty()) else {
                    break;
                };
                index += 1;
                result.push(DiffChange {
                    status: DiffStatus::Renamed,
                    original_path: original.to_string(),
                    path: renamed.to_string(),
                });
                continue;
            }
            _ => break,
        };

        result.push(DiffChange {
            status,
            original_path: original.to_string(),
            path: original.to_string(),
        });
    }

    result
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
}

/// Parse `git config -l`; a key without `=` has an empty value
pub fn parse_config_list(output: &str) -> Vec<ConfigEntry> {
    output
        .trim()
        .split(['\r', '\n'])
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once('=') {
            Some((key, value)) => ConfigEntry {
                key: key.to_string(),
                value: value.to_string(),
            },
            None => ConfigEntry {
                key: line.to_string(),
                value: String::new(),
            },
        })
        .collect()
}

/// Local branches whose upstream is `upstream`, from
/// `for-each-ref --format=%(refname:short)%00%(upstream:short) refs/heads`
pub fn parse_tracking_branches(output: &str, upstream: &str) -> Vec<Ref> {
    output
        .trim()
        .lines()
        .filter_map(|line| line.trim().split_once('\0'))
        .filter(|(_, tracked)| *tracked == upstream)
        .map(|(name, _)| Ref::head(name, None))
        .collect()
}
