use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static HEAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^refs/heads/([^ ]+) ([0-9a-f]{40})(?: ([0-9a-f]{40})?)?$").expect("head pattern must compile")
});

static REMOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^refs/remotes/([^/]+)/([^ ]+) ([0-9a-f]{40})(?: ([0-9a-f]{40})?)?$")
        .expect("remote pattern must compile")
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^refs/tags/([^ ]+) ([0-9a-f]{40})(?: ([0-9a-f]{40})?)?$").expect("tag pattern must compile")
});

static UPSTREAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^refs/remotes/([^/]+)/(.+)$").expect("upstream pattern must compile"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefType {
    Head,
    RemoteHead,
    Tag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ref {
    #[serde(rename = "type")]
    pub ref_type: RefType,
    /// Absent for a detached HEAD
    pub name: Option<String>,
    /// Absent when HEAD was resolved symbolically
    pub commit: Option<String>,
    /// Remote name, for remote heads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

impl Ref {
    pub fn head(name: impl Into<String>, commit: Option<String>) -> Self {
        Self {
            ref_type: RefType::Head,
            name: Some(name.into()),
            commit,
            remote: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamRef {
    pub remote: String,
    pub name: String,
}

/// A ref plus its upstream tracking information, when known
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    #[serde(flatten)]
    pub reference: Ref,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<UpstreamRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ahead: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behind: Option<usize>,
}

impl From<Ref> for Branch {
    fn from(reference: Ref) -> Self {
        Self {
            reference,
            upstream: None,
            ahead: None,
            behind: None,
        }
    }
}

/// Parse `for-each-ref --format='%(refname) %(objectname) %(*objectname)'`.
///
/// Tags report the peeled commit when there is one.
pub fn parse_refs(output: &str) -> Vec<Ref> {
    output.trim().lines().filter_map(parse_ref_line).collect()
}

fn parse_ref_line(line: &str) -> Option<Ref> {
    let line = line.trim_end_matches('\r');

    if let Some(caps) = HEAD_RE.captures(line) {
        return Some(Ref::head(&caps[1], Some(caps[2].to_string())));
    }

    if let Some(caps) = REMOTE_RE.captures(line) {
        return Some(Ref {
            ref_type: RefType::RemoteHead,
            name: Some(format!("{}/{}", &caps[1], &caps[2])),
            commit: Some(caps[3].to_string()),
            remote: Some(caps[1].to_string()),
        });
    }

    if let Some(caps) = TAG_RE.captures(line) {
        let commit = caps.get(3).or_else(|| caps.get(2))?;
        return Some(Ref {
            ref_type: RefType::Tag,
            name: Some(caps[1].to_string()),
            commit: Some(commit.as_str().to_string()),
            remote: None,
        });
    }

    None
}

/// Split `refs/remotes/<remote>/<name>` into its parts
pub fn parse_upstream(full_name: &str) -> Option<UpstreamRef> {
    let caps = UPSTREAM_RE.captures(full_name.trim())?;
    Some(UpstreamRef {
        remote: caps[1].to_string(),
        name: caps[2].to_string(),
    })
}

/// Count `(ahead, behind)` from `rev-list --left-right a...b` output
pub fn parse_ahead_behind(output: &str) -> (usize, usize) {
    output.lines().fold((0, 0), |(ahead, behind), line| match line.as_bytes().first() {
        Some(b'<') => (ahead + 1, behind),
        Some(b'>') => (ahead, behind + 1),
        _ => (ahead, behind),
    })
}
