use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static LS_TREE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+(\S+)\s+(\S+)\s+(\S+)\s+(.*)$").expect("ls-tree pattern must compile")
});

static LS_FILES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+(\S+)\s+(\S+)\s+(.*)$").expect("ls-files pattern must compile"));

/// Row of `git ls-tree -l`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LsTreeElement {
    pub mode: String,
    #[serde(rename = "type")]
    pub object_type: String,
    pub object: String,
    /// `-` for trees
    pub size: String,
    pub file: String,
}

/// Row of `git ls-files --stage`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LsFilesElement {
    pub mode: String,
    pub object: String,
    pub stage: String,
    pub file: String,
}

pub fn parse_ls_tree(output: &str) -> Vec<LsTreeElement> {
    output
        .split('\n')
        .filter(|line| !line.is_empty())
        .filter_map(|line| LS_TREE_RE.captures(line))
        .map(|caps| LsTreeElement {
            mode: caps[1].to_string(),
            object_type: caps[2].to_string(),
            object: caps[3].to_string(),
            size: caps[4].to_string(),
            file: caps[5].to_string(),
        })
        .collect()
}

pub fn parse_ls_files(output: &str) -> Vec<LsFilesElement> {
    output
        .split('\n')
        .filter(|line| !line.is_empty())
        .filter_map(|line| LS_FILES_RE.captures(line))
        .map(|caps| LsFilesElement {
            mode: caps[1].to_string(),
            object: caps[2].to_string(),
            stage: caps[3].to_string(),
            file: caps[4].to_string(),
        })
        .collect()
}
