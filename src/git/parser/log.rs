use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

/// `--format` template whose output [`parse_commits`] understands
pub const COMMIT_FORMAT: &str = "%H%n%aN%n%aE%n%at%n%ct%n%P%n%B";

// hash, author name, author email, author date, commit date, parents, body
static COMMIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([0-9a-f]{40})\n([^\n]*)\n([^\n]*)\n([^\n]*)\n([^\n]*)\n([^\n\x00]*)(?:\n([^\x00]*))?\x00",
    )
    .expect("commit pattern must compile")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub hash: String,
    pub message: String,
    pub parents: Vec<String>,
    pub author_name: String,
    pub author_email: String,
    pub author_date: Option<DateTime<Utc>>,
    pub commit_date: Option<DateTime<Utc>>,
}

/// Parse NUL-terminated records produced with [`COMMIT_FORMAT`] and `-z`.
///
/// One trailing newline is stripped from each message body.
pub fn parse_commits(data: &str) -> Vec<Commit> {
    COMMIT_RE
        .captures_iter(data)
        .map(|caps| {
            let field = |i: usize| caps.get(i).map_or("", |m| m.as_str());

            let message = field(7);
            let message = message.strip_suffix('\n').unwrap_or(message);
            let parents = field(6);

            Commit {
                hash: field(1).to_string(),
                message: message.to_string(),
                parents: if parents.is_empty() {
                    Vec::new()
                } else {
                    parents.split(' ').map(str::to_string).collect()
                },
                author_name: field(2).to_string(),
                author_email: field(3).to_string(),
                author_date: parse_epoch(field(4)),
                commit_date: parse_epoch(field(5)),
            }
        })
        .collect()
}

fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_A: &str = "52c293a05038d865604c2284aa8698bd087915a1";
    const HASH_B: &str = "8e5a374372b8393906c7e380dbb09349c5385554";
    const HASH_C: &str = "df27d8c75b129ab9b178b386077da2822101b217";

    #[test]
    fn test_single_commit() {
        let data = format!(
            "{HASH_A}\nJohn Doe\njohn.doe@mail.com\n1580811030\n1580811031\n{HASH_B}\nThis is a commit message.\x00"
        );

        let commits = parse_commits(&data);

        assert_eq!(commits.len(), 1);
        let commit = &commits[0];
        assert_eq!(commit.hash, HASH_A);
        assert_eq!(commit.message, "This is a commit message.");
        assert_eq!(commit.parents, vec![HASH_B]);
        assert_eq!(commit.author_name, "John Doe");
        assert_eq!(commit.author_email, "john.doe@mail.com");
        assert_eq!(commit.author_date.unwrap().timestamp(), 1580811030);
        assert_eq!(commit.commit_date.unwrap().timestamp(), 1580811031);
    }

    #[test]
    fn test_multiple_parents() {
        let data = format!(
            "{HASH_A}\nJohn Doe\njohn.doe@mail.com\n1580811030\n1580811031\n{HASH_B} {HASH_C}\nMerge branch.\x00"
        );

        let commits = parse_commits(&data);
        assert_eq!(commits[0].parents, vec![HASH_B, HASH_C]);
    }

    #[test]
    fn test_root_commit_has_no_parents() {
        let data = format!("{HASH_A}\nJohn Doe\njohn.doe@mail.com\n1580811030\n1580811031\n\nInitial.\x00");

        let commits = parse_commits(&data);
        assert_eq!(commits.len(), 1);
        assert!(commits[0].parents.is_empty());
        assert_eq!(commits[0].message, "Initial.");
    }

    #[test]
    fn test_multiline_message_keeps_interior_newlines() {
        let data = format!(
            "{HASH_A}\nJohn Doe\njohn.doe@mail.com\n1580811030\n1580811031\n{HASH_B}\nSubject\n\nBody line one\nBody line two\n\n\x00"
        );

        let commits = parse_commits(&data);
        assert_eq!(commits[0].message, "Subject\n\nBody line one\nBody line two\n");
    }

    #[test]
    fn test_records_in_order() {
        let data = format!(
            "{HASH_A}\nA\na@x\n1\n2\n{HASH_B}\nfirst\n\x00{HASH_B}\nB\nb@x\n3\n4\n{HASH_C}\nsecond\n\x00{HASH_C}\nC\nc@x\n5\n6\n\nthird\n\x00"
        );

        let commits = parse_commits(&data);
        let hashes: Vec<&str> = commits.iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(hashes, vec![HASH_A, HASH_B, HASH_C]);
        let messages: Vec<&str> = commits.iter().map(|c| c.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_empty_message() {
        let data = format!("{HASH_A}\nJohn Doe\njohn.doe@mail.com\n1580811030\n1580811031\n{HASH_B}\x00");

        let commits = parse_commits(&data);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, "");
    }

    #[test]
    fn test_unterminated_record_dropped() {
        let data = format!("{HASH_A}\nJohn Doe\njohn.doe@mail.com\n1580811030\n1580811031\n{HASH_B}\nNo terminator");
        assert!(parse_commits(&data).is_empty());
    }

    #[test]
    fn test_bad_date_is_none() {
        let data = format!("{HASH_A}\nJohn Doe\njohn.doe@mail.com\nsoon\n1580811031\n\nmsg\x00");
        let commits = parse_commits(&data);
        assert!(commits[0].author_date.is_none());
        assert!(commits[0].commit_date.is_some());
    }
}
