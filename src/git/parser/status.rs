use serde::Serialize;

/// One changed path from `git status -z`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    /// Index status
    pub x: char,
    /// Working tree status
    pub y: char,
    /// New path of a rename or copy; `path` then holds the original
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    pub path: String,
}

/// Incremental parser for `git status -z` records.
///
/// Chunks may split a record anywhere. Bytes that do not yet form a complete
/// record are kept and retried once more data arrives, so feeding the same
/// stream in one call or in many yields the same entries.
#[derive(Debug, Default)]
pub struct StatusParser {
    last_raw: Vec<u8>,
    result: Vec<StatusEntry>,
}

impl StatusParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of raw stdout
    pub fn update(&mut self, raw: &[u8]) {
        let mut buffer = std::mem::take(&mut self.last_raw);
        buffer.extend_from_slice(raw);

        let mut i = 0;
        while let Some(next) = self.parse_entry(&buffer, i) {
            i = next;
        }

        buffer.drain(..i);
        self.last_raw = buffer;
    }

    /// Entries parsed so far
    pub fn status(&self) -> &[StatusEntry] {
        &self.result
    }

    pub fn len(&self) -> usize {
        self.result.len()
    }

    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }

    pub fn into_status(self) -> Vec<StatusEntry> {
        self.result
    }

    /// Parse one record at `i`; `None` means more input is needed
    fn parse_entry(&mut self, raw: &[u8], mut i: usize) -> Option<usize> {
        if i + 4 >= raw.len() {
            return None;
        }

        let x = raw[i] as char;
        let y = raw[i + 1] as char;
        // two status bytes and the separator
        i += 3;

        let mut rename = None;
        if x == 'R' || x == 'C' {
            let end = find_nul(raw, i)?;
            rename = Some(String::from_utf8_lossy(&raw[i..end]).into_owned()).filter(|r| !r.is_empty());
            i = end + 1;
        }

        let end = find_nul(raw, i)?;
        let path = String::from_utf8_lossy(&raw[i..end]).into_owned();

        // A trailing slash marks a nested repository
        if !path.is_empty() && !path.ends_with('/') {
            self.result.push(StatusEntry { x, y, rename, path });
        }

        Some(end + 1)
    }
}

fn find_nul(raw: &[u8], from: usize) -> Option<usize> {
    raw.get(from..)?
        .iter()
        .position(|&b| b == 0)
        .map(|offset| from + offset)
}
