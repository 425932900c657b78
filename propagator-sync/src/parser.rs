//! Change parser: model response text → [`ChangeSet`].
//!
//! Grammar (literal markers from `propagator_prompt::protocol`):
//!
//! ```text
//! --- FILE: <path> ---\n <body> --- END FILE ---
//! ```
//!
//! Extraction is lenient. A block whose body runs into the next header or the
//! end of the text without an end marker is dropped on its own; the blocks
//! around it still parse.

use std::collections::BTreeMap;

use regex::Regex;

use propagator_prompt::protocol::{FILE_BEGIN, FILE_END, MARKER_CLOSE, NO_CHANGES_SENTINEL};

/// Complete replacement content keyed by workspace-relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    files: BTreeMap<String, String>,
}

impl ChangeSet {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }
}

impl FromIterator<(String, String)> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

pub struct ResponseParser {
    header: Regex,
}

impl ResponseParser {
    pub fn new() -> Result<Self, regex::Error> {
        // Path is confined to the header line; the header must end the line.
        let header = Regex::new(&format!(
            r"{}([^\r\n]+?){}[ \t]*\r?\n",
            regex::escape(FILE_BEGIN),
            regex::escape(MARKER_CLOSE)
        ))?;
        Ok(Self { header })
    }

    pub fn parse(&self, response: &str) -> ChangeSet {
        if response.contains(NO_CHANGES_SENTINEL) {
            return ChangeSet::default();
        }

        let headers: Vec<_> = self
            .header
            .captures_iter(response)
            .filter_map(|caps| Some((caps.get(0)?, caps.get(1)?.as_str())))
            .collect();

        let mut files = BTreeMap::new();
        for (idx, (whole, raw_path)) in headers.iter().enumerate() {
            let region_end = headers
                .get(idx + 1)
                .map(|(next, _)| next.start())
                .unwrap_or(response.len());
            let region = &response[whole.end()..region_end];

            let Some(end) = region.find(FILE_END) else {
                tracing::debug!("dropping unterminated block for {raw_path:?}");
                continue;
            };
            let path = raw_path.trim();
            let content = region[..end].trim();
            if path.is_empty() || content.is_empty() {
                continue;
            }
            files.insert(path.to_string(), content.to_string());
        }
        ChangeSet { files }
    }
}
