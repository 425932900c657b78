//! Prompt context: the serializable payload rendered into the model request,
//! and the packing policy that decides which source files it carries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::protocol::{
    request_file_header, FILE_BEGIN, FILE_END, MARKER_CLOSE, NO_CHANGES_SENTINEL,
};

/// Character budget for file content embedded in one request.
pub const CONTEXT_BUDGET_CHARS: usize = 100_000;

/// One source file selected for the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileExcerpt {
    pub path: String,
    pub content: String,
}

/// Result of [`pack_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedFiles {
    /// Included files, smallest first.
    pub included: Vec<FileExcerpt>,
    /// Non-empty files left out because the budget ran out.
    pub omitted: usize,
    /// Characters of file content included.
    pub chars: usize,
}

/// Select files for a request under a character budget.
///
/// Files are ordered by (character length, path) and appended until the next
/// one would push the running total past `budget`; that file and everything
/// after it is omitted whole. Empty files carry nothing to review and are
/// never packed.
pub fn pack_files(files: &BTreeMap<String, String>, budget: usize) -> PackedFiles {
    let mut ordered: Vec<(&String, &String, usize)> = files
        .iter()
        .filter(|(_, content)| !content.is_empty())
        .map(|(path, content)| (path, content, content.chars().count()))
        .collect();
    ordered.sort_by(|a, b| a.2.cmp(&b.2).then_with(|| a.0.cmp(b.0)));

    let mut packed = PackedFiles::default();
    for (idx, (path, content, len)) in ordered.iter().enumerate() {
        if packed.chars + len > budget {
            packed.omitted = ordered.len() - idx;
            break;
        }
        packed.chars += len;
        packed.included.push(FileExcerpt {
            path: (*path).clone(),
            content: (*content).clone(),
        });
    }
    packed
}

/// Flat rendering payload for `propagate.md.tera`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptContext {
    pub site_name: String,
    pub requirements: String,
    /// `=== path ===` headed file blocks joined by blank lines.
    pub files_context: String,
    pub file_count: usize,
    pub omitted_count: usize,

    pub file_begin: String,
    pub marker_close: String,
    pub file_end: String,
    pub no_changes_sentinel: String,
}

impl PromptContext {
    pub fn new(site_name: &str, requirements: &str, packed: &PackedFiles) -> Self {
        let files_context = packed
            .included
            .iter()
            .map(|f| format!("{}\n{}", request_file_header(&f.path), f.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        PromptContext {
            site_name: site_name.to_string(),
            requirements: requirements.to_string(),
            files_context,
            file_count: packed.included.len(),
            omitted_count: packed.omitted,
            file_begin: FILE_BEGIN.to_string(),
            marker_close: MARKER_CLOSE.to_string(),
            file_end: FILE_END.to_string(),
            no_changes_sentinel: NO_CHANGES_SENTINEL.to_string(),
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}
