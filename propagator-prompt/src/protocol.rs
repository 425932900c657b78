//! Literal markers shared by the prompt template and the response parser.
//!
//! A response is either the sentinel, or any number of blocks:
//!
//! ```text
//! --- FILE: <relative/path> ---
//! <complete file content>
//! --- END FILE ---
//! ```

/// Response meaning "no file changes are required".
pub const NO_CHANGES_SENTINEL: &str = "NO_CHANGES_NEEDED";

/// Opens a block header; followed by the path and [`MARKER_CLOSE`].
pub const FILE_BEGIN: &str = "--- FILE: ";

/// Closes the block header line.
pub const MARKER_CLOSE: &str = " ---";

/// Terminates a block.
pub const FILE_END: &str = "--- END FILE ---";

/// Header printed before each file in the request payload.
pub fn request_file_header(path: &str) -> String {
    format!("=== {path} ===")
}
