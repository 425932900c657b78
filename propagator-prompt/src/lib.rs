//! # propagator-prompt
//!
//! Builds the request sent to the model for one site: selects source files
//! under a character budget and renders them, together with the requirements
//! document, through a Tera template.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use propagator_prompt::{pack_files, PromptContext, PromptRenderer, CONTEXT_BUDGET_CHARS};
//!
//! fn build(files: &BTreeMap<String, String>, prd: &str) -> Option<String> {
//!     let renderer = PromptRenderer::new(None).ok()?;
//!     let packed = pack_files(files, CONTEXT_BUDGET_CHARS);
//!     renderer.render(&PromptContext::new("My Site", prd, &packed)).ok()
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod protocol;

pub use context::{pack_files, FileExcerpt, PackedFiles, PromptContext, CONTEXT_BUDGET_CHARS};
pub use engine::{PromptRenderer, PROMPT_TEMPLATE};
pub use error::RenderError;
