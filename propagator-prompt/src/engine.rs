//! Tera rendering engine for the propagation prompt.
//!
//! The default template is embedded with `include_str!`. A user directory may
//! hold `.tera` files that replace embedded templates of the same name, so the
//! prompt can be tuned without rebuilding.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use crate::context::PromptContext;
use crate::error::RenderError;

/// Name of the template rendered for every site request.
pub const PROMPT_TEMPLATE: &str = "propagate.md.tera";

const TPLS: &[(&str, &str)] = &[(PROMPT_TEMPLATE, include_str!("templates/propagate.md.tera"))];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.into(),
        source,
    }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() && path.extension().and_then(|s| s.to_str()) == Some("tera") {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    files
        .into_iter()
        .map(|path| {
            let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
            let name = normalize_template_name(rel);
            let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            Ok((name, contents))
        })
        .collect()
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = TPLS
        .iter()
        .map(|(name, content)| (normalize_template_name(Path::new(name)), content.to_string()))
        .collect();
    if let Some(dir) = user_template_dir {
        templates.extend(load_user_templates(dir)?);
    }

    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// PromptRenderer
// ---------------------------------------------------------------------------

/// Renders the per-site request text. Build once and share across workers.
pub struct PromptRenderer {
    tera: Tera,
}

impl PromptRenderer {
    /// Load embedded templates plus any overrides in `user_template_dir`.
    /// A directory that does not exist is ignored.
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(PromptRenderer {
            tera: build_tera(user_template_dir)?,
        })
    }

    pub fn render(&self, ctx: &PromptContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        Ok(self.tera.render(PROMPT_TEMPLATE, &tera_ctx)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
