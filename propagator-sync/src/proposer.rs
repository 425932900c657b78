//! Change proposer: one packed prompt, one model call.

use propagator_prompt::{pack_files, PromptContext, PromptRenderer};

use crate::collector::CollectedFiles;
use crate::error::SiteError;
use crate::model::ModelClient;

/// Raw model output plus what went into the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub response: String,
    pub files_sent: usize,
    pub files_omitted: usize,
    pub chars_sent: usize,
}

pub struct Proposer<'a> {
    pub renderer: &'a PromptRenderer,
    pub model: &'a dyn ModelClient,
    pub budget: usize,
}

impl Proposer<'_> {
    pub fn propose(
        &self,
        files: &CollectedFiles,
        requirements: &str,
        site_name: &str,
    ) -> Result<Proposal, SiteError> {
        let packed = pack_files(files, self.budget);
        let prompt = self
            .renderer
            .render(&PromptContext::new(site_name, requirements, &packed))?;
        tracing::debug!(
            site = site_name,
            files = packed.included.len(),
            omitted = packed.omitted,
            "prompt rendered"
        );

        let response = self.model.complete(&prompt)?;
        Ok(Proposal {
            response,
            files_sent: packed.included.len(),
            files_omitted: packed.omitted,
            chars_sent: packed.chars,
        })
    }
}
