use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use propagator_core::{RepoId, SiteDescriptor, SiteStatus};
use propagator_prompt::PromptRenderer;
use propagator_sync::{
    run_site, CommitOutcome, GitError, ModelClient, ModelError, PipelineContext, RunLog, Vcs,
    Workspace,
};
use tempfile::TempDir;

#[derive(Default)]
struct FakeVcs {
    seed: Vec<(&'static str, &'static str)>,
    clone_fails: bool,
    push_fails: bool,
    /// When set, the commit reports nothing to commit.
    clean_tree: bool,
    calls: Mutex<Vec<String>>,
    committed_content: Mutex<Vec<(String, String)>>,
}

impl FakeVcs {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Vcs for FakeVcs {
    fn clone_shallow(&self, repo: &RepoId, dest: &Path) -> Result<(), GitError> {
        self.calls.lock().unwrap().push(format!("clone {repo}"));
        if self.clone_fails {
            return Err(GitError::Failed {
                command: "git clone".into(),
                code: Some(128),
                stderr: "fatal: repository not found".into(),
            });
        }
        for (rel, content) in &self.seed {
            let path = dest.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        Ok(())
    }

    fn commit_all(&self, workdir: &Path, _message: &str) -> Result<CommitOutcome, GitError> {
        self.calls.lock().unwrap().push("commit".into());
        if self.clean_tree {
            return Ok(CommitOutcome::NothingToCommit);
        }
        let mut seen = self.committed_content.lock().unwrap();
        for entry in std::fs::read_dir(workdir).unwrap().flatten() {
            if entry.file_type().unwrap().is_file() {
                let content = std::fs::read_to_string(entry.path()).unwrap();
                seen.push((entry.file_name().to_string_lossy().into_owned(), content));
            }
        }
        Ok(CommitOutcome::Committed)
    }

    fn push(&self, _workdir: &Path) -> Result<(), GitError> {
        self.calls.lock().unwrap().push("push".into());
        if self.push_fails {
            return Err(GitError::Failed {
                command: "git push".into(),
                code: Some(1),
                stderr: "rejected".into(),
            });
        }
        Ok(())
    }
}

struct FakeModel {
    reply: Result<String, String>,
}

impl ModelClient for FakeModel {
    fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
        self.reply.clone().map_err(ModelError::Transport)
    }
}

struct Harness {
    work: TempDir,
    vcs: Arc<FakeVcs>,
    log: Arc<RunLog>,
    ctx: PipelineContext,
}

fn harness(vcs: FakeVcs, reply: Result<&str, &str>, dry_run: bool) -> Harness {
    let work = TempDir::new().unwrap();
    let vcs = Arc::new(vcs);
    let log = Arc::new(RunLog::in_memory());
    let model = Arc::new(FakeModel {
        reply: reply.map(str::to_string).map_err(str::to_string),
    });
    let ctx = PipelineContext::new(
        vcs.clone(),
        model,
        PromptRenderer::new(None).unwrap(),
        log.clone(),
        "# PRD\nEvery page has a footer.".to_string(),
        work.path().to_path_buf(),
        dry_run,
    )
    .unwrap();
    Harness { work, vcs, log, ctx }
}

fn site() -> SiteDescriptor {
    SiteDescriptor::new(RepoId::from("acme/dental"), Some("Smile Dental".into()))
}

fn workspace_dir(h: &Harness) -> PathBuf {
    h.work.path().join(Workspace::dir_name(&site().repo))
}

const TWO_BLOCKS: &str = "--- FILE: index.html ---\n<footer>new</footer>\n--- END FILE ---\n\
--- FILE: about.html ---\n<p>about</p>\n--- END FILE ---\n";

#[test]
fn clone_failure_is_a_git_error_result() {
    let h = harness(
        FakeVcs {
            clone_fails: true,
            ..Default::default()
        },
        Ok("unused"),
        false,
    );
    let result = run_site(&h.ctx, &site());
    assert_eq!(result.status, SiteStatus::Error);
    assert!(result.error.unwrap().contains("repository not found"));
    assert!(!workspace_dir(&h).exists());
    assert!(h
        .log
        .messages()
        .iter()
        .any(|m| m.starts_with("  ❌ Git error:")));
}

#[test]
fn dry_run_reports_without_committing() {
    let h = harness(
        FakeVcs {
            seed: vec![("index.html", "<footer>old</footer>\n")],
            ..Default::default()
        },
        Ok(TWO_BLOCKS),
        true,
    );
    let result = run_site(&h.ctx, &site());
    assert_eq!(result.status, SiteStatus::DryRun);
    assert_eq!(result.changes, 2);
    assert_eq!(h.vcs.calls(), ["clone acme/dental"]);

    let messages = h.log.messages();
    assert!(messages.contains(&"    about.html (new)".to_string()));
    assert!(messages.contains(&"    index.html (+1/-1)".to_string()));
    assert!(!workspace_dir(&h).exists());
}

#[test]
fn sentinel_means_no_changes() {
    let h = harness(FakeVcs::default(), Ok("NO_CHANGES_NEEDED"), false);
    let result = run_site(&h.ctx, &site());
    assert_eq!(result.status, SiteStatus::NoChanges);
    assert_eq!(result.changes, 0);
    assert_eq!(h.vcs.calls(), ["clone acme/dental"]);
}

#[test]
fn one_block_is_committed_and_pushed() {
    let h = harness(
        FakeVcs::default(),
        Ok("--- FILE: index.html ---\n<h1>Smile</h1>\n--- END FILE ---"),
        false,
    );
    let result = run_site(&h.ctx, &site());
    assert_eq!(result.status, SiteStatus::Success);
    assert_eq!(result.changes, 1);
    assert!(result.error.is_none());
    assert_eq!(h.vcs.calls(), ["clone acme/dental", "commit", "push"]);
    assert_eq!(
        *h.vcs.committed_content.lock().unwrap(),
        [("index.html".to_string(), "<h1>Smile</h1>".to_string())]
    );
    assert!(!workspace_dir(&h).exists());
}

#[test]
fn clean_tree_after_apply_is_no_changes() {
    let h = harness(
        FakeVcs {
            clean_tree: true,
            ..Default::default()
        },
        Ok("--- FILE: index.html ---\nsame\n--- END FILE ---"),
        false,
    );
    let result = run_site(&h.ctx, &site());
    assert_eq!(result.status, SiteStatus::NoChanges);
    assert_eq!(result.changes, 1);
    assert_eq!(h.vcs.calls(), ["clone acme/dental", "commit"]);
}

#[test]
fn push_failure_is_an_error_with_change_count() {
    let h = harness(
        FakeVcs {
            push_fails: true,
            ..Default::default()
        },
        Ok(TWO_BLOCKS),
        false,
    );
    let result = run_site(&h.ctx, &site());
    assert_eq!(result.status, SiteStatus::Error);
    assert_eq!(result.changes, 2);
    assert!(result.error.unwrap().contains("git push failed"));
    assert!(!workspace_dir(&h).exists());
}

#[test]
fn model_failure_is_an_error() {
    let h = harness(FakeVcs::default(), Err("connection reset"), false);
    let result = run_site(&h.ctx, &site());
    assert_eq!(result.status, SiteStatus::Error);
    assert!(result.error.unwrap().contains("connection reset"));
    assert_eq!(h.vcs.calls(), ["clone acme/dental"]);
}

#[test]
fn escaping_path_is_an_error_and_nothing_is_committed() {
    let h = harness(
        FakeVcs::default(),
        Ok("--- FILE: ../../outside.md ---\npwned\n--- END FILE ---"),
        false,
    );
    let result = run_site(&h.ctx, &site());
    assert_eq!(result.status, SiteStatus::Error);
    assert!(result.error.unwrap().contains("outside the workspace"));
    assert_eq!(h.vcs.calls(), ["clone acme/dental"]);
    assert!(!h.work.path().parent().unwrap().join("outside.md").exists());
}

#[test]
fn progress_log_brackets_each_site() {
    let h = harness(FakeVcs::default(), Ok("NO_CHANGES_NEEDED"), false);
    run_site(&h.ctx, &site());
    let messages = h.log.messages();
    assert_eq!(messages[1], "Processing: Smile Dental (acme/dental)");
    assert!(messages.contains(&"  Found 0 source files".to_string()));
    assert_eq!(messages.last().unwrap(), "  ⏭️  No changes needed");
}
