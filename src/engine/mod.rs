//! Rebase orchestration
//!
//! One [Engine] processes one (source, destination, rebase) triple:
//! 1. Fetch the three branches and compute the merge base
//! 2. Classify destination-only commits by their `UPSTREAM:` tags
//! 3. Replay the kept commits onto the source head
//! 4. Optionally regenerate dependency state and commit it
//! 5. Push the result and ensure a pull request exists
//! 6. Report the terminal status to the notification sink
//!
//! Every collaborator is passed in at construction, so the whole run can be
//! exercised with [crate::git::MockRepository] and friends.

pub mod classify;
pub mod module_update;
pub mod publish;
pub mod replay;
pub mod sync;

pub use classify::{Classification, ClassifiedCommit, Classifier};
pub use module_update::{update_modules, MODULE_UPDATE_MESSAGE};
pub use publish::{publish, Published};
pub use replay::{ReplayState, Replayer};
pub use sync::{synchronize, SyncState};

use tracing::{error, info, warn};

use crate::domain::{BranchRef, Identity, ModuleUpdateResult, RebaseOutcome, RunStatus, TagPolicy};
use crate::error::{RebaseBotError, Result};
use crate::git::Repository;
use crate::github::PullRequests;
use crate::modules::ModuleTooling;
use crate::notify::Notifier;
use crate::ui::formatter;

/// Everything a run needs besides its collaborators
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Upstream branch to rebase onto
    pub source: BranchRef,

    /// Downstream branch whose commits are carried
    pub dest: BranchRef,

    /// Bot-owned branch the result is pushed to
    pub rebase: BranchRef,

    /// Committer of replayed commits and author of the module update commit
    pub identity: Identity,

    pub tag_policy: TagPolicy,

    /// Run the module update step after a clean replay
    pub update_modules: bool,

    /// Publish even when the module update step failed
    pub publish_on_module_failure: bool,

    /// Do everything locally, skip push and pull request
    pub dry_run: bool,

    /// Labels added to the pull request
    pub labels: Vec<String>,
}

/// Full account of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub status: RunStatus,
    pub outcome: Option<RebaseOutcome>,
    pub module_update: Option<ModuleUpdateResult>,
    pub published: Option<Published>,
    pub kept: usize,
    pub dropped: usize,
}

impl RunReport {
    fn new(status: RunStatus) -> Self {
        RunReport {
            status,
            outcome: None,
            module_update: None,
            published: None,
            kept: 0,
            dropped: 0,
        }
    }

    fn fatal(err: &RebaseBotError) -> Self {
        RunReport::new(RunStatus::Fatal {
            kind: err.kind(),
            message: err.to_string(),
        })
    }
}

/// Rebase engine over a repository, a pull request service, dependency
/// tooling and a notification sink
pub struct Engine<R, G, T, N> {
    settings: EngineSettings,
    repo: R,
    pulls: G,
    tooling: T,
    notifier: N,
}

impl<R, G, T, N> Engine<R, G, T, N>
where
    R: Repository,
    G: PullRequests,
    T: ModuleTooling,
    N: Notifier,
{
    pub fn new(settings: EngineSettings, repo: R, pulls: G, tooling: T, notifier: N) -> Self {
        Engine {
            settings,
            repo,
            pulls,
            tooling,
            notifier,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repo
    }

    pub fn pull_requests(&self) -> &G {
        &self.pulls
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Run the whole workflow once and report its terminal status.
    ///
    /// Never fails: errors become [RunStatus::Fatal]. The status message is
    /// sent to the notifier before returning.
    pub fn run(&mut self) -> RunReport {
        info!(
            source = %self.settings.source,
            dest = %self.settings.dest,
            rebase = %self.settings.rebase,
            policy = %self.settings.tag_policy,
            dry_run = self.settings.dry_run,
            "starting rebase"
        );

        let report = match self.execute() {
            Ok(report) => report,
            Err(err) => {
                error!(error = %err, "rebase failed");
                RunReport::fatal(&err)
            }
        };

        info!(status = report.status.name(), "rebase finished");
        self.notifier
            .notify(&formatter::status_message(&self.settings, &report));
        report
    }

    fn execute(&mut self) -> Result<RunReport> {
        let settings = &self.settings;

        let sync = synchronize(&mut self.repo, &settings.source, &settings.dest, &settings.rebase)?;
        let commits = self.repo.commits_between(sync.merge_base, sync.dest_head)?;
        info!(count = commits.len(), "destination-only commits");

        let classification =
            Classifier::new(&self.pulls, &settings.source, settings.tag_policy).classify_all(&commits)?;

        let kept = classification.kept();
        let outcome = Replayer::new(&mut self.repo, &settings.rebase.branch, &settings.identity)
            .replay(sync.source_head, &kept)?;

        let mut report = RunReport::new(match &outcome {
            RebaseOutcome::Success { .. } => RunStatus::Success,
            RebaseOutcome::NoOp { .. } => RunStatus::NoOp,
            RebaseOutcome::Conflict { commit, .. } => RunStatus::Conflict {
                commit: commit.id,
                message: commit.summary.clone(),
            },
        });
        report.kept = kept.len();
        report.dropped = classification.dropped_count();
        report.outcome = Some(outcome.clone());

        if outcome.is_conflict() {
            return Ok(report);
        }

        let mut head = outcome.head();
        if settings.update_modules {
            match update_modules(&mut self.repo, &self.tooling, &settings.identity) {
                Ok(result) => {
                    if let Some(commit) = result.commit {
                        head = commit;
                    }
                    report.module_update = Some(result);
                }
                Err(err) => {
                    warn!(error = %err, "module update failed");
                    report.status = RunStatus::ModuleUpdateFailed {
                        reason: err.to_string(),
                    };
                    if !settings.publish_on_module_failure {
                        info!("withholding publish after module update failure");
                        return Ok(report);
                    }
                }
            }
        }

        if settings.dry_run {
            info!(head = %head, "dry run, skipping publish");
            return Ok(report);
        }

        match publish(&mut self.repo, &self.pulls, settings, &sync, head, &classification) {
            Ok(published) => report.published = Some(published),
            Err(err) => {
                error!(error = %err, "publish failed");
                report.status = RunStatus::PublishFailed {
                    reason: err.to_string(),
                };
            }
        }

        Ok(report)
    }
}
