use git2::Oid;
use tracing::{debug, info, warn};

use crate::domain::{ConflictingCommit, Identity, RebaseOutcome};
use crate::error::Result;
use crate::git::{ApplyResult, CommitInfo, Repository};

/// States of a single replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    Initial,
    /// Working branch reset to the new upstream head
    HeadSet,
    Replaying,
    Conflict,
    Done,
}

/// Applies kept commits, one at a time, onto a new base.
pub struct Replayer<'a, R: Repository + ?Sized> {
    repo: &'a mut R,
    branch: &'a str,
    committer: &'a Identity,
    state: ReplayState,
}

impl<'a, R: Repository + ?Sized> Replayer<'a, R> {
    pub fn new(repo: &'a mut R, branch: &'a str, committer: &'a Identity) -> Self {
        Replayer {
            repo,
            branch,
            committer,
            state: ReplayState::Initial,
        }
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    /// Reset the working branch to `onto` and apply `commits` in order.
    ///
    /// Stops at the first commit that does not apply cleanly and leaves the
    /// branch at the last commit that did. Commits whose changes are already
    /// present upstream are skipped.
    pub fn replay(&mut self, onto: Oid, commits: &[CommitInfo]) -> Result<RebaseOutcome> {
        self.repo.reset_branch(self.branch, onto)?;
        self.state = ReplayState::HeadSet;
        debug!(branch = self.branch, onto = %onto, "working branch reset");

        let mut head = onto;
        if commits.is_empty() {
            self.state = ReplayState::Done;
            info!("no commits to carry");
            return Ok(RebaseOutcome::NoOp { head });
        }

        self.state = ReplayState::Replaying;
        let mut applied = 0;
        for commit in commits {
            match self.repo.cherry_pick(self.branch, commit.id, self.committer)? {
                ApplyResult::Applied(new_head) => {
                    debug!(commit = %commit.short_id(), new = %new_head, "applied");
                    head = new_head;
                    applied += 1;
                }
                ApplyResult::Empty => {
                    info!(commit = %commit.short_id(), summary = commit.summary(), "already upstream, skipping");
                }
                ApplyResult::Conflict => {
                    self.state = ReplayState::Conflict;
                    warn!(commit = %commit.short_id(), summary = commit.summary(), "conflict");
                    return Ok(RebaseOutcome::Conflict {
                        commit: ConflictingCommit {
                            id: commit.id,
                            summary: commit.summary().to_string(),
                        },
                        head,
                    });
                }
            }
        }

        self.state = ReplayState::Done;
        info!(applied, "replay finished");
        if applied == 0 {
            Ok(RebaseOutcome::NoOp { head })
        } else {
            Ok(RebaseOutcome::Success { head, applied })
        }
    }
}
