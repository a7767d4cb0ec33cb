use std::collections::HashMap;

use tracing::debug;

use crate::domain::{BranchRef, CommitTag, InvalidTag, MergeStatus, TagDecision, TagPolicy};
use crate::error::{RebaseBotError, Result};
use crate::git::CommitInfo;
use crate::github::PullRequests;

/// A destination commit together with its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedCommit {
    pub commit: CommitInfo,
    pub decision: TagDecision,
}

/// Classification of every destination-only commit, in original order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub commits: Vec<ClassifiedCommit>,
}

impl Classification {
    /// Commits to replay, oldest first
    pub fn kept(&self) -> Vec<CommitInfo> {
        self.commits
            .iter()
            .filter(|c| c.decision.keep)
            .map(|c| c.commit.clone())
            .collect()
    }

    pub fn dropped(&self) -> impl Iterator<Item = &ClassifiedCommit> {
        self.commits.iter().filter(|c| !c.decision.keep)
    }

    pub fn kept_count(&self) -> usize {
        self.commits.iter().filter(|c| c.decision.keep).count()
    }

    pub fn dropped_count(&self) -> usize {
        self.commits.len() - self.kept_count()
    }
}

/// Decides which destination commits survive the rebase.
///
/// Merge states of upstream pull requests are looked up at most once per
/// pull request number for the lifetime of the classifier.
pub struct Classifier<'a, G: PullRequests + ?Sized> {
    pulls: &'a G,
    upstream: &'a BranchRef,
    policy: TagPolicy,
    merge_states: HashMap<u64, MergeStatus>,
}

impl<'a, G: PullRequests + ?Sized> Classifier<'a, G> {
    /// `upstream` is the repository numbered tags refer to.
    pub fn new(pulls: &'a G, upstream: &'a BranchRef, policy: TagPolicy) -> Self {
        Classifier {
            pulls,
            upstream,
            policy,
            merge_states: HashMap::new(),
        }
    }

    pub fn classify(&mut self, commit: &CommitInfo) -> Result<TagDecision> {
        let tag = CommitTag::parse(&commit.message).map_err(|InvalidTag(tag)| {
            RebaseBotError::InvalidTag {
                commit: commit.short_id(),
                tag,
            }
        })?;

        let merge_status = match tag {
            CommitTag::Pull(number) if self.policy != TagPolicy::None => {
                Some(self.merge_status(number)?)
            }
            _ => None,
        };

        let decision = TagDecision::decide(tag, merge_status, self.policy);
        debug!(
            commit = %commit.short_id(),
            kind = tag.kind(),
            keep = decision.keep,
            "classified commit"
        );
        Ok(decision)
    }

    /// Classify every commit; fails on the first invalid tag.
    pub fn classify_all(&mut self, commits: &[CommitInfo]) -> Result<Classification> {
        let mut classified = Vec::with_capacity(commits.len());
        for commit in commits {
            let decision = self.classify(commit)?;
            classified.push(ClassifiedCommit {
                commit: commit.clone(),
                decision,
            });
        }
        Ok(Classification {
            commits: classified,
        })
    }

    fn merge_status(&mut self, number: u64) -> Result<MergeStatus> {
        if let Some(status) = self.merge_states.get(&number) {
            return Ok(*status);
        }

        let status = self.pulls.merge_status(self.upstream, number)?;
        self.merge_states.insert(number, status);
        Ok(status)
    }
}
