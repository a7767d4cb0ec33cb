use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::domain::{BranchRef, MergeStatus};
use crate::error::{RebaseBotError, Result};
use crate::github::{PullRequest, PullRequestSpec, PullRequests};

/// Mock pull request service for testing without GitHub
///
/// Pull requests without a configured state report [MergeStatus::NotMerged].
#[derive(Default)]
pub struct MockPullRequests {
    statuses: HashMap<u64, MergeStatus>,
    status_queries: Cell<usize>,
    ensured: RefCell<Vec<PullRequestSpec>>,
    fail_ensure: bool,
}

impl MockPullRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the merge state reported for pull request `number`
    pub fn with_status(mut self, number: u64, status: MergeStatus) -> Self {
        self.statuses.insert(number, status);
        self
    }

    /// Make pull request creation fail
    pub fn failing(mut self) -> Self {
        self.fail_ensure = true;
        self
    }

    /// Number of merge state lookups made so far
    pub fn status_queries(&self) -> usize {
        self.status_queries.get()
    }

    /// Every pull request requested so far
    pub fn ensured(&self) -> Vec<PullRequestSpec> {
        self.ensured.borrow().clone()
    }
}

impl PullRequests for MockPullRequests {
    fn merge_status(&self, _repo: &BranchRef, number: u64) -> Result<MergeStatus> {
        self.status_queries.set(self.status_queries.get() + 1);
        Ok(self
            .statuses
            .get(&number)
            .copied()
            .unwrap_or(MergeStatus::NotMerged))
    }

    fn ensure_pull_request(&self, spec: &PullRequestSpec) -> Result<PullRequest> {
        if self.fail_ensure {
            return Err(RebaseBotError::github("HTTP 422: Validation Failed"));
        }

        let mut ensured = self.ensured.borrow_mut();
        let created = !ensured
            .iter()
            .any(|existing| existing.head == spec.head && existing.base == spec.base);
        ensured.push(spec.clone());

        Ok(PullRequest {
            number: 1,
            html_url: format!("https://github.com/{}/pull/1", spec.base.repo_slug()),
            created,
        })
    }
}
