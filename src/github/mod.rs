//! GitHub pull request services
//!
//! The engine needs two things from GitHub: the merge state of upstream pull
//! requests referenced by numbered commit tags, and an idempotent way to open
//! the rebase pull request against the destination branch.

pub mod client;
pub mod mock;

pub use client::GitHubClient;
pub use mock::MockPullRequests;

use crate::domain::{BranchRef, MergeStatus};
use crate::error::Result;

/// Request to open or refresh the rebase pull request
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequestSpec {
    /// Branch carrying the rebased history (the bot's branch)
    pub head: BranchRef,
    /// Branch the pull request targets
    pub base: BranchRef,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// An open pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
    /// Whether this call created the pull request
    pub created: bool,
}

/// Pull request operations used by the rebase engine
pub trait PullRequests {
    /// Merge state of pull request `number` in `repo`
    ///
    /// Implementations return [MergeStatus::Unknown] when GitHub answers but
    /// the state cannot be determined; transport failures are errors.
    fn merge_status(&self, repo: &BranchRef, number: u64) -> Result<MergeStatus>;

    /// Create the pull request, or update title, body and labels of the open one
    /// for the same head and base
    fn ensure_pull_request(&self, spec: &PullRequestSpec) -> Result<PullRequest>;
}
