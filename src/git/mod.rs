//! Git operations abstraction layer
//!
//! This module provides a trait-based abstraction over the version-control
//! primitives the rebase engine needs, allowing for a real repository and an
//! in-memory mock for testing.
//!
//! # Overview
//!
//! The primary abstraction is the [Repository] trait. The concrete
//! implementations are:
//!
//! - [repository::Git2Repository]: A real implementation using the `git2` crate
//! - [mock::MockRepository]: An in-memory implementation for testing
//!
//! # Usage
//!
//! Engine code depends on the [Repository] trait rather than concrete
//! implementations.
//!
//! ```rust
//! # use rebase_bot::git::Repository;
//! # use rebase_bot::domain::BranchRef;
//! # fn example<R: Repository>(repo: &mut R, source: &BranchRef, dest: &BranchRef) -> rebase_bot::Result<()> {
//! let source_head = repo.fetch_branch("source", source)?;
//! let dest_head = repo.fetch_branch("dest", dest)?;
//! if let Some(base) = repo.merge_base(dest_head, source_head)? {
//!     let commits = repo.commits_between(base, dest_head)?;
//!     println!("{} downstream commits", commits.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use std::path::Path;

use crate::domain::{BranchRef, Identity};
use crate::error::Result;
use git2::Oid;

/// Commit information for classification
#[derive(Debug, Clone, PartialEq)]
pub struct CommitInfo {
    /// The commit id
    pub id: Oid,
    /// The full commit message
    pub message: String,
    /// The commit author
    pub author: String,
}

impl CommitInfo {
    /// First line of the message
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }

    /// Abbreviated commit id for reports
    pub fn short_id(&self) -> String {
        short_id(self.id)
    }
}

/// Seven character form of an object id.
pub fn short_id(oid: Oid) -> String {
    let mut id = oid.to_string();
    id.truncate(7);
    id
}

/// Result of applying one commit as a patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// The patch applied and produced this new commit
    Applied(Oid),
    /// The patch introduced no change on top of the current tip
    Empty,
    /// The patch does not apply cleanly; nothing was written
    Conflict,
}

/// Version-control primitives used by the rebase engine
///
/// The working copy behind an implementation is exclusively owned by one
/// engine run. Mutating operations take `&mut self` to make that explicit.
///
/// ## Error Handling
///
/// All methods return [crate::error::Result<T>]. Implementations map
/// underlying errors (like `git2::Error`) to the appropriate
/// [crate::error::RebaseBotError] variants.
pub trait Repository {
    /// Root of the working tree
    fn workdir(&self) -> &Path;

    /// Fetch one branch of a remote repository
    ///
    /// Registers (or re-points) the remote `remote` at `branch.url` and
    /// fetches `branch.branch` into `refs/remotes/<remote>/<branch>`.
    ///
    /// # Returns
    /// * `Ok(Oid)` - The fetched branch head
    /// * `Err(RefNotFound)` - If the branch does not exist or cannot be fetched
    fn fetch_branch(&mut self, remote: &str, branch: &BranchRef) -> Result<Oid>;

    /// Most recent common ancestor of two commits, `None` for unrelated histories
    fn merge_base(&self, one: Oid, two: Oid) -> Result<Option<Oid>>;

    /// Get commits reachable from `head` but not from `base`
    ///
    /// Commits are returned in chronological order (oldest first). Merge
    /// commits are skipped since they cannot be applied as a single patch.
    fn commits_between(&self, base: Oid, head: Oid) -> Result<Vec<CommitInfo>>;

    /// Create or reset the local branch `branch` at `target` and check it out
    ///
    /// The working tree and index are forced to match `target`.
    fn reset_branch(&mut self, branch: &str, target: Oid) -> Result<()>;

    /// Apply a single commit as a patch onto the tip of the checked out `branch`
    ///
    /// On success the branch advances to the new commit, which keeps the
    /// original author and uses `committer`. On conflict neither the branch
    /// nor the working tree changes.
    fn cherry_pick(&mut self, branch: &str, commit: Oid, committer: &Identity)
        -> Result<ApplyResult>;

    /// Whether the working tree differs from the last commit (untracked files included)
    fn has_changes(&self) -> Result<bool>;

    /// Stage every change in the working tree and commit it on the current branch
    fn commit_all(&mut self, message: &str, identity: &Identity) -> Result<Oid>;

    /// Tree of a commit, used to compare content across histories
    fn tree_id(&self, commit: Oid) -> Result<Oid>;

    /// Push local `branch` to `target.branch` on `remote`
    fn push_branch(
        &mut self,
        branch: &str,
        remote: &str,
        target: &BranchRef,
        force: bool,
    ) -> Result<()>;
}
