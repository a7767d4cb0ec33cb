use git2::Oid;
use tracing::info;

use crate::domain::BranchRef;
use crate::error::{RebaseBotError, Result};
use crate::git::Repository;

/// Remote names the three branches are fetched under.
pub const SOURCE_REMOTE: &str = "source";
pub const DEST_REMOTE: &str = "dest";
pub const REBASE_REMOTE: &str = "rebase";

/// Heads of the three branches after fetching, plus their merge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    pub source_head: Oid,
    pub dest_head: Oid,
    pub rebase_head: Oid,
    /// Merge base of destination and source
    pub merge_base: Oid,
}

/// Fetch source, destination and rebase branches and compute the merge base.
///
/// Only remote-tracking refs are touched; local branches are left alone.
pub fn synchronize<R: Repository + ?Sized>(
    repo: &mut R,
    source: &BranchRef,
    dest: &BranchRef,
    rebase: &BranchRef,
) -> Result<SyncState> {
    let source_head = repo.fetch_branch(SOURCE_REMOTE, source)?;
    let dest_head = repo.fetch_branch(DEST_REMOTE, dest)?;
    let rebase_head = repo.fetch_branch(REBASE_REMOTE, rebase)?;

    let merge_base = repo
        .merge_base(dest_head, source_head)?
        .ok_or_else(|| RebaseBotError::NoCommonAncestor {
            destination: dest.to_string(),
            upstream: source.to_string(),
        })?;

    info!(
        source = %source_head,
        dest = %dest_head,
        rebase = %rebase_head,
        merge_base = %merge_base,
        "synchronized branches"
    );

    Ok(SyncState {
        source_head,
        dest_head,
        rebase_head,
        merge_base,
    })
}
