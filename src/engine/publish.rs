use git2::Oid;
use tracing::info;

use crate::engine::classify::Classification;
use crate::engine::sync::{SyncState, REBASE_REMOTE};
use crate::engine::EngineSettings;
use crate::error::{RebaseBotError, Result};
use crate::git::Repository;
use crate::github::{PullRequest, PullRequestSpec, PullRequests};
use crate::ui::formatter;

/// What the publish step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    /// The destination already has the rebased content; nothing was pushed
    UpToDate,
    PullRequest {
        pull: PullRequest,
        /// False when the rebase branch already had the same tree
        pushed: bool,
    },
}

/// Push the working branch and make sure a pull request exists for it.
///
/// Any failure is reported as [RebaseBotError::Publish].
pub fn publish<R, G>(
    repo: &mut R,
    pulls: &G,
    settings: &EngineSettings,
    sync: &SyncState,
    head: Oid,
    classification: &Classification,
) -> Result<Published>
where
    R: Repository + ?Sized,
    G: PullRequests + ?Sized,
{
    let head_tree = repo.tree_id(head).map_err(as_publish_error)?;

    if head_tree == repo.tree_id(sync.dest_head).map_err(as_publish_error)? {
        info!(dest = %settings.dest, "destination already up to date");
        return Ok(Published::UpToDate);
    }

    let pushed = if head_tree == repo.tree_id(sync.rebase_head).map_err(as_publish_error)? {
        info!(rebase = %settings.rebase, "rebase branch unchanged, skipping push");
        false
    } else {
        repo.push_branch(&settings.rebase.branch, REBASE_REMOTE, &settings.rebase, true)
            .map_err(as_publish_error)?;
        info!(rebase = %settings.rebase, head = %head, "pushed rebase branch");
        true
    };

    let spec = PullRequestSpec {
        head: settings.rebase.clone(),
        base: settings.dest.clone(),
        title: formatter::pull_request_title(&settings.source, sync.source_head, &settings.dest),
        body: formatter::pull_request_body(&settings.source, sync.source_head, classification),
        labels: settings.labels.clone(),
    };
    let pull = pulls.ensure_pull_request(&spec).map_err(as_publish_error)?;
    info!(
        number = pull.number,
        url = %pull.html_url,
        created = pull.created,
        "pull request ready"
    );

    Ok(Published::PullRequest { pull, pushed })
}

fn as_publish_error(err: RebaseBotError) -> RebaseBotError {
    match err {
        RebaseBotError::Publish(_) => err,
        other => RebaseBotError::publish(other.to_string()),
    }
}
