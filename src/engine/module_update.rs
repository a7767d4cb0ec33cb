use tracing::info;

use crate::domain::{Identity, ModuleUpdateResult};
use crate::error::{RebaseBotError, Result};
use crate::git::Repository;
use crate::modules::ModuleTooling;

/// Message of the commit holding regenerated dependency state.
///
/// Carries the `<carry>` tag so later runs replay it like any other
/// downstream patch.
pub const MODULE_UPDATE_MESSAGE: &str =
    "UPSTREAM: <carry>: Updating and vendoring go modules after an upstream rebase";

/// Regenerate dependency state in the working tree and commit any change.
///
/// Every failure is reported as [RebaseBotError::ModuleUpdate] so the caller
/// can apply its publish policy.
pub fn update_modules<R, T>(repo: &mut R, tooling: &T, identity: &Identity) -> Result<ModuleUpdateResult>
where
    R: Repository + ?Sized,
    T: ModuleTooling + ?Sized,
{
    tooling.regenerate(repo.workdir()).map_err(as_module_error)?;

    if !repo.has_changes().map_err(as_module_error)? {
        info!("dependency state already up to date");
        return Ok(ModuleUpdateResult::unchanged());
    }

    let commit = repo
        .commit_all(MODULE_UPDATE_MESSAGE, identity)
        .map_err(as_module_error)?;
    info!(commit = %commit, "committed regenerated dependency state");
    Ok(ModuleUpdateResult::committed(commit))
}

fn as_module_error(err: RebaseBotError) -> RebaseBotError {
    match err {
        RebaseBotError::ModuleUpdate(_) => err,
        other => RebaseBotError::module_update(other.to_string()),
    }
}
