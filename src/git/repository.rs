use std::fs;
use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{
    Cred, CredentialType, ErrorCode, FetchOptions, IndexAddOption, Oid, PushOptions,
    RemoteCallbacks, Repository as Git2Repo, Sort, StatusOptions,
};
use tracing::{debug, info};

use crate::domain::{BranchRef, Identity};
use crate::error::{RebaseBotError, Result};
use crate::git::{ApplyResult, CommitInfo};

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
    workdir: PathBuf,
    token: Option<String>,
}

impl Git2Repository {
    /// Open the repository at `path`, initialising one if none exists
    ///
    /// The directory is created when missing. It becomes the bot's private
    /// working copy for the duration of a run.
    pub fn open_or_init<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path)?;

        let repo = match Git2Repo::open(path) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => {
                info!(path = %path.display(), "initialising working copy");
                Git2Repo::init(path)?
            }
            Err(e) => return Err(e.into()),
        };

        Self::from_git2(repo)
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Result<Self> {
        let workdir = repo
            .workdir()
            .ok_or_else(|| RebaseBotError::config("Working copy must not be a bare repository"))?
            .to_path_buf();

        Ok(Git2Repository {
            repo,
            workdir,
            token: None,
        })
    }

    /// Authenticate HTTPS fetches and pushes with a GitHub token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Borrow the underlying git2 repository
    pub fn inner(&self) -> &Git2Repo {
        &self.repo
    }

    fn callbacks(&self) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();
        let token = self.token.as_deref();

        callbacks.credentials(move |_url, username_from_url, allowed_types| {
            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                if let Some(token) = token {
                    return Cred::userpass_plaintext("x-access-token", token);
                }
            }

            if allowed_types.contains(CredentialType::SSH_KEY) {
                let username = username_from_url.unwrap_or("git");
                if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                    return Ok(cred);
                }

                if let Some(home) = dirs::home_dir() {
                    for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                        let path = home.join(".ssh").join(key);
                        if path.exists() {
                            if let Ok(cred) = Cred::ssh_key(username, None, &path, None) {
                                return Ok(cred);
                            }
                        }
                    }
                }
            }

            Cred::default()
        });

        callbacks
    }

    fn ensure_remote(&self, name: &str, url: &str) -> Result<()> {
        match self.repo.find_remote(name) {
            Ok(remote) => {
                if remote.url() != Some(url) {
                    self.repo.remote_set_url(name, url)?;
                }
            }
            Err(e) if e.code() == ErrorCode::NotFound => {
                self.repo.remote(name, url)?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

impl super::Repository for Git2Repository {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn fetch_branch(&mut self, remote_name: &str, branch: &BranchRef) -> Result<Oid> {
        self.ensure_remote(remote_name, &branch.url)?;

        // A stale tracking ref would hide a branch deleted on the remote.
        let tracking = format!("refs/remotes/{}/{}", remote_name, branch.branch);
        if let Ok(mut stale) = self.repo.find_reference(&tracking) {
            stale.delete()?;
        }

        let refspec = format!("+refs/heads/{}:{}", branch.branch, tracking);
        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(self.callbacks());

        let mut remote = self.repo.find_remote(remote_name)?;
        remote
            .fetch(&[refspec.as_str()], Some(&mut fetch_options), None)
            .map_err(|e| {
                debug!(remote = remote_name, error = %e, "fetch failed");
                RebaseBotError::ref_not_found(
                    remote_name,
                    format!("{} ({})", branch.branch, e.message()),
                )
            })?;

        let oid = self
            .repo
            .find_reference(&tracking)
            .ok()
            .and_then(|reference| reference.target())
            .ok_or_else(|| RebaseBotError::ref_not_found(remote_name, branch.branch.as_str()))?;

        debug!(remote = remote_name, branch = %branch.branch, head = %oid, "fetched");
        Ok(oid)
    }

    fn merge_base(&self, one: Oid, two: Oid) -> Result<Option<Oid>> {
        match self.repo.merge_base(one, two) {
            Ok(oid) => Ok(Some(oid)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn commits_between(&self, base: Oid, head: Oid) -> Result<Vec<CommitInfo>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;
        revwalk.push(head)?;
        revwalk.hide(base)?;

        let mut commits = Vec::new();

        for oid_result in revwalk {
            let oid = oid_result?;
            let commit = self.repo.find_commit(oid)?;

            if commit.parent_count() > 1 {
                debug!(commit = %oid, "skipping merge commit");
                continue;
            }

            commits.push(CommitInfo {
                id: oid,
                message: commit.message().unwrap_or("(empty message)").to_string(),
                author: commit.author().name().unwrap_or("unknown").to_string(),
            });
        }

        Ok(commits)
    }

    fn reset_branch(&mut self, branch: &str, target: Oid) -> Result<()> {
        let refname = format!("refs/heads/{}", branch);
        self.repo.find_commit(target)?;

        self.repo
            .reference(&refname, target, true, "rebase-bot: reset to source head")?;
        self.repo.set_head(&refname)?;
        self.repo
            .checkout_head(Some(CheckoutBuilder::new().force().remove_untracked(true)))?;

        Ok(())
    }

    fn cherry_pick(
        &mut self,
        branch: &str,
        commit: Oid,
        committer: &Identity,
    ) -> Result<ApplyResult> {
        let refname = format!("refs/heads/{}", branch);
        let pick = self.repo.find_commit(commit)?;
        let tip = self.repo.find_reference(&refname)?.peel_to_commit()?;

        // Applied in memory so a conflict never touches the index or tree.
        let mut index = self.repo.cherrypick_commit(&pick, &tip, 0, None)?;
        if index.has_conflicts() {
            return Ok(ApplyResult::Conflict);
        }

        let tree_id = index.write_tree_to(&self.repo)?;
        if tree_id == tip.tree_id() {
            return Ok(ApplyResult::Empty);
        }

        let tree = self.repo.find_tree(tree_id)?;
        let message = pick.message_raw().unwrap_or_default();
        let new_commit = self.repo.commit(
            Some(&refname),
            &pick.author(),
            &committer.signature()?,
            message,
            &tree,
            &[&tip],
        )?;

        self.repo
            .checkout_tree(tree.as_object(), Some(CheckoutBuilder::new().force()))?;

        Ok(ApplyResult::Applied(new_commit))
    }

    fn has_changes(&self) -> Result<bool> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut options))?;
        Ok(!statuses.is_empty())
    }

    fn commit_all(&mut self, message: &str, identity: &Identity) -> Result<Oid> {
        let mut index = self.repo.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"], None)?;
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let parent = self.repo.head()?.peel_to_commit()?;
        let signature = identity.signature()?;

        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )?;

        Ok(oid)
    }

    fn tree_id(&self, commit: Oid) -> Result<Oid> {
        Ok(self.repo.find_commit(commit)?.tree_id())
    }

    fn push_branch(
        &mut self,
        branch: &str,
        remote_name: &str,
        target: &BranchRef,
        force: bool,
    ) -> Result<()> {
        self.ensure_remote(remote_name, &target.url)?;

        let mut callbacks = self.callbacks();
        callbacks.push_update_reference(|refname, status| match status {
            Some(status) => Err(git2::Error::from_str(&format!(
                "remote rejected {}: {}",
                refname, status
            ))),
            None => Ok(()),
        });

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let refspec = format!(
            "{}refs/heads/{}:refs/heads/{}",
            if force { "+" } else { "" },
            branch,
            target.branch
        );

        let mut remote = self.repo.find_remote(remote_name)?;
        remote
            .push(&[refspec.as_str()], Some(&mut push_options))
            .map_err(|e| {
                if e.class() == git2::ErrorClass::Net {
                    RebaseBotError::publish(format!("Network error during push: {}", e))
                } else {
                    RebaseBotError::publish(format!(
                        "Failed to push '{}' to {}: {}",
                        branch, target, e
                    ))
                }
            })?;

        info!(branch, target = %target, "pushed");
        Ok(())
    }
}
