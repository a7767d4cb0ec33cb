use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::domain::{BranchRef, Identity};
use crate::error::{RebaseBotError, Result};
use crate::git::{ApplyResult, CommitInfo, Repository};
use git2::Oid;

#[derive(Debug, Clone)]
struct MockCommit {
    parent: Option<Oid>,
    message: String,
    author: String,
    tree: Oid,
}

/// A push recorded by [MockRepository]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPush {
    pub branch: String,
    pub remote: String,
    pub target: BranchRef,
    pub head: Oid,
    pub force: bool,
}

/// In-memory repository for testing without actual git operations
///
/// Histories are linear chains of commits. Remote branches are keyed by
/// location and branch name; commits marked with [MockRepository::mark_conflicting]
/// fail to apply. Replaying the same change onto the same tree always yields
/// the same tree, so repeated runs produce identical content.
pub struct MockRepository {
    workdir: PathBuf,
    next_id: u32,
    commits: HashMap<Oid, MockCommit>,
    remote_branches: HashMap<(String, String), Oid>,
    local_branches: HashMap<String, Oid>,
    checked_out: Option<String>,
    conflicting: HashSet<Oid>,
    empty: HashSet<Oid>,
    derived_trees: HashMap<(Oid, String), Oid>,
    dirty: bool,
    fail_push: bool,
    pushes: Vec<RecordedPush>,
}

impl MockRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        MockRepository {
            workdir: PathBuf::from("/nonexistent/rebase-bot-mock"),
            next_id: 0,
            commits: HashMap::new(),
            remote_branches: HashMap::new(),
            local_branches: HashMap::new(),
            checked_out: None,
            conflicting: HashSet::new(),
            empty: HashSet::new(),
            derived_trees: HashMap::new(),
            dirty: false,
            fail_push: false,
            pushes: Vec::new(),
        }
    }

    fn next_oid(&mut self) -> Oid {
        self.next_id += 1;
        let mut bytes = [0u8; 20];
        bytes[16..].copy_from_slice(&self.next_id.to_be_bytes());
        Oid::from_bytes(&bytes).unwrap_or_else(|_| Oid::zero())
    }

    /// Add a commit on top of `parent` and return its id
    pub fn commit(&mut self, parent: Option<Oid>, message: &str) -> Oid {
        let id = self.next_oid();
        let tree = self.next_oid();
        self.commits.insert(
            id,
            MockCommit {
                parent,
                message: message.to_string(),
                author: "Test Author".to_string(),
                tree,
            },
        );
        id
    }

    /// Point a branch of a remote repository at `head`
    pub fn set_remote_branch(&mut self, branch: &BranchRef, head: Oid) {
        self.remote_branches
            .insert((branch.url.clone(), branch.branch.clone()), head);
    }

    /// Head of a remote branch, as last fetched or pushed
    pub fn remote_branch(&self, branch: &BranchRef) -> Option<Oid> {
        self.remote_branches
            .get(&(branch.url.clone(), branch.branch.clone()))
            .copied()
    }

    /// Make replaying `commit` report a conflict
    pub fn mark_conflicting(&mut self, commit: Oid) {
        self.conflicting.insert(commit);
    }

    /// Make replaying `commit` produce no changes
    pub fn mark_empty(&mut self, commit: Oid) {
        self.empty.insert(commit);
    }

    /// Simulate uncommitted changes in the working tree, until the next commit
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Make every push fail
    pub fn fail_pushes(&mut self) {
        self.fail_push = true;
    }

    pub fn branch_head(&self, branch: &str) -> Option<Oid> {
        self.local_branches.get(branch).copied()
    }

    pub fn message(&self, commit: Oid) -> Option<&str> {
        self.commits.get(&commit).map(|c| c.message.as_str())
    }

    pub fn parent(&self, commit: Oid) -> Option<Oid> {
        self.commits.get(&commit).and_then(|c| c.parent)
    }

    pub fn pushes(&self) -> &[RecordedPush] {
        &self.pushes
    }

    /// Messages of the commits between `base` (exclusive) and `head`, oldest first
    pub fn messages_between(&self, base: Oid, head: Oid) -> Vec<String> {
        let mut messages = Vec::new();
        let mut current = Some(head);
        while let Some(oid) = current {
            if oid == base {
                break;
            }
            match self.commits.get(&oid) {
                Some(commit) => {
                    messages.push(commit.message.clone());
                    current = commit.parent;
                }
                None => break,
            }
        }
        messages.reverse();
        messages
    }

    fn ancestors(&self, head: Oid) -> Vec<Oid> {
        let mut chain = Vec::new();
        let mut current = Some(head);
        while let Some(oid) = current {
            chain.push(oid);
            current = self.commits.get(&oid).and_then(|c| c.parent);
        }
        chain
    }

    fn find(&self, commit: Oid) -> Result<&MockCommit> {
        self.commits
            .get(&commit)
            .ok_or_else(|| git2::Error::from_str(&format!("commit {} not found", commit)).into())
    }

    fn checked_out_tip(&self, branch: &str) -> Result<Oid> {
        if self.checked_out.as_deref() != Some(branch) {
            return Err(RebaseBotError::config(format!(
                "Branch '{}' is not checked out",
                branch
            )));
        }
        self.branch_head(branch)
            .ok_or_else(|| RebaseBotError::config(format!("Branch '{}' has no commits", branch)))
    }

    fn derived_tree(&mut self, base_tree: Oid, change: String) -> Oid {
        if let Some(tree) = self.derived_trees.get(&(base_tree, change.clone())) {
            return *tree;
        }
        let tree = self.next_oid();
        self.derived_trees.insert((base_tree, change), tree);
        tree
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn fetch_branch(&mut self, remote: &str, branch: &BranchRef) -> Result<Oid> {
        self.remote_branch(branch)
            .ok_or_else(|| RebaseBotError::ref_not_found(remote, branch.branch.as_str()))
    }

    fn merge_base(&self, one: Oid, two: Oid) -> Result<Option<Oid>> {
        let reachable: HashSet<Oid> = self.ancestors(one).into_iter().collect();
        Ok(self
            .ancestors(two)
            .into_iter()
            .find(|oid| reachable.contains(oid)))
    }

    fn commits_between(&self, base: Oid, head: Oid) -> Result<Vec<CommitInfo>> {
        let mut commits = Vec::new();
        for oid in self.ancestors(head) {
            if oid == base {
                break;
            }
            let commit = self.find(oid)?;
            commits.push(CommitInfo {
                id: oid,
                message: commit.message.clone(),
                author: commit.author.clone(),
            });
        }
        commits.reverse();
        Ok(commits)
    }

    fn reset_branch(&mut self, branch: &str, target: Oid) -> Result<()> {
        self.find(target)?;
        self.local_branches.insert(branch.to_string(), target);
        self.checked_out = Some(branch.to_string());
        Ok(())
    }

    fn cherry_pick(
        &mut self,
        branch: &str,
        commit: Oid,
        _committer: &Identity,
    ) -> Result<ApplyResult> {
        let tip = self.checked_out_tip(branch)?;
        let picked = self.find(commit)?.clone();

        if self.conflicting.contains(&commit) {
            return Ok(ApplyResult::Conflict);
        }
        if self.empty.contains(&commit) {
            return Ok(ApplyResult::Empty);
        }

        let base_tree = self.find(tip)?.tree;
        let tree = self.derived_tree(base_tree, commit.to_string());
        let id = self.next_oid();
        self.commits.insert(
            id,
            MockCommit {
                parent: Some(tip),
                tree,
                ..picked
            },
        );
        self.local_branches.insert(branch.to_string(), id);
        Ok(ApplyResult::Applied(id))
    }

    fn has_changes(&self) -> Result<bool> {
        Ok(self.dirty)
    }

    fn commit_all(&mut self, message: &str, identity: &Identity) -> Result<Oid> {
        let branch = self
            .checked_out
            .clone()
            .ok_or_else(|| RebaseBotError::config("No branch checked out"))?;
        let tip = self.checked_out_tip(&branch)?;

        let base_tree = self.find(tip)?.tree;
        let tree = self.derived_tree(base_tree, message.to_string());
        let id = self.next_oid();
        self.commits.insert(
            id,
            MockCommit {
                parent: Some(tip),
                message: message.to_string(),
                author: identity.username.clone(),
                tree,
            },
        );
        self.local_branches.insert(branch, id);
        self.dirty = false;
        Ok(id)
    }

    fn tree_id(&self, commit: Oid) -> Result<Oid> {
        Ok(self.find(commit)?.tree)
    }

    fn push_branch(
        &mut self,
        branch: &str,
        remote: &str,
        target: &BranchRef,
        force: bool,
    ) -> Result<()> {
        if self.fail_push {
            return Err(RebaseBotError::publish(format!(
                "Failed to push '{}' to {}: remote hung up",
                branch, target
            )));
        }

        let head = self
            .branch_head(branch)
            .ok_or_else(|| RebaseBotError::publish(format!("Branch '{}' not found", branch)))?;

        self.set_remote_branch(target, head);
        self.pushes.push(RecordedPush {
            branch: branch.to_string(),
            remote: remote.to_string(),
            target: target.clone(),
            head,
            force,
        });
        Ok(())
    }
}
