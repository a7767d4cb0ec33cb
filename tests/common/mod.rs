//! Real git repositories for end-to-end tests
//!
//! Layout inside one temporary directory:
//! - `upstream/`: the project being forked, branch `main`
//! - `downstream/`: a clone of upstream carrying local commits on `main`
//! - `fork.git`: bare repository owning `rebase-bot-master`
//! - `work/`: the bot's working copy

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use git2::{Commit, Oid, Repository, RepositoryInitOptions, Signature, Sort};
use tempfile::TempDir;

use rebase_bot::domain::{BranchRef, Identity, TagPolicy};
use rebase_bot::engine::EngineSettings;
use rebase_bot::git::Git2Repository;

pub const REBASE_BRANCH: &str = "rebase-bot-master";

pub struct Forks {
    dir: TempDir,
    pub upstream: Repository,
    pub downstream: Repository,
    pub fork: Repository,
}

impl Forks {
    /// Upstream with one commit, downstream cloned from it, empty bare fork
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();

        let upstream = init_repo(&dir.path().join("upstream"));
        commit_file(&upstream, "README.md", "hello\n", "Initial commit");

        let downstream =
            Repository::clone(&path_str(&dir.path().join("upstream")), dir.path().join("downstream"))
                .unwrap();
        let fork = Repository::init_bare(dir.path().join("fork.git")).unwrap();

        Forks {
            dir,
            upstream,
            downstream,
            fork,
        }
    }

    pub fn workdir(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    pub fn source(&self) -> BranchRef {
        branch_ref(&self.dir.path().join("upstream"), "kubernetes", "main")
    }

    pub fn dest(&self) -> BranchRef {
        branch_ref(&self.dir.path().join("downstream"), "openshift", "main")
    }

    pub fn rebase(&self) -> BranchRef {
        branch_ref(&self.dir.path().join("fork.git"), "rebasebot", REBASE_BRANCH)
    }

    pub fn settings(&self, policy: TagPolicy) -> EngineSettings {
        EngineSettings {
            source: self.source(),
            dest: self.dest(),
            rebase: self.rebase(),
            identity: Identity::new("rebasebot", "rebasebot@example.com"),
            tag_policy: policy,
            update_modules: false,
            publish_on_module_failure: false,
            dry_run: false,
            labels: vec![],
        }
    }

    pub fn working_copy(&self) -> Git2Repository {
        Git2Repository::open_or_init(self.workdir()).unwrap()
    }

    /// Point the fork's rebase branch at the downstream head
    pub fn sync_fork(&self) {
        let mut remote = self
            .fork
            .remote_anonymous(&path_str(&self.dir.path().join("downstream")))
            .unwrap();
        let refspec = format!("+refs/heads/main:refs/heads/{}", REBASE_BRANCH);
        remote.fetch(&[refspec.as_str()], None, None).unwrap();
    }

    pub fn fork_head(&self) -> Oid {
        self.fork
            .refname_to_id(&format!("refs/heads/{}", REBASE_BRANCH))
            .unwrap()
    }

    pub fn upstream_head(&self) -> Oid {
        self.upstream.refname_to_id("refs/heads/main").unwrap()
    }

    pub fn downstream_head(&self) -> Oid {
        self.downstream.refname_to_id("refs/heads/main").unwrap()
    }
}

fn branch_ref(path: &Path, ns: &str, branch: &str) -> BranchRef {
    BranchRef::new(path_str(path), ns, "autoscaler", branch).unwrap()
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub fn init_repo(path: &Path) -> Repository {
    let mut options = RepositoryInitOptions::new();
    options.initial_head("main");
    Repository::init_opts(path, &options).unwrap()
}

/// Write `content` to `file` and commit it on the current branch
pub fn commit_file(repo: &Repository, file: &str, content: &str, message: &str) -> Oid {
    let workdir = repo.workdir().unwrap();
    let path = workdir.join(file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(file)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let signature = Signature::now("Test Author", "author@example.com").unwrap();
    let parents: Vec<Commit> = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().unwrap()],
        Err(_) => vec![],
    };
    let parent_refs: Vec<&Commit> = parents.iter().collect();

    repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        &parent_refs,
    )
    .unwrap()
}

/// Summaries of the commits after `base` up to `head`, oldest first
pub fn summaries(repo: &Repository, base: Oid, head: Oid) -> Vec<String> {
    let mut revwalk = repo.revwalk().unwrap();
    revwalk
        .set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)
        .unwrap();
    revwalk.push(head).unwrap();
    revwalk.hide(base).unwrap();

    revwalk
        .map(|oid| {
            let commit = repo.find_commit(oid.unwrap()).unwrap();
            commit.summary().unwrap_or_default().to_string()
        })
        .collect()
}

/// Content of `file` in the tree of `commit`, if present
pub fn file_at(repo: &Repository, commit: Oid, file: &str) -> Option<String> {
    let tree = repo.find_commit(commit).ok()?.tree().ok()?;
    let entry = tree.get_path(Path::new(file)).ok()?;
    let blob = repo.find_blob(entry.id()).ok()?;
    Some(String::from_utf8_lossy(blob.content()).into_owned())
}
