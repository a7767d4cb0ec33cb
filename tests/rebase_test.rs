// tests/rebase_test.rs
mod common;

use std::fs;
use std::path::Path;

use common::{commit_file, file_at, summaries, Forks, REBASE_BRANCH};
use rebase_bot::domain::{MergeStatus, RebaseOutcome, RunStatus, TagPolicy};
use rebase_bot::engine::{update_modules, Engine, Published, MODULE_UPDATE_MESSAGE};
use rebase_bot::error::FatalKind;
use rebase_bot::git::Repository;
use rebase_bot::github::MockPullRequests;
use rebase_bot::notify::RecordingNotifier;

fn no_changes(_: &Path) -> rebase_bot::Result<()> {
    Ok(())
}

fn vendor_modules(workdir: &Path) -> rebase_bot::Result<()> {
    fs::create_dir_all(workdir.join("vendor"))?;
    fs::write(workdir.join("vendor/modules.txt"), "# example.com/dep v1.2.3\n")?;
    Ok(())
}

#[test]
fn test_carried_commits_land_on_upstream_head() {
    let forks = Forks::new();
    commit_file(&forks.upstream, "upstream.txt", "new upstream work\n", "Upstream change");
    commit_file(&forks.downstream, "carry.txt", "carried\n", "UPSTREAM: <carry>: add carry file");
    commit_file(&forks.downstream, "fix.txt", "backport\n", "UPSTREAM: 42: backport fix");
    commit_file(&forks.downstream, "temp.txt", "temporary\n", "UPSTREAM: <drop>: temporary hack");
    forks.sync_fork();

    let pulls = MockPullRequests::new().with_status(42, MergeStatus::NotMerged);
    let mut engine = Engine::new(
        forks.settings(TagPolicy::Soft),
        forks.working_copy(),
        pulls,
        no_changes,
        RecordingNotifier::new(),
    );

    let report = engine.run();
    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.kept, 2);
    assert_eq!(report.dropped, 1);

    let head = forks.fork_head();
    assert_eq!(
        summaries(&forks.fork, forks.upstream_head(), head),
        vec!["UPSTREAM: <carry>: add carry file", "UPSTREAM: 42: backport fix"]
    );
    assert_eq!(
        file_at(&forks.fork, head, "upstream.txt").as_deref(),
        Some("new upstream work\n")
    );
    assert_eq!(file_at(&forks.fork, head, "temp.txt"), None);

    let commit = forks.fork.find_commit(head).unwrap();
    assert_eq!(commit.author().name(), Some("Test Author"));
    assert_eq!(commit.committer().name(), Some("rebasebot"));

    let ensured = engine.pull_requests().ensured();
    assert_eq!(ensured.len(), 1);
    assert_eq!(ensured[0].base, forks.dest());
    assert_eq!(ensured[0].head, forks.rebase());
}

#[test]
fn test_conflict_leaves_last_good_commit() {
    let forks = Forks::new();
    commit_file(&forks.upstream, "README.md", "upstream rewrite\n", "Rewrite readme");
    commit_file(&forks.downstream, "a.txt", "a\n", "UPSTREAM: <carry>: add a");
    let conflicting = commit_file(
        &forks.downstream,
        "README.md",
        "downstream rewrite\n",
        "UPSTREAM: <carry>: local readme",
    );
    commit_file(&forks.downstream, "b.txt", "b\n", "UPSTREAM: <carry>: add b");
    forks.sync_fork();

    let mut engine = Engine::new(
        forks.settings(TagPolicy::Soft),
        forks.working_copy(),
        MockPullRequests::new(),
        no_changes,
        RecordingNotifier::new(),
    );

    let report = engine.run();
    assert_eq!(
        report.status,
        RunStatus::Conflict {
            commit: conflicting,
            message: "UPSTREAM: <carry>: local readme".to_string(),
        }
    );

    let work = engine.repository().inner();
    let head = work
        .refname_to_id(&format!("refs/heads/{}", REBASE_BRANCH))
        .unwrap();
    assert_eq!(
        summaries(work, forks.upstream_head(), head),
        vec!["UPSTREAM: <carry>: add a"]
    );
    assert!(!engine.repository().has_changes().unwrap());
    assert!(!work.index().unwrap().has_conflicts());

    // Nothing was published.
    assert_eq!(forks.fork_head(), forks.downstream_head());
    assert!(engine.pull_requests().ensured().is_empty());
}

#[test]
fn test_nothing_to_carry_publishes_upstream_head() {
    let forks = Forks::new();
    commit_file(&forks.upstream, "upstream.txt", "upstream\n", "Upstream change");
    commit_file(&forks.downstream, "temp.txt", "temporary\n", "UPSTREAM: <drop>: temporary");
    forks.sync_fork();

    let mut engine = Engine::new(
        forks.settings(TagPolicy::Strict),
        forks.working_copy(),
        MockPullRequests::new(),
        no_changes,
        RecordingNotifier::new(),
    );

    let report = engine.run();
    assert_eq!(report.status, RunStatus::NoOp);
    assert_eq!(
        report.outcome,
        Some(RebaseOutcome::NoOp {
            head: forks.upstream_head()
        })
    );
    assert_eq!(forks.fork_head(), forks.upstream_head());
}

#[test]
fn test_patch_already_upstream_is_skipped() {
    let forks = Forks::new();
    commit_file(&forks.upstream, "fix.txt", "fixed\n", "Fix the bug");
    commit_file(&forks.upstream, "feature.txt", "feature\n", "Add feature");
    commit_file(&forks.downstream, "fix.txt", "fixed\n", "UPSTREAM: 77: fix the bug");
    commit_file(&forks.downstream, "local.txt", "local\n", "UPSTREAM: <carry>: local tweak");
    forks.sync_fork();

    let mut engine = Engine::new(
        forks.settings(TagPolicy::Soft),
        forks.working_copy(),
        MockPullRequests::new(),
        no_changes,
        RecordingNotifier::new(),
    );

    let report = engine.run();
    let Some(RebaseOutcome::Success { applied, .. }) = report.outcome else {
        panic!("expected success, got {:?}", report.outcome);
    };
    assert_eq!(applied, 1);
    assert_eq!(
        summaries(&forks.fork, forks.upstream_head(), forks.fork_head()),
        vec!["UPSTREAM: <carry>: local tweak"]
    );
}

#[test]
fn test_destination_with_same_content_is_up_to_date() {
    let forks = Forks::new();
    commit_file(&forks.upstream, "fix.txt", "fixed\n", "Fix the bug");
    commit_file(&forks.downstream, "fix.txt", "fixed\n", "UPSTREAM: 77: fix the bug");
    commit_file(&forks.downstream, "local.txt", "local\n", "UPSTREAM: <carry>: local tweak");
    forks.sync_fork();

    let mut engine = Engine::new(
        forks.settings(TagPolicy::Soft),
        forks.working_copy(),
        MockPullRequests::new(),
        no_changes,
        RecordingNotifier::new(),
    );

    let report = engine.run();
    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.published, Some(Published::UpToDate));

    let work = engine.repository().inner();
    let head = work
        .refname_to_id(&format!("refs/heads/{}", REBASE_BRANCH))
        .unwrap();
    assert_eq!(
        summaries(work, forks.upstream_head(), head),
        vec!["UPSTREAM: <carry>: local tweak"]
    );

    assert_eq!(forks.fork_head(), forks.downstream_head());
    assert!(engine.pull_requests().ensured().is_empty());
}

#[test]
fn test_module_update_adds_single_carry_commit() {
    let forks = Forks::new();
    commit_file(&forks.upstream, "go.mod", "module example.com/foo\n", "Add go.mod");
    commit_file(&forks.downstream, "carry.txt", "carried\n", "UPSTREAM: <carry>: patch");
    forks.sync_fork();

    let mut settings = forks.settings(TagPolicy::Soft);
    settings.update_modules = true;
    let mut engine = Engine::new(
        settings,
        forks.working_copy(),
        MockPullRequests::new(),
        vendor_modules,
        RecordingNotifier::new(),
    );

    let report = engine.run();
    assert_eq!(report.status, RunStatus::Success);
    let module_commit = report.module_update.and_then(|m| m.commit).unwrap();

    assert_eq!(forks.fork_head(), module_commit);
    assert_eq!(
        summaries(&forks.fork, forks.upstream_head(), module_commit),
        vec!["UPSTREAM: <carry>: patch", MODULE_UPDATE_MESSAGE]
    );
    assert!(file_at(&forks.fork, module_commit, "vendor/modules.txt").is_some());

    // A second regeneration on the same tree changes nothing.
    let identity = engine.settings().identity.clone();
    let again = update_modules(engine.repository_mut(), &vendor_modules, &identity).unwrap();
    assert!(!again.changed);
    assert_eq!(again.commit, None);
}

#[test]
fn test_rerun_without_changes_skips_push() {
    let forks = Forks::new();
    commit_file(&forks.upstream, "upstream.txt", "upstream\n", "Upstream change");
    commit_file(&forks.downstream, "carry.txt", "carried\n", "UPSTREAM: <carry>: patch");
    forks.sync_fork();

    let mut engine = Engine::new(
        forks.settings(TagPolicy::Soft),
        forks.working_copy(),
        MockPullRequests::new(),
        no_changes,
        RecordingNotifier::new(),
    );

    assert_eq!(engine.run().status, RunStatus::Success);
    let first = forks.fork_head();

    let second = engine.run();
    assert_eq!(second.status, RunStatus::Success);
    assert!(matches!(
        second.published,
        Some(Published::PullRequest { pushed: false, .. })
    ));
    assert_eq!(forks.fork_head(), first);
}

#[test]
fn test_dry_run_leaves_fork_untouched() {
    let forks = Forks::new();
    commit_file(&forks.upstream, "upstream.txt", "upstream\n", "Upstream change");
    commit_file(&forks.downstream, "carry.txt", "carried\n", "UPSTREAM: <carry>: patch");
    forks.sync_fork();

    let mut settings = forks.settings(TagPolicy::Soft);
    settings.dry_run = true;
    let mut engine = Engine::new(
        settings,
        forks.working_copy(),
        MockPullRequests::new(),
        no_changes,
        RecordingNotifier::new(),
    );

    let report = engine.run();
    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(forks.fork_head(), forks.downstream_head());
    assert!(engine.notifier().messages()[0].ends_with("[dry run]"));
}

#[test]
fn test_missing_rebase_branch_is_fatal() {
    let forks = Forks::new();
    commit_file(&forks.downstream, "carry.txt", "carried\n", "UPSTREAM: <carry>: patch");

    let mut engine = Engine::new(
        forks.settings(TagPolicy::Soft),
        forks.working_copy(),
        MockPullRequests::new(),
        no_changes,
        RecordingNotifier::new(),
    );

    let report = engine.run();
    assert!(matches!(
        report.status,
        RunStatus::Fatal {
            kind: FatalKind::RefNotFound,
            ..
        }
    ));
    assert_eq!(engine.notifier().messages().len(), 1);
}

#[test]
fn test_invalid_tag_stops_before_replay() {
    let forks = Forks::new();
    commit_file(&forks.upstream, "upstream.txt", "upstream\n", "Upstream change");
    commit_file(&forks.downstream, "wip.txt", "wip\n", "UPSTREAM: WIP: not ready");
    forks.sync_fork();

    let mut engine = Engine::new(
        forks.settings(TagPolicy::Soft),
        forks.working_copy(),
        MockPullRequests::new(),
        no_changes,
        RecordingNotifier::new(),
    );

    let report = engine.run();
    assert!(matches!(
        report.status,
        RunStatus::Fatal {
            kind: FatalKind::InvalidTag,
            ..
        }
    ));
    assert!(engine
        .repository()
        .inner()
        .find_reference(&format!("refs/heads/{}", REBASE_BRANCH))
        .is_err());
}
