//! Pure formatting functions for UI output.
//!
//! Terminal output, notification text and pull request text are all built
//! here so the engine never formats strings itself.

use git2::Oid;

use crate::domain::{BranchRef, RunStatus};
use crate::engine::{Classification, EngineSettings, Published, RunReport};
use crate::git::short_id;

const MAX_SUMMARY_LEN: usize = 72;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("\x1b[31mERROR:\x1b[0m {}", message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("\x1b[32m✓\x1b[0m {}", message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("\x1b[33m→\x1b[0m {}", message);
}

/// Print the end-of-run summary.
///
/// Successful and no-op runs get a green line, everything else goes to
/// stderr in red.
pub fn display_report(settings: &EngineSettings, report: &RunReport) {
    println!(
        "\n\x1b[1mRebase of {} onto {}\x1b[0m",
        settings.dest, settings.source
    );
    println!(
        "  Carried: {}  Dropped: {}",
        report.kept, report.dropped
    );

    if let Some(module_update) = &report.module_update {
        match module_update.commit {
            Some(commit) => println!("  Module update: committed {}", short_id(commit)),
            None => println!("  Module update: no changes"),
        }
    }

    match &report.published {
        Some(Published::PullRequest { pull, .. }) => {
            println!("  Pull request: \x1b[36m{}\x1b[0m", pull.html_url)
        }
        Some(Published::UpToDate) => println!("  Destination already up to date"),
        None => {}
    }

    let message = status_message(settings, report);
    match report.status {
        RunStatus::Success | RunStatus::NoOp => display_success(&message),
        _ => display_error(&message),
    }
}

/// One-paragraph description of a run, sent to the notification sink.
pub fn status_message(settings: &EngineSettings, report: &RunReport) -> String {
    let subject = format!("rebase of {} onto {}", settings.dest, settings.source);
    let mut message = match &report.status {
        RunStatus::Success => format!(
            "success: {}: {} carried, {} dropped",
            subject, report.kept, report.dropped
        ),
        RunStatus::NoOp => format!(
            "no-op: {}: nothing to carry, {} dropped",
            subject, report.dropped
        ),
        RunStatus::Conflict { commit, message } => format!(
            "conflict: {} stopped at {} \"{}\", manual resolution needed",
            subject,
            short_id(*commit),
            message
        ),
        RunStatus::ModuleUpdateFailed { reason } => {
            format!("module-update-failed: {}: {}", subject, reason)
        }
        RunStatus::PublishFailed { reason } => format!("publish-failed: {}: {}", subject, reason),
        RunStatus::Fatal { kind, message } => {
            format!("fatal ({}): {}: {}", kind.name(), subject, message)
        }
    };

    if let Some(Published::PullRequest { pull, .. }) = &report.published {
        message.push_str(&format!(" ({})", pull.html_url));
    }
    if settings.dry_run {
        message.push_str(" [dry run]");
    }
    message
}

/// Title of the rebase pull request.
pub fn pull_request_title(source: &BranchRef, source_head: Oid, dest: &BranchRef) -> String {
    format!(
        "Merge {}:{} ({}) into {}",
        source.url,
        source.branch,
        short_id(source_head),
        dest.branch
    )
}

/// Body of the rebase pull request: carried and dropped commits.
pub fn pull_request_body(
    source: &BranchRef,
    source_head: Oid,
    classification: &Classification,
) -> String {
    let mut body = format!(
        "Rebase onto {}:{} at {}.\n",
        source.url, source.branch, source_head
    );

    let kept: Vec<String> = classification
        .commits
        .iter()
        .filter(|c| c.decision.keep)
        .map(|c| commit_line(&c.commit.short_id(), c.commit.summary()))
        .collect();
    body.push_str("\n### Carried commits\n\n");
    if kept.is_empty() {
        body.push_str("None\n");
    } else {
        body.push_str(&kept.join("\n"));
        body.push('\n');
    }

    let dropped: Vec<String> = classification
        .dropped()
        .map(|c| commit_line(&c.commit.short_id(), c.commit.summary()))
        .collect();
    if !dropped.is_empty() {
        body.push_str("\n### Dropped commits\n\n");
        body.push_str(&dropped.join("\n"));
        body.push('\n');
    }

    body
}

fn commit_line(id: &str, summary: &str) -> String {
    format!("- {} {}", id, truncate(summary, MAX_SUMMARY_LEN))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(max - 3).collect();
        short.push_str("...");
        short
    }
}
