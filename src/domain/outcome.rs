use git2::Oid;

use crate::error::FatalKind;

/// A commit that could not be applied onto the new upstream head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictingCommit {
    pub id: Oid,
    pub summary: String,
}

/// Result of replaying the kept commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// At least one commit was applied
    Success { head: Oid, applied: usize },
    /// Nothing to apply; the working branch equals the source head
    NoOp { head: Oid },
    /// Replay halted; `head` is the last commit applied cleanly
    Conflict { commit: ConflictingCommit, head: Oid },
}

impl RebaseOutcome {
    pub fn head(&self) -> Oid {
        match self {
            RebaseOutcome::Success { head, .. }
            | RebaseOutcome::NoOp { head }
            | RebaseOutcome::Conflict { head, .. } => *head,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RebaseOutcome::Conflict { .. })
    }
}

/// Result of regenerating dependency lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleUpdateResult {
    pub changed: bool,
    pub commit: Option<Oid>,
}

impl ModuleUpdateResult {
    pub fn unchanged() -> Self {
        ModuleUpdateResult {
            changed: false,
            commit: None,
        }
    }

    pub fn committed(commit: Oid) -> Self {
        ModuleUpdateResult {
            changed: true,
            commit: Some(commit),
        }
    }
}

/// Terminal status of one run, as reported to the caller and the notification sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    NoOp,
    Conflict { commit: Oid, message: String },
    ModuleUpdateFailed { reason: String },
    PublishFailed { reason: String },
    Fatal { kind: FatalKind, message: String },
}

impl RunStatus {
    pub fn name(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::NoOp => "no-op",
            RunStatus::Conflict { .. } => "conflict",
            RunStatus::ModuleUpdateFailed { .. } => "module-update-failed",
            RunStatus::PublishFailed { .. } => "publish-failed",
            RunStatus::Fatal { .. } => "fatal",
        }
    }

    /// Process exit code for the command line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Success | RunStatus::NoOp => 0,
            RunStatus::Fatal { .. } => 1,
            RunStatus::Conflict { .. } => 2,
            RunStatus::ModuleUpdateFailed { .. } => 3,
            RunStatus::PublishFailed { .. } => 4,
        }
    }
}
