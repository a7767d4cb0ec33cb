//! Domain logic - pure rules independent of git and GitHub

pub mod branch;
pub mod identity;
pub mod outcome;
pub mod tag;

pub use branch::BranchRef;
pub use identity::Identity;
pub use outcome::{ConflictingCommit, ModuleUpdateResult, RebaseOutcome, RunStatus};
pub use tag::{CommitTag, InvalidTag, MergeStatus, TagDecision, TagPolicy};
