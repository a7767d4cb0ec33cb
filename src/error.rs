use thiserror::Error;

/// Unified error type for rebase-bot operations
#[derive(Error, Debug)]
pub enum RebaseBotError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Branch '{branch}' not found on remote '{remote}'")]
    RefNotFound { remote: String, branch: String },

    #[error("No common ancestor between destination {destination} and upstream {upstream}")]
    NoCommonAncestor { destination: String, upstream: String },

    #[error("Invalid tag '{tag}' in commit {commit}")]
    InvalidTag { commit: String, tag: String },

    #[error("Module update failed: {0}")]
    ModuleUpdate(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("GitHub API error: {0}")]
    GitHub(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in rebase-bot
pub type Result<T> = std::result::Result<T, RebaseBotError>;

/// Coarse category of a run-terminating error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    Config,
    RefNotFound,
    NoCommonAncestor,
    InvalidTag,
    ModuleUpdate,
    Publish,
    Git,
    GitHub,
    Io,
}

impl FatalKind {
    pub fn name(&self) -> &'static str {
        match self {
            FatalKind::Config => "config",
            FatalKind::RefNotFound => "ref-not-found",
            FatalKind::NoCommonAncestor => "no-common-ancestor",
            FatalKind::InvalidTag => "invalid-tag",
            FatalKind::ModuleUpdate => "module-update",
            FatalKind::Publish => "publish",
            FatalKind::Git => "git",
            FatalKind::GitHub => "github",
            FatalKind::Io => "io",
        }
    }
}

impl RebaseBotError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        RebaseBotError::Config(msg.into())
    }

    /// Create a module update error with context
    pub fn module_update(msg: impl Into<String>) -> Self {
        RebaseBotError::ModuleUpdate(msg.into())
    }

    /// Create a publish error with context
    pub fn publish(msg: impl Into<String>) -> Self {
        RebaseBotError::Publish(msg.into())
    }

    /// Create a GitHub API error with context
    pub fn github(msg: impl Into<String>) -> Self {
        RebaseBotError::GitHub(msg.into())
    }

    pub fn ref_not_found(remote: impl Into<String>, branch: impl Into<String>) -> Self {
        RebaseBotError::RefNotFound {
            remote: remote.into(),
            branch: branch.into(),
        }
    }

    /// Category reported when this error ends a run.
    pub fn kind(&self) -> FatalKind {
        match self {
            RebaseBotError::Git(_) => FatalKind::Git,
            RebaseBotError::Config(_) => FatalKind::Config,
            RebaseBotError::RefNotFound { .. } => FatalKind::RefNotFound,
            RebaseBotError::NoCommonAncestor { .. } => FatalKind::NoCommonAncestor,
            RebaseBotError::InvalidTag { .. } => FatalKind::InvalidTag,
            RebaseBotError::ModuleUpdate(_) => FatalKind::ModuleUpdate,
            RebaseBotError::Publish(_) => FatalKind::Publish,
            RebaseBotError::GitHub(_) => FatalKind::GitHub,
            RebaseBotError::Io(_) => FatalKind::Io,
        }
    }
}
