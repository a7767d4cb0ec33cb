pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod git;
pub mod github;
pub mod logging;
pub mod modules;
pub mod notify;
pub mod ui;

pub use error::{RebaseBotError, Result};
