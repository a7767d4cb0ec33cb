//! Dependency tooling that regenerates lock and vendor files
//!
//! The default tooling runs `go mod tidy` followed by `go mod vendor` in the
//! working tree, which is what Go forks need after an upstream rebase.

use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{RebaseBotError, Result};

/// Regenerates dependency artifacts in a working tree
pub trait ModuleTooling {
    fn regenerate(&self, workdir: &Path) -> Result<()>;
}

impl<F> ModuleTooling for F
where
    F: Fn(&Path) -> Result<()>,
{
    fn regenerate(&self, workdir: &Path) -> Result<()> {
        self(workdir)
    }
}

/// Runs a fixed list of commands in the working tree
#[derive(Debug, Clone, PartialEq)]
pub struct CommandTooling {
    /// File that must exist for the commands to run (e.g. `go.mod`)
    pub manifest: Option<String>,
    /// Commands executed in order, each as program followed by arguments
    pub commands: Vec<Vec<String>>,
}

impl CommandTooling {
    pub fn new(manifest: Option<String>, commands: Vec<Vec<String>>) -> Self {
        CommandTooling { manifest, commands }
    }

    /// `go mod tidy` and `go mod vendor`, skipped when there is no `go.mod`
    pub fn go_modules() -> Self {
        CommandTooling::new(
            Some("go.mod".to_string()),
            vec![
                vec!["go".to_string(), "mod".to_string(), "tidy".to_string()],
                vec!["go".to_string(), "mod".to_string(), "vendor".to_string()],
            ],
        )
    }

    fn run(&self, command: &[String], workdir: &Path) -> Result<()> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| RebaseBotError::module_update("Empty module update command"))?;
        let command_line = command.join(" ");

        debug!(command = %command_line, "running module update command");
        let output = Command::new(program)
            .args(args)
            .current_dir(workdir)
            .output()
            .map_err(|e| {
                RebaseBotError::module_update(format!(
                    "Failed to execute '{}': {}",
                    command_line, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(RebaseBotError::module_update(format!(
                "'{}' failed with exit code {}\nStdout: {}\nStderr: {}",
                command_line,
                output.status.code().unwrap_or(-1),
                stdout,
                stderr
            )));
        }

        Ok(())
    }
}

impl Default for CommandTooling {
    fn default() -> Self {
        Self::go_modules()
    }
}

impl ModuleTooling for CommandTooling {
    fn regenerate(&self, workdir: &Path) -> Result<()> {
        if let Some(manifest) = &self.manifest {
            if !workdir.join(manifest).is_file() {
                info!(manifest = %manifest, "no dependency manifest, skipping regeneration");
                return Ok(());
            }
        }

        for command in &self.commands {
            self.run(command, workdir)?;
        }

        Ok(())
    }
}
