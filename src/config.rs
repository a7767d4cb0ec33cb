use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{BranchRef, Identity, TagPolicy};
use crate::engine::EngineSettings;
use crate::error::{RebaseBotError, Result};
use crate::github::client::DEFAULT_API_URL;
use crate::modules::CommandTooling;

/// Name of the configuration file looked up in the current and config directories
pub const CONFIG_FILE_NAME: &str = "rebasebot.toml";

/// Represents the complete configuration for rebase-bot.
///
/// Branch specs, identity, credentials and module update behavior. Every
/// field can be overridden from the command line.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Upstream branch spec, e.g. `kubernetes/autoscaler:master`
    #[serde(default)]
    pub source: Option<String>,

    /// Downstream branch spec
    #[serde(default)]
    pub dest: Option<String>,

    /// Bot-owned branch spec the result is pushed to
    #[serde(default)]
    pub rebase: Option<String>,

    /// Local working copy, created on first use
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    #[serde(default)]
    pub tag_policy: TagPolicy,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub slack: SlackConfig,

    #[serde(default)]
    pub module_update: ModuleUpdateConfig,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".rebasebot")
}

fn default_username() -> String {
    Identity::default().username
}

fn default_email() -> String {
    Identity::default().email
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_manifest() -> Option<String> {
    CommandTooling::go_modules().manifest
}

fn default_commands() -> Vec<Vec<String>> {
    CommandTooling::go_modules().commands
}

/// Identity used for replayed and generated commits.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitConfig {
    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_email")]
    pub email: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            username: default_username(),
            email: default_email(),
        }
    }
}

/// GitHub API access.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitHubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// File holding an API token; anonymous access when unset
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    /// Labels added to the rebase pull request
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        GitHubConfig {
            api_url: default_api_url(),
            token_file: None,
            labels: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct SlackConfig {
    /// File holding a Slack incoming webhook URL
    #[serde(default)]
    pub webhook_file: Option<PathBuf>,
}

/// Dependency regeneration after a clean rebase.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ModuleUpdateConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Commands only run when this file exists in the working tree
    #[serde(default = "default_manifest")]
    pub manifest: Option<String>,

    #[serde(default = "default_commands")]
    pub commands: Vec<Vec<String>>,

    /// Still publish when regeneration fails
    #[serde(default)]
    pub publish_on_failure: bool,
}

impl Default for ModuleUpdateConfig {
    fn default() -> Self {
        ModuleUpdateConfig {
            enabled: false,
            manifest: default_manifest(),
            commands: default_commands(),
            publish_on_failure: false,
        }
    }
}

impl ModuleUpdateConfig {
    pub fn tooling(&self) -> CommandTooling {
        CommandTooling::new(self.manifest.clone(), self.commands.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source: None,
            dest: None,
            rebase: None,
            working_dir: default_working_dir(),
            tag_policy: TagPolicy::default(),
            dry_run: false,
            git: GitConfig::default(),
            github: GitHubConfig::default(),
            slack: SlackConfig::default(),
            module_update: ModuleUpdateConfig::default(),
        }
    }
}

impl Config {
    /// Validate branch specs and build the settings for one engine run.
    pub fn engine_settings(&self) -> Result<EngineSettings> {
        Ok(EngineSettings {
            source: required_branch("source", self.source.as_deref())?,
            dest: required_branch("dest", self.dest.as_deref())?,
            rebase: required_branch("rebase", self.rebase.as_deref())?,
            identity: Identity::new(self.git.username.clone(), self.git.email.clone()),
            tag_policy: self.tag_policy,
            update_modules: self.module_update.enabled,
            publish_on_module_failure: self.module_update.publish_on_failure,
            dry_run: self.dry_run,
            labels: self.github.labels.clone(),
        })
    }

    /// GitHub token read from `github.token_file`, if configured
    pub fn github_token(&self) -> Result<Option<String>> {
        self.github
            .token_file
            .as_deref()
            .map(read_secret)
            .transpose()
    }

    /// Slack webhook URL read from `slack.webhook_file`, if configured
    pub fn slack_webhook(&self) -> Result<Option<String>> {
        self.slack
            .webhook_file
            .as_deref()
            .map(read_secret)
            .transpose()
    }
}

fn required_branch(name: &str, spec: Option<&str>) -> Result<BranchRef> {
    let spec = spec.ok_or_else(|| {
        RebaseBotError::config(format!(
            "Missing {} branch: set '{}' in {} or pass --{}",
            name, name, CONFIG_FILE_NAME, name
        ))
    })?;
    BranchRef::parse(spec)
}

/// Read a credential file, trimming surrounding whitespace.
pub fn read_secret(path: &Path) -> Result<String> {
    let secret = fs::read_to_string(path).map_err(|e| {
        RebaseBotError::config(format!("Failed to read '{}': {}", path.display(), e))
    })?;
    let secret = secret.trim();
    if secret.is_empty() {
        return Err(RebaseBotError::config(format!(
            "'{}' is empty",
            path.display()
        )));
    }
    Ok(secret.to_string())
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `rebasebot.toml` in current directory
/// 3. `rebasebot.toml` in user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let path = if let Some(path) = config_path {
        PathBuf::from(path)
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        PathBuf::from(CONFIG_FILE_NAME)
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            config_path
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    let config_str = fs::read_to_string(&path).map_err(|e| {
        RebaseBotError::config(format!("Failed to read '{}': {}", path.display(), e))
    })?;
    toml::from_str(&config_str).map_err(|e| {
        RebaseBotError::config(format!("Failed to parse '{}': {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn configured() -> Config {
        Config {
            source: Some("kubernetes/autoscaler:master".to_string()),
            dest: Some("openshift/kubernetes-autoscaler:master".to_string()),
            rebase: Some("rebasebot/kubernetes-autoscaler:rebase-bot-master".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_engine_settings_from_config() {
        let settings = configured().engine_settings().unwrap();
        assert_eq!(settings.source.repo_slug(), "kubernetes/autoscaler");
        assert_eq!(settings.rebase.branch, "rebase-bot-master");
        assert_eq!(settings.tag_policy, TagPolicy::Soft);
        assert_eq!(settings.identity, Identity::default());
        assert!(!settings.update_modules);
    }

    #[test]
    fn test_missing_branch_is_config_error() {
        let config = Config {
            dest: None,
            ..configured()
        };
        let err = config.engine_settings().unwrap_err();
        assert!(matches!(err, RebaseBotError::Config(ref msg) if msg.contains("--dest")));
    }

    #[test]
    fn test_invalid_branch_spec_is_config_error() {
        let config = Config {
            source: Some("not a spec".to_string()),
            ..configured()
        };
        assert!(matches!(
            config.engine_settings(),
            Err(RebaseBotError::Config(_))
        ));
    }

    #[test]
    fn test_read_secret_trims() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  ghp_secret  ").unwrap();

        assert_eq!(read_secret(file.path()).unwrap(), "ghp_secret");
    }

    #[test]
    fn test_read_secret_rejects_empty_file() {
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            read_secret(file.path()),
            Err(RebaseBotError::Config(_))
        ));
    }

    #[test]
    fn test_unset_credentials_are_none() {
        let config = Config::default();
        assert_eq!(config.github_token().unwrap(), None);
        assert_eq!(config.slack_webhook().unwrap(), None);
    }
}
