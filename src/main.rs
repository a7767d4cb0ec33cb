use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use rebase_bot::config::{self, Config};
use rebase_bot::domain::TagPolicy;
use rebase_bot::engine::Engine;
use rebase_bot::git::Git2Repository;
use rebase_bot::github::GitHubClient;
use rebase_bot::notify::{LogNotifier, Notifier, SlackNotifier};
use rebase_bot::ui;
use rebase_bot::RebaseBotError;

#[derive(clap::Parser, Debug)]
#[command(
    name = "rebase-bot",
    version,
    about = "Rebase a downstream fork onto its upstream and open a pull request with the result"
)]
struct Args {
    #[arg(long, help = "Upstream branch, as <location>:<branch>")]
    source: Option<String>,

    #[arg(long, help = "Downstream branch, as <location>:<branch>")]
    dest: Option<String>,

    #[arg(long, help = "Bot-owned branch to push the result to, as <location>:<branch>")]
    rebase: Option<String>,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(long, help = "Local working copy used for the rebase")]
    working_dir: Option<PathBuf>,

    #[arg(long, help = "Handling of untagged commits: soft, strict or none")]
    tag_policy: Option<TagPolicy>,

    #[arg(long, help = "Rebase locally without pushing or opening a pull request")]
    dry_run: bool,

    #[arg(long, help = "Regenerate and commit go modules after the rebase")]
    update_go_modules: bool,

    #[arg(long, help = "Committer name")]
    git_username: Option<String>,

    #[arg(long, help = "Committer email")]
    git_email: Option<String>,

    #[arg(
        long,
        help = "File containing a GitHub token (personal access or app installation token)"
    )]
    github_token_file: Option<PathBuf>,

    #[arg(long, hide = true)]
    github_app_key: Option<PathBuf>,

    #[arg(long, hide = true)]
    github_cloner_key: Option<PathBuf>,

    #[arg(long, help = "File containing a Slack webhook URL")]
    slack_webhook: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    rebase_bot::logging::init_logger()?;

    let mut config = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(1);
        }
    };
    if let Err(e) = apply_args(&mut config, args) {
        ui::display_error(&e.to_string());
        std::process::exit(1);
    }

    let code = match run(&config) {
        Ok(code) => code,
        Err(e) => {
            ui::display_error(&e.to_string());
            1
        }
    };
    std::process::exit(code);
}

/// Command line values take precedence over the configuration file
fn apply_args(config: &mut Config, args: Args) -> rebase_bot::Result<()> {
    if args.github_app_key.is_some() || args.github_cloner_key.is_some() {
        return Err(RebaseBotError::config(
            "GitHub App keys are not supported; pass an installation token with --github-token-file",
        ));
    }
    if args.source.is_some() {
        config.source = args.source;
    }
    if args.dest.is_some() {
        config.dest = args.dest;
    }
    if args.rebase.is_some() {
        config.rebase = args.rebase;
    }
    if let Some(working_dir) = args.working_dir {
        config.working_dir = working_dir;
    }
    if let Some(policy) = args.tag_policy {
        config.tag_policy = policy;
    }
    if args.dry_run {
        config.dry_run = true;
    }
    if args.update_go_modules {
        config.module_update.enabled = true;
    }
    if let Some(username) = args.git_username {
        config.git.username = username;
    }
    if let Some(email) = args.git_email {
        config.git.email = email;
    }
    if args.github_token_file.is_some() {
        config.github.token_file = args.github_token_file;
    }
    if args.slack_webhook.is_some() {
        config.slack.webhook_file = args.slack_webhook;
    }
    Ok(())
}

fn run(config: &Config) -> rebase_bot::Result<i32> {
    let settings = config.engine_settings()?;
    let token = config.github_token()?;

    let notifier: Box<dyn Notifier> = match config.slack_webhook()? {
        Some(url) => Box::new(SlackNotifier::new(url)),
        None => Box::new(LogNotifier),
    };

    let mut repo = Git2Repository::open_or_init(&config.working_dir)?;
    if let Some(token) = &token {
        repo = repo.with_token(token.clone());
    }
    let pulls = GitHubClient::new(config.github.api_url.clone(), token);

    info!(working_dir = %config.working_dir.display(), "using working copy");
    ui::display_status(&format!(
        "Rebasing {} onto {}",
        settings.dest, settings.source
    ));

    let mut engine = Engine::new(
        settings,
        repo,
        pulls,
        config.module_update.tooling(),
        notifier,
    );
    let report = engine.run();
    ui::display_report(engine.settings(), &report);

    Ok(report.status.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from([
            "rebase-bot",
            "--source",
            "kubernetes/autoscaler:master",
            "--tag-policy",
            "strict",
            "--update-go-modules",
            "--git-username",
            "bot",
            "--slack-webhook",
            "/run/secrets/slack",
        ]);
        let mut config = Config {
            source: Some("old/upstream:main".to_string()),
            dest: Some("openshift/autoscaler:master".to_string()),
            ..Config::default()
        };

        apply_args(&mut config, args).unwrap();

        assert_eq!(config.source.as_deref(), Some("kubernetes/autoscaler:master"));
        assert_eq!(config.dest.as_deref(), Some("openshift/autoscaler:master"));
        assert_eq!(config.tag_policy, TagPolicy::Strict);
        assert!(config.module_update.enabled);
        assert_eq!(config.git.username, "bot");
        assert_eq!(config.git.email, Config::default().git.email);
        assert_eq!(
            config.slack.webhook_file,
            Some(PathBuf::from("/run/secrets/slack"))
        );
        assert!(!config.dry_run);
    }

    #[test]
    fn test_github_app_keys_point_to_token_file() {
        let args = Args::parse_from([
            "rebase-bot",
            "--github-app-key",
            "/credentials/gh-app-key",
            "--github-cloner-key",
            "/credentials/gh-cloner-key",
        ]);
        let mut config = Config::default();

        let err = apply_args(&mut config, args).unwrap_err();

        assert!(matches!(err, RebaseBotError::Config(_)));
        assert!(err.to_string().contains("--github-token-file"));
        assert_eq!(config.github.token_file, None);
    }

    #[test]
    fn test_unknown_tag_policy_is_rejected() {
        let result = Args::try_parse_from(["rebase-bot", "--tag-policy", "lenient"]);
        assert!(result.is_err());
    }
}
