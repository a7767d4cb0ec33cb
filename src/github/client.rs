use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::{BranchRef, MergeStatus};
use crate::error::{RebaseBotError, Result};
use crate::github::{PullRequest, PullRequestSpec, PullRequests};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Deserialize)]
struct PullSummary {
    number: u64,
    html_url: String,
}

/// Blocking GitHub REST client
pub struct GitHubClient {
    agent: ureq::Agent,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a client for `api_url`, authenticating with `token` when given
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("rebase-bot/", env!("CARGO_PKG_VERSION")))
            .build();

        GitHubClient {
            agent,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let request = self
            .agent
            .request(method, &self.url(path))
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", "2022-11-28");

        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {}", token)),
            None => request,
        }
    }

    fn find_open_pull(&self, spec: &PullRequestSpec) -> Result<Option<PullSummary>> {
        let path = format!("/repos/{}/pulls", spec.base.repo_slug());
        let head = format!("{}:{}", spec.head.ns, spec.head.branch);

        let pulls: Vec<PullSummary> = self
            .request("GET", &path)
            .query("state", "open")
            .query("head", &head)
            .query("base", &spec.base.branch)
            .call()
            .map_err(api_error)?
            .into_json()
            .map_err(|e| RebaseBotError::github(format!("Failed to parse pull list: {}", e)))?;

        Ok(pulls.into_iter().next())
    }

    fn add_labels(&self, spec: &PullRequestSpec, number: u64) -> Result<()> {
        if spec.labels.is_empty() {
            return Ok(());
        }

        let path = format!("/repos/{}/issues/{}/labels", spec.base.repo_slug(), number);
        self.request("POST", &path)
            .send_json(json!({ "labels": spec.labels }))
            .map_err(api_error)?;
        Ok(())
    }
}

fn api_error(error: ureq::Error) -> RebaseBotError {
    match error {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            RebaseBotError::github(format!("HTTP {}: {}", code, body))
        }
        ureq::Error::Transport(transport) => RebaseBotError::github(transport.to_string()),
    }
}

impl PullRequests for GitHubClient {
    fn merge_status(&self, repo: &BranchRef, number: u64) -> Result<MergeStatus> {
        let path = format!("/repos/{}/pulls/{}/merge", repo.repo_slug(), number);

        match self.request("GET", &path).call() {
            Ok(response) if response.status() == 204 => Ok(MergeStatus::Merged),
            Ok(response) => {
                warn!(pr = number, status = response.status(), "unexpected merge status reply");
                Ok(MergeStatus::Unknown)
            }
            Err(ureq::Error::Status(404, _)) => Ok(MergeStatus::NotMerged),
            Err(ureq::Error::Status(code, _)) => {
                warn!(pr = number, status = code, "merge status unavailable");
                Ok(MergeStatus::Unknown)
            }
            Err(ureq::Error::Transport(transport)) => Err(RebaseBotError::github(format!(
                "Failed to query merge status of #{}: {}",
                number, transport
            ))),
        }
    }

    fn ensure_pull_request(&self, spec: &PullRequestSpec) -> Result<PullRequest> {
        let pull = match self.find_open_pull(spec)? {
            Some(existing) => {
                debug!(pr = existing.number, "updating existing pull request");
                let path = format!("/repos/{}/pulls/{}", spec.base.repo_slug(), existing.number);
                self.request("PATCH", &path)
                    .send_json(json!({ "title": spec.title, "body": spec.body }))
                    .map_err(api_error)?;

                PullRequest {
                    number: existing.number,
                    html_url: existing.html_url,
                    created: false,
                }
            }
            None => {
                let path = format!("/repos/{}/pulls", spec.base.repo_slug());
                let created: PullSummary = self
                    .request("POST", &path)
                    .send_json(json!({
                        "title": spec.title,
                        "body": spec.body,
                        "head": format!("{}:{}", spec.head.ns, spec.head.branch),
                        "base": spec.base.branch,
                        "maintainer_can_modify": false,
                    }))
                    .map_err(api_error)?
                    .into_json()
                    .map_err(|e| {
                        RebaseBotError::github(format!("Failed to parse created pull: {}", e))
                    })?;

                info!(pr = created.number, url = %created.html_url, "created pull request");
                PullRequest {
                    number: created.number,
                    html_url: created.html_url,
                    created: true,
                }
            }
        };

        self.add_labels(spec, pull.number)?;
        Ok(pull)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_trailing_slash_is_trimmed() {
        let client = GitHubClient::new("https://github.example.com/api/v3/", None);
        assert_eq!(
            client.url("/repos/a/b/pulls"),
            "https://github.example.com/api/v3/repos/a/b/pulls"
        );
    }

    #[test]
    fn test_transport_error_is_github_error() {
        // Nothing listens on port 9 on loopback.
        let client = GitHubClient::new("http://127.0.0.1:9", None);
        let repo = BranchRef::parse("kubernetes/autoscaler:master").unwrap();

        let err = client.merge_status(&repo, 100).unwrap_err();
        assert!(matches!(err, RebaseBotError::GitHub(_)));
    }
}
