use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{RebaseBotError, Result};

const GITHUB_URL: &str = "https://github.com";

/// One branch on one remote repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    /// Fetchable location of the repository (URL or local path)
    pub url: String,
    /// Owner of the repository (GitHub organisation or user)
    pub ns: String,
    /// Repository name
    pub name: String,
    /// Branch name
    pub branch: String,
}

impl BranchRef {
    /// Create a branch reference from its parts.
    ///
    /// The location is taken as is, which allows local paths in tests and
    /// mirrors that are not hosted on GitHub.
    pub fn new(
        url: impl Into<String>,
        ns: impl Into<String>,
        name: impl Into<String>,
        branch: impl Into<String>,
    ) -> Result<Self> {
        let branch = branch.into();
        validate_branch_name(&branch)?;

        Ok(BranchRef {
            url: url.into(),
            ns: ns.into(),
            name: name.into(),
            branch,
        })
    }

    /// Parse a branch spec of the form `<location>:<branch>`.
    ///
    /// The location is either a full URL such as
    /// `https://github.com/kubernetes/autoscaler` or the GitHub shorthand
    /// `openshift/kubernetes-autoscaler`.
    pub fn parse(spec: &str) -> Result<Self> {
        let (location, branch) = spec.rsplit_once(':').ok_or_else(|| {
            RebaseBotError::config(format!(
                "Invalid branch spec '{}': expected <location>:<branch>",
                spec
            ))
        })?;

        let (url, ns, name) = if location.contains("://") {
            parse_url_location(location)?
        } else {
            let (ns, name) = split_repo_path(location).ok_or_else(|| {
                RebaseBotError::config(format!(
                    "Invalid repository '{}' in branch spec '{}'",
                    location, spec
                ))
            })?;
            (format!("{}/{}/{}", GITHUB_URL, ns, name), ns, name)
        };

        BranchRef::new(url, ns, name, branch)
    }

    /// `ns/name`, the form GitHub uses in its API paths.
    pub fn repo_slug(&self) -> String {
        format!("{}/{}", self.ns, self.name)
    }
}

impl FromStr for BranchRef {
    type Err = RebaseBotError;

    fn from_str(s: &str) -> Result<Self> {
        BranchRef::parse(s)
    }
}

impl fmt::Display for BranchRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.ns, self.name, self.branch)
    }
}

fn validate_branch_name(branch: &str) -> Result<()> {
    if branch.is_empty() {
        return Err(RebaseBotError::config("Branch name must not be empty"));
    }
    if branch.chars().any(char::is_whitespace) {
        return Err(RebaseBotError::config(format!(
            "Branch name '{}' must not contain whitespace",
            branch
        )));
    }
    Ok(())
}

fn parse_url_location(location: &str) -> Result<(String, String, String)> {
    let url = Url::parse(location).map_err(|e| {
        RebaseBotError::config(format!("Invalid repository URL '{}': {}", location, e))
    })?;

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|segment| !segment.is_empty()).collect())
        .unwrap_or_default();

    if segments.len() < 2 {
        return Err(RebaseBotError::config(format!(
            "Repository URL '{}' must end with <namespace>/<name>",
            location
        )));
    }

    let ns = segments[segments.len() - 2].to_string();
    let name = segments[segments.len() - 1]
        .trim_end_matches(".git")
        .to_string();

    Ok((location.trim_end_matches('/').to_string(), ns, name))
}

fn split_repo_path(location: &str) -> Option<(String, String)> {
    let (ns, name) = location.split_once('/')?;
    if ns.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((ns.to_string(), name.to_string()))
}
