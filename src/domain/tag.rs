use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RebaseBotError;

/// Prefix marking a downstream commit as managed by the tagging convention.
pub const UPSTREAM_PREFIX: &str = "UPSTREAM:";

/// Run-wide rule for commits that carry no usable tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagPolicy {
    /// Untagged commits are kept
    #[default]
    Soft,
    /// Untagged commits are dropped
    Strict,
    /// Every commit is kept, whatever its tag says
    None,
}

impl TagPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            TagPolicy::Soft => "soft",
            TagPolicy::Strict => "strict",
            TagPolicy::None => "none",
        }
    }
}

impl fmt::Display for TagPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TagPolicy {
    type Err = RebaseBotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "soft" => Ok(TagPolicy::Soft),
            "strict" => Ok(TagPolicy::Strict),
            "none" => Ok(TagPolicy::None),
            other => Err(RebaseBotError::config(format!(
                "Unknown tag policy '{}': expected soft, strict or none",
                other
            ))),
        }
    }
}

/// Tag found on the first line of a commit message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTag {
    /// `UPSTREAM: <carry>: ...`
    Carry,
    /// `UPSTREAM: <drop>: ...`
    Drop,
    /// `UPSTREAM: 1234: ...`, tracked by an upstream pull request
    Pull(u64),
    /// No `UPSTREAM:` prefix
    Untagged,
}

/// A tag-shaped prefix whose token is neither `<carry>`, `<drop>` nor a PR number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTag(pub String);

/// Merge state of an upstream pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    Merged,
    NotMerged,
    Unknown,
}

impl CommitTag {
    /// Extract the tag from a commit message.
    ///
    /// Only the first line is inspected and matching is case-sensitive.
    pub fn parse(message: &str) -> Result<Self, InvalidTag> {
        let subject = message.lines().next().unwrap_or_default();

        if !subject.starts_with(UPSTREAM_PREFIX) {
            return Ok(CommitTag::Untagged);
        }

        let token = match Regex::new(r"^UPSTREAM: ?([^:]*):")
            .ok()
            .and_then(|re| re.captures(subject))
            .and_then(|captures| captures.get(1))
        {
            Some(token) => token.as_str().trim(),
            None => return Err(InvalidTag(subject.to_string())),
        };

        match token {
            "<carry>" => Ok(CommitTag::Carry),
            "<drop>" => Ok(CommitTag::Drop),
            number => match number.parse::<u64>() {
                Ok(pr) if pr > 0 && number.bytes().all(|b| b.is_ascii_digit()) => {
                    Ok(CommitTag::Pull(pr))
                }
                _ => Err(InvalidTag(token.to_string())),
            },
        }
    }

    /// Upstream pull request referenced by the tag, if any.
    pub fn pull_request(&self) -> Option<u64> {
        match self {
            CommitTag::Pull(number) => Some(*number),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CommitTag::Carry => "carry",
            CommitTag::Drop => "drop",
            CommitTag::Pull(_) => "numbered",
            CommitTag::Untagged => "untagged",
        }
    }
}

/// Outcome of classifying one commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagDecision {
    pub tag: CommitTag,
    pub keep: bool,
}

impl TagDecision {
    /// Decide whether a commit survives the rebase.
    ///
    /// `merge_status` is only consulted for numbered tags; callers pass
    /// `None` when no lookup was made.
    pub fn decide(tag: CommitTag, merge_status: Option<MergeStatus>, policy: TagPolicy) -> Self {
        let keep = match tag {
            CommitTag::Carry => true,
            CommitTag::Drop => policy == TagPolicy::None,
            CommitTag::Pull(_) => {
                policy == TagPolicy::None || merge_status != Some(MergeStatus::Merged)
            }
            CommitTag::Untagged => policy != TagPolicy::Strict,
        };

        TagDecision { tag, keep }
    }
}
