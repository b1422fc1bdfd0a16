use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VerdictError;

/// A repository on the code-hosting platform.
///
/// # Examples
///
/// ```
/// use verdict_core::RepoId;
///
/// let repo: RepoId = "octocat/hello-world".parse().unwrap();
/// assert_eq!(repo.owner, "octocat");
/// assert_eq!(repo.name, "hello-world");
/// assert_eq!(repo.to_string(), "octocat/hello-world");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoId {
    /// Account or organization that owns the repository.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoId {
    type Err = VerdictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(owner, name))
            }
            _ => Err(VerdictError::Config(format!(
                "invalid repository '{s}', expected owner/repo"
            ))),
        }
    }
}

/// The pull request under review.
///
/// # Examples
///
/// ```
/// use verdict_core::PullRequest;
///
/// let pr = PullRequest {
///     number: 42,
///     title: Some("Add retries".into()),
///     body: None,
/// };
/// assert_eq!(pr.number, 42);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number, shared with its issue number.
    pub number: u64,
    /// PR title, if the platform sent one.
    #[serde(default)]
    pub title: Option<String>,
    /// PR description. `None` when the author left it empty.
    #[serde(default)]
    pub body: Option<String>,
}

/// A file touched by a pull request, as listed by the platform.
///
/// Deserializes directly from an entry of GitHub's "list pull request files"
/// response; fields the pipeline does not use are ignored.
///
/// # Examples
///
/// ```
/// use verdict_core::ChangedFile;
///
/// let file: ChangedFile = serde_json::from_str(
///     r#"{"filename": "src/lib.rs", "additions": 3, "deletions": 1, "status": "modified"}"#,
/// ).unwrap();
/// assert_eq!(file.filename, "src/lib.rs");
/// assert!(file.patch.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    /// Path relative to the repository root.
    pub filename: String,
    /// Lines added.
    pub additions: u64,
    /// Lines removed.
    pub deletions: u64,
    /// Unified diff text. Absent for binary files and very large diffs.
    #[serde(default)]
    pub patch: Option<String>,
}

/// The `(app, user, session)` triple addressing a conversation on the agent.
///
/// The session id is derived from the PR number alone, so every run for the
/// same PR lands in the same server-side session.
///
/// # Examples
///
/// ```
/// use verdict_core::SessionIdentity;
///
/// let first = SessionIdentity::for_pull_request("adk_agent", "github-action", 42);
/// let second = SessionIdentity::for_pull_request("adk_agent", "github-action", 42);
/// assert_eq!(first.session_id, "pr-42");
/// assert_eq!(first, second);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    /// Agent application name.
    pub app_name: String,
    /// Automation actor the session belongs to.
    pub user_id: String,
    /// `pr-<number>`.
    pub session_id: String,
}

impl SessionIdentity {
    pub fn for_pull_request(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        pr_number: u64,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: format!("pr-{pr_number}"),
        }
    }
}
