//! The CI event that started a run.

use std::path::Path;

use serde::Deserialize;
use verdict_core::{PullRequest, RepoId, VerdictError};

/// Repository and pull request a run was triggered for.
///
/// A context without a pull request is valid: the run is a no-op.
///
/// # Examples
///
/// ```
/// use verdict_review::trigger::TriggerContext;
///
/// let event = r#"{"pull_request": {"number": 42, "title": "Fix", "body": null}}"#;
/// let ctx = TriggerContext::from_event_json(event, Some("octo/demo")).unwrap();
/// assert_eq!(ctx.pull_request.unwrap().number, 42);
/// assert_eq!(ctx.repo.unwrap().to_string(), "octo/demo");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerContext {
    /// Repository the event belongs to, when known.
    pub repo: Option<RepoId>,
    /// The pull request, when the event is a pull-request event.
    pub pull_request: Option<PullRequest>,
}

#[derive(Deserialize)]
struct EventPayload {
    #[serde(default)]
    pull_request: Option<PullRequest>,
    #[serde(default)]
    repository: Option<EventRepository>,
}

#[derive(Deserialize)]
struct EventRepository {
    #[serde(default)]
    full_name: Option<String>,
}

impl TriggerContext {
    /// Context for an explicitly named pull request.
    pub fn manual(repo: RepoId, pull_request: PullRequest) -> Self {
        Self {
            repo: Some(repo),
            pull_request: Some(pull_request),
        }
    }

    /// Parse a webhook event document.
    ///
    /// `repository` is the `owner/repo` string from the runner
    /// (`GITHUB_REPOSITORY`); it takes precedence over the event's own
    /// `repository.full_name`.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::Config`] if the document is not a JSON object
    /// or a repository name is malformed.
    pub fn from_event_json(event: &str, repository: Option<&str>) -> Result<Self, VerdictError> {
        let payload: EventPayload = serde_json::from_str(event)
            .map_err(|e| VerdictError::Config(format!("invalid event payload: {e}")))?;

        let repo_name = repository
            .filter(|r| !r.trim().is_empty())
            .map(str::to_string)
            .or_else(|| payload.repository.and_then(|r| r.full_name));
        let repo = repo_name.as_deref().map(str::parse::<RepoId>).transpose()?;

        Ok(Self {
            repo,
            pull_request: payload.pull_request,
        })
    }

    /// Read and parse the event file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::Io`] if the file cannot be read, otherwise as
    /// [`from_event_json`](Self::from_event_json).
    pub fn from_event_file(path: &Path, repository: Option<&str>) -> Result<Self, VerdictError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_event_json(&content, repository)
    }
}
