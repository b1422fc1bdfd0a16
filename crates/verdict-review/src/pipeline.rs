use std::fmt;

use tracing::info;
use verdict_core::{VerdictConfig, VerdictError};

use crate::agent::AgentClient;
use crate::github::{parse_pr_reference, GitHubClient};
use crate::payload::build_payload;
use crate::response::SNAPSHOT_CHARS;
use crate::trigger::TriggerContext;

/// How a pipeline run ended.
///
/// # Examples
///
/// ```
/// use verdict_review::pipeline::ReviewOutcome;
///
/// let outcome = ReviewOutcome::Skipped {
///     reason: "Not a pull request event".into(),
/// };
/// assert!(outcome.to_string().contains("Not a pull request event"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// The trigger carried no pull request; nothing was contacted.
    Skipped { reason: String },
    /// The verdict was posted as a new PR comment.
    Posted {
        comment_url: Option<String>,
        chars: usize,
    },
    /// Dry run: the verdict that would have been posted.
    DryRun { text: String },
}

impl fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped { reason } => write!(f, "{reason}"),
            Self::Posted {
                comment_url: Some(url),
                chars,
            } => write!(f, "Posted review comment ({chars} chars): {url}"),
            Self::Posted {
                comment_url: None,
                chars,
            } => write!(f, "Posted review comment ({chars} chars)"),
            Self::DryRun { text } => write!(f, "{text}"),
        }
    }
}

/// Orchestrates one review: files → payload → agent session → verdict → comment.
///
/// Every stage runs strictly after the previous one and the first failure
/// ends the run. Configuration is validated on construction, before any
/// request is made.
pub struct ReviewPipeline {
    config: VerdictConfig,
    dry_run: bool,
}

impl ReviewPipeline {
    /// Create a pipeline from fully resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::Config`] if the agent endpoint or the GitHub
    /// token is missing.
    pub fn new(config: VerdictConfig) -> Result<Self, VerdictError> {
        config.validate()?;
        Ok(Self {
            config,
            dry_run: false,
        })
    }

    /// Stop after extracting the verdict instead of posting it.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Build a trigger for `owner/repo#number` by asking GitHub for the PR.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::Config`] for a malformed reference, or
    /// [`VerdictError::PlatformApi`] if the PR cannot be fetched.
    pub async fn trigger_for_reference(&self, pr_ref: &str) -> Result<TriggerContext, VerdictError> {
        let (repo, number) = parse_pr_reference(pr_ref)?;
        let github = GitHubClient::new(&self.config.github)?;
        let pull_request = github.get_pull_request(&repo, number).await?;
        Ok(TriggerContext::manual(repo, pull_request))
    }

    /// Run the review for `trigger`.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure: [`VerdictError::PlatformApi`] for
    /// file listing or commenting, [`VerdictError::AgentTransport`] for the
    /// agent exchange, and [`VerdictError::NoReviewableContent`] when the
    /// agent's reply holds no text.
    pub async fn run(&self, trigger: &TriggerContext) -> Result<ReviewOutcome, VerdictError> {
        let Some(pr) = trigger.pull_request.as_ref() else {
            info!("not a pull request event, nothing to review");
            return Ok(ReviewOutcome::Skipped {
                reason: "Not a pull request event. Exiting.".into(),
            });
        };
        let repo = trigger.repo.as_ref().ok_or_else(|| {
            VerdictError::Config(
                "pull request event without a repository; set GITHUB_REPOSITORY".into(),
            )
        })?;

        let github = GitHubClient::new(&self.config.github)?;
        let agent = AgentClient::new(&self.config.agent)?;

        info!(pr = pr.number, %repo, "fetching files for PR");
        let files = github.list_changed_files(repo, pr.number).await?;
        let payload = build_payload(repo, pr, &files);
        info!(files = files.len(), bytes = payload.len(), "built review payload");

        let session = agent.session(pr.number).establish().await?;
        let done = session.run(&payload).await?;

        let text = done
            .response
            .extract_text()
            .ok_or_else(|| VerdictError::NoReviewableContent {
                snapshot: done.response.snapshot(SNAPSHOT_CHARS),
            })?;

        if self.dry_run {
            info!(chars = text.len(), "dry run, not posting");
            return Ok(ReviewOutcome::DryRun { text });
        }

        info!(pr = pr.number, "posting comment on PR");
        let posted = github.create_comment(repo, pr.number, &text).await?;
        info!(comment_id = posted.id, "posted review comment");

        Ok(ReviewOutcome::Posted {
            comment_url: posted.html_url,
            chars: text.chars().count(),
        })
    }
}
