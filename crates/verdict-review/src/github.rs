use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use verdict_core::{ChangedFile, GitHubConfig, PullRequest, RepoId, VerdictError};

/// GitHub client for listing PR files and posting the review comment.
///
/// # Examples
///
/// ```
/// use verdict_review::github::parse_pr_reference;
///
/// let (repo, number) = parse_pr_reference("rust-lang/rust#12345").unwrap();
/// assert_eq!(repo.owner, "rust-lang");
/// assert_eq!(repo.name, "rust");
/// assert_eq!(number, 12345);
/// ```
pub struct GitHubClient {
    octocrab: octocrab::Octocrab,
    per_page: u8,
}

/// A comment created on a pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct PostedComment {
    /// Platform id of the new comment.
    pub id: u64,
    /// Browser link to the comment.
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Serialize)]
struct ListFilesParams {
    per_page: u8,
    page: u32,
}

impl GitHubClient {
    /// Create a client from the resolved GitHub configuration.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::Config`] if no token is configured or the API
    /// URL is invalid, or [`VerdictError::PlatformApi`] if the client cannot
    /// be built.
    pub fn new(config: &GitHubConfig) -> Result<Self, VerdictError> {
        let token = config.token()?;

        let mut builder = octocrab::Octocrab::builder().personal_token(token.to_string());
        if let Some(api_url) = config.api_url.as_deref() {
            builder = builder.base_uri(api_url).map_err(|e| {
                VerdictError::Config(format!("invalid GitHub API URL '{api_url}': {e}"))
            })?;
        }
        let octocrab = builder
            .build()
            .map_err(|e| VerdictError::PlatformApi(format!("failed to create GitHub client: {e}")))?;

        Ok(Self {
            octocrab,
            per_page: config.page_size(),
        })
    }

    /// List the files changed by a pull request, in platform order.
    ///
    /// Reads a single page of `per_page` entries. PRs touching more files
    /// than that are reviewed on the first page only.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::PlatformApi`] on network or API errors.
    pub async fn list_changed_files(
        &self,
        repo: &RepoId,
        pr_number: u64,
    ) -> Result<Vec<ChangedFile>, VerdictError> {
        let route = format!("/repos/{}/{}/pulls/{pr_number}/files", repo.owner, repo.name);
        let params = ListFilesParams {
            per_page: self.per_page,
            page: 1,
        };
        debug!(%route, per_page = self.per_page, "listing changed files");

        let files: Vec<ChangedFile> = self
            .octocrab
            .get(route, Some(&params))
            .await
            .map_err(|e| VerdictError::PlatformApi(format!("failed to list PR files: {e}")))?;

        if files.len() >= usize::from(self.per_page) {
            info!(
                count = files.len(),
                "PR has at least one full page of files; later pages are not reviewed"
            );
        }
        Ok(files)
    }

    /// Fetch title and description of a pull request.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::PlatformApi`] on network or API errors.
    pub async fn get_pull_request(
        &self,
        repo: &RepoId,
        pr_number: u64,
    ) -> Result<PullRequest, VerdictError> {
        let route = format!("/repos/{}/{}/pulls/{pr_number}", repo.owner, repo.name);
        self.octocrab
            .get(route, None::<&()>)
            .await
            .map_err(|e| VerdictError::PlatformApi(format!("failed to fetch PR #{pr_number}: {e}")))
    }

    /// Post `body` as a new comment on the pull request's conversation.
    ///
    /// Always creates a comment; earlier comments are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::PlatformApi`] on API errors.
    pub async fn create_comment(
        &self,
        repo: &RepoId,
        pr_number: u64,
        body: &str,
    ) -> Result<PostedComment, VerdictError> {
        let route = format!(
            "/repos/{}/{}/issues/{pr_number}/comments",
            repo.owner, repo.name
        );
        let payload = serde_json::json!({ "body": body });

        self.octocrab
            .post(route, Some(&payload))
            .await
            .map_err(|e| VerdictError::PlatformApi(format!("failed to post comment: {e}")))
    }
}

/// Parse a PR reference string (`owner/repo#number`) into its components.
///
/// # Errors
///
/// Returns [`VerdictError::Config`] if the format is invalid.
///
/// # Examples
///
/// ```
/// use verdict_review::github::parse_pr_reference;
///
/// let (repo, num) = parse_pr_reference("octocat/hello-world#42").unwrap();
/// assert_eq!(repo.to_string(), "octocat/hello-world");
/// assert_eq!(num, 42);
/// ```
pub fn parse_pr_reference(pr_ref: &str) -> Result<(RepoId, u64), VerdictError> {
    let Some((owner_repo, number_str)) = pr_ref.split_once('#') else {
        return Err(VerdictError::Config(format!(
            "invalid PR reference '{pr_ref}', expected owner/repo#number"
        )));
    };
    let repo: RepoId = owner_repo.parse().map_err(|_| {
        VerdictError::Config(format!(
            "invalid PR reference '{pr_ref}', expected owner/repo#number"
        ))
    })?;
    let number: u64 = number_str
        .parse()
        .map_err(|_| VerdictError::Config(format!("invalid PR number: {number_str}")))?;
    Ok((repo, number))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(server: &mockito::ServerGuard) -> GitHubConfig {
        GitHubConfig {
            token: Some("ghp_test".into()),
            api_url: Some(server.url()),
            ..GitHubConfig::default()
        }
    }

    #[test]
    fn parse_valid_pr_reference() {
        let (repo, num) = parse_pr_reference("rust-lang/rust#12345").unwrap();
        assert_eq!(repo, RepoId::new("rust-lang", "rust"));
        assert_eq!(num, 12345);
    }

    #[test]
    fn parse_pr_reference_missing_hash() {
        assert!(parse_pr_reference("owner/repo").is_err());
    }

    #[test]
    fn parse_pr_reference_missing_slash() {
        assert!(parse_pr_reference("repo#123").is_err());
    }

    #[test]
    fn parse_pr_reference_invalid_number() {
        assert!(parse_pr_reference("owner/repo#abc").is_err());
    }

    #[tokio::test]
    async fn client_requires_token() {
        let result = GitHubClient::new(&GitHubConfig::default());
        assert!(matches!(result, Err(VerdictError::Config(_))));
    }

    #[tokio::test]
    async fn list_changed_files_reads_first_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/octo/demo/pulls/7/files")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("per_page".into(), "100".into()),
                mockito::Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"filename": "src/lib.rs", "status": "modified", "additions": 4, "deletions": 1, "patch": "@@ -1 +1,4 @@"},
                    {"filename": "logo.png", "status": "added", "additions": 0, "deletions": 0}
                ]"#,
            )
            .create_async()
            .await;

        let client = GitHubClient::new(&config_for(&server)).unwrap();
        let files = client
            .list_changed_files(&RepoId::new("octo", "demo"), 7)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].filename, "src/lib.rs");
        assert_eq!(files[0].additions, 4);
        assert!(files[1].patch.is_none());
    }

    #[tokio::test]
    async fn list_changed_files_surfaces_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/octo/demo/pulls/7/files")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "Not Found", "documentation_url": "https://docs.github.com"}"#)
            .create_async()
            .await;

        let client = GitHubClient::new(&config_for(&server)).unwrap();
        let err = client
            .list_changed_files(&RepoId::new("octo", "demo"), 7)
            .await
            .unwrap_err();
        assert!(matches!(err, VerdictError::PlatformApi(_)));
    }

    #[tokio::test]
    async fn create_comment_posts_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/repos/octo/demo/issues/7/comments")
            .match_body(mockito::Matcher::Json(serde_json::json!({ "body": "LGTM" })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 99, "html_url": "https://github.com/octo/demo/pull/7#issuecomment-99"}"#)
            .create_async()
            .await;

        let client = GitHubClient::new(&config_for(&server)).unwrap();
        let posted = client
            .create_comment(&RepoId::new("octo", "demo"), 7, "LGTM")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(posted.id, 99);
        assert!(posted.html_url.unwrap().ends_with("issuecomment-99"));
    }

    #[tokio::test]
    async fn get_pull_request_reads_title_and_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/octo/demo/pulls/7")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"number": 7, "title": "Fix parser", "body": null, "state": "open"}"#)
            .create_async()
            .await;

        let client = GitHubClient::new(&config_for(&server)).unwrap();
        let pr = client
            .get_pull_request(&RepoId::new("octo", "demo"), 7)
            .await
            .unwrap();
        assert_eq!(pr.number, 7);
        assert_eq!(pr.title.as_deref(), Some("Fix parser"));
        assert!(pr.body.is_none());
    }
}
