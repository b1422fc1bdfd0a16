/// Errors that can occur anywhere in the review pipeline.
///
/// Each variant maps to one failure domain. Library crates return this type
/// directly; the binary reports it through `miette` at the boundary, which is
/// also the only place a failure is turned into an exit status.
///
/// # Examples
///
/// ```
/// use verdict_core::VerdictError;
///
/// let err = VerdictError::Config("GITHUB_TOKEN not set".into());
/// assert!(err.to_string().contains("GITHUB_TOKEN"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum VerdictError {
    /// Missing or invalid configuration: tokens, endpoint, PR reference, event file.
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(verdict::config),
        help("set AGENT_URL and GITHUB_TOKEN, or run `verdict init` to create a .verdict.toml")
    )]
    Config(String),

    /// The code-hosting platform rejected or failed a request.
    #[error("GitHub API error: {0}")]
    #[diagnostic(code(verdict::platform))]
    PlatformApi(String),

    /// A request to the review agent could not be completed.
    #[error("agent transport error: {0}")]
    #[diagnostic(code(verdict::agent))]
    AgentTransport(String),

    /// The agent answered, but nothing in the answer could be posted.
    #[error("no assistant text found in agent response. Response: {snapshot}")]
    #[diagnostic(code(verdict::no_content))]
    NoReviewableContent {
        /// The raw response, truncated for the log line.
        snapshot: String,
    },

    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
