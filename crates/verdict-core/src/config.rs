use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::VerdictError;

/// Default config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".verdict.toml";

/// Top-level configuration loaded from `.verdict.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
/// The resolved value is built once by the binary and threaded through the
/// pipeline; no stage reads the environment on its own.
///
/// # Examples
///
/// ```
/// use verdict_core::VerdictConfig;
///
/// let config = VerdictConfig::default();
/// assert_eq!(config.agent.app_name, "adk_agent");
/// assert_eq!(config.github.per_page, 100);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerdictConfig {
    /// Remote review agent settings.
    #[serde(default)]
    pub agent: AgentConfig,
    /// Code-hosting platform settings.
    #[serde(default)]
    pub github: GitHubConfig,
}

impl VerdictConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::Io`] if the file cannot be read, or
    /// [`VerdictError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, VerdictError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use verdict_core::VerdictConfig;
    ///
    /// let toml = r#"
    /// [agent]
    /// endpoint = "http://localhost:8000"
    /// "#;
    /// let config = VerdictConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.agent.endpoint.as_deref(), Some("http://localhost:8000"));
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, VerdictError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load from an explicit path, or from `.verdict.toml` in `dir` when it
    /// exists, or fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::Io`] if an explicit path cannot be read; a
    /// missing default file is not an error.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, VerdictError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let default_path = dir.join(CONFIG_FILE_NAME);
        if default_path.is_file() {
            Self::from_file(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Overlay values from the environment.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`; tests pass a map.
    /// Empty values are ignored.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `AGENT_URL` | `agent.endpoint` |
    /// | `AGENT_AUTH_TOKEN` | `agent.auth_token` |
    /// | `GITHUB_TOKEN`, then `GH_TOKEN` | `github.token` |
    /// | `GITHUB_API_URL` | `github.api_url` |
    ///
    /// # Examples
    ///
    /// ```
    /// use verdict_core::VerdictConfig;
    ///
    /// let config = VerdictConfig::default().with_env(|key| match key {
    ///     "AGENT_URL" => Some("http://agent:8000".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.agent.endpoint.as_deref(), Some("http://agent:8000"));
    /// ```
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("AGENT_URL") {
            self.agent.endpoint = Some(url);
        }
        if let Some(token) = get("AGENT_AUTH_TOKEN") {
            self.agent.auth_token = Some(token);
        }
        if let Some(token) = get("GITHUB_TOKEN").or_else(|| get("GH_TOKEN")) {
            self.github.token = Some(token);
        }
        if let Some(url) = get("GITHUB_API_URL") {
            self.github.api_url = Some(url);
        }
        self
    }

    /// Check that everything a run needs is present.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::Config`] naming the first missing value.
    pub fn validate(&self) -> Result<(), VerdictError> {
        self.agent.base_url()?;
        self.github.token()?;
        Ok(())
    }
}

/// Remote review agent configuration.
///
/// # Examples
///
/// ```
/// use verdict_core::AgentConfig;
///
/// let config = AgentConfig::default();
/// assert_eq!(config.user_id, "github-action");
/// assert!(config.strict_status);
/// assert!(config.auth_token().is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the agent server, e.g. `http://localhost:8000`.
    pub endpoint: Option<String>,
    /// Application name the agent serves (default: `"adk_agent"`).
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// User id sessions are created under (default: `"github-action"`).
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Value for the `x-agent-auth` header. Omitted from requests when unset.
    #[serde(default, skip_serializing)]
    pub auth_token: Option<String>,
    /// Treat a non-2xx `/run` response as a failure (default: `true`).
    #[serde(default = "default_strict_status")]
    pub strict_status: bool,
    /// Per-request timeout in seconds. Unset means the transport default.
    pub timeout_secs: Option<u64>,
}

fn default_app_name() -> String {
    "adk_agent".into()
}

fn default_user_id() -> String {
    "github-action".into()
}

fn default_strict_status() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            app_name: default_app_name(),
            user_id: default_user_id(),
            auth_token: None,
            strict_status: default_strict_status(),
            timeout_secs: None,
        }
    }
}

impl AgentConfig {
    /// The endpoint without a trailing slash.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::Config`] if no endpoint is configured.
    ///
    /// # Examples
    ///
    /// ```
    /// use verdict_core::AgentConfig;
    ///
    /// let config = AgentConfig {
    ///     endpoint: Some("http://localhost:8000/".into()),
    ///     ..AgentConfig::default()
    /// };
    /// assert_eq!(config.base_url().unwrap(), "http://localhost:8000");
    /// ```
    pub fn base_url(&self) -> Result<&str, VerdictError> {
        self.endpoint
            .as_deref()
            .map(|e| e.trim().trim_end_matches('/'))
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                VerdictError::Config(
                    "agent endpoint not set. Pass --agent-url, set AGENT_URL, or add [agent] endpoint to .verdict.toml".into(),
                )
            })
    }

    /// The auth token, if one is configured and non-empty.
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Code-hosting platform configuration.
///
/// # Examples
///
/// ```
/// use verdict_core::GitHubConfig;
///
/// let config = GitHubConfig::default();
/// assert!(config.api_url.is_none());
/// assert_eq!(config.page_size(), 100);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Access token. Normally supplied through `GITHUB_TOKEN`.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    /// API base URL for GitHub Enterprise (default: public GitHub).
    pub api_url: Option<String>,
    /// Page size for the changed-files listing (default: 100).
    #[serde(default = "default_per_page")]
    pub per_page: u8,
}

fn default_per_page() -> u8 {
    100
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: None,
            per_page: default_per_page(),
        }
    }
}

impl GitHubConfig {
    /// The access token.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::Config`] if no token is configured.
    pub fn token(&self) -> Result<&str, VerdictError> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                VerdictError::Config(
                    "GITHUB_TOKEN not set. Pass --github-token or set GITHUB_TOKEN env var".into(),
                )
            })
    }

    /// `per_page` clamped to the platform's accepted range.
    pub fn page_size(&self) -> u8 {
        self.per_page.clamp(1, 100)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = VerdictConfig::default();
        assert!(config.agent.endpoint.is_none());
        assert_eq!(config.agent.app_name, "adk_agent");
        assert_eq!(config.agent.user_id, "github-action");
        assert!(config.agent.strict_status);
        assert!(config.agent.timeout_secs.is_none());
        assert!(config.github.token.is_none());
        assert_eq!(config.github.per_page, 100);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[agent]
endpoint = "https://agent.internal:8443/"
app_name = "reviewer"
user_id = "ci-bot"
strict_status = false
timeout_secs = 300

[github]
api_url = "https://github.example.com/api/v3"
per_page = 50
"#;
        let config = VerdictConfig::from_toml(toml).unwrap();
        assert_eq!(config.agent.base_url().unwrap(), "https://agent.internal:8443");
        assert_eq!(config.agent.app_name, "reviewer");
        assert_eq!(config.agent.user_id, "ci-bot");
        assert!(!config.agent.strict_status);
        assert_eq!(config.agent.timeout_secs, Some(300));
        assert_eq!(
            config.github.api_url.as_deref(),
            Some("https://github.example.com/api/v3")
        );
        assert_eq!(config.github.page_size(), 50);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = VerdictConfig::from_toml("").unwrap();
        assert_eq!(config.agent.app_name, "adk_agent");
        assert_eq!(config.github.per_page, 100);
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = VerdictConfig::from_toml("{{invalid}}");
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let config = VerdictConfig::from_toml(
            r#"
[agent]
endpoint = "http://from-file:8000"
"#,
        )
        .unwrap()
        .with_env(env(&[
            ("AGENT_URL", "http://from-env:8000"),
            ("AGENT_AUTH_TOKEN", "s3cret"),
            ("GITHUB_TOKEN", "ghp_test"),
        ]));
        assert_eq!(config.agent.base_url().unwrap(), "http://from-env:8000");
        assert_eq!(config.agent.auth_token(), Some("s3cret"));
        assert_eq!(config.github.token().unwrap(), "ghp_test");
    }

    #[test]
    fn gh_token_is_a_fallback() {
        let config = VerdictConfig::default().with_env(env(&[("GH_TOKEN", "gho_x")]));
        assert_eq!(config.github.token().unwrap(), "gho_x");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let config = VerdictConfig::default().with_env(env(&[("AGENT_AUTH_TOKEN", "")]));
        assert!(config.agent.auth_token.is_none());
    }

    #[test]
    fn validate_requires_endpoint_and_token() {
        let config = VerdictConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("agent endpoint not set"));

        let config = config.with_env(env(&[("AGENT_URL", "http://localhost:8000")]));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("GITHUB_TOKEN"));

        let config = config.with_env(env(&[("GITHUB_TOKEN", "ghp_test")]));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn tokens_are_not_serialized() {
        let mut config = VerdictConfig::default();
        config.agent.auth_token = Some("s3cret".into());
        config.github.token = Some("ghp_test".into());
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("ghp_test"));
    }

    #[test]
    fn page_size_is_clamped() {
        let config = GitHubConfig {
            per_page: 0,
            ..GitHubConfig::default()
        };
        assert_eq!(config.page_size(), 1);
        let config = GitHubConfig {
            per_page: 250,
            ..GitHubConfig::default()
        };
        assert_eq!(config.page_size(), 100);
    }

    #[test]
    fn load_without_file_gives_defaults() {
        let dir = std::env::temp_dir().join("verdict-config-missing-dir-test");
        let config = VerdictConfig::load(None, &dir).unwrap();
        assert_eq!(config.agent.app_name, "adk_agent");
    }
}
