use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::{debug, info, warn};
use verdict_core::{AgentConfig, SessionIdentity, VerdictError};

use crate::payload::ReviewPayload;
use crate::response::{truncate_chars, AgentResponse, SNAPSHOT_CHARS};

/// Header carrying the agent auth token.
pub const AUTH_HEADER: &str = "x-agent-auth";

/// Characters left unescaped in a path segment, matching JavaScript's
/// `encodeURIComponent`.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A part of a message sent to the agent.
#[derive(Debug, Clone, Serialize)]
pub struct Part<'a> {
    pub text: &'a str,
}

/// The user turn carried by a run request.
#[derive(Debug, Clone, Serialize)]
pub struct NewMessage<'a> {
    pub role: &'static str,
    pub parts: Vec<Part<'a>>,
}

/// Body of `POST {endpoint}/run`.
///
/// # Examples
///
/// ```
/// use verdict_core::SessionIdentity;
/// use verdict_review::agent::RunRequest;
///
/// let session = SessionIdentity::for_pull_request("adk_agent", "github-action", 42);
/// let body = serde_json::to_value(RunRequest::new(&session, "diff")).unwrap();
/// assert_eq!(body["sessionId"], "pr-42");
/// assert_eq!(body["newMessage"]["role"], "user");
/// assert_eq!(body["newMessage"]["parts"][0]["text"], "diff");
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest<'a> {
    #[serde(flatten)]
    pub session: &'a SessionIdentity,
    pub new_message: NewMessage<'a>,
}

impl<'a> RunRequest<'a> {
    pub fn new(session: &'a SessionIdentity, text: &'a str) -> Self {
        Self {
            session,
            new_message: NewMessage {
                role: "user",
                parts: vec![Part { text }],
            },
        }
    }
}

/// HTTP client for the review agent's session protocol.
///
/// A review is two requests: create (or reuse) the session, then run the
/// agent inside it. The order is carried by the types: [`PendingSession`]
/// can only [`establish`](PendingSession::establish), and only an
/// [`EstablishedSession`] can [`run`](EstablishedSession::run).
///
/// # Examples
///
/// ```
/// use verdict_core::AgentConfig;
/// use verdict_review::agent::AgentClient;
///
/// let config = AgentConfig {
///     endpoint: Some("http://localhost:8000/".into()),
///     ..AgentConfig::default()
/// };
/// let client = AgentClient::new(&config).unwrap();
/// let session = client.session(42);
/// assert_eq!(
///     session.url(),
///     "http://localhost:8000/apps/adk_agent/users/github-action/sessions/pr-42"
/// );
/// ```
pub struct AgentClient {
    http: reqwest::Client,
    base_url: String,
    app_name: String,
    user_id: String,
    auth_token: Option<String>,
    strict_status: bool,
}

impl AgentClient {
    /// Create a client from agent configuration.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::Config`] if no endpoint is configured, or
    /// [`VerdictError::AgentTransport`] if the HTTP client cannot be built.
    pub fn new(config: &AgentConfig) -> Result<Self, VerdictError> {
        let base_url = config.base_url()?.to_string();

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(|e| {
            VerdictError::AgentTransport(format!("failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            http,
            base_url,
            app_name: config.app_name.clone(),
            user_id: config.user_id.clone(),
            auth_token: config.auth_token().map(str::to_string),
            strict_status: config.strict_status,
        })
    }

    /// Start the protocol for a pull request. No request is sent yet.
    pub fn session(&self, pr_number: u64) -> PendingSession<'_> {
        PendingSession {
            client: self,
            identity: SessionIdentity::for_pull_request(
                self.app_name.clone(),
                self.user_id.clone(),
                pr_number,
            ),
        }
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = &self.auth_token {
            request = request.header(AUTH_HEADER, token);
        }
        request
    }
}

/// A session that has not been created on the agent yet.
pub struct PendingSession<'a> {
    client: &'a AgentClient,
    identity: SessionIdentity,
}

impl<'a> PendingSession<'a> {
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// `{endpoint}/apps/{app}/users/{user}/sessions/{session}`.
    pub fn url(&self) -> String {
        format!(
            "{}/apps/{}/users/{}/sessions/{}",
            self.client.base_url,
            utf8_percent_encode(&self.identity.app_name, PATH_SEGMENT),
            utf8_percent_encode(&self.identity.user_id, PATH_SEGMENT),
            utf8_percent_encode(&self.identity.session_id, PATH_SEGMENT),
        )
    }

    /// Create the session, or reuse it if the agent already has it.
    ///
    /// Any HTTP status counts as success: an agent that already holds this
    /// session answers with an error status, and re-running a review for the
    /// same PR must still work.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::AgentTransport`] if the request cannot be sent
    /// or its body cannot be read.
    pub async fn establish(self) -> Result<EstablishedSession<'a>, VerdictError> {
        let url = self.url();
        info!(session = %self.identity.session_id, "creating agent session");
        debug!(%url, "POST session");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| VerdictError::AgentTransport(format!("session request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            VerdictError::AgentTransport(format!("failed to read session response: {e}"))
        })?;
        if status.is_success() {
            debug!(%status, "session created");
        } else {
            warn!(
                %status,
                body = %truncate_chars(&body, 200),
                "session creation returned an error status; continuing with existing session"
            );
        }

        Ok(EstablishedSession {
            client: self.client,
            identity: self.identity,
        })
    }
}

/// A session known to the agent, ready for the run request.
pub struct EstablishedSession<'a> {
    client: &'a AgentClient,
    identity: SessionIdentity,
}

impl EstablishedSession<'_> {
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Send the payload to `{endpoint}/run` and classify the reply.
    ///
    /// # Errors
    ///
    /// Returns [`VerdictError::AgentTransport`] if the request fails, or, with
    /// `strict_status` enabled, if the agent answers with a non-2xx status.
    pub async fn run(self, payload: &ReviewPayload) -> Result<RunComplete, VerdictError> {
        let url = format!("{}/run", self.client.base_url);
        info!(bytes = payload.len(), "calling agent /run");
        debug!(%url, "POST run");

        let request = RunRequest::new(&self.identity, payload.as_str());
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| VerdictError::AgentTransport(format!("run request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            VerdictError::AgentTransport(format!("failed to read run response: {e}"))
        })?;

        if !status.is_success() {
            if self.client.strict_status {
                return Err(VerdictError::AgentTransport(format!(
                    "agent /run returned {status}: {}",
                    truncate_chars(&body, SNAPSHOT_CHARS)
                )));
            }
            warn!(%status, "agent /run returned an error status; using body as-is");
        }

        Ok(RunComplete {
            identity: self.identity,
            status: status.as_u16(),
            response: AgentResponse::from_body(&body),
        })
    }
}

/// The finished exchange.
#[derive(Debug, Clone)]
pub struct RunComplete {
    /// Session the run happened in.
    pub identity: SessionIdentity,
    /// HTTP status of the `/run` reply.
    pub status: u16,
    /// The classified reply.
    pub response: AgentResponse,
}
