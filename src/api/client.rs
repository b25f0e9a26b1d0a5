//! HTTP client for the study assistant backend
//!
//! [`ApiClient`] builds every request against one configured base URL,
//! stamps the current session onto it, and hands it to
//! [`send_with_timeout`](super::request::send_with_timeout).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::request::send_with_timeout;
use super::types::{
    AuthRequest, AuthResponse, ChatReply, ChatRequest, TopicCard, TopicDetail, TopicsResponse,
};
use super::StudyBackend;
use crate::config::ApiConfig;
use crate::error::{AssistantError, Result};
use crate::session::SessionStore;

/// Backend client
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use dsa_assistant::api::{ApiClient, StudyBackend};
/// use dsa_assistant::config::ApiConfig;
/// use dsa_assistant::session::{MemoryStore, SessionStore};
///
/// # async fn example() -> dsa_assistant::error::Result<()> {
/// let session = SessionStore::new(Arc::new(MemoryStore::new()));
/// let client = ApiClient::new(&ApiConfig::default(), session)?;
/// let reply = client
///     .post_chat("what is a heap?", &CancellationToken::new())
///     .await?;
/// println!("{}", reply.reply);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: SessionStore,
    request_timeout: Duration,
    chat_timeout: Duration,
}

impl ApiClient {
    /// Create a client from the API configuration
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Config`] if the base URL does not parse or
    /// cannot carry a path
    pub fn new(config: &ApiConfig, session: SessionStore) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            AssistantError::Config(format!("Invalid base URL {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AssistantError::Config(format!(
                "Base URL cannot carry a path: {}",
                config.base_url
            ))
            .into());
        }

        let http = Client::builder()
            .user_agent(concat!("dsa-assistant/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AssistantError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            session,
            request_timeout: config.request_timeout(),
            chat_timeout: config.chat_timeout(),
        })
    }

    /// Base URL every endpoint is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Timeout for auth and revise requests
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Timeout for chat sends
    pub fn chat_timeout(&self) -> Duration {
        self.chat_timeout
    }

    /// Append path segments to the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AssistantError::Config(format!("Base URL cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach the bearer token, if a session exists
    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        Ok(match self.session.token()? {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn authenticate(
        &self,
        route: &str,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<AuthResponse> {
        let url = self.endpoint(&["auth", route])?;
        let request = self.http.post(url).json(&AuthRequest { email, password });
        let operation = format!("POST /auth/{}", route);
        let response: AuthResponse =
            send_with_timeout(request, &operation, self.request_timeout, cancel).await?;
        tracing::info!("Authenticated as {}", response.user_id);
        Ok(response)
    }
}

#[async_trait]
impl StudyBackend for ApiClient {
    async fn signup(
        &self,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<AuthResponse> {
        self.authenticate("signup", email, password, cancel).await
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<AuthResponse> {
        self.authenticate("login", email, password, cancel).await
    }

    async fn post_chat(&self, message: &str, cancel: &CancellationToken) -> Result<ChatReply> {
        let user_id = self.session.current_user_id()?;
        // Trailing empty segment keeps the backend's `/chat/` route.
        let url = self.endpoint(&["chat", ""])?;
        let request = self.authorize(self.http.post(url).json(&ChatRequest {
            user_id: &user_id,
            message,
        }))?;
        send_with_timeout(request, "POST /chat/", self.chat_timeout, cancel).await
    }

    async fn revise_topics(&self, cancel: &CancellationToken) -> Result<Vec<TopicCard>> {
        let user_id = self.session.current_user_id()?;
        let url = self.endpoint(&["revise", "topics"])?;
        let request = self.authorize(self.http.get(url).query(&[("user_id", &user_id)]))?;
        let response: TopicsResponse = send_with_timeout(
            request,
            "GET /revise/topics",
            self.request_timeout,
            cancel,
        )
        .await?;
        Ok(response.topics)
    }

    async fn revise_topic_detail(
        &self,
        topic: &str,
        cancel: &CancellationToken,
    ) -> Result<TopicDetail> {
        let user_id = self.session.current_user_id()?;
        let url = self.endpoint(&["revise", "topic", topic])?;
        let request = self.authorize(self.http.get(url).query(&[("user_id", &user_id)]))?;
        let operation = format!("GET /revise/topic/{}", topic);
        send_with_timeout(request, &operation, self.request_timeout, cancel).await
    }
}
