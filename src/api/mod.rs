//! Backend access layer
//!
//! This module provides the abstraction over the study assistant's REST
//! surface ([`StudyBackend`]), its HTTP implementation ([`ApiClient`]),
//! the wire types, and the timeout-aware request helper every call shares.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

pub mod client;
pub mod request;
pub mod types;

pub use client::ApiClient;
pub use request::send_with_timeout;
pub use types::{
    AuthResponse, ChatReply, MistakeCount, RecentExchange, RecordId, TopicCard, TopicDetail,
};

/// Operations the study assistant backend offers
///
/// Implementations read the session immediately before each request and
/// never retry; every failure is final for that call.
#[async_trait]
pub trait StudyBackend: Send + Sync {
    /// Create an account (`POST /auth/signup`)
    async fn signup(
        &self,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<AuthResponse>;

    /// Log in (`POST /auth/login`)
    async fn login(
        &self,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<AuthResponse>;

    /// Ask a question (`POST /chat/`)
    async fn post_chat(&self, message: &str, cancel: &CancellationToken) -> Result<ChatReply>;

    /// List revision topics for the current user (`GET /revise/topics`)
    async fn revise_topics(&self, cancel: &CancellationToken) -> Result<Vec<TopicCard>>;

    /// Fetch the revision detail for one topic (`GET /revise/topic/{topic}`)
    async fn revise_topic_detail(
        &self,
        topic: &str,
        cancel: &CancellationToken,
    ) -> Result<TopicDetail>;
}
