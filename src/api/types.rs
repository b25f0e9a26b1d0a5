//! Wire types for the study assistant backend
//!
//! Field names follow the backend's JSON exactly (`user_id`, `created_at`,
//! ...), so no serde renames are needed.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /auth/signup` and `POST /auth/login`
#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Session issued by the auth endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token
    pub token: String,
    /// Identifier that scopes chat and revise data
    pub user_id: String,
}

/// Body of `POST /chat/`
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub user_id: &'a str,
    pub message: &'a str,
}

/// Assistant answer to one chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Answer text shown to the user
    pub reply: String,
    /// Topic the backend classified the question under
    pub topic: String,
    /// Updated confidence for that topic, in `[0, 1]`
    pub confidence: f64,
}

/// One entry of the revision topic listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCard {
    pub topic: String,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
}

impl TopicCard {
    /// Confidence as a whole percentage, clamped to `0..=100`
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

/// Response of `GET /revise/topics`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicsResponse {
    #[serde(default)]
    pub topics: Vec<TopicCard>,
}

/// Identifier of a stored exchange; the backend sends integers today
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A past question and the explanation given for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentExchange {
    pub id: RecordId,
    /// ISO-8601 timestamp as sent by the backend (usually without offset)
    pub created_at: String,
    pub user_input: String,
    pub response: String,
}

impl RecentExchange {
    /// `created_at` formatted as `YYYY-MM-DD HH:MM`, or verbatim when it
    /// does not parse
    pub fn created_at_display(&self) -> String {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&self.created_at) {
            return ts.format("%Y-%m-%d %H:%M").to_string();
        }
        if let Ok(ts) = NaiveDateTime::parse_from_str(&self.created_at, "%Y-%m-%dT%H:%M:%S%.f") {
            return ts.format("%Y-%m-%d %H:%M").to_string();
        }
        self.created_at.clone()
    }
}

/// A recurring mistake and how often it was recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MistakeCount {
    pub mistake: String,
    pub frequency: u32,
}

/// Response of `GET /revise/topic/{topic}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicDetail {
    pub topic: String,
    /// Most recent first
    #[serde(default)]
    pub recents: Vec<RecentExchange>,
    /// Most frequent first
    #[serde(default)]
    pub mistakes: Vec<MistakeCount>,
}
