//! Chat transcript and composer
//!
//! The view is either idle or awaiting exactly one reply. Messages are
//! append-only and live only as long as the view.

use colored::Colorize;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Effect;
use crate::api::ChatReply;
use crate::route::Route;

/// First message of every chat
pub const GREETING: &str =
    "Ask a DSA question. I'll answer with intuition + mistakes + testcases.";

/// Assistant text shown when a send fails for any reason
pub const FALLBACK_REPLY: &str = "Backend error. Is the backend running?";

/// Placeholder rendered while a reply is pending
pub const THINKING: &str = "Thinking...";

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Opaque unique id
    pub id: String,
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
        }
    }

    /// Message typed by the user
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Message produced by the assistant
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

/// Whether a reply is pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatStatus {
    #[default]
    Idle,
    AwaitingResponse,
}

/// Events the chat view reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// Replace the composer contents
    InputChanged(String),
    /// Enter pressed; `modified` is true when Shift (or similar) was held
    KeyEnter { modified: bool },
    /// Send button pressed
    SendClicked,
    /// Backend answered the pending message
    ReplyReceived(ChatReply),
    /// The pending send failed; carries the underlying error text
    RequestFailed(String),
    OpenRevise,
    Logout,
}

/// State of the chat view
#[derive(Debug, Clone, PartialEq)]
pub struct ChatView {
    messages: Vec<ChatMessage>,
    /// Composer contents
    pub input: String,
    status: ChatStatus,
}

impl Default for ChatView {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatView {
    /// Fresh view holding only the greeting
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(GREETING)],
            input: String::new(),
            status: ChatStatus::Idle,
        }
    }

    /// Transcript, oldest first
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn status(&self) -> ChatStatus {
        self.status
    }

    /// Whether the composer accepts input
    pub fn is_input_enabled(&self) -> bool {
        self.status == ChatStatus::Idle
    }

    /// Whether the send control is active
    pub fn can_send(&self) -> bool {
        self.is_input_enabled() && !self.input.trim().is_empty()
    }

    /// Whether the user has asked anything yet
    pub fn has_history(&self) -> bool {
        self.messages.iter().any(|m| m.role == Role::User)
    }

    /// Apply one event
    pub fn update(&mut self, event: ChatEvent) -> Option<Effect> {
        match event {
            ChatEvent::InputChanged(text) => {
                if self.is_input_enabled() {
                    self.input = text;
                }
                None
            }
            ChatEvent::KeyEnter { modified: true } => {
                if self.is_input_enabled() {
                    self.input.push('\n');
                }
                None
            }
            ChatEvent::KeyEnter { modified: false } | ChatEvent::SendClicked => self.submit(),
            ChatEvent::ReplyReceived(reply) => {
                if self.status == ChatStatus::AwaitingResponse {
                    self.messages.push(ChatMessage::assistant(reply.reply));
                    self.status = ChatStatus::Idle;
                }
                None
            }
            ChatEvent::RequestFailed(error) => {
                if self.status == ChatStatus::AwaitingResponse {
                    tracing::warn!("Chat request failed: {}", error);
                    self.messages.push(ChatMessage::assistant(FALLBACK_REPLY));
                    self.status = ChatStatus::Idle;
                }
                None
            }
            ChatEvent::OpenRevise => Some(Effect::Navigate(Route::Revise)),
            ChatEvent::Logout => Some(Effect::Logout),
        }
    }

    fn submit(&mut self) -> Option<Effect> {
        if self.status != ChatStatus::Idle {
            return None;
        }
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return None;
        }

        self.messages.push(ChatMessage::user(text.clone()));
        self.input.clear();
        self.status = ChatStatus::AwaitingResponse;
        Some(Effect::SendChat(text))
    }

    /// Full transcript, plus the placeholder while a reply is pending
    pub fn render(&self) -> String {
        let mut out: String = self.messages.iter().map(render_message).collect();
        if self.status == ChatStatus::AwaitingResponse {
            out.push_str(&format!("{} {}\n", "assistant>".cyan(), THINKING.dimmed()));
        }
        out
    }

    /// Messages appended after the first `seen`, rendered
    pub fn render_since(&self, seen: usize) -> String {
        self.messages
            .iter()
            .skip(seen)
            .map(render_message)
            .collect()
    }
}

/// One transcript line, continuation lines indented under the label
pub fn render_message(message: &ChatMessage) -> String {
    let label = match message.role {
        Role::User => "you>".bold().to_string(),
        Role::Assistant => "assistant>".cyan().to_string(),
    };
    let mut lines = message.text.lines();
    let mut out = format!("{} {}\n", label, lines.next().unwrap_or_default());
    for line in lines {
        out.push_str(&format!("    {}\n", line));
    }
    out
}
