//! View state machines
//!
//! Each view is a plain struct updated by events. `update` never performs
//! I/O; it returns at most one [`Effect`] describing the request or
//! navigation the runtime should carry out, and the runtime feeds the
//! outcome back in as another event.

use crate::api::AuthResponse;
use crate::route::Route;

pub mod auth;
pub mod chat;
pub mod revise;

pub use auth::{AuthEvent, AuthMode, AuthView};
pub use chat::{ChatEvent, ChatMessage, ChatStatus, ChatView, Role};
pub use revise::{ReviseEvent, ReviseView};

/// Work a view asks the runtime to perform
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Call signup or login with validated credentials
    Authenticate {
        mode: AuthMode,
        email: String,
        password: String,
    },
    /// Persist the issued session, then show the chat
    StartSession(AuthResponse),
    /// Send one chat message
    SendChat(String),
    /// Load the revision topic list
    FetchTopics,
    /// Load the revision detail for one topic
    FetchTopicDetail(String),
    /// Switch to another view
    Navigate(Route),
    /// Drop the session and return to the auth view
    Logout,
}
