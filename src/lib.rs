//! DSA Assistant - chat-based study assistant client library
//!
//! This library provides the client side of the DSA study assistant: the
//! HTTP client for the backend API, session persistence, the route guard,
//! and the view state machines the CLI drives.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: Backend client, request timeout/cancellation wrapper and wire types
//! - `session`: Persisted auth token and user id behind a key-value store
//! - `route`: Views and the guard that keeps protected views behind a session
//! - `views`: Auth, chat and revise state machines
//! - `app`: Runtime that executes view effects against the backend
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use dsa_assistant::{commands, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let app = commands::build_app(&config)?;
//!     println!("Starting on {}", app.route());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod route;
pub mod session;
pub mod views;

// Re-export commonly used types
pub use api::{ApiClient, StudyBackend};
pub use app::App;
pub use config::Config;
pub use error::{AssistantError, Result};
pub use route::Route;
pub use session::SessionStore;
