//! Login / signup form

use colored::Colorize;
use std::fmt;

use super::Effect;
use crate::api::AuthResponse;
use crate::error::AssistantError;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Credentials filled in by "Fill demo credentials"
pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_PASSWORD: &str = "password123";

/// Which auth endpoint the form submits to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Signup,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => write!(f, "login"),
            Self::Signup => write!(f, "signup"),
        }
    }
}

/// Events the auth form reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SetMode(AuthMode),
    EmailChanged(String),
    PasswordChanged(String),
    ConfirmChanged(String),
    FillDemo,
    Submit,
    Succeeded(AuthResponse),
    Failed(String),
}

/// State of the auth form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthView {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub confirm: String,
    /// Inline error (validation or backend message)
    pub error: Option<String>,
    /// Notice shown after a successful submit
    pub success: Option<String>,
    /// A request is in flight; further submits are ignored
    pub loading: bool,
}

impl AuthView {
    /// Empty login form
    pub fn new() -> Self {
        Self::default()
    }

    /// Client-side field checks, in display order
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Validation`] with the message to show inline
    pub fn validate(&self) -> Result<(), AssistantError> {
        if !self.email.contains('@') {
            return Err(AssistantError::Validation(
                "Enter a valid email".to_string(),
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AssistantError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.mode == AuthMode::Signup && self.password != self.confirm {
            return Err(AssistantError::Validation(
                "Passwords do not match".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply one event
    pub fn update(&mut self, event: AuthEvent) -> Option<Effect> {
        match event {
            AuthEvent::SetMode(mode) => {
                self.mode = mode;
                None
            }
            AuthEvent::EmailChanged(email) => {
                self.email = email;
                None
            }
            AuthEvent::PasswordChanged(password) => {
                self.password = password;
                None
            }
            AuthEvent::ConfirmChanged(confirm) => {
                self.confirm = confirm;
                None
            }
            AuthEvent::FillDemo => {
                self.email = DEMO_EMAIL.to_string();
                self.password = DEMO_PASSWORD.to_string();
                self.confirm = DEMO_PASSWORD.to_string();
                None
            }
            AuthEvent::Submit => self.submit(),
            AuthEvent::Succeeded(session) => {
                self.loading = false;
                self.success = Some(
                    match self.mode {
                        AuthMode::Signup => "Account created. Redirecting...",
                        AuthMode::Login => "Welcome back. Redirecting...",
                    }
                    .to_string(),
                );
                Some(Effect::StartSession(session))
            }
            AuthEvent::Failed(message) => {
                self.loading = false;
                self.error = Some(if message.is_empty() {
                    "Auth failed".to_string()
                } else {
                    message
                });
                None
            }
        }
    }

    fn submit(&mut self) -> Option<Effect> {
        if self.loading {
            return None;
        }
        self.error = None;
        self.success = None;

        if let Err(e) = self.validate() {
            self.error = Some(e.to_string());
            return None;
        }

        self.loading = true;
        Some(Effect::Authenticate {
            mode: self.mode,
            email: self.email.clone(),
            password: self.password.clone(),
        })
    }

    /// Title, status and inline messages
    pub fn render(&self) -> String {
        let mut out = format!("{}  {}\n", "DSA Assistant".bold(), "beta".green());
        out.push_str(match self.mode {
            AuthMode::Login => "Login to continue.\n",
            AuthMode::Signup => "Create an account to begin.\n",
        });
        if self.loading {
            out.push_str(&format!("{}\n", "Please wait...".dimmed()));
        }
        if let Some(error) = &self.error {
            out.push_str(&format!("{}\n", error.red()));
        }
        if let Some(success) = &self.success {
            out.push_str(&format!("{}\n", success.green()));
        }
        out
    }
}
