//! Views and the guard that decides which one may be shown

use std::fmt;

/// A navigable view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Login / signup form (`/auth`)
    Auth,
    /// Chat with the assistant (`/`)
    Chat,
    /// Topic revision (`/revise`)
    Revise,
}

impl Route {
    /// Resolve a path; unknown paths land on the chat view
    ///
    /// # Examples
    ///
    /// ```
    /// use dsa_assistant::route::Route;
    ///
    /// assert_eq!(Route::from_path("/revise"), Route::Revise);
    /// assert_eq!(Route::from_path("/nowhere"), Route::Chat);
    /// ```
    pub fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "/auth" | "auth" => Self::Auth,
            "/revise" | "revise" => Self::Revise,
            _ => Self::Chat,
        }
    }

    /// Canonical path of the view
    pub fn path(&self) -> &'static str {
        match self {
            Self::Auth => "/auth",
            Self::Chat => "/",
            Self::Revise => "/revise",
        }
    }

    /// Whether the view needs a session
    pub fn is_protected(&self) -> bool {
        !matches!(self, Self::Auth)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Decide which view to show for a navigation
///
/// Protected views redirect to [`Route::Auth`] when no session is present.
/// Stateless; call it on every navigation.
pub fn guard(requested: Route, session_present: bool) -> Route {
    if requested.is_protected() && !session_present {
        tracing::debug!("No session, redirecting {} to {}", requested, Route::Auth);
        Route::Auth
    } else {
        requested
    }
}
