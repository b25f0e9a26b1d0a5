//! Session persistence
//!
//! A session is the bearer token and user identifier returned by the auth
//! endpoints. [`SessionStore`] is the only component that reads or writes
//! them; everything else asks it immediately before each request.

use crate::config::{SessionConfig, SessionLocation};
use crate::error::Result;
use std::sync::Arc;

pub mod store;
pub use store::{FileStore, KeyValueStore, KeyringStore, MemoryStore, KEYRING_SERVICE};

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "auth_token";

/// Storage key for the user identifier
pub const USER_ID_KEY: &str = "user_id";

/// Identity used for requests when nobody is logged in
pub const FALLBACK_USER_ID: &str = "demo_user";

/// An authenticated session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token issued by the backend
    pub token: String,
    /// Identifier the backend scopes chat history and revision data by
    pub user_id: String,
}

/// Reads and writes the session through an injected [`KeyValueStore`]
///
/// No validation of token shape or expiry is performed.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use dsa_assistant::session::{MemoryStore, SessionStore, FALLBACK_USER_ID};
///
/// let session = SessionStore::new(Arc::new(MemoryStore::new()));
/// assert_eq!(session.current_user_id().unwrap(), FALLBACK_USER_ID);
///
/// session.save("t1", "u1").unwrap();
/// assert_eq!(session.current_user_id().unwrap(), "u1");
/// ```
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a session store backed by `store`
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Open the store the configuration points at
    ///
    /// The OS keyring unless `session.path` names a file.
    pub fn open(config: &SessionConfig) -> Result<Self> {
        match config.location() {
            SessionLocation::Keyring => Ok(Self::new(Arc::new(KeyringStore::default()))),
            SessionLocation::File(path) => Self::open_file(path),
        }
    }

    /// Create a session store persisted to a JSON file at `path`
    ///
    /// # Errors
    ///
    /// Returns error if the file's directory cannot be created
    pub fn open_file<P: Into<std::path::PathBuf>>(path: P) -> Result<Self> {
        Ok(Self::new(Arc::new(FileStore::new(path)?)))
    }

    /// Persist a freshly issued session
    pub fn save(&self, token: &str, user_id: &str) -> Result<()> {
        self.store.set(TOKEN_KEY, token)?;
        self.store.set(USER_ID_KEY, user_id)?;
        tracing::debug!("Session saved for user {}", user_id);
        Ok(())
    }

    /// Identifier to stamp on outgoing requests
    ///
    /// Falls back to [`FALLBACK_USER_ID`] when no user is stored, so
    /// unauthenticated calls still run against a default identity.
    pub fn current_user_id(&self) -> Result<String> {
        Ok(self
            .store
            .get(USER_ID_KEY)?
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| FALLBACK_USER_ID.to_string()))
    }

    /// Stored bearer token, if any
    pub fn token(&self) -> Result<Option<String>> {
        Ok(self.store.get(TOKEN_KEY)?.filter(|t| !t.is_empty()))
    }

    /// The full session when both entries are present
    pub fn current(&self) -> Result<Option<Session>> {
        let token = self.token()?;
        let user_id = self.store.get(USER_ID_KEY)?;
        Ok(match (token, user_id) {
            (Some(token), Some(user_id)) => Some(Session { token, user_id }),
            _ => None,
        })
    }

    /// Whether a session token is present
    pub fn is_authenticated(&self) -> Result<bool> {
        Ok(self.token()?.is_some())
    }

    /// Remove both session entries
    pub fn clear(&self) -> Result<()> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(USER_ID_KEY)?;
        tracing::debug!("Session cleared");
        Ok(())
    }
}
