//! Auth collaborator: who is signed in, and what that means for persistence.
//!
//! A signed-in user persists through the document store; without one the
//! editor keeps working in local-only mode.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::info;

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("user id must not be blank")]
    BlankUser,
    #[error("sign-in refused for {0}")]
    Refused(String),
    #[error("auth state unavailable")]
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

impl User {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self { display_name: id.clone(), id }
    }
}

/// Where edits end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    /// Signed in: writes go to the document store under this user.
    Remote(User),
    /// Nobody signed in: edits stay in memory / on local disk.
    LocalOnly,
}

impl PersistenceMode {
    #[must_use]
    pub fn from_user(user: Option<User>) -> Self {
        user.map_or(Self::LocalOnly, Self::Remote)
    }

    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<User>;

    /// # Errors
    ///
    /// Returns an [`AuthError`] if the identity is rejected.
    fn sign_in(&self, user_id: &str) -> Result<User, AuthError>;

    fn sign_out(&self);

    fn persistence_mode(&self) -> PersistenceMode {
        PersistenceMode::from_user(self.current_user())
    }
}

/// Auth over a fixed allow-list of identities. With an empty list any
/// non-blank id may sign in.
#[derive(Default)]
pub struct StaticAuth {
    allowed: Vec<String>,
    current: RwLock<Option<User>>,
}

impl StaticAuth {
    #[must_use]
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed, current: RwLock::new(None) }
    }

    /// Already signed in as `user_id`.
    #[must_use]
    pub fn signed_in(user_id: &str) -> Self {
        Self { allowed: Vec::new(), current: RwLock::new(Some(User::new(user_id))) }
    }
}

impl AuthProvider for StaticAuth {
    fn current_user(&self) -> Option<User> {
        self.current.read().ok().and_then(|guard| guard.clone())
    }

    fn sign_in(&self, user_id: &str) -> Result<User, AuthError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AuthError::BlankUser);
        }
        if !self.allowed.is_empty() && !self.allowed.iter().any(|a| a == user_id) {
            return Err(AuthError::Refused(user_id.to_string()));
        }
        let user = User::new(user_id);
        let mut current = self.current.write().map_err(|_| AuthError::Unavailable)?;
        *current = Some(user.clone());
        info!(user = %user.id, "signed in");
        Ok(user)
    }

    fn sign_out(&self) {
        if let Ok(mut current) = self.current.write() {
            if let Some(user) = current.take() {
                info!(user = %user.id, "signed out");
            }
        }
    }
}
