//! Session payload and the identity derived from it

use serde::{Deserialize, Serialize};

use super::user::{Role, User};
use crate::error::{AppError, AppResult};

/// What the server keeps for a logged-in browser session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub authenticated: bool,
    pub user_id: i32,
    pub username: String,
    pub role: Role,
}

impl SessionData {
    pub fn for_user(user: &User) -> Self {
        Self {
            authenticated: true,
            user_id: user.id,
            username: user.name.clone(),
            role: user.role,
        }
    }
}

/// Caller identity resolved from a session, passed to the operations it is allowed to reach
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i32,
    pub username: String,
    pub role: Role,
}

impl Identity {
    /// Resolve the caller from whatever session the request carried
    pub fn from_session(session: Option<SessionData>) -> AppResult<Self> {
        match session {
            Some(data) if data.authenticated => Ok(Self {
                user_id: data.user_id,
                username: data.username,
                role: data.role,
            }),
            _ => Err(AppError::Unauthenticated(
                "Not logged in, please log in first".to_string(),
            )),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Administrator privileges required".to_string()))
        }
    }
}
