//! identity handed over by the external authentication service.
//!
//! token introspection happens outside this crate; operations only ever see
//! the verified user id.

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// verified caller identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
}

impl AuthenticatedUser {
    pub fn new(id: UserId) -> Self {
        Self { id }
    }
}

impl From<UserId> for AuthenticatedUser {
    fn from(id: UserId) -> Self {
        Self::new(id)
    }
}

/// identity details mirrored from the auth service, used in read projections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    /// national taxpayer document
    pub document: String,
}

impl UserProfile {
    pub fn new(user_id: UserId, name: impl Into<String>, email: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            email: email.into(),
            document: document.into(),
        }
    }

    pub fn identity(&self) -> AuthenticatedUser {
        AuthenticatedUser::new(self.user_id)
    }
}
