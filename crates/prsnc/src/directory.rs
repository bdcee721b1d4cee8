//! User directory seam.
//!
//! The gateway does not own user storage. It resolves the subject id from a
//! verified token to a user record through [`UserDirectory`]; the shipped
//! implementation is a static table loaded from config, and deployments with
//! a real user store plug in their own.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::DirectoryUser;

/// A resolved user record.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub display_name: String,
    pub is_active: bool,
}

/// Directory lookup errors.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user not found")]
    NotFound,

    #[error("directory lookup failed: {0}")]
    Internal(String),
}

/// Resolves subject identifiers to user records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user_by_id(&self, id: &str) -> Result<UserRecord, DirectoryError>;
}

/// In-memory directory backed by the `[directory]` section of the config.
pub struct StaticDirectory {
    users: HashMap<String, UserRecord>,
}

impl StaticDirectory {
    pub fn new(users: &[DirectoryUser]) -> Self {
        let users = users
            .iter()
            .map(|u| {
                (
                    u.id.clone(),
                    UserRecord {
                        id: u.id.clone(),
                        display_name: u.display_name.clone(),
                        is_active: u.is_active,
                    },
                )
            })
            .collect();
        Self { users }
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn get_user_by_id(&self, id: &str) -> Result<UserRecord, DirectoryError> {
        self.users
            .get(id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }
}
