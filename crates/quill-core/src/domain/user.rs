use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity - profile data kept alongside the identity-provider account.
///
/// `id` is the provider's subject id (`localId`); credentials never live here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub username: Option<String>,
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a user record for a freshly registered subject id.
    /// `created_at` is assigned by the store on save.
    pub fn new(id: impl Into<String>, email: impl Into<String>, username: Option<String>) -> Self {
        Self {
            id: id.into(),
            username,
            email: email.into(),
            created_at: None,
        }
    }
}
