use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::users::repo_types::User;

/// User projection returned to clients. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub department: Option<String>,
    pub title: Option<String>,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            department: u.department,
            title: u.title,
            active: u.active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Partial update: `None` fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub department: Option<String>,
    pub title: Option<String>,
    pub active: Option<bool>,
}

/// Query string filters for the user listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub department: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub message: String,
}
