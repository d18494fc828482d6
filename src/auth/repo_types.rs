use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub user_name: String,   // display name, "first last"
    pub user_tg: String,     // stable external id, unique
    pub username_tg: String, // handle, unique
    pub is_admin: bool,
    pub score: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Identity fields supplied on authentication.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_name: String,
    pub user_tg: String,
    pub username_tg: String,
}
