use serde::{Deserialize, Serialize};

use crate::auth::repo_types::User;

/// Request body for authentication (find-or-create).
#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub first_name: String,
    pub last_name: String,
    pub user_tg: String,
    pub username_tg: String,
    /// Raw `Telegram.WebApp.initData`; required once a bot token is configured.
    #[serde(default)]
    pub init_data: Option<String>,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response returned after authentication or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub is_admin: bool,
    pub user_tg: String,
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub user_name: String,
    pub user_tg: String,
    pub username_tg: String,
    pub is_admin: bool,
    pub score: f64,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            user_name: u.user_name,
            user_tg: u.user_tg,
            username_tg: u.username_tg,
            is_admin: u.is_admin,
            score: u.score,
        }
    }
}
