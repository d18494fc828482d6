use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use tracing::{error, warn};

use super::{claims::TokenKind, jwt::JwtKeys, repo_types::User};
use crate::state::AppState;

/// Extracts and validates an access token, yielding the caller's `user_tg`.
pub struct AuthUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header".to_string(),
            ))?;

        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(_) => {
                warn!("invalid or expired token");
                return Err((
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                ));
            }
        };

        if claims.kind != TokenKind::Access {
            return Err((
                StatusCode::UNAUTHORIZED,
                "Access token required".to_string(),
            ));
        }

        Ok(AuthUser(claims.sub))
    }
}

/// An authenticated caller whose account carries the admin flag.
///
/// The flag is read from the database on every request, so revoking it takes effect
/// without waiting for tokens to expire.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_tg) = AuthUser::from_request_parts(parts, state).await?;

        let user = match User::find_by_user_tg(&state.db, &user_tg).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                warn!(%user_tg, "token for unknown user");
                return Err((StatusCode::UNAUTHORIZED, "User not found".into()));
            }
            Err(e) => {
                error!(error = %e, %user_tg, "admin lookup failed");
                return Err((StatusCode::SERVICE_UNAVAILABLE, "Store unavailable".into()));
            }
        };

        if !user.is_admin {
            warn!(%user_tg, "admin route refused");
            return Err((StatusCode::FORBIDDEN, "Admin rights required".into()));
        }

        Ok(AdminUser(user))
    }
}
