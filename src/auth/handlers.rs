use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, instrument, warn};

use crate::{
    auth::{
        dto::{AuthRequest, AuthResponse, PublicUser, RefreshRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        repo_types::User,
        services::{authenticate, verify_login},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn issue_pair(keys: &JwtKeys, user: User) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let access_token = keys.sign_access(&user.user_tg).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    let refresh_token = keys.sign_refresh(&user.user_tg).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(AuthResponse {
        is_admin: user.is_admin,
        user_tg: user.user_tg.clone(),
        access_token,
        refresh_token,
        user: PublicUser::from(user),
    }))
}

/// POST /auth: find-or-create the caller and hand out a token pair.
#[instrument(skip(state, payload), fields(user_tg = %payload.user_tg))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<AuthRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    verify_login(&state.config.telegram, &payload, OffsetDateTime::now_utc()).map_err(|e| {
        warn!(error = %e, "telegram login not verified");
        (e.status(), e.to_string())
    })?;

    let user = authenticate(&state.db, &payload).await.map_err(|e| {
        warn!(error = %e, "authentication refused");
        (e.status(), e.to_string())
    })?;

    let keys = JwtKeys::from_ref(&state);
    issue_pair(&keys, user)
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, format!("{}", e)))?;

    let user = load_user(&state, &claims.sub).await?;
    issue_pair(&keys, user)
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_tg): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = load_user(&state, &user_tg).await?;
    Ok(Json(PublicUser::from(user)))
}

async fn load_user(state: &AppState, user_tg: &str) -> Result<User, (StatusCode, String)> {
    match User::find_by_user_tg(&state.db, user_tg).await {
        Ok(Some(u)) => Ok(u),
        Ok(None) => {
            warn!(%user_tg, "user not found");
            Err((StatusCode::UNAUTHORIZED, "User not found".into()))
        }
        Err(e) => {
            error!(error = %e, %user_tg, "user lookup failed");
            Err((StatusCode::SERVICE_UNAVAILABLE, "Store unavailable".into()))
        }
    }
}
