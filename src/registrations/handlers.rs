use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{error, instrument, warn};

use super::{
    ledger::{self, LedgerError},
    repo::Registration,
};
use crate::{auth::extractors::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct RegistrationStatus {
    pub lecture_id: i64,
    pub registered: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/lectures/:id/registrations", post(register))
        .route("/lectures/:id/registration", get(status))
}

/// The caller's own account vanishing is an auth problem, not a missing resource.
fn rejection(e: LedgerError) -> (StatusCode, String) {
    match &e {
        LedgerError::StoreUnavailable(inner) => {
            error!(error = %inner, "ledger store failure");
            (e.status(), "Store unavailable".into())
        }
        LedgerError::UserNotFound => (StatusCode::UNAUTHORIZED, e.to_string()),
        _ => (e.status(), e.to_string()),
    }
}

/// POST /lectures/:id/registrations
#[instrument(skip(state))]
pub async fn register(
    State(state): State<AppState>,
    AuthUser(user_tg): AuthUser,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<Registration>), (StatusCode, String)> {
    match ledger::register_user(&state.db, id, &user_tg).await {
        Ok(registration) => Ok((StatusCode::CREATED, Json(registration))),
        Err(e) => {
            warn!(error = %e, lecture_id = id, %user_tg, "registration refused");
            Err(rejection(e))
        }
    }
}

/// GET /lectures/:id/registration
#[instrument(skip(state))]
pub async fn status(
    State(state): State<AppState>,
    AuthUser(user_tg): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<RegistrationStatus>, (StatusCode, String)> {
    let registered = ledger::is_registered(&state.db, id, &user_tg)
        .await
        .map_err(rejection)?;
    Ok(Json(RegistrationStatus {
        lecture_id: id,
        registered,
    }))
}
