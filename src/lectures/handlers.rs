use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{error, instrument, warn};

use super::{
    dto::{LectureForm, LectureView},
    services::{self, CatalogError},
};
use crate::{auth::extractors::AdminUser, photos::PhotoUpload, state::AppState};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/lectures", get(list_lectures))
        .route("/lectures/:id", get(get_lecture))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/lectures", post(create_lecture))
        .route("/admin/lectures/:id", put(update_lecture).delete(delete_lecture))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
}

fn rejection(e: CatalogError) -> (StatusCode, String) {
    match &e {
        CatalogError::StoreUnavailable(inner) => {
            error!(error = %inner, "catalog store failure");
            (e.status(), "Store unavailable".into())
        }
        CatalogError::Storage(inner) => {
            error!(error = %inner, "photo storage failure");
            (e.status(), "Photo storage unavailable".into())
        }
        _ => (e.status(), e.to_string()),
    }
}

/// Drain a multipart body into a `LectureForm`. An empty `offline_photo` part
/// (browsers send one when no file is picked) counts as no photo.
async fn read_form(mut mp: Multipart) -> Result<LectureForm, (StatusCode, String)> {
    // 400 for broken bodies, 413 once the body limit trips
    let bad = |e: MultipartError| {
        warn!(error = %e, "multipart body rejected");
        (e.status(), e.body_text())
    };

    let mut form = LectureForm::default();
    while let Some(field) = mp.next_field().await.map_err(bad)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if name == "offline_photo" {
            let content_type = field
                .content_type()
                .map(str::to_owned)
                .unwrap_or_else(|| "application/octet-stream".into());
            let body = field.bytes().await.map_err(bad)?;
            if !body.is_empty() {
                form.offline_photo = Some(PhotoUpload { body, content_type });
            }
        } else {
            let value = field.text().await.map_err(bad)?;
            form.set_text(&name, value);
        }
    }
    Ok(form)
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_lectures(
    State(state): State<AppState>,
) -> Result<Json<Vec<LectureView>>, (StatusCode, String)> {
    let lectures = services::list_lectures(&state).await.map_err(rejection)?;
    Ok(Json(lectures))
}

#[instrument(skip(state))]
pub async fn get_lecture(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LectureView>, (StatusCode, String)> {
    let lecture = services::get_lecture(&state, id).await.map_err(rejection)?;
    Ok(Json(lecture))
}

/// POST /admin/lectures (multipart)
#[instrument(skip(state, admin, mp), fields(admin = %admin.0.user_tg))]
pub async fn create_lecture(
    State(state): State<AppState>,
    admin: AdminUser,
    mp: Multipart,
) -> Result<(StatusCode, HeaderMap, Json<LectureView>), (StatusCode, String)> {
    let (draft, photo) = read_form(mp)
        .await?
        .into_draft()
        .map_err(|e| {
            warn!(error = %e, "invalid lecture");
            rejection(e)
        })?;

    let lecture = services::create_lecture(&state, draft, photo)
        .await
        .map_err(rejection)?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/lectures/{}", lecture.id).parse::<HeaderValue>() {
        headers.insert(axum::http::header::LOCATION, location);
    }

    Ok((StatusCode::CREATED, headers, Json(lecture)))
}

/// PUT /admin/lectures/:id (multipart, partial)
#[instrument(skip(state, admin, mp), fields(admin = %admin.0.user_tg))]
pub async fn update_lecture(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
    mp: Multipart,
) -> Result<Json<LectureView>, (StatusCode, String)> {
    let (patch, photo) = read_form(mp).await?.into_patch().map_err(rejection)?;
    let lecture = services::update_lecture(&state, id, patch, photo)
        .await
        .map_err(rejection)?;
    Ok(Json(lecture))
}

#[instrument(skip(state, admin), fields(admin = %admin.0.user_tg))]
pub async fn delete_lecture(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    services::delete_lecture(&state, id)
        .await
        .map_err(rejection)?;
    Ok(StatusCode::NO_CONTENT)
}
