use axum::http::StatusCode;
use thiserror::Error;
use tracing::{info, warn};

use super::{
    dto::LectureView,
    repo,
    repo_types::{LectureDraft, LecturePatch, LectureWithSeats},
};
use crate::{
    photos::{
        services::{discard_photo, photo_key, presign_photo, upload_photo},
        PhotoUpload,
    },
    registrations::{ledger, repo as registrations_repo, LedgerError},
    state::AppState,
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("lecture not found")]
    NotFound,
    #[error("{0}")]
    InvalidInput(String),
    #[error("max_seats {requested} is below the {registered} existing registrations")]
    CapacityBelowRegistrations { registered: i64, requested: i32 },
    #[error("photo storage failed: {0:#}")]
    Storage(anyhow::Error),
    #[error("store unavailable: {0}")]
    StoreUnavailable(sqlx::Error),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) if db.is_check_violation() => {
                CatalogError::InvalidInput("lecture violates a schema constraint".into())
            }
            other => CatalogError::StoreUnavailable(other),
        }
    }
}

impl From<LedgerError> for CatalogError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::LectureNotFound => CatalogError::NotFound,
            LedgerError::StoreUnavailable(inner) => CatalogError::StoreUnavailable(inner),
            other => CatalogError::InvalidInput(other.to_string()),
        }
    }
}

impl CatalogError {
    pub fn status(&self) -> StatusCode {
        match self {
            CatalogError::NotFound => StatusCode::NOT_FOUND,
            CatalogError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CatalogError::CapacityBelowRegistrations { .. } => StatusCode::CONFLICT,
            CatalogError::Storage(_) | CatalogError::StoreUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

async fn to_view(st: &AppState, l: LectureWithSeats) -> Result<LectureView, CatalogError> {
    let offline_photo = match l.photo_key.as_deref() {
        Some(key) => Some(presign_photo(st, key).await.map_err(CatalogError::Storage)?),
        None => None,
    };
    Ok(LectureView {
        id: l.id,
        title: l.title,
        speaker: l.speaker,
        date: l.date,
        end_time: l.end_time,
        max_seats: l.max_seats,
        remaining_seats: l.remaining_seats,
        format: l.format,
        conference_link: l.conference_link,
        offline_map_link: l.offline_map_link,
        offline_photo,
    })
}

pub async fn list_lectures(st: &AppState) -> Result<Vec<LectureView>, CatalogError> {
    let rows = ledger::list_lectures_with_remaining_seats(&st.db).await?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(to_view(st, row).await?);
    }
    Ok(out)
}

pub async fn get_lecture(st: &AppState, id: i64) -> Result<LectureView, CatalogError> {
    let row = repo::get_with_seats(&st.db, id)
        .await?
        .ok_or(CatalogError::NotFound)?;
    to_view(st, row).await
}

/// Upload the photo, if any, under a fresh key.
async fn stage_photo(
    st: &AppState,
    photo: Option<PhotoUpload>,
) -> Result<Option<String>, CatalogError> {
    let Some(photo) = photo else {
        return Ok(None);
    };
    let key = photo_key(&photo.content_type).ok_or_else(|| {
        CatalogError::InvalidInput(format!("unsupported photo type {}", photo.content_type))
    })?;
    upload_photo(st, &key, photo)
        .await
        .map_err(CatalogError::Storage)?;
    Ok(Some(key))
}

pub async fn create_lecture(
    st: &AppState,
    draft: LectureDraft,
    photo: Option<PhotoUpload>,
) -> Result<LectureView, CatalogError> {
    let key = stage_photo(st, photo).await?;

    let lecture = match repo::insert(&st.db, &draft, key.as_deref()).await {
        Ok(l) => l,
        Err(e) => {
            if let Some(k) = &key {
                discard_photo(st, k).await;
            }
            return Err(e.into());
        }
    };

    info!(lecture_id = lecture.id, title = %lecture.title, max_seats = lecture.max_seats, "lecture created");
    to_view(st, LectureWithSeats::fresh(lecture)).await
}

/// Row-locked update. Returns the photo key that the update replaced, if any.
async fn apply_update(
    st: &AppState,
    id: i64,
    patch: &LecturePatch,
    new_key: Option<&str>,
) -> Result<Option<String>, CatalogError> {
    let mut tx = st.db.begin().await?;

    let locked = repo::lock_for_update(&mut *tx, id)
        .await?
        .ok_or(CatalogError::NotFound)?;

    if let Some(requested) = patch.max_seats {
        let registered = registrations_repo::count_for_lecture(&mut *tx, id).await?;
        if i64::from(requested) < registered {
            return Err(CatalogError::CapacityBelowRegistrations {
                registered,
                requested,
            });
        }
    }

    repo::update(&mut *tx, id, patch, new_key)
        .await?
        .ok_or(CatalogError::NotFound)?;
    tx.commit().await?;

    Ok(match new_key {
        Some(_) => locked.photo_key,
        None => None,
    })
}

pub async fn update_lecture(
    st: &AppState,
    id: i64,
    patch: LecturePatch,
    photo: Option<PhotoUpload>,
) -> Result<LectureView, CatalogError> {
    let new_key = stage_photo(st, photo).await?;

    match apply_update(st, id, &patch, new_key.as_deref()).await {
        Ok(Some(replaced)) => discard_photo(st, &replaced).await,
        Ok(None) => {}
        Err(e) => {
            if let Some(k) = &new_key {
                discard_photo(st, k).await;
            }
            warn!(error = %e, lecture_id = id, "lecture update refused");
            return Err(e);
        }
    }

    info!(lecture_id = id, "lecture updated");
    get_lecture(st, id).await
}

pub async fn delete_lecture(st: &AppState, id: i64) -> Result<(), CatalogError> {
    let photo = repo::delete(&st.db, id)
        .await?
        .ok_or(CatalogError::NotFound)?;
    if let Some(key) = photo {
        discard_photo(st, &key).await;
    }
    info!(lecture_id = id, "lecture deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn statuses() {
        assert_eq!(CatalogError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            CatalogError::CapacityBelowRegistrations {
                registered: 3,
                requested: 2
            }
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            CatalogError::from(sqlx::Error::PoolTimedOut).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            CatalogError::Storage(anyhow::anyhow!("bucket unreachable")).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn ledger_not_found_maps_to_catalog_not_found() {
        assert!(matches!(
            CatalogError::from(LedgerError::LectureNotFound),
            CatalogError::NotFound
        ));
    }

    #[tokio::test]
    async fn unsupported_photo_type_is_rejected_before_upload() {
        let state = AppState::fake();
        let photo = PhotoUpload {
            body: Bytes::from_static(b"%PDF"),
            content_type: "application/pdf".into(),
        };
        let err = stage_photo(&state, Some(photo)).await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn supported_photo_gets_a_key() {
        let state = AppState::fake();
        let photo = PhotoUpload {
            body: Bytes::from_static(b"\x89PNG"),
            content_type: "image/png".into(),
        };
        let key = stage_photo(&state, Some(photo)).await.unwrap().unwrap();
        assert!(key.ends_with(".png"));
        assert!(stage_photo(&state, None).await.unwrap().is_none());
    }
}
