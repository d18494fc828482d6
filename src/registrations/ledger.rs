//! Seat accounting for lectures.
//!
//! A registration is admitted inside one transaction that holds the lecture's row lock
//! from the duplicate check until the insert commits. Concurrent attempts on the same
//! lecture therefore queue on that lock and each sees the count left by the previous
//! one, so the count can never pass `max_seats`. The `(user_id, lecture_id)` unique
//! constraint backs up the duplicate check on its own.
//!
//! Every early return drops the open transaction, which rolls it back: a refused or
//! failed attempt leaves nothing behind and is safe to retry.

use axum::http::StatusCode;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info};

use super::repo::{self, Registration};
use crate::{
    auth::repo_types::User,
    lectures::{repo as lectures_repo, repo_types::LectureWithSeats},
};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("user not found")]
    UserNotFound,
    #[error("lecture not found")]
    LectureNotFound,
    #[error("already registered for this lecture")]
    AlreadyRegistered,
    #[error("no seats left for this lecture")]
    CapacityExceeded,
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

impl LedgerError {
    /// Only infrastructure faults are worth retrying; the other kinds are final answers.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::StoreUnavailable(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            LedgerError::UserNotFound | LedgerError::LectureNotFound => StatusCode::NOT_FOUND,
            LedgerError::AlreadyRegistered | LedgerError::CapacityExceeded => StatusCode::CONFLICT,
            LedgerError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// `max_seats` minus current registrations for one lecture.
pub async fn remaining_seats(db: &PgPool, lecture_id: i64) -> Result<i64, LedgerError> {
    lectures_repo::get_with_seats(db, lecture_id)
        .await?
        .map(|l| l.remaining_seats)
        .ok_or(LedgerError::LectureNotFound)
}

/// Every lecture with its remaining seats, from a single aggregate read, ordered by id.
pub async fn list_lectures_with_remaining_seats(
    db: &PgPool,
) -> Result<Vec<LectureWithSeats>, LedgerError> {
    Ok(lectures_repo::list_with_seats(db).await?)
}

/// Claim one seat of `lecture_id` for the user identified by `user_key` (`users.user_tg`).
pub async fn register_user(
    db: &PgPool,
    lecture_id: i64,
    user_key: &str,
) -> Result<Registration, LedgerError> {
    let mut tx = db.begin().await?;

    let user = User::find_by_user_tg(&mut *tx, user_key)
        .await?
        .ok_or(LedgerError::UserNotFound)?;

    let lecture = lectures_repo::lock_for_update(&mut *tx, lecture_id)
        .await?
        .ok_or(LedgerError::LectureNotFound)?;

    if repo::exists(&mut *tx, user.id, lecture.id).await? {
        return Err(LedgerError::AlreadyRegistered);
    }

    let registered = repo::count_for_lecture(&mut *tx, lecture.id).await?;
    if registered >= i64::from(lecture.max_seats) {
        debug!(lecture_id, registered, max_seats = lecture.max_seats, "lecture full");
        return Err(LedgerError::CapacityExceeded);
    }

    let registration = match repo::insert(&mut *tx, user.id, lecture.id).await {
        Ok(r) => r,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(LedgerError::AlreadyRegistered);
        }
        Err(e) => return Err(e.into()),
    };

    tx.commit().await?;

    info!(
        registration_id = registration.id,
        user_id = user.id,
        lecture_id,
        seats_left = i64::from(lecture.max_seats) - registered - 1,
        "user registered for lecture"
    );
    Ok(registration)
}

/// Whether the user already holds a seat on the lecture.
pub async fn is_registered(
    db: &PgPool,
    lecture_id: i64,
    user_key: &str,
) -> Result<bool, LedgerError> {
    let user = User::find_by_user_tg(db, user_key)
        .await?
        .ok_or(LedgerError::UserNotFound)?;
    if !lectures_repo::exists(db, lecture_id).await? {
        return Err(LedgerError::LectureNotFound);
    }
    Ok(repo::exists(db, user.id, lecture_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_store_faults_are_retryable() {
        assert!(LedgerError::StoreUnavailable(sqlx::Error::PoolTimedOut).is_retryable());
        for e in [
            LedgerError::UserNotFound,
            LedgerError::LectureNotFound,
            LedgerError::AlreadyRegistered,
            LedgerError::CapacityExceeded,
        ] {
            assert!(!e.is_retryable(), "{e} must not be retryable");
        }
    }

    #[test]
    fn statuses() {
        assert_eq!(LedgerError::LectureNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(LedgerError::UserNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(LedgerError::AlreadyRegistered.status(), StatusCode::CONFLICT);
        assert_eq!(LedgerError::CapacityExceeded.status(), StatusCode::CONFLICT);
        assert_eq!(
            LedgerError::StoreUnavailable(sqlx::Error::PoolClosed).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
