use serde::Serialize;
use sqlx::{FromRow, PgExecutor};
use time::OffsetDateTime;

/// One user's seat on one lecture.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Registration {
    pub id: i64,
    pub user_id: i64,
    pub lecture_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn exists<'e, E>(db: E, user_id: i64, lecture_id: i64) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1
              FROM lecture_registrations
             WHERE user_id = $1 AND lecture_id = $2
        )
        "#,
    )
    .bind(user_id)
    .bind(lecture_id)
    .fetch_one(db)
    .await
}

pub async fn count_for_lecture<'e, E>(db: E, lecture_id: i64) -> Result<i64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM lecture_registrations WHERE lecture_id = $1",
    )
    .bind(lecture_id)
    .fetch_one(db)
    .await
}

pub async fn insert<'e, E>(db: E, user_id: i64, lecture_id: i64) -> Result<Registration, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Registration>(
        r#"
        INSERT INTO lecture_registrations (user_id, lecture_id)
        VALUES ($1, $2)
        RETURNING id, user_id, lecture_id, created_at
        "#,
    )
    .bind(user_id)
    .bind(lecture_id)
    .fetch_one(db)
    .await
}
