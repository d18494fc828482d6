use sqlx::PgExecutor;

use super::repo_types::{Lecture, LectureDraft, LecturePatch, LectureWithSeats, LockedLecture};

/// Lecture columns plus remaining seats, computed by one aggregate join so capacity and
/// count always come from the same snapshot. Single-lecture reads and the listing both
/// go through this projection.
const LECTURE_WITH_SEATS: &str = r#"
    SELECT l.id, l.title, l.speaker, l.date, l.end_time, l.max_seats, l.format,
           l.conference_link, l.offline_map_link, l.photo_key,
           l.max_seats - COALESCE(r.registered, 0) AS remaining_seats
      FROM lectures l
      LEFT JOIN (
            SELECT lecture_id, COUNT(*) AS registered
              FROM lecture_registrations
             GROUP BY lecture_id
           ) r ON r.lecture_id = l.id
"#;

const LECTURE_COLUMNS: &str = "id, title, speaker, date, end_time, max_seats, format, \
                               conference_link, offline_map_link, photo_key";

/// All lectures with remaining seats, ordered by id.
pub async fn list_with_seats<'e, E>(db: E) -> Result<Vec<LectureWithSeats>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let sql = format!("{LECTURE_WITH_SEATS} ORDER BY l.id ASC");
    sqlx::query_as::<_, LectureWithSeats>(&sql)
        .fetch_all(db)
        .await
}

pub async fn get_with_seats<'e, E>(db: E, id: i64) -> Result<Option<LectureWithSeats>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let sql = format!("{LECTURE_WITH_SEATS} WHERE l.id = $1");
    sqlx::query_as::<_, LectureWithSeats>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Take the row lock that serialises seat accounting for one lecture.
/// Held until the surrounding transaction ends.
pub async fn lock_for_update<'e, E>(db: E, id: i64) -> Result<Option<LockedLecture>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, LockedLecture>(
        r#"
        SELECT id, max_seats, photo_key
          FROM lectures
         WHERE id = $1
           FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn exists<'e, E>(db: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM lectures WHERE id = $1)")
        .bind(id)
        .fetch_one(db)
        .await
}

pub async fn insert<'e, E>(
    db: E,
    draft: &LectureDraft,
    photo_key: Option<&str>,
) -> Result<Lecture, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        INSERT INTO lectures (title, speaker, date, end_time, max_seats, format,
                              conference_link, offline_map_link, photo_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {LECTURE_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Lecture>(&sql)
        .bind(&draft.title)
        .bind(&draft.speaker)
        .bind(draft.date)
        .bind(draft.end_time)
        .bind(draft.max_seats)
        .bind(draft.format)
        .bind(draft.conference_link.as_deref())
        .bind(draft.offline_map_link.as_deref())
        .bind(photo_key)
        .fetch_one(db)
        .await
}

/// Apply a partial update. `photo_key` replaces the stored key when given.
pub async fn update<'e, E>(
    db: E,
    id: i64,
    patch: &LecturePatch,
    photo_key: Option<&str>,
) -> Result<Option<Lecture>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        UPDATE lectures
           SET title            = COALESCE($2, title),
               speaker          = COALESCE($3, speaker),
               date             = COALESCE($4, date),
               end_time         = COALESCE($5, end_time),
               max_seats        = COALESCE($6, max_seats),
               format           = COALESCE($7, format),
               conference_link  = CASE WHEN $8 THEN $9 ELSE conference_link END,
               offline_map_link = CASE WHEN $10 THEN $11 ELSE offline_map_link END,
               photo_key        = COALESCE($12, photo_key)
         WHERE id = $1
        RETURNING {LECTURE_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Lecture>(&sql)
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(patch.speaker.as_deref())
        .bind(patch.date)
        .bind(patch.end_time)
        .bind(patch.max_seats)
        .bind(patch.format)
        .bind(patch.conference_link.is_some())
        .bind(patch.conference_link.clone().flatten())
        .bind(patch.offline_map_link.is_some())
        .bind(patch.offline_map_link.clone().flatten())
        .bind(photo_key)
        .fetch_optional(db)
        .await
}

/// Delete a lecture; registrations go with it. Returns the photo key of the deleted
/// row, or `None` when no such lecture existed.
pub async fn delete<'e, E>(db: E, id: i64) -> Result<Option<Option<String>>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar::<_, Option<String>>("DELETE FROM lectures WHERE id = $1 RETURNING photo_key")
        .bind(id)
        .fetch_optional(db)
        .await
}
