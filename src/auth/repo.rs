use crate::auth::repo_types::{NewUser, User};
use sqlx::PgExecutor;

impl User {
    /// Find a user by their stable external id.
    pub async fn find_by_user_tg<'e, E>(db: E, user_tg: &str) -> Result<Option<User>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, user_name, user_tg, username_tg, is_admin, score, created_at
            FROM users
            WHERE user_tg = $1
            "#,
        )
        .bind(user_tg)
        .fetch_optional(db)
        .await
    }

    /// Find-or-create keyed on `user_tg`.
    ///
    /// One statement, so two concurrent first logins for the same account both end up
    /// with the same row. An existing row keeps its name, admin flag and score; only
    /// the handle is refreshed.
    pub async fn find_or_create<'e, E>(db: E, new: &NewUser) -> Result<User, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_name, user_tg, username_tg)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_tg) DO UPDATE
                SET username_tg = EXCLUDED.username_tg
            RETURNING id, user_name, user_tg, username_tg, is_admin, score, created_at
            "#,
        )
        .bind(&new.user_name)
        .bind(&new.user_tg)
        .bind(&new.username_tg)
        .fetch_one(db)
        .await
    }
}
