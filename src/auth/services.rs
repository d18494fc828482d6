use axum::http::StatusCode;
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::{
    auth::{
        dto::AuthRequest,
        repo_types::{NewUser, User},
        telegram::{InitDataError, InitDataVerifier},
    },
    config::TelegramConfig,
};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid handle")]
    InvalidHandle,
    #[error("display name is empty")]
    EmptyName,
    #[error("external id is empty")]
    EmptyExternalId,
    #[error("handle already belongs to another account")]
    HandleTaken,
    #[error(transparent)]
    Unverified(#[from] InitDataError),
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

impl IdentityError {
    pub fn status(&self) -> StatusCode {
        match self {
            IdentityError::InvalidHandle
            | IdentityError::EmptyName
            | IdentityError::EmptyExternalId => StatusCode::BAD_REQUEST,
            IdentityError::HandleTaken => StatusCode::CONFLICT,
            IdentityError::Unverified(_) => StatusCode::UNAUTHORIZED,
            IdentityError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Telegram handle rules; a leading `@` is tolerated and stripped.
pub(crate) fn normalize_handle(raw: &str) -> Option<String> {
    lazy_static! {
        static ref HANDLE_RE: Regex = Regex::new(r"^[A-Za-z0-9_]{5,32}$").unwrap();
    }
    let handle = raw.trim();
    let handle = handle.strip_prefix('@').unwrap_or(handle);
    HANDLE_RE.is_match(handle).then(|| handle.to_owned())
}

pub(crate) fn display_name(first_name: &str, last_name: &str) -> Option<String> {
    let name = format!("{} {}", first_name.trim(), last_name.trim());
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_owned())
}

pub(crate) fn new_user_from(req: &AuthRequest) -> Result<NewUser, IdentityError> {
    let user_tg = req.user_tg.trim();
    if user_tg.is_empty() {
        return Err(IdentityError::EmptyExternalId);
    }
    let username_tg = normalize_handle(&req.username_tg).ok_or(IdentityError::InvalidHandle)?;
    let user_name =
        display_name(&req.first_name, &req.last_name).ok_or(IdentityError::EmptyName)?;
    Ok(NewUser {
        user_name,
        user_tg: user_tg.to_owned(),
        username_tg,
    })
}

/// With a bot token configured, the login must carry Telegram `initData` signed for
/// the same `user_tg`.
pub fn verify_login(
    cfg: &TelegramConfig,
    req: &AuthRequest,
    now: OffsetDateTime,
) -> Result<(), IdentityError> {
    let Some(bot_token) = cfg.bot_token.as_deref() else {
        return Ok(());
    };
    let init_data = req
        .init_data
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .ok_or(InitDataError::Missing)?;
    let max_age = Duration::seconds(i64::try_from(cfg.init_data_max_age_secs).unwrap_or(i64::MAX));

    let telegram_id = InitDataVerifier::new(bot_token, max_age).verify(init_data, now)?;
    if telegram_id.to_string() != req.user_tg.trim() {
        return Err(InitDataError::UserMismatch.into());
    }
    Ok(())
}

/// Validate the request and find-or-create the matching user.
pub async fn authenticate(db: &PgPool, req: &AuthRequest) -> Result<User, IdentityError> {
    let new = new_user_from(req)?;
    match User::find_or_create(db, &new).await {
        Ok(user) => {
            info!(user_id = user.id, user_tg = %user.user_tg, is_admin = user.is_admin, "user authenticated");
            Ok(user)
        }
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            warn!(username_tg = %new.username_tg, "handle already taken");
            Err(IdentityError::HandleTaken)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(first: &str, last: &str, user_tg: &str, handle: &str) -> AuthRequest {
        AuthRequest {
            first_name: first.into(),
            last_name: last.into(),
            user_tg: user_tg.into(),
            username_tg: handle.into(),
            init_data: None,
        }
    }

    fn telegram(bot_token: Option<&str>) -> TelegramConfig {
        TelegramConfig {
            bot_token: bot_token.map(str::to_owned),
            init_data_max_age_secs: 3600,
        }
    }

    #[test]
    fn handle_rules() {
        assert_eq!(normalize_handle("@alice_01").as_deref(), Some("alice_01"));
        assert_eq!(normalize_handle("  bob_the_builder ").as_deref(), Some("bob_the_builder"));
        assert_eq!(normalize_handle("abcd"), None);
        assert_eq!(normalize_handle("has space"), None);
        assert_eq!(normalize_handle("dash-not-allowed"), None);
        assert_eq!(normalize_handle(&"x".repeat(33)), None);
    }

    #[test]
    fn display_name_joins_and_trims() {
        assert_eq!(display_name(" Ada ", "Lovelace").as_deref(), Some("Ada Lovelace"));
        assert_eq!(display_name("Ada", "").as_deref(), Some("Ada"));
        assert_eq!(display_name("  ", " "), None);
    }

    #[test]
    fn new_user_from_validates_every_field() {
        let ok = new_user_from(&req("Ada", "Lovelace", "1001", "@ada_l")).unwrap();
        assert_eq!(ok.user_name, "Ada Lovelace");
        assert_eq!(ok.user_tg, "1001");
        assert_eq!(ok.username_tg, "ada_l");

        assert!(matches!(
            new_user_from(&req("Ada", "L", " ", "ada_l")),
            Err(IdentityError::EmptyExternalId)
        ));
        assert!(matches!(
            new_user_from(&req("Ada", "L", "1001", "a")),
            Err(IdentityError::InvalidHandle)
        ));
        assert!(matches!(
            new_user_from(&req("", "", "1001", "ada_l")),
            Err(IdentityError::EmptyName)
        ));
    }

    #[test]
    fn login_is_trusted_without_a_bot_token() {
        let now = OffsetDateTime::now_utc();
        assert!(verify_login(&telegram(None), &req("Ada", "L", "1001", "ada_l"), now).is_ok());
    }

    #[test]
    fn bot_token_requires_matching_init_data() {
        let now = OffsetDateTime::now_utc();
        let cfg = telegram(Some("42:secret"));
        let date = now.unix_timestamp().to_string();
        let signed = InitDataVerifier::new("42:secret", Duration::hours(1))
            .sign(&[("user", r#"{"id":1001}"#), ("auth_date", &date)]);

        let mut login = req("Ada", "L", "1001", "ada_l");
        assert!(matches!(
            verify_login(&cfg, &login, now),
            Err(IdentityError::Unverified(InitDataError::Missing))
        ));

        login.init_data = Some(signed.clone());
        assert!(verify_login(&cfg, &login, now).is_ok());

        let mut impostor = req("Eve", "X", "2002", "eve_x");
        impostor.init_data = Some(signed);
        let err = verify_login(&cfg, &impostor, now).unwrap_err();
        assert!(matches!(err, IdentityError::Unverified(InitDataError::UserMismatch)));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn statuses() {
        assert_eq!(IdentityError::InvalidHandle.status(), StatusCode::BAD_REQUEST);
        assert_eq!(IdentityError::HandleTaken.status(), StatusCode::CONFLICT);
        assert_eq!(
            IdentityError::StoreUnavailable(sqlx::Error::PoolTimedOut).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
