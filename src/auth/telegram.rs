//! Telegram Mini App `initData` verification.
//!
//! Telegram signs the launch query string with the bot token:
//! `secret = HMAC_SHA256(key = "WebAppData", msg = bot_token)` and
//! `hash = hex(HMAC_SHA256(key = secret, msg = data_check_string))`, where the
//! data-check string is every `key=value` pair except `hash`, sorted by key and
//! joined with `\n`.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use time::{Duration, OffsetDateTime};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitDataError {
    #[error("telegram init data is required")]
    Missing,
    #[error("telegram init data is malformed")]
    Malformed,
    #[error("telegram init data signature does not match")]
    BadSignature,
    #[error("telegram init data has expired")]
    Expired,
    #[error("telegram init data belongs to another user")]
    UserMismatch,
}

#[derive(Deserialize)]
struct InitDataUser {
    id: i64,
}

pub struct InitDataVerifier<'a> {
    bot_token: &'a str,
    max_age: Duration,
}

fn keyed(key: &[u8]) -> Result<HmacSha256, InitDataError> {
    HmacSha256::new_from_slice(key).map_err(|_| InitDataError::BadSignature)
}

fn field<'p>(pairs: &'p [(String, String)], name: &str) -> Result<&'p str, InitDataError> {
    pairs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .ok_or(InitDataError::Malformed)
}

/// `pairs` must already be sorted by key and exclude `hash`.
fn data_check_string(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl<'a> InitDataVerifier<'a> {
    pub fn new(bot_token: &'a str, max_age: Duration) -> Self {
        Self { bot_token, max_age }
    }

    fn mac(&self) -> Result<HmacSha256, InitDataError> {
        let mut secret = keyed(b"WebAppData")?;
        secret.update(self.bot_token.as_bytes());
        keyed(&secret.finalize().into_bytes())
    }

    /// Check the signature and age of `init_data`, returning the Telegram user id it carries.
    pub fn verify(&self, init_data: &str, now: OffsetDateTime) -> Result<i64, InitDataError> {
        let mut pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(init_data).map_err(|_| InitDataError::Malformed)?;
        let hash_at = pairs
            .iter()
            .position(|(k, _)| k == "hash")
            .ok_or(InitDataError::Malformed)?;
        let (_, hash) = pairs.remove(hash_at);
        let expected = hex::decode(hash).map_err(|_| InitDataError::BadSignature)?;

        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let mut mac = self.mac()?;
        mac.update(data_check_string(&pairs).as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| InitDataError::BadSignature)?;

        let auth_date: i64 = field(&pairs, "auth_date")?
            .parse()
            .map_err(|_| InitDataError::Malformed)?;
        let signed_at =
            OffsetDateTime::from_unix_timestamp(auth_date).map_err(|_| InitDataError::Malformed)?;
        if now - signed_at > self.max_age {
            return Err(InitDataError::Expired);
        }

        let user: InitDataUser =
            serde_json::from_str(field(&pairs, "user")?).map_err(|_| InitDataError::Malformed)?;
        Ok(user.id)
    }

    /// Produce `initData` the way Telegram would, for tests.
    #[cfg(test)]
    pub(crate) fn sign(&self, pairs: &[(&str, &str)]) -> String {
        let mut owned: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        owned.sort_by(|a, b| a.0.cmp(&b.0));
        let mut mac = self.mac().unwrap();
        mac.update(data_check_string(&owned).as_bytes());
        let hash = hex::encode(mac.finalize().into_bytes());
        owned.push(("hash".into(), hash));
        serde_urlencoded::to_string(&owned).unwrap()
    }
}
