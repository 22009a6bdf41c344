use crate::config::Config;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

const MAX_SESSION_TTL_SECS: u64 = 366 * 24 * 60 * 60;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AuthError {
    #[error("please enter both username and password")]
    MissingCredentials,
    #[error("admin credentials are not configured")]
    NotConfigured,
    #[error("invalid username or password")]
    InvalidCredentials,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "bad_params",
            Self::NotConfigured => "auth_not_configured",
            Self::InvalidCredentials => "invalid_credentials",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

pub fn password_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Byte comparison whose running time does not depend on where inputs differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// In-memory sessions for the single UI attached to this sidecar.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    pub fn login(
        &mut self,
        config: &Config,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let (Some(expected_user), Some(expected_digest)) = (
            config.admin_username.as_deref(),
            config.admin_password_sha256.as_deref(),
        ) else {
            return Err(AuthError::NotConfigured);
        };
        // Always hash, whichever field is wrong.
        let digest = password_digest(password);
        let user_ok = constant_time_eq(username.as_bytes(), expected_user.as_bytes());
        let digest_ok = constant_time_eq(digest.as_bytes(), expected_digest.as_bytes());
        if !(user_ok & digest_ok) {
            return Err(AuthError::InvalidCredentials);
        }

        self.purge_expired(now);
        let ttl = Duration::seconds(config.session_ttl_secs.min(MAX_SESSION_TTL_SECS) as i64);
        let session = Session {
            token: Uuid::new_v4().to_string(),
            username: username.to_string(),
            expires_at: now + ttl,
        };
        self.sessions
            .insert(session.token.clone(), session.clone());
        Ok(session)
    }

    /// Live session for `token`; an expired one is dropped and `None` returned.
    pub fn get(&mut self, token: &str, now: DateTime<Utc>) -> Option<&Session> {
        let expired = self.sessions.get(token).map(|s| s.expires_at <= now)?;
        if expired {
            self.sessions.remove(token);
            return None;
        }
        self.sessions.get(token)
    }

    pub fn logout(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) {
        self.sessions.retain(|_, s| s.expires_at > now);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            admin_username: Some("admin".into()),
            admin_password_sha256: Some(password_digest("s3cret")),
            session_ttl_secs: 60,
            ..Config::default()
        }
    }

    #[test]
    fn digest_is_lowercase_hex_sha256() {
        assert_eq!(
            password_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn constant_time_eq_matches_plain_equality() {
        assert!(constant_time_eq(b"admin", b"admin"));
        assert!(!constant_time_eq(b"admin", b"admiN"));
        assert!(!constant_time_eq(b"admin", b"admin2"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn login_checks_both_fields() {
        let mut store = SessionStore::default();
        let now = Utc::now();
        let cfg = config();
        assert_eq!(
            store.login(&cfg, "", "s3cret", now),
            Err(AuthError::MissingCredentials)
        );
        assert_eq!(
            store.login(&cfg, "admin", "wrong", now),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            store.login(&cfg, "root", "s3cret", now),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            store.login(&Config::default(), "admin", "s3cret", now),
            Err(AuthError::NotConfigured)
        );
        let s = store.login(&cfg, "admin", "s3cret", now).expect("login");
        assert_eq!(s.username, "admin");
        assert!(store.get(&s.token, now).is_some());
    }

    #[test]
    fn sessions_expire_and_logout_is_idempotent() {
        let mut store = SessionStore::default();
        let now = Utc::now();
        let s = store.login(&config(), "admin", "s3cret", now).expect("login");
        assert!(store.get(&s.token, now + Duration::seconds(59)).is_some());
        assert!(store.get(&s.token, now + Duration::seconds(60)).is_none());
        assert_eq!(store.len(), 0);

        let s = store.login(&config(), "admin", "s3cret", now).expect("login");
        assert!(store.logout(&s.token));
        assert!(!store.logout(&s.token));
        assert!(store.get(&s.token, now).is_none());
    }
}
