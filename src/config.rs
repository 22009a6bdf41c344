use std::env;
use std::path::PathBuf;

pub const DEFAULT_SESSION_TTL_SECS: u64 = 8 * 60 * 60;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub admin_username: Option<String>,
    /// Lowercase hex SHA-256 of the admin password.
    pub admin_password_sha256: Option<String>,
    pub session_ttl_secs: u64,
    pub workspace: Option<PathBuf>,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            admin_username: env_string("LABD_ADMIN_USERNAME"),
            admin_password_sha256: env_string("LABD_ADMIN_PASSWORD_SHA256")
                .map(|s| s.to_ascii_lowercase()),
            session_ttl_secs: env_u64("LABD_SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS),
            workspace: env_string("LABD_WORKSPACE").map(PathBuf::from),
            log_json: env_bool("LABD_LOG_JSON", false),
        }
    }

    pub fn auth_configured(&self) -> bool {
        self.admin_username.is_some() && self.admin_password_sha256.is_some()
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|v| {
        let t = v.trim().to_string();
        if t.is_empty() {
            None
        } else {
            Some(t)
        }
    })
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}
