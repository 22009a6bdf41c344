use rusqlite::Connection;

use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};

pub type HandlerResult = Result<serde_json::Value, serde_json::Value>;

pub fn str_param(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
}

/// Present and non-blank after trimming.
pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    match str_param(req, key) {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(err(
            &req.id,
            "bad_params",
            format!("{key} must not be empty"),
            None,
        )),
        None => Err(err(&req.id, "bad_params", format!("missing {key}"), None)),
    }
}

/// Resolves `params.token` to the signed-in username.
pub fn require_session(state: &mut AppState, req: &Request) -> Result<String, serde_json::Value> {
    let Some(token) = str_param(req, "token") else {
        return Err(err(&req.id, "unauthorized", "sign in first", None));
    };
    match state.sessions.get(&token, chrono::Utc::now()) {
        Some(session) => Ok(session.username.clone()),
        None => Err(err(
            &req.id,
            "unauthorized",
            "session expired or unknown; sign in again",
            None,
        )),
    }
}

pub fn require_db<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn respond(result: HandlerResult) -> serde_json::Value {
    result.unwrap_or_else(|e| e)
}
