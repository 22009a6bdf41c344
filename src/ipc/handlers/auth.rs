use crate::ipc::error::{err, ok};
use crate::ipc::helpers::str_param;
use crate::ipc::types::{AppState, Request};
use chrono::{SecondsFormat, Utc};
use serde_json::json;

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let username = str_param(req, "username").unwrap_or_default();
    // Passwords are taken verbatim; only the username is trimmed.
    let password = req
        .params
        .get("password")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    match state
        .sessions
        .login(&state.config, &username, password, Utc::now())
    {
        Ok(session) => {
            tracing::info!(username = %session.username, "admin signed in");
            ok(
                &req.id,
                json!({
                    "token": session.token,
                    "username": session.username,
                    "expiresAt": session.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                }),
            )
        }
        Err(e) => {
            tracing::warn!(username = %username, code = e.code(), "sign-in rejected");
            err(&req.id, e.code(), e.to_string(), None)
        }
    }
}

fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    let token = str_param(req, "token").unwrap_or_default();
    match state.sessions.get(&token, Utc::now()) {
        Some(session) => ok(
            &req.id,
            json!({
                "valid": true,
                "username": session.username,
                "expiresAt": session.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            }),
        ),
        None => ok(&req.id, json!({ "valid": false })),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let token = str_param(req, "token").unwrap_or_default();
    let logged_out = state.sessions.logout(&token);
    if logged_out {
        tracing::info!("admin signed out");
    }
    ok(&req.id, json!({ "loggedOut": logged_out }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        _ => None,
    }
}
