use crate::allocate;
use crate::db;
use crate::ipc::error::{allocate_err, err, ok, store_err};
use crate::ipc::helpers::{require_db, require_session, required_str, respond, str_param, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::model::non_empty;
use crate::natural;
use crate::roster;
use serde_json::json;
use uuid::Uuid;

fn handle_computers_list(state: &mut AppState, req: &Request) -> HandlerResult {
    require_session(state, req)?;
    let Some(conn) = state.db.as_ref() else {
        return Ok(ok(&req.id, json!({ "computers": [] })));
    };

    let mut computers = db::list_computers(conn)
        .map_err(|e| store_err(&req.id, "db_query_failed", &e, Some("computers")))?;
    natural::sort_computers(&mut computers);
    let query = str_param(req, "query").unwrap_or_default();
    let computers = roster::search_computers(computers, &query);

    Ok(ok(&req.id, json!({ "computers": computers })))
}

fn handle_computers_create(state: &mut AppState, req: &Request) -> HandlerResult {
    require_session(state, req)?;
    let conn = require_db(state, req)?;

    let name = str_param(req, "name").unwrap_or_default();
    if name.is_empty() {
        return Err(err(&req.id, "bad_params", "computer name is required", None));
    }
    let location = non_empty(req.params.get("location").and_then(|v| v.as_str()));

    let computer_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO computers(id, name, location, created_at) VALUES(?, ?, ?, ?)",
        (&computer_id, &name, location.as_deref(), db::now_rfc3339()),
    )
    .map_err(|e| store_err(&req.id, "db_insert_failed", &e, Some("computers")))?;
    tracing::debug!(computer_id = %computer_id, name = %name, "computer created");

    Ok(ok(
        &req.id,
        json!({ "computerId": computer_id, "name": name, "location": location }),
    ))
}

fn handle_computers_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    require_session(state, req)?;
    let conn = require_db(state, req)?;
    let computer_id = required_str(req, "computerId")?;

    let removed = allocate::delete_computer(conn, &computer_id)
        .map_err(|e| allocate_err(&req.id, &e))?;
    tracing::debug!(computer_id = %computer_id, allocations_removed = removed, "computer deleted");

    Ok(ok(&req.id, json!({ "ok": true, "allocationsRemoved": removed })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "computers.list" => handle_computers_list(state, req),
        "computers.create" => handle_computers_create(state, req),
        "computers.delete" => handle_computers_delete(state, req),
        _ => return None,
    };
    Some(respond(result))
}
