use crate::allocate::{self, StudentForm};
use crate::ipc::error::{allocate_err, err, ok};
use crate::ipc::helpers::{require_db, require_session, required_str, respond, str_param, HandlerResult};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_allocate(state: &mut AppState, req: &Request) -> HandlerResult {
    require_session(state, req)?;
    let conn = require_db(state, req)?;

    let computer_id = str_param(req, "computerId").unwrap_or_default();
    let slots: Vec<StudentForm> = match req.params.get("students") {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| {
            err(
                &req.id,
                "bad_params",
                format!("invalid students: {e}"),
                None,
            )
        })?,
    };

    let allocated = allocate::allocate_students(conn, &computer_id, &slots)
        .map_err(|e| allocate_err(&req.id, &e))?;
    tracing::debug!(
        computer_id = %computer_id,
        count = allocated.len(),
        "students allocated"
    );
    Ok(ok(&req.id, json!({ "allocated": allocated })))
}

fn handle_allocations_create(state: &mut AppState, req: &Request) -> HandlerResult {
    require_session(state, req)?;
    let conn = require_db(state, req)?;
    let student_id = required_str(req, "studentId")?;
    let computer_id = required_str(req, "computerId")?;

    let allocation_id = allocate::create_allocation(conn, &student_id, &computer_id)
        .map_err(|e| allocate_err(&req.id, &e))?;
    tracing::debug!(student_id = %student_id, computer_id = %computer_id, "allocation created");
    Ok(ok(&req.id, json!({ "allocationId": allocation_id })))
}

fn handle_allocations_delete_by_student(state: &mut AppState, req: &Request) -> HandlerResult {
    require_session(state, req)?;
    let conn = require_db(state, req)?;
    let student_id = required_str(req, "studentId")?;

    let removed = allocate::remove_allocation(conn, &student_id)
        .map_err(|e| allocate_err(&req.id, &e))?;
    tracing::debug!(student_id = %student_id, removed, "allocation removed");
    Ok(ok(&req.id, json!({ "removed": removed })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "allocations.allocate" => handle_allocate(state, req),
        "allocations.create" => handle_allocations_create(state, req),
        "allocations.deleteByStudent" => handle_allocations_delete_by_student(state, req),
        _ => return None,
    };
    Some(respond(result))
}
