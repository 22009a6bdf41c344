use crate::allocate::{self, StudentForm};
use crate::db;
use crate::ipc::error::{allocate_err, err, ok, store_err};
use crate::ipc::helpers::{require_db, require_session, required_str, respond, str_param, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::model::Section;
use crate::roster;
use serde_json::json;

fn student_form(req: &Request) -> StudentForm {
    StudentForm {
        name: str_param(req, "name").unwrap_or_default(),
        roll_no: str_param(req, "rollNo").unwrap_or_default(),
        section: str_param(req, "section").unwrap_or_default(),
    }
}

fn handle_students_list(state: &mut AppState, req: &Request) -> HandlerResult {
    require_session(state, req)?;
    let Some(conn) = state.db.as_ref() else {
        return Ok(ok(&req.id, json!({ "students": [] })));
    };

    let students = db::list_students(conn)
        .map_err(|e| store_err(&req.id, "db_query_failed", &e, Some("students")))?;
    Ok(ok(&req.id, json!({ "students": students })))
}

fn handle_students_create(state: &mut AppState, req: &Request) -> HandlerResult {
    require_session(state, req)?;
    let conn = require_db(state, req)?;

    let student_id = allocate::create_student(conn, &student_form(req))
        .map_err(|e| allocate_err(&req.id, &e))?;
    tracing::debug!(student_id = %student_id, "student created");
    Ok(ok(&req.id, json!({ "studentId": student_id })))
}

fn handle_students_update(state: &mut AppState, req: &Request) -> HandlerResult {
    require_session(state, req)?;
    let conn = require_db(state, req)?;
    let student_id = required_str(req, "studentId")?;

    allocate::update_student(conn, &student_id, &student_form(req))
        .map_err(|e| allocate_err(&req.id, &e))?;
    tracing::debug!(student_id = %student_id, "student updated");
    Ok(ok(&req.id, json!({ "ok": true })))
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    require_session(state, req)?;
    let conn = require_db(state, req)?;
    let student_id = required_str(req, "studentId")?;

    allocate::delete_student(conn, &student_id).map_err(|e| allocate_err(&req.id, &e))?;
    tracing::debug!(student_id = %student_id, "student deleted");
    Ok(ok(&req.id, json!({ "ok": true })))
}

fn handle_roster_get(state: &mut AppState, req: &Request) -> HandlerResult {
    require_session(state, req)?;
    let conn = require_db(state, req)?;
    let computer_id = required_str(req, "computerId")?;
    let section_raw = required_str(req, "section")?;
    let Some(section) = Section::parse(&section_raw) else {
        return Err(err(
            &req.id,
            "bad_params",
            format!("section must be one of A, B, C (got {section_raw:?})"),
            None,
        ));
    };

    let computer = db::find_computer(conn, &computer_id)
        .map_err(|e| store_err(&req.id, "db_query_failed", &e, Some("computers")))?
        .ok_or_else(|| err(&req.id, "not_found", "computer not found", None))?;
    let students = db::list_students(conn)
        .map_err(|e| store_err(&req.id, "db_query_failed", &e, Some("students")))?;
    let entries = roster::build(&students, &computer.id, section);

    Ok(ok(
        &req.id,
        json!({
            "computer": computer,
            "section": section,
            "students": entries,
        }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => handle_students_list(state, req),
        "students.create" => handle_students_create(state, req),
        "students.update" => handle_students_update(state, req),
        "students.delete" => handle_students_delete(state, req),
        "roster.get" => handle_roster_get(state, req),
        _ => return None,
    };
    Some(respond(result))
}
