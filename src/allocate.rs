//! Student and allocation mutations.
//!
//! Every multi-row change runs inside one transaction. Dependent allocations are
//! deleted explicitly before their student or computer.

use crate::db;
use crate::model::{non_empty, Section};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_SLOTS: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum AllocateError {
    #[error("please select a computer")]
    MissingComputer,
    #[error("at most two students can be allocated at once")]
    TooManySlots,
    #[error("please enter at least one student")]
    NoStudents,
    #[error("all fields are required")]
    MissingField,
    #[error("section must be one of A, B, C (got {0:?})")]
    BadSection(String),
    #[error("computer not found")]
    ComputerNotFound,
    #[error("student not found")]
    StudentNotFound,
    #[error("student already has an allocation")]
    AlreadyAllocated,
    #[error("{source}")]
    Db {
        code: &'static str,
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl AllocateError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingComputer
            | Self::TooManySlots
            | Self::NoStudents
            | Self::MissingField
            | Self::BadSection(_) => "bad_params",
            Self::ComputerNotFound | Self::StudentNotFound => "not_found",
            Self::AlreadyAllocated => "already_allocated",
            Self::Db { code, .. } => *code,
        }
    }

    pub fn table(&self) -> Option<&'static str> {
        match self {
            Self::Db { table, .. } => Some(*table),
            _ => None,
        }
    }
}

fn db_err(code: &'static str, table: &'static str) -> impl FnOnce(rusqlite::Error) -> AllocateError {
    move |source| AllocateError::Db {
        code,
        table,
        source,
    }
}

/// Raw form input for one student. Fields may be blank.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentForm {
    #[serde(deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub roll_no: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub section: String,
}

// An untouched form field may arrive as `null`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidStudent {
    pub name: String,
    pub roll_no: String,
    pub section: Section,
}

impl StudentForm {
    /// A slot counts only when name, roll number and section are all present.
    pub fn is_filled(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.roll_no.trim().is_empty()
            && !self.section.trim().is_empty()
    }

    pub fn validate(&self) -> Result<ValidStudent, AllocateError> {
        let name = non_empty(Some(self.name.as_str())).ok_or(AllocateError::MissingField)?;
        let roll_no = non_empty(Some(self.roll_no.as_str())).ok_or(AllocateError::MissingField)?;
        if self.section.trim().is_empty() {
            return Err(AllocateError::MissingField);
        }
        let section = Section::parse(&self.section)
            .ok_or_else(|| AllocateError::BadSection(self.section.clone()))?;
        Ok(ValidStudent {
            name,
            roll_no,
            section,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocated {
    pub student_id: String,
    pub allocation_id: String,
}

/// Checks the allocate form without touching the store.
pub fn plan(computer_id: &str, slots: &[StudentForm]) -> Result<Vec<ValidStudent>, AllocateError> {
    if computer_id.trim().is_empty() {
        return Err(AllocateError::MissingComputer);
    }
    if slots.len() > MAX_SLOTS {
        return Err(AllocateError::TooManySlots);
    }
    let planned = slots
        .iter()
        .filter(|s| s.is_filled())
        .map(StudentForm::validate)
        .collect::<Result<Vec<_>, _>>()?;
    if planned.is_empty() {
        return Err(AllocateError::NoStudents);
    }
    Ok(planned)
}

/// Creates each filled slot's student and links it to `computer_id`.
/// All-or-nothing: a failure part way leaves no student behind.
pub fn allocate_students(
    conn: &Connection,
    computer_id: &str,
    slots: &[StudentForm],
) -> Result<Vec<Allocated>, AllocateError> {
    let planned = plan(computer_id, slots)?;
    let computer_id = computer_id.trim();

    let computer = db::find_computer(conn, computer_id).map_err(db_err("db_query_failed", "computers"))?;
    if computer.is_none() {
        return Err(AllocateError::ComputerNotFound);
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(db_err("db_tx_failed", "students"))?;
    let mut out = Vec::with_capacity(planned.len());
    for student in &planned {
        let student_id = insert_student(&tx, student)?;
        let allocation_id = insert_allocation(&tx, &student_id, computer_id)?;
        out.push(Allocated {
            student_id,
            allocation_id,
        });
    }
    tx.commit().map_err(db_err("db_tx_failed", "allocations"))?;
    Ok(out)
}

fn insert_student(conn: &Connection, student: &ValidStudent) -> Result<String, AllocateError> {
    let student_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(id, name, roll_no, section, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, NULL)",
        (
            &student_id,
            &student.name,
            &student.roll_no,
            student.section,
            db::now_rfc3339(),
        ),
    )
    .map_err(db_err("db_insert_failed", "students"))?;
    Ok(student_id)
}

fn insert_allocation(
    conn: &Connection,
    student_id: &str,
    computer_id: &str,
) -> Result<String, AllocateError> {
    let allocation_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO allocations(id, student_id, computer_id, created_at) VALUES(?, ?, ?, ?)",
        (&allocation_id, student_id, computer_id, db::now_rfc3339()),
    )
    .map_err(db_err("db_insert_failed", "allocations"))?;
    Ok(allocation_id)
}

pub fn create_student(conn: &Connection, form: &StudentForm) -> Result<String, AllocateError> {
    let student = form.validate()?;
    insert_student(conn, &student)
}

/// Links an existing student to an existing computer.
pub fn create_allocation(
    conn: &Connection,
    student_id: &str,
    computer_id: &str,
) -> Result<String, AllocateError> {
    if !db::student_exists(conn, student_id).map_err(db_err("db_query_failed", "students"))? {
        return Err(AllocateError::StudentNotFound);
    }
    let computer = db::find_computer(conn, computer_id).map_err(db_err("db_query_failed", "computers"))?;
    if computer.is_none() {
        return Err(AllocateError::ComputerNotFound);
    }
    let existing = db::allocation_for_student(conn, student_id)
        .map_err(db_err("db_query_failed", "allocations"))?;
    if existing.is_some() {
        return Err(AllocateError::AlreadyAllocated);
    }
    insert_allocation(conn, student_id, computer_id)
}

/// Replaces name, roll number and section. The row is untouched on rejection.
pub fn update_student(
    conn: &Connection,
    student_id: &str,
    form: &StudentForm,
) -> Result<(), AllocateError> {
    let student = form.validate()?;
    let changed = conn
        .execute(
            "UPDATE students SET name = ?, roll_no = ?, section = ?, updated_at = ? WHERE id = ?",
            (
                &student.name,
                &student.roll_no,
                student.section,
                db::now_rfc3339(),
                student_id,
            ),
        )
        .map_err(db_err("db_update_failed", "students"))?;
    if changed == 0 {
        return Err(AllocateError::StudentNotFound);
    }
    Ok(())
}

pub fn delete_student(conn: &Connection, student_id: &str) -> Result<(), AllocateError> {
    if !db::student_exists(conn, student_id).map_err(db_err("db_query_failed", "students"))? {
        return Err(AllocateError::StudentNotFound);
    }
    let tx = conn
        .unchecked_transaction()
        .map_err(db_err("db_tx_failed", "students"))?;
    tx.execute("DELETE FROM allocations WHERE student_id = ?", [student_id])
        .map_err(db_err("db_delete_failed", "allocations"))?;
    tx.execute("DELETE FROM students WHERE id = ?", [student_id])
        .map_err(db_err("db_delete_failed", "students"))?;
    tx.commit().map_err(db_err("db_tx_failed", "students"))?;
    Ok(())
}

/// Deletes the computer and every allocation pointing at it. Returns how
/// many allocations were removed.
pub fn delete_computer(conn: &Connection, computer_id: &str) -> Result<usize, AllocateError> {
    let computer = db::find_computer(conn, computer_id).map_err(db_err("db_query_failed", "computers"))?;
    if computer.is_none() {
        return Err(AllocateError::ComputerNotFound);
    }
    let tx = conn
        .unchecked_transaction()
        .map_err(db_err("db_tx_failed", "computers"))?;
    let removed = tx
        .execute("DELETE FROM allocations WHERE computer_id = ?", [computer_id])
        .map_err(db_err("db_delete_failed", "allocations"))?;
    tx.execute("DELETE FROM computers WHERE id = ?", [computer_id])
        .map_err(db_err("db_delete_failed", "computers"))?;
    tx.commit().map_err(db_err("db_tx_failed", "computers"))?;
    Ok(removed)
}

/// Drops a student's allocation, keeping the student. `false` if there was none.
pub fn remove_allocation(conn: &Connection, student_id: &str) -> Result<bool, AllocateError> {
    let removed = conn
        .execute("DELETE FROM allocations WHERE student_id = ?", [student_id])
        .map_err(db_err("db_delete_failed", "allocations"))?;
    Ok(removed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn open_temp(prefix: &str) -> Connection {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        db::open_db(&p).expect("open db")
    }

    fn add_computer(conn: &Connection, id: &str, name: &str) {
        conn.execute(
            "INSERT INTO computers(id, name, location, created_at) VALUES(?, ?, NULL, 'now')",
            (id, name),
        )
        .expect("insert computer");
    }

    fn form(name: &str, roll_no: &str, section: &str) -> StudentForm {
        StudentForm {
            name: name.into(),
            roll_no: roll_no.into(),
            section: section.into(),
        }
    }

    fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |r| r.get(0)).expect("count")
    }

    #[test]
    fn plan_rejects_empty_slots_and_missing_computer() {
        let empty = [StudentForm::default(), StudentForm::default()];
        assert!(matches!(plan("c1", &empty), Err(AllocateError::NoStudents)));
        let one = [form("Asha", "1", "A")];
        assert!(matches!(plan(" ", &one), Err(AllocateError::MissingComputer)));
        let three = [form("a", "1", "A"), form("b", "2", "B"), form("c", "3", "C")];
        assert!(matches!(plan("c1", &three), Err(AllocateError::TooManySlots)));
    }

    #[test]
    fn plan_skips_partially_filled_slots() {
        let slots = [form("Asha", "1", "A"), form("Ravi", "", "B")];
        let planned = plan("c1", &slots).expect("plan");
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].name, "Asha");
    }

    #[test]
    fn null_fields_deserialize_as_an_unfilled_slot() {
        let slots: Vec<StudentForm> = serde_json::from_value(serde_json::json!([
            { "name": "Asha", "rollNo": "11", "section": "A" },
            { "name": null, "rollNo": null, "section": null }
        ]))
        .expect("deserialize slots");
        assert!(slots[0].is_filled());
        assert!(!slots[1].is_filled());
        let planned = plan("c1", &slots).expect("plan");
        assert_eq!(planned.len(), 1);

        let missing: StudentForm =
            serde_json::from_value(serde_json::json!({ "name": "Ravi" })).expect("partial");
        assert!(!missing.is_filled());
    }

    #[test]
    fn plan_rejects_unknown_section_in_filled_slot() {
        let slots = [form("Asha", "1", "Z")];
        let e = plan("c1", &slots).expect_err("bad section");
        assert_eq!(e.code(), "bad_params");
    }

    #[test]
    fn empty_slots_issue_no_writes() {
        let conn = open_temp("labd-alloc-empty");
        add_computer(&conn, "c1", "Computer 1");
        let e = allocate_students(&conn, "c1", &[StudentForm::default(), StudentForm::default()])
            .expect_err("no students");
        assert_eq!(e.code(), "bad_params");
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM students"), 0);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM allocations"), 0);
    }

    #[test]
    fn one_filled_slot_creates_one_student_and_one_allocation() {
        let conn = open_temp("labd-alloc-one");
        add_computer(&conn, "c1", "Computer 1");
        let out = allocate_students(&conn, "c1", &[form(" Asha ", "12", "a"), StudentForm::default()])
            .expect("allocate");
        assert_eq!(out.len(), 1);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM students"), 1);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM allocations"), 1);
        let (name, section): (String, String) = conn
            .query_row("SELECT name, section FROM students", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .expect("student row");
        assert_eq!(name, "Asha");
        assert_eq!(section, "A");
    }

    #[test]
    fn unknown_computer_creates_nothing() {
        let conn = open_temp("labd-alloc-missing");
        let e = allocate_students(&conn, "nope", &[form("Asha", "12", "A")]).expect_err("missing");
        assert_eq!(e.code(), "not_found");
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM students"), 0);
    }

    #[test]
    fn failed_link_rolls_back_created_students() {
        let conn = open_temp("labd-alloc-rollback");
        add_computer(&conn, "c1", "Computer 1");
        // Make the allocation insert fail after the student insert succeeded.
        conn.execute(
            "CREATE TRIGGER fail_alloc BEFORE INSERT ON allocations
             BEGIN SELECT RAISE(ABORT, 'link failed'); END",
            [],
        )
        .expect("trigger");
        let e = allocate_students(&conn, "c1", &[form("Asha", "12", "A")]).expect_err("link fails");
        assert_eq!(e.code(), "db_insert_failed");
        assert_eq!(e.table(), Some("allocations"));
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM students"), 0);
    }

    #[test]
    fn update_with_empty_section_leaves_row_unchanged() {
        let conn = open_temp("labd-update-section");
        let id = create_student(&conn, &form("Asha", "12", "B")).expect("create");
        let e = update_student(&conn, &id, &form("Asha K", "13", "")).expect_err("empty section");
        assert_eq!(e.code(), "bad_params");
        let (name, roll, section): (String, String, String) = conn
            .query_row(
                "SELECT name, roll_no, section FROM students WHERE id = ?",
                [&id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .expect("row");
        assert_eq!((name.as_str(), roll.as_str(), section.as_str()), ("Asha", "12", "B"));

        update_student(&conn, &id, &form("Asha K", "13", "C")).expect("update");
        let section: String = conn
            .query_row("SELECT section FROM students WHERE id = ?", [&id], |r| r.get(0))
            .expect("row");
        assert_eq!(section, "C");
    }

    #[test]
    fn deleting_computer_removes_all_its_allocations() {
        let conn = open_temp("labd-delete-computer");
        add_computer(&conn, "c1", "Computer 1");
        add_computer(&conn, "c2", "Computer 2");
        allocate_students(&conn, "c1", &[form("a", "1", "A"), form("b", "2", "B")]).expect("c1 pair");
        allocate_students(&conn, "c1", &[form("c", "3", "C")]).expect("c1 single");
        allocate_students(&conn, "c2", &[form("d", "4", "A")]).expect("c2");

        let removed = delete_computer(&conn, "c1").expect("delete");
        assert_eq!(removed, 3);
        assert_eq!(
            count(&conn, "SELECT COUNT(*) FROM allocations WHERE computer_id = 'c1'"),
            0
        );
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM allocations"), 1);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM students"), 4);
    }

    #[test]
    fn deleting_student_removes_its_allocation() {
        let conn = open_temp("labd-delete-student");
        add_computer(&conn, "c1", "Computer 1");
        let out = allocate_students(&conn, "c1", &[form("a", "1", "A")]).expect("allocate");
        delete_student(&conn, &out[0].student_id).expect("delete");
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM allocations"), 0);
        assert!(matches!(
            delete_student(&conn, &out[0].student_id),
            Err(AllocateError::StudentNotFound)
        ));
    }

    #[test]
    fn remove_allocation_keeps_student_and_allows_relink() {
        let conn = open_temp("labd-remove-allocation");
        add_computer(&conn, "c1", "Computer 1");
        add_computer(&conn, "c2", "Computer 2");
        let out = allocate_students(&conn, "c1", &[form("a", "1", "A")]).expect("allocate");
        let sid = &out[0].student_id;

        assert!(matches!(
            create_allocation(&conn, sid, "c2"),
            Err(AllocateError::AlreadyAllocated)
        ));
        assert!(remove_allocation(&conn, sid).expect("remove"));
        assert!(!remove_allocation(&conn, sid).expect("remove again"));
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM students"), 1);
        create_allocation(&conn, sid, "c2").expect("relink");
    }
}
