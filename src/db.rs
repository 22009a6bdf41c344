use crate::model::{Computer, Student};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "labd.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS computers(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            location TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            roll_no TEXT NOT NULL,
            section TEXT NOT NULL CHECK(section IN ('A', 'B', 'C')),
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_section ON students(section)",
        [],
    )?;

    // One allocation per student; dependents are removed explicitly (no ON DELETE CASCADE).
    conn.execute(
        "CREATE TABLE IF NOT EXISTS allocations(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL UNIQUE,
            computer_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(computer_id) REFERENCES computers(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_allocations_computer ON allocations(computer_id)",
        [],
    )?;

    Ok(conn)
}

/// Computers in store order, each with its current allocation count.
pub fn list_computers(conn: &Connection) -> rusqlite::Result<Vec<Computer>> {
    // Correlated subquery so a computer with no allocations still reports 0.
    let mut stmt = conn.prepare(
        "SELECT
           c.id,
           c.name,
           c.location,
           (SELECT COUNT(*) FROM allocations a WHERE a.computer_id = c.id) AS student_count
         FROM computers c
         ORDER BY c.rowid",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Computer {
            id: row.get(0)?,
            name: row.get(1)?,
            location: row.get(2)?,
            student_count: row.get(3)?,
        })
    })?;
    rows.collect()
}

/// Students in store order, joined with their allocated computer.
pub fn list_students(conn: &Connection) -> rusqlite::Result<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.name, s.roll_no, s.section, c.id, c.name
         FROM students s
         LEFT JOIN allocations a ON a.student_id = s.id
         LEFT JOIN computers c ON c.id = a.computer_id
         ORDER BY s.rowid",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Student {
            id: row.get(0)?,
            name: row.get(1)?,
            roll_no: row.get(2)?,
            section: row.get(3)?,
            computer_id: row.get(4)?,
            computer_name: row.get(5)?,
        })
    })?;
    rows.collect()
}

pub fn find_computer(conn: &Connection, computer_id: &str) -> rusqlite::Result<Option<Computer>> {
    conn.query_row(
        "SELECT
           c.id,
           c.name,
           c.location,
           (SELECT COUNT(*) FROM allocations a WHERE a.computer_id = c.id)
         FROM computers c
         WHERE c.id = ?",
        [computer_id],
        |row| {
            Ok(Computer {
                id: row.get(0)?,
                name: row.get(1)?,
                location: row.get(2)?,
                student_count: row.get(3)?,
            })
        },
    )
    .optional()
}

pub fn student_exists(conn: &Connection, student_id: &str) -> rusqlite::Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM students WHERE id = ?", [student_id], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

pub fn allocation_for_student(
    conn: &Connection,
    student_id: &str,
) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT id FROM allocations WHERE student_id = ?",
        [student_id],
        |r| r.get(0),
    )
    .optional()
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
