//! Derived views over already-fetched students and computers.

use crate::model::{Computer, Section, Student};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    /// 1-based display position.
    pub position: usize,
    #[serde(flatten)]
    pub student: Student,
}

/// Students allocated to `computer_id` in `section`, in the order given.
pub fn build(students: &[Student], computer_id: &str, section: Section) -> Vec<RosterEntry> {
    students
        .iter()
        .filter(|s| s.computer_id.as_deref() == Some(computer_id) && s.section == section)
        .enumerate()
        .map(|(i, s)| RosterEntry {
            position: i + 1,
            student: s.clone(),
        })
        .collect()
}

/// Case-insensitive substring match on computer name; blank query keeps all.
pub fn search_computers(computers: Vec<Computer>, query: &str) -> Vec<Computer> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return computers;
    }
    computers
        .into_iter()
        .filter(|c| c.name.to_lowercase().contains(&q))
        .collect()
}
