//! Natural ordering for computer names, so "Computer 2" sorts before "Computer 10".

use crate::model::Computer;
use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum Run<'a> {
    Text(&'a str),
    Digits(&'a str),
}

/// Splits a name into alternating text/digit runs. The first run is always
/// text (possibly empty), so runs at the same index always have the same kind.
fn runs(s: &str) -> Vec<Run<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits = false;
    for (i, ch) in s.char_indices() {
        let is_digit = ch.is_ascii_digit();
        if is_digit != in_digits {
            out.push(if in_digits {
                Run::Digits(&s[start..i])
            } else {
                Run::Text(&s[start..i])
            });
            start = i;
            in_digits = is_digit;
        }
    }
    out.push(if in_digits {
        Run::Digits(&s[start..])
    } else {
        Run::Text(&s[start..])
    });
    out
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

fn compare_run(a: &Run<'_>, b: &Run<'_>) -> Ordering {
    match (a, b) {
        (Run::Digits(x), Run::Digits(y)) => compare_digits(x, y),
        (Run::Text(x), Run::Text(y)) => compare_text(x, y),
        // Unreachable with `runs`, but keep the order total anyway.
        (Run::Text(_), Run::Digits(_)) => Ordering::Greater,
        (Run::Digits(_), Run::Text(_)) => Ordering::Less,
    }
}

/// Total order: run-by-run natural comparison, fewer runs first on a prefix
/// tie, then byte order of the full names when every run compares equal
/// ("a01" vs "a1", "PC" vs "pc").
pub fn compare(a: &str, b: &str) -> Ordering {
    let ra = runs(a);
    let rb = runs(b);
    for (x, y) in ra.iter().zip(rb.iter()) {
        let ord = compare_run(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ra.len().cmp(&rb.len()).then_with(|| a.cmp(b))
}

pub fn sort_computers(computers: &mut [Computer]) {
    computers.sort_by(|a, b| compare(&a.name, &b.name));
}
