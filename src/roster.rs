use crate::model::{Student, UserData};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub added: usize,
    pub skipped: usize,
}

/// Appends imported students whose NIS is not on the roster yet.
///
/// Rows with a blank name or NIS are dropped first. Only the roster as it was
/// before this call is checked, so a NIS repeated inside `incoming` (the same
/// student on two class sheets, say) is appended each time.
pub fn merge_imported_students(roster: &mut Vec<Student>, incoming: Vec<Student>) -> MergeSummary {
    let known: HashSet<String> = roster.iter().map(|s| s.external_id.clone()).collect();
    let mut summary = MergeSummary::default();
    for s in incoming {
        if s.external_id.trim().is_empty() || s.display_name.trim().is_empty() {
            summary.skipped += 1;
            continue;
        }
        if known.contains(&s.external_id) {
            summary.skipped += 1;
            continue;
        }
        roster.push(s);
        summary.added += 1;
    }
    summary
}

/// Drops the whole roster and, with it, every attendance event.
pub fn reset(data: &mut UserData) {
    data.students.clear();
    data.records.clear();
}

/// Distinct class labels with student counts, sorted by label.
pub fn class_counts(roster: &[Student]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for s in roster {
        *counts.entry(s.class_label.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(label, n)| (label.to_string(), n))
        .collect()
}

pub fn find_student<'a>(roster: &'a [Student], student_id: &str) -> Option<&'a Student> {
    roster.iter().find(|s| s.id == student_id)
}
