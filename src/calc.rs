use crate::model::{AttendanceEvent, AttendanceStatus, Student};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

pub const MONTH_NAMES_ID: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemesterHalf {
    /// January through June.
    First,
    /// July through December.
    Second,
}

impl SemesterHalf {
    pub fn number(self) -> u32 {
        match self {
            SemesterHalf::First => 1,
            SemesterHalf::Second => 2,
        }
    }

    pub fn of_month(month: u32) -> Self {
        if month <= 6 {
            SemesterHalf::First
        } else {
            SemesterHalf::Second
        }
    }
}

/// Time range an aggregate is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Month { year: i32, month: u32 },
    Semester { year: i32, half: SemesterHalf },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("missing window")]
    Missing,
    #[error("window.kind must be one of: month, semester")]
    BadKind,
    #[error("window.year must be an integer")]
    BadYear,
    #[error("window.month must be between 1 and 12")]
    BadMonth,
    #[error("window.semester must be 1 or 2")]
    BadSemester,
}

impl Window {
    pub fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            Window::Month { year, month } => date.year() == year && date.month() == month,
            Window::Semester { year, half } => {
                date.year() == year && SemesterHalf::of_month(date.month()) == half
            }
        }
    }

    /// Human label, e.g. `Maret 2024` or `Semester 1 2024`.
    pub fn label(&self) -> String {
        match *self {
            Window::Month { year, month } => format!("{} {}", month_name(month), year),
            Window::Semester { year, half } => format!("Semester {} {}", half.number(), year),
        }
    }

    /// Default export file stem.
    pub fn report_file_stem(&self) -> String {
        match *self {
            Window::Month { year, month } => {
                format!("Rekap_Absensi_{}_{}", month_name(month), year)
            }
            Window::Semester { year, half } => {
                format!("Rekap_Absensi_Semester_{}_{}", half.number(), year)
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match *self {
            Window::Month { year, month } => serde_json::json!({
                "kind": "month",
                "year": year,
                "month": month,
            }),
            Window::Semester { year, half } => serde_json::json!({
                "kind": "semester",
                "year": year,
                "semester": half.number(),
            }),
        }
    }

    /// Accepts `{"kind":"month","year":2024,"month":3}` or
    /// `{"kind":"semester","year":2024,"semester":1}`.
    pub fn from_params(raw: Option<&serde_json::Value>) -> Result<Window, WindowError> {
        let Some(raw) = raw.filter(|v| v.is_object()) else {
            return Err(WindowError::Missing);
        };
        let year = raw
            .get("year")
            .and_then(|v| v.as_i64())
            .and_then(|y| i32::try_from(y).ok())
            .ok_or(WindowError::BadYear)?;
        match raw.get("kind").and_then(|v| v.as_str()).map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("month") => {
                let month = raw
                    .get("month")
                    .and_then(|v| v.as_u64())
                    .filter(|m| (1..=12).contains(m))
                    .ok_or(WindowError::BadMonth)? as u32;
                Ok(Window::Month { year, month })
            }
            Some("semester") => {
                let half = match raw.get("semester").and_then(|v| v.as_u64()) {
                    Some(1) => SemesterHalf::First,
                    Some(2) => SemesterHalf::Second,
                    _ => return Err(WindowError::BadSemester),
                };
                Ok(Window::Semester { year, half })
            }
            _ => Err(WindowError::BadKind),
        }
    }
}

pub fn month_name(month: u32) -> &'static str {
    let idx = month.clamp(1, 12) as usize - 1;
    MONTH_NAMES_ID[idx]
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRow {
    pub student_id: String,
    pub present: u32,
    pub sick: u32,
    pub excused: u32,
    pub unexcused: u32,
    pub total: u32,
}

impl AggregateRow {
    fn empty(student_id: &str) -> Self {
        AggregateRow {
            student_id: student_id.to_string(),
            ..AggregateRow::default()
        }
    }

    /// Returns false for statuses that are not counted.
    fn count(&mut self, status: &AttendanceStatus) -> bool {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Sick => self.sick += 1,
            AttendanceStatus::ExcusedAbsence => self.excused += 1,
            AttendanceStatus::UnexcusedAbsence => self.unexcused += 1,
            AttendanceStatus::Unrecognized(_) => return false,
        }
        self.total += 1;
        true
    }

    pub fn percentage(&self) -> f64 {
        attendance_percent(self.present, self.total)
    }
}

/// `present / max(total, 1) * 100`; zero when nothing was recorded.
pub fn attendance_percent(present: u32, total: u32) -> f64 {
    f64::from(present) / f64::from(total.max(1)) * 100.0
}

pub fn format_percent(pct: f64) -> String {
    format!("{:.1}%", pct)
}

/// One row per roster student (after the class filter), in roster order.
///
/// Events outside `window`, for students outside the filter, or for students
/// no longer on the roster are ignored. Unrecognized statuses are skipped.
pub fn aggregate(
    roster: &[Student],
    events: &[AttendanceEvent],
    window: Window,
    class_filter: Option<&str>,
) -> Vec<AggregateRow> {
    let selected: Vec<&Student> = roster
        .iter()
        .filter(|s| class_filter.map_or(true, |c| s.class_label == c))
        .collect();

    let mut by_student: HashMap<&str, AggregateRow> = selected
        .iter()
        .map(|s| (s.id.as_str(), AggregateRow::empty(&s.id)))
        .collect();

    let mut unrecognized = 0usize;
    for event in events.iter().filter(|e| window.contains(e.date)) {
        let Some(row) = by_student.get_mut(event.student_id.as_str()) else {
            continue;
        };
        if !row.count(&event.status) {
            unrecognized += 1;
        }
    }
    if unrecognized > 0 {
        warn!(unrecognized, "skipped events with unrecognized status");
    }

    selected
        .iter()
        .map(|s| {
            by_student
                .remove(s.id.as_str())
                .unwrap_or_else(|| AggregateRow::empty(&s.id))
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecapSummary {
    pub students: usize,
    pub present: u32,
    pub sick: u32,
    pub excused: u32,
    pub unexcused: u32,
    pub total: u32,
    pub percentage: f64,
}

pub fn summarize(rows: &[AggregateRow]) -> RecapSummary {
    let mut s = RecapSummary {
        students: rows.len(),
        ..RecapSummary::default()
    };
    for r in rows {
        s.present += r.present;
        s.sick += r.sick;
        s.excused += r.excused;
        s.unexcused += r.unexcused;
        s.total += r.total;
    }
    s.percentage = attendance_percent(s.present, s.total);
    s
}
