use crate::model::{AttendanceEvent, AttendanceStatus};
use chrono::NaiveDate;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Created,
    Updated,
}

/// Sets the status for `(student_id, date)`.
///
/// An existing event for the pair keeps its id and has its status replaced;
/// otherwise a new event is appended. Returns the index of the affected event.
pub fn record_status(
    events: &mut Vec<AttendanceEvent>,
    student_id: &str,
    date: NaiveDate,
    status: AttendanceStatus,
) -> (usize, RecordOutcome) {
    if let Some(idx) = events
        .iter()
        .position(|e| e.student_id == student_id && e.date == date)
    {
        events[idx].status = status;
        return (idx, RecordOutcome::Updated);
    }
    events.push(AttendanceEvent {
        id: Uuid::new_v4().to_string(),
        student_id: student_id.to_string(),
        date,
        status,
    });
    (events.len() - 1, RecordOutcome::Created)
}

/// Events recorded on `date`, as (student id, status) pairs in log order.
pub fn statuses_on(events: &[AttendanceEvent], date: NaiveDate) -> Vec<(&str, &AttendanceStatus)> {
    events
        .iter()
        .filter(|e| e.date == date)
        .map(|e| (e.student_id.as_str(), &e.status))
        .collect()
}
