use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{ensure_session, required_date, required_status, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{AttendanceStatus, RECORDABLE_STATUSES};
use crate::records::{self, RecordOutcome};
use crate::roster;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, warn};

fn attendance_day_open(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    ensure_session(state)?;
    let date = required_date(params, "date")?;

    let by_student: HashMap<&str, &AttendanceStatus> =
        records::statuses_on(&state.data.records, date).into_iter().collect();

    let classes: Vec<serde_json::Value> = roster::class_counts(&state.data.students)
        .into_iter()
        .map(|(label, _)| {
            let students: Vec<serde_json::Value> = state
                .data
                .students
                .iter()
                .filter(|s| s.class_label == label)
                .map(|s| {
                    json!({
                        "id": s.id,
                        "nis": s.external_id,
                        "name": s.display_name,
                        "status": by_student.get(s.id.as_str()).map(|st| st.label()),
                    })
                })
                .collect();
            json!({ "classLabel": label, "students": students })
        })
        .collect();

    // Day totals only cover students still on the roster.
    let mut counts = serde_json::Map::new();
    for status in RECORDABLE_STATUSES.iter() {
        let n = state
            .data
            .students
            .iter()
            .filter(|s| by_student.get(s.id.as_str()) == Some(&status))
            .count();
        counts.insert(status.label().to_string(), json!(n));
    }

    Ok(json!({
        "date": date.format("%Y-%m-%d").to_string(),
        "classes": classes,
        "counts": counts,
    }))
}

fn attendance_record(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    ensure_session(state)?;
    let student_id = required_str(params, "studentId")?;
    let date = required_date(params, "date")?;
    let status = required_status(params)?;

    if roster::find_student(&state.data.students, &student_id).is_none() {
        return Err(HandlerErr::new("not_found", "student not found")
            .with_details(json!({ "studentId": student_id })));
    }

    let (idx, outcome) = records::record_status(&mut state.data.records, &student_id, date, status);
    state.persist();
    debug!(student = %student_id, %date, ?outcome, "status recorded");

    Ok(json!({
        "record": state.data.records[idx],
        "created": outcome == RecordOutcome::Created,
    }))
}

fn attendance_bulk_record(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    ensure_session(state)?;
    let date = required_date(params, "date")?;
    let status = required_status(params)?;
    let Some(ids_json) = params.get("studentIds").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("missing studentIds"));
    };
    let student_ids: Vec<&str> = ids_json.iter().filter_map(|v| v.as_str()).collect();

    let (mut created, mut updated, mut skipped) = (0usize, 0usize, 0usize);
    for student_id in student_ids {
        if roster::find_student(&state.data.students, student_id).is_none() {
            skipped += 1;
            continue;
        }
        match records::record_status(&mut state.data.records, student_id, date, status.clone()).1 {
            RecordOutcome::Created => created += 1,
            RecordOutcome::Updated => updated += 1,
        }
    }
    if skipped > 0 {
        warn!(skipped, "bulk record skipped unknown students");
    }
    if created + updated > 0 {
        state.persist();
    }

    Ok(json!({
        "created": created,
        "updated": updated,
        "skipped": skipped,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.dayOpen" => attendance_day_open(state, &req.params),
        "attendance.record" => attendance_record(state, &req.params),
        "attendance.bulkRecord" => attendance_bulk_record(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
