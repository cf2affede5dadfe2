use crate::db;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{ensure_session, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::roster;
use crate::sheets::{self, ImportError};
use serde_json::json;
use std::path::PathBuf;
use tracing::{error, info, warn};

fn students_list(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    ensure_session(state)?;
    let class_label = optional_str(params, "classLabel");
    let students: Vec<&crate::model::Student> = state
        .data
        .students
        .iter()
        .filter(|s| class_label.as_deref().map_or(true, |c| s.class_label == c))
        .collect();
    Ok(json!({
        "students": students,
        "classCount": roster::class_counts(&state.data.students).len(),
    }))
}

fn classes_list(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    ensure_session(state)?;
    let classes: Vec<serde_json::Value> = roster::class_counts(&state.data.students)
        .into_iter()
        .map(|(label, n)| json!({ "classLabel": label, "studentCount": n }))
        .collect();
    Ok(json!({ "classes": classes }))
}

fn students_import(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    ensure_session(state)?;
    let path = PathBuf::from(required_str(params, "path")?);

    let incoming = sheets::read_roster_file(&path).map_err(|e| {
        let code = match e {
            ImportError::ReadFailed(_) => "read_failed",
            ImportError::NoValidRows => "no_valid_rows",
        };
        warn!(path = %path.to_string_lossy(), "roster import rejected: {e}");
        HandlerErr::new(code, e.to_string())
            .with_details(json!({ "path": path.to_string_lossy() }))
    })?;

    let parsed = incoming.len();
    let summary = roster::merge_imported_students(&mut state.data.students, incoming);
    if summary.added > 0 {
        state.persist();
    }
    info!(parsed, added = summary.added, skipped = summary.skipped, "roster imported");

    Ok(json!({
        "parsed": parsed,
        "added": summary.added,
        "skipped": summary.skipped,
        "studentCount": state.data.students.len(),
    }))
}

fn students_template(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let path = PathBuf::from(required_str(params, "path")?);
    sheets::write_roster_template(&path)
        .map_err(|e| HandlerErr::new("export_failed", format!("{e:#}")))?;
    Ok(json!({ "path": path.to_string_lossy() }))
}

fn students_clear(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let key = ensure_session(state)?.storage_key();
    roster::reset(&mut state.data);
    if let Some(conn) = state.db.as_ref() {
        if let Err(e) = db::user_data_delete(conn, &key) {
            error!("failed to delete stored data: {e:#}");
        }
    }
    info!("roster and attendance cleared");
    Ok(json!({}))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => students_list(state, &req.params),
        "students.import" => students_import(state, &req.params),
        "students.template" => students_template(&req.params),
        "students.clear" => students_clear(state),
        "classes.list" => classes_list(state),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
