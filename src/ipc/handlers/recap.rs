use crate::calc::{self, format_percent};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{ensure_session, optional_str, required_window};
use crate::ipc::types::{AppState, Request};
use crate::report;
use crate::roster;
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

fn recap_open(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    ensure_session(state)?;
    let window = required_window(params)?;
    let class_label = optional_str(params, "classLabel");

    let rows = calc::aggregate(
        &state.data.students,
        &state.data.records,
        window,
        class_label.as_deref(),
    );
    let summary = calc::summarize(&rows);

    let by_id: HashMap<&str, &crate::model::Student> = state
        .data
        .students
        .iter()
        .map(|s| (s.id.as_str(), s))
        .collect();
    let rows_json: Vec<serde_json::Value> = rows
        .iter()
        .filter_map(|r| {
            let s = by_id.get(r.student_id.as_str())?;
            Some(json!({
                "studentId": r.student_id,
                "nis": s.external_id,
                "name": s.display_name,
                "classLabel": s.class_label,
                "present": r.present,
                "sick": r.sick,
                "excused": r.excused,
                "unexcused": r.unexcused,
                "total": r.total,
                "percentage": r.percentage(),
                "percentageText": format_percent(r.percentage()),
            }))
        })
        .collect();
    let classes: Vec<String> = roster::class_counts(&state.data.students)
        .into_iter()
        .map(|(label, _)| label)
        .collect();

    Ok(json!({
        "window": window.to_json(),
        "label": window.label(),
        "classLabel": class_label,
        "classes": classes,
        "rows": rows_json,
        "summary": summary,
    }))
}

fn recap_export(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    ensure_session(state)?;
    let window = required_window(params)?;

    let out_path = match optional_str(params, "path") {
        Some(p) => PathBuf::from(p),
        None => {
            let dir = optional_str(params, "outDir")
                .map(PathBuf::from)
                .or_else(|| state.report_dir())
                .ok_or_else(|| HandlerErr::bad_params("missing path or outDir"))?;
            dir.join(format!("{}.xlsx", window.report_file_stem()))
        }
    };

    // Export always covers every class; the class filter is a view concern.
    let rows = calc::aggregate(&state.data.students, &state.data.records, window, None);
    let sheets = report::format_for_export(&rows, &state.data.students);
    report::write_report_workbook(&sheets, &out_path).map_err(|e| {
        HandlerErr::new("export_failed", format!("{e:#}"))
            .with_details(json!({ "path": out_path.to_string_lossy() }))
    })?;
    info!(
        path = %out_path.to_string_lossy(),
        sheets = sheets.len(),
        window = %window.label(),
        "recap exported"
    );

    let sheets_json: Vec<serde_json::Value> = sheets
        .iter()
        .map(|s| {
            json!({
                "name": s.sheet_name,
                "classLabel": s.class_label,
                "rowCount": s.rows.len(),
            })
        })
        .collect();
    Ok(json!({
        "path": out_path.to_string_lossy(),
        "sheets": sheets_json,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "recap.open" => recap_open(state, &req.params),
        "recap.export" => recap_export(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
