use crate::backup;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{required_str, user_json};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn workspace_path(state: &AppState) -> Result<PathBuf, HandlerErr> {
    state
        .workspace
        .clone()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

fn backup_export_workspace(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let workspace = workspace_path(state)?;
    let out_path = PathBuf::from(required_str(params, "outPath")?);
    let summary = backup::export_workspace_bundle(&workspace, &out_path)
        .map_err(|e| HandlerErr::new("backup_failed", format!("{e:#}")))?;
    info!(path = %out_path.to_string_lossy(), "workspace backup written");
    Ok(json!({
        "path": out_path.to_string_lossy(),
        "bundleFormat": summary.bundle_format,
        "entryCount": summary.entry_count,
        "sha256": summary.sha256,
    }))
}

fn backup_import_workspace(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let workspace = workspace_path(state)?;
    let in_path = PathBuf::from(required_str(params, "inPath")?);

    // Close the connection before the database file is swapped.
    state.db = None;
    let imported = backup::import_workspace_bundle(&in_path, &workspace);
    let reopened = state.open_workspace(&workspace);

    let summary = imported.map_err(|e| HandlerErr::new("backup_failed", format!("{e:#}")))?;
    reopened.map_err(|e| HandlerErr::new("db_open_failed", format!("{e:#}")))?;
    info!(path = %in_path.to_string_lossy(), format = %summary.bundle_format_detected, "workspace restored");

    Ok(json!({
        "bundleFormatDetected": summary.bundle_format_detected,
        "user": user_json(state.user.as_ref()),
        "studentCount": state.data.students.len(),
        "recordCount": state.data.records.len(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "backup.exportWorkspace" => backup_export_workspace(state, &req.params),
        "backup.importWorkspace" => backup_import_workspace(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
