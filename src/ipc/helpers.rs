use chrono::NaiveDate;
use serde_json::json;

use crate::calc::Window;
use crate::ipc::error::HandlerErr;
use crate::ipc::types::AppState;
use crate::model::{AttendanceStatus, UserProfile};

pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn required_date(params: &serde_json::Value, key: &str) -> Result<NaiveDate, HandlerErr> {
    let raw = required_str(params, key)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
        HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key))
            .with_details(json!({ key: raw }))
    })
}

pub fn required_status(params: &serde_json::Value) -> Result<AttendanceStatus, HandlerErr> {
    let raw = required_str(params, "status")?;
    raw.parse::<AttendanceStatus>().map_err(|e| {
        HandlerErr::bad_params(e.to_string())
            .with_details(json!({ "allowed": ["Hadir", "Sakit", "Izin", "Alpha"] }))
    })
}

pub fn required_window(params: &serde_json::Value) -> Result<Window, HandlerErr> {
    Window::from_params(params.get("window")).map_err(|e| HandlerErr::bad_params(e.to_string()))
}

/// Data-bearing methods need an open workspace and a signed-in identity.
pub fn ensure_session(state: &AppState) -> Result<&UserProfile, HandlerErr> {
    if state.db.is_none() {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    }
    state
        .user
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_session", "sign in or continue as guest first"))
}

pub fn user_json(user: Option<&UserProfile>) -> serde_json::Value {
    match user {
        Some(u) => json!({
            "id": u.id,
            "name": u.name,
            "email": u.email,
            "picture": u.picture,
            "guest": u.is_guest(),
        }),
        None => serde_json::Value::Null,
    }
}
