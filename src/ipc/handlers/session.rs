use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{optional_str, required_str, user_json};
use crate::ipc::types::{AppState, Request};
use crate::model::UserProfile;
use serde_json::json;

fn start(state: &mut AppState, profile: UserProfile) -> Result<serde_json::Value, HandlerErr> {
    if state.db.is_none() {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    }
    state
        .activate(profile)
        .map_err(|e| HandlerErr::new("db_query_failed", format!("{e:#}")))?;
    Ok(json!({
        "user": user_json(state.user.as_ref()),
        "studentCount": state.data.students.len(),
        "recordCount": state.data.records.len(),
    }))
}

fn session_sign_in(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let profile = UserProfile {
        id: required_str(params, "id")?,
        name: required_str(params, "name")?,
        email: optional_str(params, "email").unwrap_or_default(),
        picture: optional_str(params, "picture").unwrap_or_default(),
    };
    start(state, profile)
}

fn session_sign_out(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    state
        .sign_out()
        .map_err(|e| HandlerErr::new("db_query_failed", format!("{e:#}")))?;
    Ok(json!({}))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "session.current" => Ok(json!({ "user": user_json(state.user.as_ref()) })),
        "session.guest" => start(state, UserProfile::guest()),
        "session.signIn" => session_sign_in(state, &req.params),
        "session.signOut" => session_sign_out(state),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
