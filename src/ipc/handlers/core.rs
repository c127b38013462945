use crate::db::DB_FILE_NAME;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{get_required_str, respond};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};
use std::path::PathBuf;

fn health(state: &AppState) -> Value {
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.as_ref().map(|p| p.display().to_string()),
        "dbOpen": state.db.is_some(),
    })
}

fn select_workspace(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let path = PathBuf::from(get_required_str(params, "path")?);
    if let Err(e) = state.open_workspace(path.clone()) {
        tracing::error!(workspace = %path.display(), error = %e, "workspace open failed");
        return Err(HandlerErr::new("db_open_failed", format!("{e:#}")));
    }
    tracing::info!(workspace = %path.display(), "workspace selected");
    Ok(json!({
        "workspacePath": path.display().to_string(),
        "dbFile": DB_FILE_NAME,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "health" => Some(ok(&req.id, health(state))),
        "workspace.select" => Some(respond(req, select_workspace(state, &req.params))),
        _ => None,
    }
}
