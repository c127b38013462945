use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::Value;

pub type HandlerFn = fn(&Connection, &Value) -> Result<Value, HandlerErr>;

/// Runs a handler against the open workspace and shapes the response.
pub fn with_db(state: &AppState, req: &Request, f: HandlerFn) -> Value {
    let Some(conn) = state.db.as_ref() else {
        return HandlerErr::new("no_workspace", "select a workspace first").response(&req.id);
    };
    respond(req, f(conn, &req.params))
}

pub fn respond(req: &Request, result: Result<Value, HandlerErr>) -> Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => {
            tracing::debug!(method = %req.method, code = e.code, message = %e.message, "request failed");
            e.response(&req.id)
        }
    }
}

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    let s = params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    if s.is_empty() {
        return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
    }
    Ok(s)
}

/// Absent, null and blank strings all read as `None`.
pub fn get_optional_str(params: &Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let t = s.trim();
            Ok(if t.is_empty() { None } else { Some(t.to_string()) })
        }
        Some(_) => Err(HandlerErr::bad_params(format!(
            "{} must be string or null",
            key
        ))),
    }
}

pub fn get_required_f64(params: &Value, key: &str) -> Result<f64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a number", key)))
}

pub fn get_required_i64(params: &Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be an integer", key)))
}

pub fn get_required_date(params: &Value, key: &str) -> Result<NaiveDate, HandlerErr> {
    let raw = get_required_str(params, key)?;
    Ok(store::parse_date(&raw, key)?)
}

pub fn get_optional_date(params: &Value, key: &str) -> Result<Option<NaiveDate>, HandlerErr> {
    match get_optional_str(params, key)? {
        Some(raw) => Ok(Some(store::parse_date(&raw, key)?)),
        None => Ok(None),
    }
}

/// For patch objects: `Some(None)` when the key is present and null/blank.
pub fn get_patch_str(patch: &Value, key: &str) -> Result<Option<Option<String>>, HandlerErr> {
    if patch.get(key).is_none() {
        return Ok(None);
    }
    Ok(Some(get_optional_str(patch, key)?))
}

pub fn get_patch(params: &Value) -> Result<&Value, HandlerErr> {
    match params.get("patch") {
        Some(v) if v.is_object() => Ok(v),
        _ => Err(HandlerErr::bad_params("patch must be an object")),
    }
}
