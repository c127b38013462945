use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_optional_date, get_optional_str, get_required_str, with_db, HandlerFn};
use crate::ipc::types::{AppState, Request};
use crate::store;
use rusqlite::Connection;
use serde_json::{json, Value};

fn enrollments_create(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let course_id = get_required_str(params, "courseId")?;
    let enrollment_date = get_optional_date(params, "enrollmentDate")?;
    let enrollment_id =
        store::create_enrollment(conn, &student_id, &course_id, enrollment_date)?;
    Ok(json!({ "enrollmentId": enrollment_id }))
}

fn enrollments_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_optional_str(params, "studentId")?;
    let course_id = get_optional_str(params, "courseId")?;
    let enrollments =
        store::list_enrollments(conn, student_id.as_deref(), course_id.as_deref())?;
    Ok(json!({ "enrollments": enrollments }))
}

fn enrollments_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let enrollment_id = get_required_str(params, "enrollmentId")?;
    store::delete_enrollment(conn, &enrollment_id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: HandlerFn = match req.method.as_str() {
        "enrollments.create" => enrollments_create,
        "enrollments.list" => enrollments_list,
        "enrollments.delete" => enrollments_delete,
        _ => return None,
    };
    Some(with_db(state, req, f))
}
