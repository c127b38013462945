use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_required_date, get_required_str, with_db, HandlerFn};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, AttendanceStatus};
use rusqlite::Connection;
use serde_json::{json, Value};

fn attendance_record(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let enrollment_id = get_required_str(params, "enrollmentId")?;
    let date = get_required_date(params, "date")?;
    let status = AttendanceStatus::parse(&get_required_str(params, "status")?)?;
    let attendance_id = store::record_attendance(conn, &enrollment_id, date, status)?;
    Ok(json!({ "attendanceId": attendance_id }))
}

fn attendance_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let enrollment_id = get_required_str(params, "enrollmentId")?;
    let records = store::list_attendance(conn, &enrollment_id)?;
    Ok(json!({ "records": records }))
}

fn attendance_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let attendance_id = get_required_str(params, "attendanceId")?;
    store::delete_attendance(conn, &attendance_id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: HandlerFn = match req.method.as_str() {
        "attendance.record" => attendance_record,
        "attendance.list" => attendance_list,
        "attendance.delete" => attendance_delete,
        _ => return None,
    };
    Some(with_db(state, req, f))
}
