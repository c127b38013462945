use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{with_db, HandlerFn};
use crate::ipc::types::{AppState, Request};
use crate::reports;
use rusqlite::Connection;
use serde_json::{json, Value};

fn gpa_summary(conn: &Connection, _params: &Value) -> Result<Value, HandlerErr> {
    Ok(json!({ "rows": reports::gpa_summary(conn)? }))
}

fn attendance_summary(conn: &Connection, _params: &Value) -> Result<Value, HandlerErr> {
    Ok(json!({ "rows": reports::attendance_summary(conn)? }))
}

fn risk_summary(conn: &Connection, _params: &Value) -> Result<Value, HandlerErr> {
    let (rows, unassessed) = reports::partition_risk(reports::risk_report(conn)?);
    let unassessed: Vec<Value> = unassessed
        .into_iter()
        .map(|e| {
            json!({
                "studentId": e.student_id,
                "fullName": e.full_name,
                "gpa": e.gpa,
                "reason": "noAttendanceData",
            })
        })
        .collect();
    Ok(json!({ "rows": rows, "unassessed": unassessed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: HandlerFn = match req.method.as_str() {
        "reports.gpaSummary" => gpa_summary,
        "reports.attendanceSummary" => attendance_summary,
        "reports.riskSummary" => risk_summary,
        _ => return None,
    };
    Some(with_db(state, req, f))
}
