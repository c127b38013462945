use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_optional_date, get_required_f64, get_required_str, with_db, HandlerFn};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, NewGrade};
use rusqlite::Connection;
use serde_json::{json, Value};

fn grades_record(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let grade = NewGrade {
        enrollment_id: get_required_str(params, "enrollmentId")?,
        assessment_type: get_required_str(params, "assessmentType")?,
        score: get_required_f64(params, "score")?,
        graded_date: get_optional_date(params, "gradedDate")?,
    };
    let grade_id = store::record_grade(conn, &grade)?;
    Ok(json!({ "gradeId": grade_id }))
}

fn grades_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let enrollment_id = get_required_str(params, "enrollmentId")?;
    let grades = store::list_grades(conn, &enrollment_id)?;
    Ok(json!({ "grades": grades }))
}

fn grades_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let grade_id = get_required_str(params, "gradeId")?;
    store::delete_grade(conn, &grade_id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: HandlerFn = match req.method.as_str() {
        "grades.record" => grades_record,
        "grades.list" => grades_list,
        "grades.delete" => grades_delete,
        _ => return None,
    };
    Some(with_db(state, req, f))
}
