use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    get_patch, get_patch_str, get_optional_date, get_required_date, get_required_str, with_db,
    HandlerFn,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, NewStudent, StudentPatch};
use rusqlite::Connection;
use serde_json::{json, Value};

fn students_create(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let new = NewStudent {
        first_name: get_required_str(params, "firstName")?,
        last_name: get_required_str(params, "lastName")?,
        email: get_required_str(params, "email")?,
        date_of_birth: get_required_date(params, "dateOfBirth")?,
    };
    let student_id = store::create_student(conn, &new)?;
    Ok(json!({ "studentId": student_id }))
}

fn students_get(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let student = store::get_student(conn, &student_id)?;
    Ok(json!({ "student": student }))
}

fn students_list(conn: &Connection, _params: &Value) -> Result<Value, HandlerErr> {
    let students = store::list_students(conn)?;
    Ok(json!({ "students": students }))
}

fn students_update(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let patch = get_patch(params)?;

    // Name and email columns are NOT NULL; clearing them is not a thing.
    let required = |key: &str| -> Result<Option<String>, HandlerErr> {
        match get_patch_str(patch, key)? {
            Some(Some(v)) => Ok(Some(v)),
            Some(None) => Err(HandlerErr::bad_params(format!("{} must not be empty", key))),
            None => Ok(None),
        }
    };
    let student_patch = StudentPatch {
        first_name: required("firstName")?,
        last_name: required("lastName")?,
        email: required("email")?,
        date_of_birth: get_optional_date(patch, "dateOfBirth")?,
    };
    store::update_student(conn, &student_id, &student_patch)?;
    Ok(json!({ "ok": true }))
}

fn students_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    store::delete_student(conn, &student_id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: HandlerFn = match req.method.as_str() {
        "students.create" => students_create,
        "students.get" => students_get,
        "students.list" => students_list,
        "students.update" => students_update,
        "students.delete" => students_delete,
        _ => return None,
    };
    Some(with_db(state, req, f))
}
