use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    get_optional_str, get_patch, get_patch_str, get_required_i64, get_required_str, with_db,
    HandlerFn,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, CoursePatch, NewCourse};
use rusqlite::Connection;
use serde_json::{json, Value};

fn courses_create(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let new = NewCourse {
        name: get_required_str(params, "name")?,
        credits: get_required_i64(params, "credits")?,
        instructor: get_optional_str(params, "instructor")?,
        description: get_optional_str(params, "description")?,
    };
    let course_id = store::create_course(conn, &new)?;
    Ok(json!({ "courseId": course_id }))
}

fn courses_get(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let course_id = get_required_str(params, "courseId")?;
    let course = store::get_course(conn, &course_id)?;
    Ok(json!({ "course": course }))
}

fn courses_list(conn: &Connection, _params: &Value) -> Result<Value, HandlerErr> {
    let courses = store::list_courses(conn)?;
    Ok(json!({ "courses": courses }))
}

fn courses_update(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let course_id = get_required_str(params, "courseId")?;
    let patch = get_patch(params)?;

    let name = match get_patch_str(patch, "name")? {
        Some(None) => return Err(HandlerErr::bad_params("name must not be empty")),
        other => other.flatten(),
    };
    let credits = match patch.get("credits") {
        None => None,
        Some(_) => Some(get_required_i64(patch, "credits")?),
    };
    let course_patch = CoursePatch {
        name,
        credits,
        instructor: get_patch_str(patch, "instructor")?,
        description: get_patch_str(patch, "description")?,
    };
    store::update_course(conn, &course_id, &course_patch)?;
    Ok(json!({ "ok": true }))
}

fn courses_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let course_id = get_required_str(params, "courseId")?;
    store::delete_course(conn, &course_id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: HandlerFn = match req.method.as_str() {
        "courses.create" => courses_create,
        "courses.get" => courses_get,
        "courses.list" => courses_list,
        "courses.update" => courses_update,
        "courses.delete" => courses_delete,
        _ => return None,
    };
    Some(with_db(state, req, f))
}
