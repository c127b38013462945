use crate::calc::{self, CalcConfig, CreditWeighting};
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_required_f64, get_required_str, respond, with_db, HandlerFn};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::{json, Value};

fn grade_points(params: &Value) -> Result<Value, HandlerErr> {
    let score = get_required_f64(params, "score")?;
    Ok(json!({ "score": score, "gradePoints": calc::grade_points(score) }))
}

fn student_gpa(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let cfg = calc::load_calc_config(conn);
    let gpa = calc::student_gpa_with(conn, &student_id, &cfg)?;
    Ok(json!({
        "studentId": student_id,
        "gpa": gpa,
        "creditWeighting": cfg.credit_weighting,
    }))
}

fn config_get(conn: &Connection, _params: &Value) -> Result<Value, HandlerErr> {
    Ok(json!({ "config": calc::load_calc_config(conn) }))
}

fn config_update(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let mut cfg = calc::load_calc_config(conn);
    if let Some(v) = params.get("creditWeighting") {
        cfg.credit_weighting = serde_json::from_value::<CreditWeighting>(v.clone()).map_err(|_| {
            HandlerErr::bad_params("creditWeighting must be one of: perGrade, perEnrollment")
        })?;
    }
    calc::save_calc_config(conn, &cfg)?;
    tracing::info!(weighting = ?cfg.credit_weighting, "calc config updated");
    Ok(json!({ "config": cfg }))
}

fn config_reset(conn: &Connection, _params: &Value) -> Result<Value, HandlerErr> {
    crate::db::settings_delete(conn, calc::CALC_CONFIG_KEY)?;
    Ok(json!({ "config": CalcConfig::default() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: HandlerFn = match req.method.as_str() {
        // Pure; answers without a workspace.
        "calc.gradePoints" => return Some(respond(req, grade_points(&req.params))),
        "calc.studentGpa" => student_gpa,
        "calc.config.get" => config_get,
        "calc.config.update" => config_update,
        "calc.config.reset" => config_reset,
        _ => return None,
    };
    Some(with_db(state, req, f))
}
