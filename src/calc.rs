use crate::db;
use crate::error::Result;
use rusqlite::Connection;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const CALC_CONFIG_KEY: &str = "calc.config";

/// Scores are stored at two-decimal precision; this recovers the exact value
/// from the stored `REAL`.
pub fn score_decimal(score: f64) -> Decimal {
    Decimal::new((score * 100.0).round() as i64, 2)
}

/// Grade-point step table, checked top-down.
fn grade_points_decimal(score: Decimal) -> Decimal {
    let steps = [
        (dec!(75), dec!(4.0)),
        (dec!(70), dec!(3.7)),
        (dec!(65), dec!(3.0)),
        (dec!(60), dec!(2.7)),
        (dec!(50), dec!(2.0)),
    ];
    steps
        .into_iter()
        .find(|(min, _)| score >= *min)
        .map(|(_, points)| points)
        .unwrap_or(Decimal::ZERO)
}

pub fn grade_points(score: f64) -> f64 {
    grade_points_decimal(score_decimal(score))
        .to_f64()
        .unwrap_or(0.0)
}

/// Half-away-from-zero rounding to `places` decimals, done in exact decimal
/// arithmetic so that ties such as 2.425 go up.
pub fn round_to(x: Decimal, places: u32) -> f64 {
    x.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

/// Mean of the raw scores to one decimal, `None` without grades.
pub fn average_score(rows: &[GradedRow]) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    let sum: Decimal = rows.iter().map(|r| score_decimal(r.score)).sum();
    Some(round_to(sum / Decimal::from(rows.len()), 1))
}

/// How course credits enter the GPA denominator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CreditWeighting {
    /// Credits are added once per grade row, so a course with several
    /// graded assessments is weighted several times.
    #[default]
    PerGrade,
    /// Each graded enrollment contributes its mean grade points times its
    /// credits, and its credits once.
    PerEnrollment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalcConfig {
    pub credit_weighting: CreditWeighting,
}

pub fn load_calc_config(conn: &Connection) -> CalcConfig {
    match db::settings_get_json(conn, CALC_CONFIG_KEY) {
        Ok(Some(v)) => match serde_json::from_value(v) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed calc config");
                CalcConfig::default()
            }
        },
        Ok(None) => CalcConfig::default(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read calc config; using defaults");
            CalcConfig::default()
        }
    }
}

pub fn save_calc_config(conn: &Connection, cfg: &CalcConfig) -> Result<()> {
    db::settings_set_json(conn, CALC_CONFIG_KEY, &serde_json::to_value(cfg)?)
}

/// One grade joined to its enrollment's course credits.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedRow {
    pub enrollment_id: String,
    pub credits: i64,
    pub score: f64,
}

pub fn gpa_from_rows(rows: &[GradedRow], weighting: CreditWeighting) -> f64 {
    let points = |r: &GradedRow| grade_points_decimal(score_decimal(r.score));
    let (total_points, total_credits) = match weighting {
        CreditWeighting::PerGrade => rows
            .iter()
            .fold((Decimal::ZERO, 0i64), |(pts, cr), r| {
                (pts + points(r) * Decimal::from(r.credits), cr + r.credits)
            }),
        CreditWeighting::PerEnrollment => {
            // enrollment -> (credits, grade point sum, grade count)
            let mut per: BTreeMap<&str, (i64, Decimal, i64)> = BTreeMap::new();
            for r in rows {
                let e = per
                    .entry(r.enrollment_id.as_str())
                    .or_insert((r.credits, Decimal::ZERO, 0));
                e.1 += points(r);
                e.2 += 1;
            }
            per.values()
                .fold((Decimal::ZERO, 0i64), |(pts, cr), &(credits, gp_sum, n)| {
                    let mean = gp_sum / Decimal::from(n);
                    (pts + mean * Decimal::from(credits), cr + credits)
                })
        }
    };
    if total_credits == 0 {
        return 0.0;
    }
    round_to(total_points / Decimal::from(total_credits), 2)
}

pub fn graded_rows_for_student(conn: &Connection, student_id: &str) -> Result<Vec<GradedRow>> {
    let mut stmt = conn.prepare(
        "SELECT e.id, c.credits, g.score
         FROM enrollments e
         JOIN courses c ON c.id = e.course_id
         JOIN grades g ON g.enrollment_id = e.id
         WHERE e.student_id = ?
         ORDER BY e.id, g.id",
    )?;
    let rows = stmt
        .query_map([student_id], |r| {
            Ok(GradedRow {
                enrollment_id: r.get(0)?,
                credits: r.get(1)?,
                score: r.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Graded rows for every student that has any, keyed by student id.
pub fn graded_rows_by_student(conn: &Connection) -> Result<HashMap<String, Vec<GradedRow>>> {
    let mut stmt = conn.prepare(
        "SELECT e.student_id, e.id, c.credits, g.score
         FROM enrollments e
         JOIN courses c ON c.id = e.course_id
         JOIN grades g ON g.enrollment_id = e.id
         ORDER BY e.student_id, e.id, g.id",
    )?;
    let mut rows = stmt.query([])?;
    let mut out: HashMap<String, Vec<GradedRow>> = HashMap::new();
    while let Some(r) = rows.next()? {
        let student_id: String = r.get(0)?;
        out.entry(student_id).or_default().push(GradedRow {
            enrollment_id: r.get(1)?,
            credits: r.get(2)?,
            score: r.get(3)?,
        });
    }
    Ok(out)
}

pub fn student_gpa_with(conn: &Connection, student_id: &str, cfg: &CalcConfig) -> Result<f64> {
    let rows = graded_rows_for_student(conn, student_id)?;
    Ok(gpa_from_rows(&rows, cfg.credit_weighting))
}

/// GPA under the workspace's configured credit weighting. Unknown students
/// and students without grades get 0.00.
#[allow(dead_code)]
pub fn student_gpa(conn: &Connection, student_id: &str) -> Result<f64> {
    student_gpa_with(conn, student_id, &load_calc_config(conn))
}
