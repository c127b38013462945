//! Read-only projections over the gradebook. Every call recomputes from the
//! current tables; nothing is cached.

use crate::calc::{self, round_to};
use crate::error::Result;
use crate::store;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

pub const GPA_RISK_THRESHOLD: f64 = 2.0;
pub const ATTENDANCE_RISK_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpaSummaryRow {
    pub student_id: String,
    pub full_name: String,
    pub gpa: f64,
    pub course_count: i64,
    pub average_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummaryRow {
    pub student_id: String,
    pub full_name: String,
    pub total_records: i64,
    pub present_count: i64,
    pub attendance_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RiskLevel {
    #[serde(rename = "High Risk (GPA & Attendance)")]
    HighRisk,
    #[serde(rename = "Academic Risk (Low GPA)")]
    AcademicRisk,
    #[serde(rename = "Attendance Risk")]
    AttendanceRisk,
    #[serde(rename = "Moderate / No Immediate Risk")]
    Moderate,
}

impl RiskLevel {
    pub fn classify(gpa: f64, attendance_percentage: f64) -> Self {
        let low_gpa = gpa < GPA_RISK_THRESHOLD;
        let low_attendance = attendance_percentage < ATTENDANCE_RISK_THRESHOLD;
        match (low_gpa, low_attendance) {
            (true, true) => Self::HighRisk,
            (true, false) => Self::AcademicRisk,
            (false, true) => Self::AttendanceRisk,
            (false, false) => Self::Moderate,
        }
    }

    /// Severity order, most severe first.
    pub fn rank(self) -> u8 {
        match self {
            Self::HighRisk => 0,
            Self::AcademicRisk => 1,
            Self::AttendanceRisk => 2,
            Self::Moderate => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::HighRisk => "High Risk (GPA & Attendance)",
            Self::AcademicRisk => "Academic Risk (Low GPA)",
            Self::AttendanceRisk => "Attendance Risk",
            Self::Moderate => "Moderate / No Immediate Risk",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSummaryRow {
    pub student_id: String,
    pub full_name: String,
    pub gpa: f64,
    pub attendance_percentage: f64,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RiskOutcome {
    #[serde(rename_all = "camelCase")]
    Assessed {
        attendance_percentage: f64,
        level: RiskLevel,
    },
    NoAttendanceData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskEntry {
    pub student_id: String,
    pub full_name: String,
    pub gpa: f64,
    pub outcome: RiskOutcome,
}

fn by_name(a_name: &str, a_id: &str, b_name: &str, b_id: &str) -> Ordering {
    a_name.cmp(b_name).then_with(|| a_id.cmp(b_id))
}

fn count_by_student(conn: &Connection, sql: &str) -> Result<HashMap<String, i64>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
        .collect::<rusqlite::Result<HashMap<_, _>>>()?;
    Ok(rows)
}

/// One row per student, including students with no enrollments.
pub fn gpa_summary(conn: &Connection) -> Result<Vec<GpaSummaryRow>> {
    let cfg = calc::load_calc_config(conn);
    let students = store::list_students(conn)?;
    let course_counts = count_by_student(
        conn,
        "SELECT student_id, COUNT(DISTINCT course_id) FROM enrollments GROUP BY student_id",
    )?;
    let graded = calc::graded_rows_by_student(conn)?;

    let mut out: Vec<GpaSummaryRow> = students
        .into_iter()
        .map(|s| {
            let rows = graded.get(&s.id).map(Vec::as_slice).unwrap_or_default();
            let gpa = calc::gpa_from_rows(rows, cfg.credit_weighting);
            GpaSummaryRow {
                full_name: s.full_name(),
                gpa,
                course_count: course_counts.get(&s.id).copied().unwrap_or(0),
                average_score: calc::average_score(rows),
                student_id: s.id,
            }
        })
        .collect();

    out.sort_by(|a, b| {
        b.gpa
            .total_cmp(&a.gpa)
            .then_with(|| by_name(&a.full_name, &a.student_id, &b.full_name, &b.student_id))
    });
    Ok(out)
}

/// One row per student with at least one attendance record.
pub fn attendance_summary(conn: &Connection) -> Result<Vec<AttendanceSummaryRow>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.first_name, s.last_name,
                COUNT(a.id),
                SUM(CASE WHEN a.status = 'Present' THEN 1 ELSE 0 END)
         FROM students s
         JOIN enrollments e ON e.student_id = s.id
         JOIN attendance a ON a.enrollment_id = e.id
         GROUP BY s.id, s.first_name, s.last_name
         HAVING COUNT(a.id) > 0",
    )?;
    let mut out = stmt
        .query_map([], |r| {
            let first: String = r.get(1)?;
            let last: String = r.get(2)?;
            let total: i64 = r.get(3)?;
            let present: i64 = r.get(4)?;
            Ok(AttendanceSummaryRow {
                student_id: r.get(0)?,
                full_name: format!("{} {}", first, last),
                total_records: total,
                present_count: present,
                attendance_percentage: round_to(
                    Decimal::from(100 * present) / Decimal::from(total),
                    1,
                ),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    out.sort_by(|a, b| {
        b.attendance_percentage
            .total_cmp(&a.attendance_percentage)
            .then_with(|| by_name(&a.full_name, &a.student_id, &b.full_name, &b.student_id))
    });
    Ok(out)
}

/// Every student with an explicit outcome. Students without attendance
/// records are reported as [`RiskOutcome::NoAttendanceData`] after all
/// assessed students.
pub fn risk_report(conn: &Connection) -> Result<Vec<RiskEntry>> {
    let attendance: HashMap<String, f64> = attendance_summary(conn)?
        .into_iter()
        .map(|r| (r.student_id, r.attendance_percentage))
        .collect();

    let mut out: Vec<RiskEntry> = gpa_summary(conn)?
        .into_iter()
        .map(|g| {
            let outcome = match attendance.get(&g.student_id) {
                Some(&pct) => RiskOutcome::Assessed {
                    attendance_percentage: pct,
                    level: RiskLevel::classify(g.gpa, pct),
                },
                None => RiskOutcome::NoAttendanceData,
            };
            RiskEntry {
                student_id: g.student_id,
                full_name: g.full_name,
                gpa: g.gpa,
                outcome,
            }
        })
        .collect();

    let sort_key = |e: &RiskEntry| match e.outcome {
        RiskOutcome::Assessed { level, .. } => level.rank(),
        RiskOutcome::NoAttendanceData => u8::MAX,
    };
    out.sort_by(|a, b| {
        sort_key(a)
            .cmp(&sort_key(b))
            .then_with(|| by_name(&a.full_name, &a.student_id, &b.full_name, &b.student_id))
    });
    Ok(out)
}

/// Splits a risk report into classified rows (severity order kept) and the
/// students without attendance.
pub fn partition_risk(entries: Vec<RiskEntry>) -> (Vec<RiskSummaryRow>, Vec<RiskEntry>) {
    let mut assessed = Vec::new();
    let mut unassessed = Vec::new();
    for e in entries {
        match e.outcome {
            RiskOutcome::Assessed {
                attendance_percentage,
                level,
            } => assessed.push(RiskSummaryRow {
                student_id: e.student_id,
                full_name: e.full_name,
                gpa: e.gpa,
                attendance_percentage,
                risk_level: level,
            }),
            RiskOutcome::NoAttendanceData => unassessed.push(e),
        }
    }
    (assessed, unassessed)
}

/// Classified students only, most severe first. The request adapter uses
/// [`partition_risk`] directly so it can also list the unassessed.
#[allow(dead_code)]
pub fn risk_summary(conn: &Connection) -> Result<Vec<RiskSummaryRow>> {
    Ok(partition_risk(risk_report(conn)?).0)
}
