//! Typed access to the five gradebook entities.
//!
//! Constraint enforcement is left to SQLite (see `db::SCHEMA`); failures come
//! back as [`Error::ConstraintViolation`] through the rusqlite conversion.

use crate::error::{ConstraintKind, Error, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

const DATE_FMT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "Present",
            Self::Absent => "Absent",
            Self::Late => "Late",
            Self::Excused => "Excused",
        }
    }

    /// Unknown labels are rejected the same way the table's CHECK would.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "Present" => Ok(Self::Present),
            "Absent" => Ok(Self::Absent),
            "Late" => Ok(Self::Late),
            "Excused" => Ok(Self::Excused),
            other => Err(Error::ConstraintViolation {
                kind: ConstraintKind::Check,
                message: format!(
                    "invalid attendance status '{}' (expected Present, Absent, Late or Excused)",
                    other
                ),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: String,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    pub credits: i64,
    pub instructor: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub name: String,
    pub credits: i64,
    pub instructor: Option<String>,
    pub description: Option<String>,
}

/// `instructor`/`description`: outer `None` keeps the value, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct CoursePatch {
    pub name: Option<String>,
    pub credits: Option<i64>,
    pub instructor: Option<Option<String>>,
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: String,
    pub student_id: String,
    pub course_id: String,
    pub enrollment_date: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: String,
    pub enrollment_id: String,
    pub assessment_type: String,
    pub score: f64,
    pub graded_date: String,
}

#[derive(Debug, Clone)]
pub struct NewGrade {
    pub enrollment_id: String,
    pub assessment_type: String,
    pub score: f64,
    pub graded_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub enrollment_id: String,
    pub date: String,
    pub status: AttendanceStatus,
}

pub fn parse_date(raw: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FMT)
        .map_err(|_| Error::InvalidInput(format!("{} must be YYYY-MM-DD", field)))
}

fn fmt_date(d: NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Scores are kept at two-decimal precision.
fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

fn require_affected(n: usize, entity: &'static str, id: &str) -> Result<()> {
    if n == 0 {
        return Err(Error::NotFound {
            entity,
            id: id.to_string(),
        });
    }
    Ok(())
}

fn student_from_row(r: &Row) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        first_name: r.get(1)?,
        last_name: r.get(2)?,
        email: r.get(3)?,
        date_of_birth: r.get(4)?,
    })
}

fn course_from_row(r: &Row) -> rusqlite::Result<Course> {
    Ok(Course {
        id: r.get(0)?,
        name: r.get(1)?,
        credits: r.get(2)?,
        instructor: r.get(3)?,
        description: r.get(4)?,
    })
}

fn enrollment_from_row(r: &Row) -> rusqlite::Result<Enrollment> {
    Ok(Enrollment {
        id: r.get(0)?,
        student_id: r.get(1)?,
        course_id: r.get(2)?,
        enrollment_date: r.get(3)?,
    })
}

fn grade_from_row(r: &Row) -> rusqlite::Result<Grade> {
    Ok(Grade {
        id: r.get(0)?,
        enrollment_id: r.get(1)?,
        assessment_type: r.get(2)?,
        score: r.get(3)?,
        graded_date: r.get(4)?,
    })
}

fn attendance_from_row(r: &Row) -> rusqlite::Result<AttendanceRecord> {
    let raw: String = r.get(3)?;
    let status = AttendanceStatus::parse(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(AttendanceRecord {
        id: r.get(0)?,
        enrollment_id: r.get(1)?,
        date: r.get(2)?,
        status,
    })
}

// ---------------------------------------------------------------------------
// Students

pub fn create_student(conn: &Connection, s: &NewStudent) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(id, first_name, last_name, email, date_of_birth)
         VALUES(?, ?, ?, ?, ?)",
        (
            &id,
            s.first_name.trim(),
            s.last_name.trim(),
            s.email.trim(),
            fmt_date(s.date_of_birth),
        ),
    )?;
    tracing::debug!(student_id = %id, "student created");
    Ok(id)
}

pub fn get_student(conn: &Connection, student_id: &str) -> Result<Student> {
    conn.query_row(
        "SELECT id, first_name, last_name, email, date_of_birth FROM students WHERE id = ?",
        [student_id],
        student_from_row,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound {
        entity: "student",
        id: student_id.to_string(),
    })
}

pub fn list_students(conn: &Connection) -> Result<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT id, first_name, last_name, email, date_of_birth
         FROM students
         ORDER BY last_name, first_name, id",
    )?;
    let rows = stmt
        .query_map([], student_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn update_student(conn: &Connection, student_id: &str, patch: &StudentPatch) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    let cur = get_student(&tx, student_id)?;
    let dob = match patch.date_of_birth {
        Some(d) => fmt_date(d),
        None => cur.date_of_birth,
    };
    tx.execute(
        "UPDATE students SET first_name = ?, last_name = ?, email = ?, date_of_birth = ?
         WHERE id = ?",
        (
            patch.first_name.as_deref().map(str::trim).unwrap_or(&cur.first_name),
            patch.last_name.as_deref().map(str::trim).unwrap_or(&cur.last_name),
            patch.email.as_deref().map(str::trim).unwrap_or(&cur.email),
            dob,
            student_id,
        ),
    )?;
    tx.commit()?;
    Ok(())
}

pub fn delete_student(conn: &Connection, student_id: &str) -> Result<()> {
    let n = conn.execute("DELETE FROM students WHERE id = ?", [student_id])?;
    require_affected(n, "student", student_id)?;
    tracing::debug!(student_id, "student deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Courses

pub fn create_course(conn: &Connection, c: &NewCourse) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO courses(id, name, credits, instructor, description) VALUES(?, ?, ?, ?, ?)",
        (
            &id,
            c.name.trim(),
            c.credits,
            c.instructor.as_deref(),
            c.description.as_deref(),
        ),
    )?;
    tracing::debug!(course_id = %id, "course created");
    Ok(id)
}

pub fn get_course(conn: &Connection, course_id: &str) -> Result<Course> {
    conn.query_row(
        "SELECT id, name, credits, instructor, description FROM courses WHERE id = ?",
        [course_id],
        course_from_row,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound {
        entity: "course",
        id: course_id.to_string(),
    })
}

pub fn list_courses(conn: &Connection) -> Result<Vec<Course>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, credits, instructor, description FROM courses ORDER BY name, id",
    )?;
    let rows = stmt
        .query_map([], course_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn update_course(conn: &Connection, course_id: &str, patch: &CoursePatch) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    let cur = get_course(&tx, course_id)?;
    let instructor = match &patch.instructor {
        Some(v) => v.clone(),
        None => cur.instructor,
    };
    let description = match &patch.description {
        Some(v) => v.clone(),
        None => cur.description,
    };
    tx.execute(
        "UPDATE courses SET name = ?, credits = ?, instructor = ?, description = ? WHERE id = ?",
        (
            patch.name.as_deref().map(str::trim).unwrap_or(&cur.name),
            patch.credits.unwrap_or(cur.credits),
            instructor,
            description,
            course_id,
        ),
    )?;
    tx.commit()?;
    Ok(())
}

pub fn delete_course(conn: &Connection, course_id: &str) -> Result<()> {
    let n = conn.execute("DELETE FROM courses WHERE id = ?", [course_id])?;
    require_affected(n, "course", course_id)
}

// ---------------------------------------------------------------------------
// Enrollments

pub fn create_enrollment(
    conn: &Connection,
    student_id: &str,
    course_id: &str,
    enrollment_date: Option<NaiveDate>,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO enrollments(id, student_id, course_id, enrollment_date) VALUES(?, ?, ?, ?)",
        (
            &id,
            student_id,
            course_id,
            fmt_date(enrollment_date.unwrap_or_else(today)),
        ),
    )?;
    tracing::debug!(enrollment_id = %id, student_id, course_id, "enrollment created");
    Ok(id)
}

pub fn list_enrollments(
    conn: &Connection,
    student_id: Option<&str>,
    course_id: Option<&str>,
) -> Result<Vec<Enrollment>> {
    let mut stmt = conn.prepare(
        "SELECT id, student_id, course_id, enrollment_date
         FROM enrollments
         WHERE (?1 IS NULL OR student_id = ?1)
           AND (?2 IS NULL OR course_id = ?2)
         ORDER BY enrollment_date, id",
    )?;
    let rows = stmt
        .query_map((student_id, course_id), enrollment_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn delete_enrollment(conn: &Connection, enrollment_id: &str) -> Result<()> {
    let n = conn.execute("DELETE FROM enrollments WHERE id = ?", [enrollment_id])?;
    require_affected(n, "enrollment", enrollment_id)
}

// ---------------------------------------------------------------------------
// Grades

pub fn record_grade(conn: &Connection, g: &NewGrade) -> Result<String> {
    let assessment_type = g.assessment_type.trim();
    if assessment_type.is_empty() {
        return Err(Error::InvalidInput(
            "assessmentType must not be empty".to_string(),
        ));
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO grades(id, enrollment_id, assessment_type, score, graded_date)
         VALUES(?, ?, ?, ?, ?)",
        (
            &id,
            &g.enrollment_id,
            assessment_type,
            round_score(g.score),
            fmt_date(g.graded_date.unwrap_or_else(today)),
        ),
    )?;
    Ok(id)
}

pub fn list_grades(conn: &Connection, enrollment_id: &str) -> Result<Vec<Grade>> {
    let mut stmt = conn.prepare(
        "SELECT id, enrollment_id, assessment_type, score, graded_date
         FROM grades
         WHERE enrollment_id = ?
         ORDER BY graded_date, id",
    )?;
    let rows = stmt
        .query_map([enrollment_id], grade_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn delete_grade(conn: &Connection, grade_id: &str) -> Result<()> {
    let n = conn.execute("DELETE FROM grades WHERE id = ?", [grade_id])?;
    require_affected(n, "grade", grade_id)
}

// ---------------------------------------------------------------------------
// Attendance

pub fn record_attendance(
    conn: &Connection,
    enrollment_id: &str,
    date: NaiveDate,
    status: AttendanceStatus,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO attendance(id, enrollment_id, date, status) VALUES(?, ?, ?, ?)",
        (&id, enrollment_id, fmt_date(date), status.as_str()),
    )?;
    Ok(id)
}

pub fn list_attendance(conn: &Connection, enrollment_id: &str) -> Result<Vec<AttendanceRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, enrollment_id, date, status
         FROM attendance
         WHERE enrollment_id = ?
         ORDER BY date",
    )?;
    let rows = stmt
        .query_map([enrollment_id], attendance_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn delete_attendance(conn: &Connection, attendance_id: &str) -> Result<()> {
    let n = conn.execute("DELETE FROM attendance WHERE id = ?", [attendance_id])?;
    require_affected(n, "attendance record", attendance_id)
}
