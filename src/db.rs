use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = crate::backup::WORKSPACE_DB_FILE;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS students(
    id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    date_of_birth TEXT NOT NULL
        CHECK (date_of_birth BETWEEN '1900-01-01' AND '2010-12-31'),
    created_at TEXT NOT NULL DEFAULT CURRENT_DATE
);

CREATE TABLE IF NOT EXISTS courses(
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    credits INTEGER NOT NULL CHECK (credits > 0),
    instructor TEXT,
    description TEXT
);

CREATE TABLE IF NOT EXISTS enrollments(
    id TEXT PRIMARY KEY,
    student_id TEXT NOT NULL,
    course_id TEXT NOT NULL,
    enrollment_date TEXT NOT NULL DEFAULT CURRENT_DATE,
    UNIQUE(student_id, course_id),
    FOREIGN KEY(student_id) REFERENCES students(id) ON DELETE CASCADE,
    FOREIGN KEY(course_id) REFERENCES courses(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS grades(
    id TEXT PRIMARY KEY,
    enrollment_id TEXT NOT NULL,
    assessment_type TEXT NOT NULL,
    score REAL NOT NULL CHECK (score >= 0 AND score <= 100),
    graded_date TEXT NOT NULL DEFAULT CURRENT_DATE,
    FOREIGN KEY(enrollment_id) REFERENCES enrollments(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS attendance(
    id TEXT PRIMARY KEY,
    enrollment_id TEXT NOT NULL,
    date TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('Present', 'Absent', 'Late', 'Excused')),
    UNIQUE(enrollment_id, date),
    FOREIGN KEY(enrollment_id) REFERENCES enrollments(id) ON DELETE CASCADE
);

-- CHECK constraints cannot call date('now'), so the no-future rule is a trigger.
CREATE TRIGGER IF NOT EXISTS trg_attendance_no_future_insert
BEFORE INSERT ON attendance
WHEN NEW.date > date('now', 'localtime')
BEGIN
    SELECT RAISE(ABORT, 'attendance date must not be in the future');
END;

CREATE TRIGGER IF NOT EXISTS trg_attendance_no_future_update
BEFORE UPDATE OF date ON attendance
WHEN NEW.date > date('now', 'localtime')
BEGIN
    SELECT RAISE(ABORT, 'attendance date must not be in the future');
END;

CREATE TABLE IF NOT EXISTS workspace_settings(
    key TEXT PRIMARY KEY,
    value_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_enrollments_student ON enrollments(student_id);
CREATE INDEX IF NOT EXISTS idx_enrollments_course ON enrollments(course_id);
CREATE INDEX IF NOT EXISTS idx_grades_enrollment ON grades(enrollment_id);
CREATE INDEX IF NOT EXISTS idx_attendance_enrollment ON attendance(enrollment_id);
"#;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)?;
    init_schema(&conn)?;
    tracing::debug!(path = %db_path.display(), "opened workspace database");
    Ok(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> Result<()> {
    // Cascading deletes depend on this; SQLite defaults it off per connection.
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn settings_get_json(conn: &Connection, key: &str) -> Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM workspace_settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> Result<()> {
    conn.execute(
        "INSERT INTO workspace_settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

pub fn settings_delete(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM workspace_settings WHERE key = ?", [key])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_is_idempotent() {
        let conn = open_in_memory().expect("open");
        init_schema(&conn).expect("second init");
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('students', 'courses', 'enrollments', 'grades', 'attendance')",
                [],
                |r| r.get(0),
            )
            .expect("count tables");
        assert_eq!(n, 5);
    }

    #[test]
    fn foreign_keys_are_enabled() {
        let conn = open_in_memory().expect("open");
        let on: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |r| r.get(0))
            .expect("pragma");
        assert_eq!(on, 1);
    }

    #[test]
    fn settings_roundtrip_and_delete() {
        let conn = open_in_memory().expect("open");
        assert!(settings_get_json(&conn, "calc.config").expect("get").is_none());

        settings_set_json(&conn, "calc.config", &json!({ "creditWeighting": "perGrade" }))
            .expect("set");
        settings_set_json(&conn, "calc.config", &json!({ "creditWeighting": "perEnrollment" }))
            .expect("overwrite");
        let v = settings_get_json(&conn, "calc.config")
            .expect("get")
            .expect("present");
        assert_eq!(v["creditWeighting"], "perEnrollment");

        settings_delete(&conn, "calc.config").expect("delete");
        assert!(settings_get_json(&conn, "calc.config").expect("get").is_none());
    }
}
