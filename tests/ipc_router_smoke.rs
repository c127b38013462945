use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut child = Command::new(exe)
        .env_remove("GRADEBOOKD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

#[test]
fn requests_before_workspace_select_report_no_workspace() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["ok"], true);
    assert!(health["result"]["workspacePath"].is_null());

    let list = request(&mut stdin, &mut reader, "2", "students.list", json!({}));
    assert_eq!(list["ok"], false);
    assert_eq!(list["error"]["code"], "no_workspace");

    // Pure calculation does not need a workspace.
    let gp = request(
        &mut stdin,
        &mut reader,
        "3",
        "calc.gradePoints",
        json!({ "score": 74.99 }),
    );
    assert_eq!(gp["result"]["gradePoints"], 3.7);

    writeln!(
        stdin,
        "{}",
        json!({ "id": "4", "method": "no.such.method", "params": {} })
    )
    .expect("write");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read");
    let v: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
    assert_eq!(v["error"]["code"], "not_implemented");

    writeln!(stdin, "this is not json").expect("write");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read");
    let v: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
    assert_eq!(v["error"]["code"], "bad_json");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("gradebook-router-smoke");
    let bundle_out = workspace.join("smoke-backup.gbbackup.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let student = request(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({
            "firstName": "Smoke",
            "lastName": "Student",
            "email": "smoke@example.edu",
            "dateOfBirth": "2005-03-04"
        }),
    );
    let student_id = student["result"]["studentId"]
        .as_str()
        .expect("studentId")
        .to_string();
    let _ = request(&mut stdin, &mut reader, "3", "students.list", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "4",
        "students.get",
        json!({ "studentId": student_id }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "5",
        "students.update",
        json!({ "studentId": student_id, "patch": { "firstName": "Updated" } }),
    );
    let course = request(
        &mut stdin,
        &mut reader,
        "6",
        "courses.create",
        json!({ "name": "Smoke 101", "credits": 3, "instructor": "Dr. Smoke" }),
    );
    let course_id = course["result"]["courseId"]
        .as_str()
        .expect("courseId")
        .to_string();
    let _ = request(&mut stdin, &mut reader, "7", "courses.list", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "8",
        "courses.get",
        json!({ "courseId": course_id }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "9",
        "courses.update",
        json!({ "courseId": course_id, "patch": { "description": "Smoke testing" } }),
    );
    let enrollment = request(
        &mut stdin,
        &mut reader,
        "10",
        "enrollments.create",
        json!({ "studentId": student_id, "courseId": course_id }),
    );
    let enrollment_id = enrollment["result"]["enrollmentId"]
        .as_str()
        .expect("enrollmentId")
        .to_string();
    let _ = request(
        &mut stdin,
        &mut reader,
        "11",
        "enrollments.list",
        json!({ "studentId": student_id }),
    );
    let grade = request(
        &mut stdin,
        &mut reader,
        "12",
        "grades.record",
        json!({ "enrollmentId": enrollment_id, "assessmentType": "Quiz", "score": 81.5 }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "13",
        "grades.list",
        json!({ "enrollmentId": enrollment_id }),
    );
    let att = request(
        &mut stdin,
        &mut reader,
        "14",
        "attendance.record",
        json!({ "enrollmentId": enrollment_id, "date": "2024-03-01", "status": "Present" }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "15",
        "attendance.list",
        json!({ "enrollmentId": enrollment_id }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "16",
        "calc.studentGpa",
        json!({ "studentId": student_id }),
    );
    let _ = request(&mut stdin, &mut reader, "17", "calc.config.get", json!({}));
    let _ = request(&mut stdin, &mut reader, "18", "reports.gpaSummary", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "19",
        "reports.attendanceSummary",
        json!({}),
    );
    let _ = request(&mut stdin, &mut reader, "20", "reports.riskSummary", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "21",
        "backup.exportWorkspaceBundle",
        json!({ "outPath": bundle_out.to_string_lossy() }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "22",
        "backup.importWorkspaceBundle",
        json!({ "inPath": bundle_out.to_string_lossy() }),
    );
    if let Some(grade_id) = grade["result"]["gradeId"].as_str() {
        let _ = request(
            &mut stdin,
            &mut reader,
            "23",
            "grades.delete",
            json!({ "gradeId": grade_id }),
        );
    }
    if let Some(attendance_id) = att["result"]["attendanceId"].as_str() {
        let _ = request(
            &mut stdin,
            &mut reader,
            "24",
            "attendance.delete",
            json!({ "attendanceId": attendance_id }),
        );
    }
    let _ = request(
        &mut stdin,
        &mut reader,
        "25",
        "enrollments.delete",
        json!({ "enrollmentId": enrollment_id }),
    );
    let _ = request(&mut stdin, &mut reader, "26", "calc.config.reset", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "27",
        "courses.delete",
        json!({ "courseId": course_id }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "28",
        "students.delete",
        json!({ "studentId": student_id }),
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
