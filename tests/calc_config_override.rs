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
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(value["ok"], true, "{} failed: {}", method, value);
    value["result"].clone()
}

#[test]
fn credit_weighting_is_a_workspace_setting() {
    let workspace = temp_dir("gradebook-calc-config");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({
            "firstName": "Grace",
            "lastName": "Hopper",
            "email": "grace@example.edu",
            "dateOfBirth": "2002-12-09"
        }),
    )["studentId"]
        .as_str()
        .expect("studentId")
        .to_string();
    let c1 = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "courses.create",
        json!({ "name": "Compilers", "credits": 3 }),
    )["courseId"]
        .as_str()
        .expect("courseId")
        .to_string();
    let c2 = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "courses.create",
        json!({ "name": "Seminar", "credits": 1 }),
    )["courseId"]
        .as_str()
        .expect("courseId")
        .to_string();
    let e1 = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "enrollments.create",
        json!({ "studentId": student, "courseId": c1 }),
    )["enrollmentId"]
        .as_str()
        .expect("enrollmentId")
        .to_string();
    let e2 = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "enrollments.create",
        json!({ "studentId": student, "courseId": c2 }),
    )["enrollmentId"]
        .as_str()
        .expect("enrollmentId")
        .to_string();
    for (i, (eid, score)) in [(&e1, 80.0), (&e1, 55.0), (&e2, 40.0)].iter().enumerate() {
        request_ok(
            &mut stdin,
            &mut reader,
            &format!("g{}", i),
            "grades.record",
            json!({ "enrollmentId": eid, "assessmentType": "Exam", "score": score }),
        );
    }

    let cfg = request_ok(&mut stdin, &mut reader, "7", "calc.config.get", json!({}));
    assert_eq!(cfg["config"]["creditWeighting"], "perGrade");

    // (4.0 * 3 + 2.0 * 3 + 0.0 * 1) / 7
    let gpa = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "calc.studentGpa",
        json!({ "studentId": student }),
    );
    assert_eq!(gpa["gpa"], 2.57);

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "calc.config.update",
        json!({ "creditWeighting": "perEnrollment" }),
    );
    assert_eq!(updated["config"]["creditWeighting"], "perEnrollment");

    // (3.0 * 3 + 0.0 * 1) / 4
    let gpa = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "calc.studentGpa",
        json!({ "studentId": student }),
    );
    assert_eq!(gpa["gpa"], 2.25);
    assert_eq!(gpa["creditWeighting"], "perEnrollment");

    let bad = request(
        &mut stdin,
        &mut reader,
        "11",
        "calc.config.update",
        json!({ "creditWeighting": "perMoonPhase" }),
    );
    assert_eq!(bad["ok"], false);
    assert_eq!(bad["error"]["code"], "bad_params");

    request_ok(&mut stdin, &mut reader, "12", "calc.config.reset", json!({}));
    let gpa = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "calc.studentGpa",
        json!({ "studentId": student }),
    );
    assert_eq!(gpa["gpa"], 2.57);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn setting_survives_a_restart() {
    let workspace = temp_dir("gradebook-calc-config-restart");

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "calc.config.update",
            json!({ "creditWeighting": "perEnrollment" }),
        );
        drop(stdin);
        let _ = child.wait();
    }

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let cfg = request_ok(&mut stdin, &mut reader, "2", "calc.config.get", json!({}));
    assert_eq!(cfg["config"]["creditWeighting"], "perEnrollment");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
