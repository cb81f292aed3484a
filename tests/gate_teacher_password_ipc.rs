use rusqlite::Connection;
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
    let exe = env!("CARGO_BIN_EXE_portald");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn portald");
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
    value
}

#[test]
fn flagged_teacher_is_sent_to_password_change_then_allowed() {
    let workspace = temp_dir("portal-gate-teacher");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request(&mut stdin, &mut reader, "2", "auth.initialize", json!({}));

    let created = request(
        &mut stdin,
        &mut reader,
        "3",
        "setup.teacherCreate",
        json!({
            "name": "R. Okafor",
            "email": "r.okafor@school.example",
            "mustChangePassword": true
        }),
    );
    let teacher_id = created["result"]["teacherId"]
        .as_str()
        .expect("teacherId")
        .to_string();

    let _ = request(
        &mut stdin,
        &mut reader,
        "4",
        "auth.assume",
        json!({
            "identity": {
                "email": "r.okafor@school.example",
                "role": "teacher",
                "id": teacher_id
            }
        }),
    );

    // Role matches but the flag is set: denied with the password-change
    // redirect, dashboard content never allowed.
    let gate = request(
        &mut stdin,
        &mut reader,
        "5",
        "gate.evaluate",
        json!({ "requiredRole": "teacher" }),
    );
    assert_eq!(gate["result"]["decision"], json!("redirect_password_change"));
    assert_eq!(gate["result"]["navigateTo"], json!("/teacher/password-change"));
    assert!(gate["result"]["reason"].as_str().is_some());

    // Clearing the flag lets the next evaluation pass.
    let changed = request(
        &mut stdin,
        &mut reader,
        "6",
        "setup.passwordChange",
        json!({ "teacherId": teacher_id }),
    );
    assert_eq!(changed["result"]["mustChangePassword"], json!(false));

    let gate = request(
        &mut stdin,
        &mut reader,
        "7",
        "gate.evaluate",
        json!({ "requiredRole": "teacher" }),
    );
    assert_eq!(gate["result"]["decision"], json!("allow"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn transient_lookup_failure_keeps_gate_pending() {
    let workspace = temp_dir("portal-gate-teacher-lookup");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request(&mut stdin, &mut reader, "2", "auth.initialize", json!({}));

    let created = request(
        &mut stdin,
        &mut reader,
        "3",
        "setup.teacherCreate",
        json!({ "name": "J. Lindqvist", "mustChangePassword": false }),
    );
    let teacher_id = created["result"]["teacherId"]
        .as_str()
        .expect("teacherId")
        .to_string();

    let _ = request(
        &mut stdin,
        &mut reader,
        "4",
        "auth.assume",
        json!({
            "identity": {
                "email": "j.lindqvist@school.example",
                "role": "teacher",
                "id": teacher_id
            }
        }),
    );

    // Break the lookup out from under the gate.
    {
        let conn = Connection::open(workspace.join("portal.sqlite3")).expect("open db");
        conn.execute("DROP TABLE teachers", []).expect("drop table");
    }

    // The check cannot resolve, so the decision stays deferred rather
    // than denying or allowing.
    let gate = request(
        &mut stdin,
        &mut reader,
        "5",
        "gate.evaluate",
        json!({ "requiredRole": "teacher" }),
    );
    assert_eq!(gate["result"]["decision"], json!("pending"), "{gate}");
    assert!(gate["result"]["navigateTo"].is_null());

    // Still pending on re-evaluation while the failure persists.
    let gate = request(
        &mut stdin,
        &mut reader,
        "6",
        "gate.evaluate",
        json!({ "requiredRole": "teacher" }),
    );
    assert_eq!(gate["result"]["decision"], json!("pending"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn teacher_identity_without_record_is_denied_to_login() {
    let workspace = temp_dir("portal-gate-teacher-missing");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request(&mut stdin, &mut reader, "2", "auth.initialize", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "3",
        "auth.assume",
        json!({
            "identity": {
                "email": "ghost@school.example",
                "role": "teacher",
                "id": "no-such-teacher"
            }
        }),
    );

    let gate = request(
        &mut stdin,
        &mut reader,
        "4",
        "gate.evaluate",
        json!({ "requiredRole": "teacher" }),
    );
    assert_eq!(gate["result"]["decision"], json!("redirect_login"));
    assert_eq!(gate["result"]["navigateTo"], json!("/teacher/login"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
