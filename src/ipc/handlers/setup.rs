use crate::auth::credential_hash;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

struct HandlerErr {
    code: &'static str,
    message: String,
}

impl HandlerErr {
    fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, None)
    }
}

fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: format!("missing {}", key),
        })
}

fn db_err(e: impl std::fmt::Display) -> HandlerErr {
    HandlerErr {
        code: "db_query_failed",
        message: e.to_string(),
    }
}

fn admin_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let email = get_required_str(params, "email")?;
    let password = get_required_str(params, "password")?;
    if email.trim().is_empty() || password.is_empty() {
        return Err(HandlerErr {
            code: "bad_params",
            message: "email and password must be non-empty".to_string(),
        });
    }
    let id = uuid::Uuid::new_v4().to_string();
    // Re-provisioning an existing email rotates its credential.
    conn.execute(
        "INSERT INTO admins(id, email, password_hash, updated_at) VALUES(?, ?, ?, ?)
         ON CONFLICT(email) DO UPDATE SET password_hash = excluded.password_hash,
                                          updated_at = excluded.updated_at",
        rusqlite::params![id, email.trim(), credential_hash(&password), db::now_rfc3339()],
    )
    .map_err(db_err)?;
    let admin_id: String = conn
        .query_row("SELECT id FROM admins WHERE email = ?", [email.trim()], |r| {
            r.get(0)
        })
        .map_err(db_err)?;
    Ok(json!({ "adminId": admin_id }))
}

fn teacher_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let email = params.get("email").and_then(|v| v.as_str());
    let must_change = params
        .get("mustChangePassword")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO teachers(id, name, email, must_change_password, updated_at)
         VALUES(?, ?, ?, ?, ?)",
        rusqlite::params![id, name, email, must_change as i64, db::now_rfc3339()],
    )
    .map_err(db_err)?;
    Ok(json!({ "teacherId": id, "mustChangePassword": must_change }))
}

fn student_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let email = params.get("email").and_then(|v| v.as_str());
    let homeroom = params.get("homeroomTeacherId").and_then(|v| v.as_str());
    let parent_email = params.get("parentEmail").and_then(|v| v.as_str());
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(id, name, email, homeroom_teacher_id, parent_email, updated_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        rusqlite::params![id, name, email, homeroom, parent_email, db::now_rfc3339()],
    )
    .map_err(db_err)?;
    Ok(json!({ "studentId": id }))
}

/// Marks a teacher's temporary credential as replaced: the gate's
/// secondary check passes from here on. The credential itself lives with
/// the external identity provider.
fn password_change(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let teacher_id = get_required_str(params, "teacherId")?;
    let changed = conn
        .execute(
            "UPDATE teachers SET must_change_password = 0, updated_at = ? WHERE id = ?",
            [db::now_rfc3339().as_str(), teacher_id.as_str()],
        )
        .map_err(db_err)?;
    if changed == 0 {
        return Err(HandlerErr {
            code: "not_found",
            message: "teacher not found".to_string(),
        });
    }
    Ok(json!({ "teacherId": teacher_id, "mustChangePassword": false }))
}

fn with_conn(
    state: &mut AppState,
    req: &Request,
    f: impl FnOnce(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_password_change(state: &mut AppState, req: &Request) -> serde_json::Value {
    let resp = with_conn(state, req, password_change);
    if resp.get("ok").and_then(|v| v.as_bool()) == Some(true) {
        // The credential state under any mounted gate changed; make every
        // gate re-run its secondary check.
        state.notify_identity_changed();
    }
    resp
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.adminCreate" => Some(with_conn(state, req, admin_create)),
        "setup.teacherCreate" => Some(with_conn(state, req, teacher_create)),
        "setup.studentCreate" => Some(with_conn(state, req, student_create)),
        "setup.passwordChange" => Some(handle_password_change(state, req)),
        _ => None,
    }
}
