use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::session::{Identity, Role};
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

fn db_err(e: impl std::fmt::Display) -> HandlerErr {
    HandlerErr {
        code: "db_query_failed",
        message: e.to_string(),
    }
}

fn require_record_id(identity: &Identity) -> Result<&str, HandlerErr> {
    identity.id.as_deref().ok_or_else(|| HandlerErr {
        code: "bad_params",
        message: "identity carries no record id".to_string(),
    })
}

const STUDENT_COLS: &str = "id, name, email, homeroom_teacher_id, parent_email";

fn rows_to_json(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<serde_json::Value>, HandlerErr> {
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let rows = stmt
        .query_map(params, |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
                "email": r.get::<_, Option<String>>(2)?,
                "homeroomTeacherId": r.get::<_, Option<String>>(3)?,
                "parentEmail": r.get::<_, Option<String>>(4)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err)?;
    Ok(rows)
}

/// Roster view scoped by the caller's identity: admins see everything,
/// teachers their homeroom, students their own row, parents their
/// children's rows.
fn students_for(
    conn: &Connection,
    identity: &Identity,
) -> Result<Vec<serde_json::Value>, HandlerErr> {
    match identity.role {
        Role::Admin => rows_to_json(
            conn,
            &format!("SELECT {STUDENT_COLS} FROM students ORDER BY name"),
            &[],
        ),
        Role::Teacher => {
            let tid = require_record_id(identity)?;
            rows_to_json(
                conn,
                &format!(
                    "SELECT {STUDENT_COLS} FROM students
                     WHERE homeroom_teacher_id = ? ORDER BY name"
                ),
                &[&tid],
            )
        }
        Role::Student => {
            let sid = require_record_id(identity)?;
            rows_to_json(
                conn,
                &format!("SELECT {STUDENT_COLS} FROM students WHERE id = ?"),
                &[&sid],
            )
        }
        Role::Parent => rows_to_json(
            conn,
            &format!(
                "SELECT {STUDENT_COLS} FROM students WHERE parent_email = ? ORDER BY name"
            ),
            &[&identity.email],
        ),
    }
}

fn handle_students(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(identity) = state.auth.identity() else {
        return err(&req.id, "unauthenticated", "no active session", None);
    };
    match students_for(conn, identity) {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.students" => Some(handle_students(state, req)),
        _ => None,
    }
}
