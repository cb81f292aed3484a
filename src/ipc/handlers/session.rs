use crate::auth::AuthError;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::session::{Identity, Role};
use serde_json::json;

fn identity_json(identity: &Identity) -> serde_json::Value {
    serde_json::to_value(identity).unwrap_or_else(|_| json!(null))
}

fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| format!("missing {}", key))
}

fn handle_initialize(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    state.auth.initialize(conn);
    let identity = state.auth.identity().cloned();
    state.notify_identity_changed();
    ok(
        &req.id,
        json!({
            "identity": identity.as_ref().map(identity_json),
            "loading": false
        }),
    )
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let email = match get_required_str(&req.params, "email") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let password = match get_required_str(&req.params, "password") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };

    match state.auth.login(conn, &email, &password) {
        Ok((identity, navigate_to)) => {
            state.notify_identity_changed();
            ok(
                &req.id,
                json!({
                    "identity": identity_json(&identity),
                    "navigateTo": navigate_to
                }),
            )
        }
        Err(AuthError::NotFound) => err(&req.id, "not_found", "no account for that email", None),
        Err(AuthError::InvalidCredential) => {
            err(&req.id, "invalid_credential", "invalid credential", None)
        }
        Err(AuthError::Lookup(m)) => err(&req.id, "db_query_failed", m, None),
    }
}

fn handle_assume(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(params) = req.params.get("identity") else {
        return err(&req.id, "bad_params", "missing params.identity", None);
    };
    let email = match get_required_str(params, "email") {
        Ok(v) => v,
        Err(_) => return err(&req.id, "bad_params", "missing identity.email", None),
    };
    let role_raw = match get_required_str(params, "role") {
        Ok(v) => v,
        Err(_) => return err(&req.id, "bad_params", "missing identity.role", None),
    };
    let Some(role) = Role::parse(&role_raw) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown role: {}", role_raw),
            None,
        );
    };
    let id = params
        .get("id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let identity = Identity { email, role, id };
    match state.auth.assume(conn, identity) {
        Ok((identity, navigate_to)) => {
            state.notify_identity_changed();
            ok(
                &req.id,
                json!({
                    "identity": identity_json(&identity),
                    "navigateTo": navigate_to
                }),
            )
        }
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let navigate_to = state.auth.logout(conn);
    state.notify_identity_changed();
    ok(&req.id, json!({ "navigateTo": navigate_to }))
}

fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "identity": state.auth.identity().map(identity_json),
            "loading": state.auth.loading()
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.initialize" => Some(handle_initialize(state, req)),
        "auth.login" => Some(handle_login(state, req)),
        "auth.assume" => Some(handle_assume(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        _ => None,
    }
}
