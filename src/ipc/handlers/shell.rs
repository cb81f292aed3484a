use crate::ipc::error::{err, ok};
use crate::ipc::handlers::gate::evaluate_for_role;
use crate::ipc::types::{AppState, Request};
use crate::nav;
use crate::session::Role;
use serde_json::json;

/// Composes the dashboard shell for one role: navigation config, header
/// identity, and the gate decision for the content region. No state of
/// its own.
fn handle_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let role_raw = req.params.get("role").and_then(|v| v.as_str());
    let Some(role_raw) = role_raw else {
        return err(&req.id, "bad_params", "missing params.role", None);
    };
    let Some(role) = Role::parse(role_raw) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown role: {}", role_raw),
            None,
        );
    };

    let gate = evaluate_for_role(state, role);

    let nav_items: Vec<serde_json::Value> = nav::items(role)
        .iter()
        .map(|item| json!({ "label": item.label, "path": item.path }))
        .collect();

    let header = state.auth.identity().map(|identity| {
        json!({
            "email": identity.email,
            "role": identity.role.as_str()
        })
    });

    ok(
        &req.id,
        json!({
            "gate": gate,
            "nav": nav_items,
            "header": header
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "shell.open" => Some(handle_open(state, req)),
        _ => None,
    }
}
