use crate::db;
use crate::gate::{GateDecision, RoleGate, SecondaryCheck};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::session::Role;
use serde_json::json;

pub fn decision_json(decision: &GateDecision) -> serde_json::Value {
    match decision {
        GateDecision::Allow => json!({ "decision": "allow" }),
        GateDecision::StillLoading => json!({ "decision": "pending" }),
        GateDecision::RedirectToLogin(route) => json!({
            "decision": "redirect_login",
            "navigateTo": route
        }),
        GateDecision::RedirectToPasswordChange { route, reason } => json!({
            "decision": "redirect_password_change",
            "navigateTo": route,
            "reason": reason
        }),
    }
}

/// Runs one evaluation of the mounted gate for `role`, driving the
/// secondary lookup first when the gate is waiting on it. Shared with the
/// shell handler.
pub fn evaluate_for_role(state: &mut AppState, role: Role) -> serde_json::Value {
    let conn = state.db.as_ref();
    let gate = state
        .gates
        .entry(role)
        .or_insert_with(|| RoleGate::new(role));
    let identity = state.auth.identity();
    let loading = state.auth.loading();

    // The secondary check only starts once the role match has succeeded.
    if gate.wants_secondary() && !loading {
        if let Some(identity) = identity.filter(|i| i.role == role) {
            let Some(record_id) = identity.id.as_deref() else {
                // Identity carries no record to check against.
                return decision_json(&gate.force_deny());
            };
            if let Some(conn) = conn {
                match db::teacher_must_change_password(conn, record_id) {
                    Ok(Some(true)) => {
                        let epoch = gate.epoch();
                        gate.resolve_secondary(epoch, SecondaryCheck::Required);
                    }
                    Ok(Some(false)) => {
                        let epoch = gate.epoch();
                        gate.resolve_secondary(epoch, SecondaryCheck::NotRequired);
                    }
                    Ok(None) => {
                        // No underlying record at all: deny, back to login.
                        return decision_json(&gate.force_deny());
                    }
                    Err(e) => {
                        // Transient lookup failure: check stays unresolved,
                        // the gate stays pending.
                        log::warn!("password-change lookup failed: {e}");
                    }
                }
            }
        }
    }

    let decision = gate.evaluate(identity, loading);
    log::debug!("gate {} -> {:?}", role.as_str(), gate.state());
    decision_json(&decision)
}

fn handle_evaluate(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let role_raw = req.params.get("requiredRole").and_then(|v| v.as_str());
    let Some(role_raw) = role_raw else {
        return err(&req.id, "bad_params", "missing params.requiredRole", None);
    };
    let Some(role) = Role::parse(role_raw) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown role: {}", role_raw),
            None,
        );
    };
    ok(&req.id, evaluate_for_role(state, role))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "gate.evaluate" => Some(handle_evaluate(state, req)),
        _ => None,
    }
}
