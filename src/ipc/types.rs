use std::collections::HashMap;
use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::gate::RoleGate;
use crate::session::Role;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub auth: AuthContext,
    /// One mounted gate per protected subtree, keyed by required role.
    pub gates: HashMap<Role, RoleGate>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            auth: AuthContext::new(),
            gates: HashMap::new(),
        }
    }

    /// Login, logout, and restore all route through here so every mounted
    /// gate re-enters Pending and in-flight check results go stale.
    pub fn notify_identity_changed(&mut self) {
        for gate in self.gates.values_mut() {
            gate.identity_changed();
        }
    }
}
