use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db;

/// Well-known settings slot holding the serialized identity.
pub const SESSION_SLOT: &str = "session.identity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Parent,
    Student,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "teacher" => Some(Self::Teacher),
            "parent" => Some(Self::Parent),
            "student" => Some(Self::Student),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Teacher => "teacher",
            Self::Parent => "parent",
            Self::Student => "student",
        }
    }

    pub fn dashboard_root(self) -> &'static str {
        match self {
            Self::Admin => "/dashboard",
            Self::Teacher => "/teacher/dashboard",
            Self::Parent => "/parent/dashboard",
            Self::Student => "/student/dashboard",
        }
    }

    /// Where a denied visitor is sent. Students share the unified login page.
    pub fn login_route(self) -> &'static str {
        match self {
            Self::Admin => "/login",
            Self::Teacher => "/teacher/login",
            Self::Parent => "/parent/login",
            Self::Student => "/login",
        }
    }

    pub fn password_change_route(self) -> &'static str {
        match self {
            Self::Admin => "/password-change",
            Self::Teacher => "/teacher/password-change",
            Self::Parent => "/parent/password-change",
            Self::Student => "/student/password-change",
        }
    }

    /// Roles whose accounts are provisioned with temporary credentials and
    /// must pass a password-change check before their dashboard renders.
    pub fn has_password_check(self) -> bool {
        matches!(self, Self::Teacher)
    }
}

/// The authenticated principal. `id` scopes roster queries for roles that
/// map onto a record of their own (teachers, students).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Persists the identity across page loads. A value that fails to parse is
/// cleared and reported as absent, never as an error.
pub fn save(conn: &Connection, identity: &Identity) -> anyhow::Result<()> {
    let raw = serde_json::to_string(identity)?;
    db::settings_set(conn, SESSION_SLOT, &raw)
}

pub fn load(conn: &Connection) -> Option<Identity> {
    let raw = match db::settings_get(conn, SESSION_SLOT) {
        Ok(Some(v)) => v,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("session slot read failed: {e}");
            return None;
        }
    };
    match serde_json::from_str::<Identity>(&raw) {
        Ok(identity) => Some(identity),
        Err(_) => {
            // Corrupt slot: drop it so the next load is clean.
            if let Err(e) = db::settings_remove(conn, SESSION_SLOT) {
                log::warn!("failed to clear corrupt session slot: {e}");
            }
            None
        }
    }
}

pub fn clear(conn: &Connection) -> anyhow::Result<()> {
    db::settings_remove(conn, SESSION_SLOT)
}
