use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::db;
use crate::session::{self, Identity, Role};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no account for that email")]
    NotFound,
    #[error("invalid credential")]
    InvalidCredential,
    #[error("credential lookup failed: {0}")]
    Lookup(String),
}

/// One-way digest used for credential comparison. Plaintext is never stored.
pub fn credential_hash(raw: &str) -> String {
    format!("{:x}", Sha256::digest(raw.as_bytes()))
}

/// Single source of truth for "who is logged in" within one UI tab.
/// Mutated only by its own operations; read-only everywhere else.
pub struct AuthContext {
    identity: Option<Identity>,
    loading: bool,
}

impl AuthContext {
    /// Starts in the loading state: no gate may decide until `initialize`
    /// has restored (or failed to restore) the persisted session.
    pub fn new() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Restores the session from the store. Never fails outward; any
    /// internal failure degrades to "no identity".
    pub fn initialize(&mut self, conn: &Connection) {
        self.loading = true;
        self.identity = session::load(conn);
        self.loading = false;
    }

    /// Admin login path. Other roles authenticate through an external
    /// identity provider and enter via `assume`.
    ///
    /// On success: exactly one persist and one navigation signal. On any
    /// failure: no state mutation, loading flag reset.
    pub fn login(
        &mut self,
        conn: &Connection,
        email: &str,
        password: &str,
    ) -> Result<(Identity, &'static str), AuthError> {
        self.loading = true;
        let out = self.login_inner(conn, email, password);
        self.loading = false;
        out
    }

    fn login_inner(
        &mut self,
        conn: &Connection,
        email: &str,
        password: &str,
    ) -> Result<(Identity, &'static str), AuthError> {
        let record = db::admin_by_email(conn, email)
            .map_err(|e| AuthError::Lookup(e.to_string()))?
            .ok_or(AuthError::NotFound)?;
        if credential_hash(password) != record.password_hash {
            return Err(AuthError::InvalidCredential);
        }
        let identity = Identity {
            email: record.email,
            role: Role::Admin,
            id: Some(record.id),
        };
        session::save(conn, &identity).map_err(|e| AuthError::Lookup(e.to_string()))?;
        self.identity = Some(identity.clone());
        Ok((identity, Role::Admin.dashboard_root()))
    }

    /// Accepts an identity asserted by the external provider and holds it
    /// exactly like a login result. Performs no credential verification.
    pub fn assume(
        &mut self,
        conn: &Connection,
        identity: Identity,
    ) -> Result<(Identity, &'static str), AuthError> {
        session::save(conn, &identity).map_err(|e| AuthError::Lookup(e.to_string()))?;
        let nav = identity.role.dashboard_root();
        self.identity = Some(identity.clone());
        self.loading = false;
        Ok((identity, nav))
    }

    /// Idempotent: with no active identity this is a no-op beyond the
    /// navigation signal.
    pub fn logout(&mut self, conn: &Connection) -> &'static str {
        self.identity = None;
        self.loading = false;
        if let Err(e) = session::clear(conn) {
            log::warn!("failed to clear session slot on logout: {e}");
        }
        "/login"
    }
}
