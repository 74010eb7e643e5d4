//! src/services/auth_gate.rs
//!
//! AuthGate — tracks the current identity, connectivity, and derived
//! admin role. External identity and role lookups sit behind the
//! [`IdentityProvider`] and [`RoleStore`] traits so the gate can be
//! exercised against fakes and wired to any hosted provider.
//!
//! Session resolution is a polling accessor (`snapshot`) plus an explicit
//! `refresh` that consults the provider once; there is no hidden callback
//! subscription.

use crate::models::session::{Identity, SessionState};
use async_trait::async_trait;
use std::sync::{
    Arc, RwLock,
    atomic::{AtomicBool, Ordering},
};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("identity provider error: {0}")]
    Provider(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("offline: sign-in requires connectivity")]
    Offline,
    #[error("role store error: {0}")]
    RoleStore(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Metadata written when a role record is provisioned for an allow-listed
/// identity on first interactive sign-in.
#[derive(Clone, Debug)]
pub struct RoleEntry {
    pub email: String,
    pub is_owner: bool,
    pub added_by: String,
}

/// External identity provider boundary (interactive and password flows).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current identity, if a session already exists with the provider.
    async fn current_identity(&self) -> AuthResult<Option<Identity>>;

    /// Interactive (e.g. OAuth popup) sign-in flow.
    async fn sign_in_interactive(&self) -> AuthResult<Identity>;

    /// Password sign-in for non-local accounts.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<Identity>;

    async fn sign_out(&self) -> AuthResult<()>;
}

/// External role database boundary.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// True when a role record exists for `uid` (existence grants admin).
    async fn role_exists(&self, uid: &str) -> AuthResult<bool>;

    /// Create or replace the role record for `uid`.
    async fn put_role(&self, uid: &str, entry: RoleEntry) -> AuthResult<()>;

    /// Force the backing client online/offline. Pass-through directives,
    /// not retried.
    async fn enable_network(&self) -> AuthResult<()>;
    async fn disable_network(&self) -> AuthResult<()>;
}

/// Opt-in local admin credentials.
///
/// The original system shipped a hardcoded credential pair that bypassed
/// the identity provider entirely. That behavior is reproduced only when
/// explicitly configured; by default no local admin exists.
#[derive(Clone, Debug)]
pub struct LocalAdmin {
    pub email: String,
    pub password: String,
}

/// Session/authorization gate.
///
/// Owns the session state exclusively; consumers read snapshots. Role
/// resolution runs once per identity change: allow-list hit short-circuits
/// the role store, remote lookup only happens while online, and offline
/// non-allow-listed identities are conservatively denied.
pub struct AuthGate {
    provider: Arc<dyn IdentityProvider>,
    roles: Arc<dyn RoleStore>,
    allowlist: Vec<String>,
    local_admin: Option<LocalAdmin>,
    state: RwLock<SessionState>,
    online: AtomicBool,
    /// True while the current session was synthesized from `LocalAdmin`
    /// credentials rather than the provider.
    local_session: AtomicBool,
}

impl AuthGate {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        roles: Arc<dyn RoleStore>,
        allowlist: Vec<String>,
        local_admin: Option<LocalAdmin>,
    ) -> Self {
        Self {
            provider,
            roles,
            allowlist,
            local_admin,
            state: RwLock::new(SessionState::Unknown),
            online: AtomicBool::new(true),
            local_session: AtomicBool::new(false),
        }
    }

    /// Current session snapshot.
    pub fn snapshot(&self) -> SessionState {
        self.state.read().expect("session lock poisoned").clone()
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Toggle connectivity and pass the directive through to the role
    /// store. The already-resolved session is not recomputed; the flag only
    /// gates future role lookups. Directive failures are logged, not
    /// retried.
    pub async fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        let result = if online {
            self.roles.enable_network().await
        } else {
            self.roles.disable_network().await
        };
        if let Err(err) = result {
            warn!("network directive failed: {}", err);
        }
    }

    fn on_allowlist(&self, email: &str) -> bool {
        self.allowlist
            .iter()
            .any(|entry| entry.eq_ignore_ascii_case(email))
    }

    /// Role resolution: allow-list first (no remote call), then remote
    /// lookup while online, otherwise deny. Remote failures deny rather
    /// than error.
    async fn resolve_role(&self, identity: &Identity) -> bool {
        if self.on_allowlist(&identity.email) {
            return true;
        }
        if !self.is_online() {
            return false;
        }
        match self.roles.role_exists(&identity.uid).await {
            Ok(exists) => exists,
            Err(err) => {
                warn!("role lookup for {} failed: {}", identity.uid, err);
                false
            }
        }
    }

    fn set_state(&self, next: SessionState, local: bool) {
        *self.state.write().expect("session lock poisoned") = next;
        self.local_session.store(local, Ordering::SeqCst);
    }

    async fn apply_identity(&self, identity: Option<Identity>) -> SessionState {
        let next = match identity {
            Some(identity) => {
                let is_admin = self.resolve_role(&identity).await;
                SessionState::SignedIn { identity, is_admin }
            }
            None => SessionState::SignedOut,
        };
        self.set_state(next.clone(), false);
        next
    }

    /// Consult the provider once and apply whatever it reports. Resolves
    /// the initial `Unknown` state on first call. A local-admin session is
    /// never overwritten by a provider poll.
    pub async fn refresh(&self) -> AuthResult<SessionState> {
        if self.local_session.load(Ordering::SeqCst) {
            return Ok(self.snapshot());
        }
        let identity = self.provider.current_identity().await?;
        Ok(self.apply_identity(identity).await)
    }

    /// Interactive provider sign-in.
    ///
    /// On success, if the identity is allow-listed, online, and has no role
    /// record yet, a record is provisioned best-effort; provisioning
    /// failure never fails the sign-in.
    pub async fn sign_in_interactive(&self) -> AuthResult<SessionState> {
        if !self.is_online() {
            return Err(AuthError::Offline);
        }
        let identity = self.provider.sign_in_interactive().await?;

        if self.on_allowlist(&identity.email) {
            match self.roles.role_exists(&identity.uid).await {
                Ok(false) => {
                    let entry = RoleEntry {
                        email: identity.email.clone(),
                        is_owner: true,
                        added_by: "system".to_string(),
                    };
                    if let Err(err) = self.roles.put_role(&identity.uid, entry).await {
                        warn!("provisioning role record for {} failed: {}", identity.uid, err);
                    }
                }
                Ok(true) => {}
                Err(err) => warn!("role pre-check for {} failed: {}", identity.uid, err),
            }
        }

        Ok(self.apply_identity(Some(identity)).await)
    }

    /// Password sign-in.
    ///
    /// When local admin credentials are configured and the email matches,
    /// the provider is bypassed entirely: the correct password synthesizes
    /// a local admin session, any other password is rejected. All other
    /// accounts are forwarded to the provider.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<SessionState> {
        if let Some(local) = &self.local_admin {
            if local.email.eq_ignore_ascii_case(email) {
                if local.password != password {
                    return Err(AuthError::InvalidCredentials);
                }
                info!("local admin session established for {}", email);
                let state = SessionState::SignedIn {
                    identity: Identity {
                        uid: "local-admin".to_string(),
                        email: local.email.clone(),
                        display_name: Some("Admin User".to_string()),
                    },
                    is_admin: true,
                };
                self.set_state(state.clone(), true);
                return Ok(state);
            }
        }

        if !self.is_online() {
            return Err(AuthError::Offline);
        }
        let identity = self.provider.sign_in_with_password(email, password).await?;
        Ok(self.apply_identity(Some(identity)).await)
    }

    /// Sign out. Local admin sessions just clear state; provider sessions
    /// delegate to the provider first and fail only if it does.
    pub async fn sign_out(&self) -> AuthResult<()> {
        if !self.local_session.load(Ordering::SeqCst) {
            self.provider.sign_out().await?;
        }
        self.set_state(SessionState::SignedOut, false);
        Ok(())
    }
}
