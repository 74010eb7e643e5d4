//! Identity provider default: no external provider configured.

use crate::models::session::Identity;
use crate::services::auth_gate::{AuthError, AuthResult, IdentityProvider};
use async_trait::async_trait;

/// Stand-in used when no hosted identity provider is wired up. There is
/// never an existing session, and every sign-in attempt fails; only the
/// configured local admin (handled by the gate itself) can sign in.
pub struct UnconfiguredIdentityProvider;

#[async_trait]
impl IdentityProvider for UnconfiguredIdentityProvider {
    async fn current_identity(&self) -> AuthResult<Option<Identity>> {
        Ok(None)
    }

    async fn sign_in_interactive(&self) -> AuthResult<Identity> {
        Err(AuthError::Provider("no identity provider configured".into()))
    }

    async fn sign_in_with_password(&self, _email: &str, _password: &str) -> AuthResult<Identity> {
        Err(AuthError::Provider("no identity provider configured".into()))
    }

    async fn sign_out(&self) -> AuthResult<()> {
        Ok(())
    }
}
