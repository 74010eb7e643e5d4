//! Role store default: no remote role database configured.

use crate::services::auth_gate::{AuthResult, RoleEntry, RoleStore};
use async_trait::async_trait;

/// Stand-in role database. No identity holds a remote role record, so
/// admin status comes only from the allow-list or the local admin. Writes
/// and network directives are accepted and dropped.
pub struct UnconfiguredRoleStore;

#[async_trait]
impl RoleStore for UnconfiguredRoleStore {
    async fn role_exists(&self, _uid: &str) -> AuthResult<bool> {
        Ok(false)
    }

    async fn put_role(&self, _uid: &str, _entry: RoleEntry) -> AuthResult<()> {
        Ok(())
    }

    async fn enable_network(&self) -> AuthResult<()> {
        Ok(())
    }

    async fn disable_network(&self) -> AuthResult<()> {
        Ok(())
    }
}
