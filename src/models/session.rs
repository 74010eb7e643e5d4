//! Session and identity types for the authorization gate.

use serde::Serialize;

/// A resolved user identity from the external identity provider.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Provider-assigned unique id.
    pub uid: String,

    /// Email address used for allow-list matching.
    pub email: String,

    /// Display name, when the provider supplies one.
    pub display_name: Option<String>,
}

/// Current session as seen by consumers of the gate.
///
/// `Unknown` is the initial state before the identity provider has been
/// consulted for the first time; it resolves to `SignedOut` or `SignedIn`
/// and never recurs for the lifetime of the process.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Unknown,
    SignedOut,
    SignedIn { identity: Identity, is_admin: bool },
}

impl SessionState {
    /// True only for an admin `SignedIn` session.
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            SessionState::SignedIn { is_admin: true, .. }
        )
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::SignedIn { identity, .. } => Some(identity),
            _ => None,
        }
    }
}
