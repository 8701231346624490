//! Authorization hook for session revocation.

use std::collections::HashSet;

use crate::AuthResult;
use crate::error::AuthError;
use crate::types::session::{Identity, Session};

/// Decides whether `caller` may revoke `target`.
pub trait RevocationPolicy: Send + Sync {
    /// Authorizes a revocation.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Forbidden` if the caller may not revoke the session.
    fn authorize(&self, caller: &Identity, target: &Session) -> AuthResult<()>;

    /// Returns `true` if `caller` may revoke sessions of any identity.
    ///
    /// Only such callers learn whether an unknown session id exists; everyone
    /// else gets the same refusal as for another identity's session.
    fn may_revoke_any(&self, _caller: &Identity) -> bool {
        false
    }
}

/// Lets identities revoke their own sessions, and admins revoke any session.
#[derive(Debug, Clone, Default)]
pub struct OwnerOrAdmin {
    admins: HashSet<Identity>,
}

impl OwnerOrAdmin {
    /// Creates a policy with the given admin identities.
    #[must_use]
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Identity>,
    {
        Self {
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if `identity` is an admin.
    #[must_use]
    pub fn is_admin(&self, identity: &Identity) -> bool {
        self.admins.contains(identity)
    }
}

impl RevocationPolicy for OwnerOrAdmin {
    fn authorize(&self, caller: &Identity, target: &Session) -> AuthResult<()> {
        if &target.identity == caller || self.is_admin(caller) {
            Ok(())
        } else {
            Err(AuthError::forbidden(format!(
                "{caller} may not revoke sessions of another identity"
            )))
        }
    }

    fn may_revoke_any(&self, caller: &Identity) -> bool {
        self.is_admin(caller)
    }
}
