//! Authentication collaborator boundary.
//!
//! # Responsibility
//! - Expose the "current authenticated principal, or none" contract the
//!   service layer consumes.
//! - Keep credential handling entirely outside the core.
//!
//! # Invariants
//! - Resolving a principal has no side effects and never fails; absence is
//!   represented as `None`, not as an error.

use crate::model::user::UserId;

/// Operation context capable of naming the authenticated principal.
///
/// Implemented by embedders over their session mechanism; services call it
/// exactly once at the start of every operation.
pub trait AuthContext {
    /// Returns the authenticated principal's user id, or `None` when the
    /// context is unauthenticated.
    fn principal(&self) -> Option<UserId>;
}

/// Fixed-principal context for embedders and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticPrincipal(Option<UserId>);

impl StaticPrincipal {
    /// Context authenticated as the given user.
    pub fn of(user: UserId) -> Self {
        Self(Some(user))
    }

    /// Context with no authenticated principal.
    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl AuthContext for StaticPrincipal {
    fn principal(&self) -> Option<UserId> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthContext, StaticPrincipal};
    use uuid::Uuid;

    #[test]
    fn static_principal_reports_identity() {
        let id = Uuid::new_v4();
        assert_eq!(StaticPrincipal::of(id).principal(), Some(id));
        assert_eq!(StaticPrincipal::anonymous().principal(), None);
    }
}
