use storefront_auth::{Principal, Role};
use storefront_core::UserId;

/// Principal context for a request (authenticated identity + roles).
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn display_name(&self) -> &str {
        &self.principal.display_name
    }

    pub fn roles(&self) -> &[Role] {
        &self.principal.roles
    }

    pub fn is_admin(&self) -> bool {
        self.principal.is_admin()
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}
