use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier (e.g. "orders.manage").
///
/// The wildcard `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    /// View every order, advance order status, read the sales report.
    pub const MANAGE_ORDERS: Permission = Permission(Cow::Borrowed("orders.manage"));

    /// Create products and restock them.
    pub const MANAGE_CATALOG: Permission = Permission(Cow::Borrowed("catalog.manage"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }

    /// Role → permission policy. Admins get everything; shoppers need no
    /// extra permissions beyond being authenticated.
    pub fn for_roles(roles: &[Role]) -> Vec<Permission> {
        if roles.iter().any(Role::is_admin) {
            return vec![Permission::WILDCARD];
        }
        Vec::new()
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
