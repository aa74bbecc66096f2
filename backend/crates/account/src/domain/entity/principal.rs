//! Principal Entity
//!
//! An authenticated identity as reported by the identity gateway.
//! Read-only from this system's point of view.

use crate::domain::value_object::{email::Email, principal_id::PrincipalId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: PrincipalId,
    /// Absent for some federated accounts
    pub email: Option<Email>,
    /// Gateway-side display name, unvalidated
    pub display_name: Option<String>,
}

impl Principal {
    pub fn new(id: PrincipalId, email: Option<Email>, display_name: Option<String>) -> Self {
        Self {
            id,
            email,
            display_name: display_name.filter(|name| !name.trim().is_empty()),
        }
    }
}
