/// Claims derivation
///
/// Maps an identity to the additional claims embedded in its access tokens.
/// Implementations must be pure: same username, same claims.

use std::collections::HashSet;

use serde_json::Value;

use crate::auth::claims::AdditionalClaims;

pub trait ClaimsPolicy: Send + Sync {
    fn claims_for(&self, identity: &str) -> AdditionalClaims;
}

/// Grants `employee: true` to a fixed set of usernames, `false` to everyone else
#[derive(Debug, Clone, Default)]
pub struct EmployeeAllowlist {
    employees: HashSet<String>,
}

impl EmployeeAllowlist {
    pub fn new<I, S>(employees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            employees: employees.into_iter().map(Into::into).collect(),
        }
    }
}

impl ClaimsPolicy for EmployeeAllowlist {
    fn claims_for(&self, identity: &str) -> AdditionalClaims {
        let mut claims = AdditionalClaims::new();
        claims.insert(
            "employee".to_string(),
            Value::Bool(self.employees.contains(identity)),
        );
        claims
    }
}
