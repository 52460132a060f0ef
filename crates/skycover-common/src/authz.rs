//! Capability checks
//!
//! Mutating operations with an administrative surface start with an
//! explicit `require(caller, permission)` call. There is no dynamic role
//! dispatch: a caller carries its roles, each role grants a fixed set of
//! permissions.

use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Roles an operator account may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Full administrative control
    Admin,
    /// Day-to-day operations: yield distribution, batch runs
    Operator,
}

/// Fine-grained permissions checked per operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    ConfigurePool,
    Pause,
    Resume,
    CancelPolicy,
    DistributeYield,
    RunBatch,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Role {
    fn grants(&self, permission: Permission) -> bool {
        match self {
            Role::Admin => true,
            Role::Operator => matches!(
                permission,
                Permission::DistributeYield | Permission::RunBatch
            ),
        }
    }
}

/// Caller identity presented to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Account identifier
    pub account: String,
    /// Roles granted to this account
    pub roles: Vec<Role>,
}

impl Caller {
    pub fn new(account: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            account: account.into(),
            roles,
        }
    }

    /// Plain account with no administrative roles.
    pub fn user(account: impl Into<String>) -> Self {
        Self::new(account, Vec::new())
    }
}

/// Check that `caller` holds `permission`.
pub fn require(caller: &Caller, permission: Permission) -> Result<(), AuthError> {
    if caller.roles.iter().any(|r| r.grants(permission)) {
        Ok(())
    } else {
        Err(AuthError::MissingPermission {
            account: caller.account.clone(),
            permission: permission.to_string(),
        })
    }
}
