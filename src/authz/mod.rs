mod permission;

use std::collections::BTreeSet;
use std::fmt;

pub use permission::Permission;

#[derive(Debug, PartialEq)]
pub enum PermissionError {
    Empty,
    EmptyPart(String),
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PermissionError::Empty => write!(f, "Permission string cannot be empty"),
            PermissionError::EmptyPart(raw) => {
                write!(f, "Permission '{raw}' contains an empty part")
            }
        }
    }
}

impl std::error::Error for PermissionError {}

#[derive(Debug, PartialEq)]
pub enum AuthorizationError {
    MissingRole(String),
    Unauthorized(String),
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthorizationError::MissingRole(role) => write!(f, "Missing role '{role}'"),
            AuthorizationError::Unauthorized(permission) => {
                write!(f, "Permission '{permission}' is not granted")
            }
        }
    }
}

impl std::error::Error for AuthorizationError {}

/// Role and permission data attached to an identity, with the checks derived from it.
pub trait AuthorizationInfo {
    fn roles(&self) -> &BTreeSet<String>;

    fn permissions(&self) -> &[Permission];

    fn has_role(&self, role: &str) -> bool {
        self.roles().contains(role)
    }

    fn has_all_roles<'a, I>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        roles.into_iter().all(|role| self.has_role(role))
    }

    fn is_permitted(&self, permission: &Permission) -> bool {
        self.permissions()
            .iter()
            .any(|granted| granted.implies(permission))
    }

    fn check_role(&self, role: &str) -> Result<(), AuthorizationError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(AuthorizationError::MissingRole(role.to_string()))
        }
    }

    fn check_permission(&self, permission: &Permission) -> Result<(), AuthorizationError> {
        if self.is_permitted(permission) {
            Ok(())
        } else {
            Err(AuthorizationError::Unauthorized(permission.to_string()))
        }
    }
}
