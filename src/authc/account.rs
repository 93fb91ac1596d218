use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::authz::{AuthorizationInfo, Permission};
use crate::secret::Secret;

/// An identifier for an account, tagged with the realm that vouched for it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Principal {
    pub realm: String,
    pub name: String,
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.realm)
    }
}

/// Identity resolved by one or more realms.
///
/// An account always holds at least one principal; the first one is the primary principal.
/// Credentials are never serialized and only kept for cross-realm matching.
#[derive(Clone, Debug, Serialize)]
pub struct Account {
    principals: Vec<Principal>,
    #[serde(skip)]
    credentials: Option<Secret<String>>,
    roles: BTreeSet<String>,
    permissions: Vec<Permission>,
}

impl Account {
    pub fn new(realm: impl Into<String>, principal: impl Into<String>) -> Self {
        Self {
            principals: vec![Principal {
                realm: realm.into(),
                name: principal.into(),
            }],
            credentials: None,
            roles: BTreeSet::new(),
            permissions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: impl Into<Secret<String>>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }

    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_permissions<I>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        for permission in permissions {
            self.add_permission(permission);
        }
        self
    }

    pub fn add_permission(&mut self, permission: Permission) {
        if !self.permissions.contains(&permission) {
            self.permissions.push(permission);
        }
    }

    pub fn primary_principal(&self) -> &Principal {
        &self.principals[0]
    }

    pub fn principals(&self) -> &[Principal] {
        &self.principals
    }

    pub fn credentials(&self) -> Option<&Secret<String>> {
        self.credentials.as_ref()
    }

    /// Names of the realms that contributed to this account, in contribution order.
    pub fn realm_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for principal in &self.principals {
            if !names.contains(&principal.realm.as_str()) {
                names.push(&principal.realm);
            }
        }
        names
    }

    /// Folds `other` into this account: principals, roles and permissions are unioned,
    /// existing credentials win.
    pub fn merge(&mut self, other: Account) {
        let Account {
            principals,
            credentials,
            roles,
            permissions,
        } = other;

        for principal in principals {
            if !self.principals.contains(&principal) {
                self.principals.push(principal);
            }
        }

        if self.credentials.is_none() {
            self.credentials = credentials;
        }

        self.roles.extend(roles);
        for permission in permissions {
            self.add_permission(permission);
        }
    }
}

impl AuthorizationInfo for Account {
    fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    fn permissions(&self) -> &[Permission] {
        &self.permissions
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.primary_principal())
    }
}
