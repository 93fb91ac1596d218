
use std::collections::{BTreeSet, HashMap};

use argon2::password_hash::PasswordHashString;
use argon2::{Argon2, PasswordVerifier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{Realm, RealmError};
use crate::authc::{Account, AuthenticationError, AuthenticationToken, Credentials};
use crate::authz::Permission;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    pub name: String,
    #[serde(default)]
    pub users: HashMap<String, UserConfig>,
    #[serde(default)]
    pub roles: HashMap<String, RoleConfig>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserConfig {
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub disabled: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RoleConfig {
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

struct MemoryUser {
    password: PasswordHashString,
    roles: BTreeSet<String>,
    permissions: Vec<Permission>,
    disabled: bool,
    expires_at: Option<DateTime<Utc>>,
}

/// Realm backed by users and roles declared in the configuration file.
///
/// Passwords are stored as argon2 PHC strings; a user's effective permissions are its own
/// permissions plus those of every role it holds.
pub struct MemoryRealm {
    name: String,
    users: HashMap<String, MemoryUser>,
}

fn build_users(config: &Config) -> HashMap<String, MemoryUser> {
    let mut users = HashMap::new();

    for (username, user) in &config.users {
        let password = match PasswordHashString::new(&user.password) {
            Ok(hash) => hash,
            Err(err) => {
                warn!(
                    "Invalid password hash for user {username} in realm {}: {err}",
                    config.name
                );
                continue;
            }
        };

        let mut permissions = user.permissions.clone();
        for role in &user.roles {
            match config.roles.get(role) {
                Some(role_config) => {
                    for permission in &role_config.permissions {
                        if !permissions.contains(permission) {
                            permissions.push(permission.clone());
                        }
                    }
                }
                None => warn!(
                    "User {username} references unknown role {role} in realm {}",
                    config.name
                ),
            }
        }

        users.insert(
            username.clone(),
            MemoryUser {
                password,
                roles: user.roles.iter().cloned().collect(),
                permissions,
                disabled: user.disabled,
                expires_at: user.expires_at,
            },
        );
    }

    users
}

impl MemoryRealm {
    pub fn new(config: &Config) -> Self {
        Self {
            name: config.name.clone(),
            users: build_users(config),
        }
    }

    #[instrument(skip(self, password), fields(realm = %self.name))]
    fn verify(&self, username: &str, password: &str) -> Result<Option<Account>, RealmError> {
        let Some(user) = self.users.get(username) else {
            debug!("Username not found in realm");
            return Ok(None);
        };

        if user.disabled {
            return Err(AuthenticationError::DisabledAccount(format!(
                "Account '{username}' is disabled"
            ))
            .into());
        }

        if let Some(expires_at) = user.expires_at {
            if expires_at <= Utc::now() {
                return Err(AuthenticationError::ExpiredCredentials(format!(
                    "Credentials for '{username}' expired at {expires_at}"
                ))
                .into());
            }
        }

        if let Err(error) =
            Argon2::default().verify_password(password.as_bytes(), &user.password.password_hash())
        {
            debug!("Password verification failed: {error}");
            return Err(AuthenticationError::IncorrectCredentials(format!(
                "Submitted credentials for '{username}' did not match"
            ))
            .into());
        }

        let account = Account::new(&self.name, username)
            .with_roles(user.roles.iter().cloned())
            .with_permissions(user.permissions.iter().cloned());

        Ok(Some(account))
    }
}

#[async_trait]
impl Realm for MemoryRealm {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, token: &AuthenticationToken) -> bool {
        matches!(token.credentials(), Credentials::UsernamePassword { .. })
    }

    async fn get_account(
        &self,
        token: &AuthenticationToken,
    ) -> Result<Option<Account>, RealmError> {
        let Credentials::UsernamePassword { username, password } = token.credentials() else {
            return Err(AuthenticationError::UnsupportedToken(format!(
                "Realm '{}' only accepts username/password tokens",
                self.name
            ))
            .into());
        };

        self.verify(username, password.expose())
    }
}
