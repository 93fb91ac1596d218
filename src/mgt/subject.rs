use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::authc::{Account, AuthenticationToken, Principal};
use crate::authz::{AuthorizationInfo, Permission};

/// An authenticated identity, as returned by a successful login.
#[derive(Clone, Debug, Serialize)]
pub struct Subject {
    id: Uuid,
    #[serde(flatten)]
    account: Account,
    authenticated: bool,
    host: Option<IpAddr>,
    remember_me: bool,
    authenticated_at: DateTime<Utc>,
}

impl Subject {
    pub fn new(account: Account, token: &AuthenticationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            account,
            authenticated: true,
            host: token.host(),
            remember_me: token.remember_me(),
            authenticated_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn primary_principal(&self) -> &Principal {
        self.account.primary_principal()
    }

    pub fn principals(&self) -> &[Principal] {
        self.account.principals()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn host(&self) -> Option<IpAddr> {
        self.host
    }

    pub fn is_remembered(&self) -> bool {
        self.remember_me
    }

    pub fn authenticated_at(&self) -> DateTime<Utc> {
        self.authenticated_at
    }
}

impl AuthorizationInfo for Subject {
    fn roles(&self) -> &BTreeSet<String> {
        self.account.roles()
    }

    fn permissions(&self) -> &[Permission] {
        self.account.permissions()
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.account, self.id)
    }
}
