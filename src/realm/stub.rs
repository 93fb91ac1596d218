use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::{Realm, RealmError};
use crate::authc::{Account, AuthenticationError, AuthenticationToken, TokenKind};

#[derive(Clone, Debug)]
pub enum Behavior {
    Found,
    NotFound,
    WrongPassword,
    Internal,
    Unavailable,
    Panic,
    /// Returns an account whose principal name is whitespace.
    Blank,
    /// Never completes.
    Pending,
}

/// Deterministic realm for pipeline tests; counts how many times it was queried.
pub struct StubRealm {
    name: String,
    supported: Option<TokenKind>,
    behavior: Behavior,
    roles: Vec<String>,
    queries: AtomicUsize,
}

impl StubRealm {
    pub fn new(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            supported: Some(TokenKind::UsernamePassword),
            behavior,
            roles: Vec::new(),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn unsupported(name: &str) -> Self {
        Self {
            supported: None,
            ..Self::new(name, Behavior::Found)
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.roles.push(role.to_string());
        self
    }

    pub fn shared(self) -> Arc<StubRealm> {
        Arc::new(self)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Realm for StubRealm {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, token: &AuthenticationToken) -> bool {
        self.supported == Some(token.kind())
    }

    async fn get_account(
        &self,
        token: &AuthenticationToken,
    ) -> Result<Option<Account>, RealmError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let principal = token.principal().unwrap_or_default();

        match self.behavior {
            Behavior::Found => Ok(Some(
                Account::new(&self.name, format!("{principal}@{}", self.name))
                    .with_roles(self.roles.clone()),
            )),
            Behavior::NotFound => Ok(None),
            Behavior::WrongPassword => Err(AuthenticationError::IncorrectCredentials(
                format!("bad password in {}", self.name),
            )
            .into()),
            Behavior::Internal => Err(RealmError::internal(io::Error::other("directory down"))),
            Behavior::Unavailable => Err(RealmError::unavailable("timed out")),
            Behavior::Panic => panic!("realm {} exploded", self.name),
            Behavior::Blank => Ok(Some(Account::new(&self.name, "  "))),
            Behavior::Pending => std::future::pending().await,
        }
    }
}
