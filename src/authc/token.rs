use std::fmt;
use std::net::IpAddr;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use serde::Deserialize;
use tracing::debug;

use crate::secret::Secret;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    UsernamePassword,
    Bearer,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenKind::UsernamePassword => write!(f, "username-password"),
            TokenKind::Bearer => write!(f, "bearer"),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Credentials {
    UsernamePassword {
        username: String,
        password: Secret<String>,
    },
    Bearer(Secret<String>),
}

/// Credentials submitted for one login attempt, plus request metadata.
#[derive(Clone, Debug)]
pub struct AuthenticationToken {
    credentials: Credentials,
    host: Option<IpAddr>,
    remember_me: bool,
}

impl AuthenticationToken {
    pub fn username_password(
        username: impl Into<String>,
        password: impl Into<Secret<String>>,
    ) -> Self {
        Self::new(Credentials::UsernamePassword {
            username: username.into(),
            password: password.into(),
        })
    }

    pub fn bearer(token: impl Into<Secret<String>>) -> Self {
        Self::new(Credentials::Bearer(token.into()))
    }

    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            host: None,
            remember_me: false,
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = Some(host);
        self
    }

    #[must_use]
    pub fn with_remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }

    /// Builds a token from an HTTP `Authorization` header value (`Basic` or `Bearer`).
    pub fn from_authorization_header(value: &str) -> Option<Self> {
        if let Some(encoded) = value.strip_prefix("Basic ") {
            let decoded = BASE64_STANDARD.decode(encoded.trim()).ok()?;
            let decoded = String::from_utf8(decoded).ok()?;
            let (username, password) = decoded.split_once(':')?;
            return Some(Self::username_password(username, password));
        }

        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if token.is_empty() {
                return None;
            }
            return Some(Self::bearer(token));
        }

        debug!("Unrecognized authorization scheme");
        None
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn kind(&self) -> TokenKind {
        match self.credentials {
            Credentials::UsernamePassword { .. } => TokenKind::UsernamePassword,
            Credentials::Bearer(_) => TokenKind::Bearer,
        }
    }

    /// The identifier submitted with the token, if it carries one in cleartext.
    pub fn principal(&self) -> Option<&str> {
        match &self.credentials {
            Credentials::UsernamePassword { username, .. } => Some(username),
            Credentials::Bearer(_) => None,
        }
    }

    pub fn host(&self) -> Option<IpAddr> {
        self.host
    }

    pub fn remember_me(&self) -> bool {
        self.remember_me
    }
}

impl fmt::Display for AuthenticationToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}[", self.kind())?;
        match self.principal() {
            Some(principal) => write!(f, "{principal}")?,
            None => write!(f, "<opaque>")?,
        }
        if let Some(host) = self.host {
            write!(f, " from {host}")?;
        }
        write!(f, "]")
    }
}
