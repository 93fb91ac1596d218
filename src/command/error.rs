use crate::authc::AuthenticationError;
use crate::authz::{AuthorizationError, PermissionError};
use crate::command::argon;
use crate::configuration;
use std::{fmt, io};

#[derive(Debug)]
pub enum Error {
    IO(io::Error),
    Configuration(configuration::Error),
    Argon(argon::Error),
    Authentication(AuthenticationError),
    Authorization(AuthorizationError),
    Permission(PermissionError),
    Serialization(serde_json::Error),
    Metrics(prometheus::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::IO(err) => write!(f, "IO error: {err}"),
            Error::Configuration(err) => {
                write!(f, "Configuration error:")?;
                write!(f, "{err}")
            }
            Error::Argon(err) => write!(f, "Password hashing error: {err}"),
            Error::Authentication(err) => write!(f, "Authentication failed: {err}"),
            Error::Authorization(err) => write!(f, "Authorization failed: {err}"),
            Error::Permission(err) => write!(f, "Invalid permission: {err}"),
            Error::Serialization(err) => write!(f, "Serialization error: {err}"),
            Error::Metrics(err) => write!(f, "Metrics error: {err}"),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IO(err)
    }
}

impl From<configuration::Error> for Error {
    fn from(err: configuration::Error) -> Self {
        Error::Configuration(err)
    }
}

impl From<argon::Error> for Error {
    fn from(err: argon::Error) -> Self {
        Error::Argon(err)
    }
}

impl From<AuthenticationError> for Error {
    fn from(err: AuthenticationError) -> Self {
        Error::Authentication(err)
    }
}

impl From<AuthorizationError> for Error {
    fn from(err: AuthorizationError) -> Self {
        Error::Authorization(err)
    }
}

impl From<PermissionError> for Error {
    fn from(err: PermissionError) -> Self {
        Error::Permission(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err)
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err)
    }
}
