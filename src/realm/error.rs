use std::{error, fmt};

use crate::authc::{AuthenticationError, BoxError};

/// Error raised by a realm while resolving an account.
///
/// Only `Authentication` belongs to the authentication domain; the two other variants carry
/// arbitrary realm internals and get wrapped by the strategies before reaching the caller.
#[derive(Debug)]
pub enum RealmError {
    Authentication(AuthenticationError),
    Unavailable(BoxError),
    Internal(BoxError),
}

impl RealmError {
    pub fn unavailable<E: Into<BoxError>>(error: E) -> Self {
        RealmError::Unavailable(error.into())
    }

    pub fn internal<E: Into<BoxError>>(error: E) -> Self {
        RealmError::Internal(error.into())
    }

    /// Converts this error into the caller-facing error family.
    pub fn into_authentication_error(self, realm: &str) -> AuthenticationError {
        match self {
            RealmError::Authentication(error) => error,
            RealmError::Unavailable(source) => AuthenticationError::RealmUnavailable {
                realm: realm.to_string(),
                source,
            },
            RealmError::Internal(source) => AuthenticationError::RealmQueryFailure {
                realm: realm.to_string(),
                source,
            },
        }
    }
}

impl fmt::Display for RealmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RealmError::Authentication(err) => write!(f, "{err}"),
            RealmError::Unavailable(err) => write!(f, "Realm unavailable: {err}"),
            RealmError::Internal(err) => write!(f, "Realm internal error: {err}"),
        }
    }
}

impl error::Error for RealmError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            RealmError::Authentication(err) => Some(err),
            RealmError::Unavailable(err) | RealmError::Internal(err) => Some(err.as_ref()),
        }
    }
}

impl From<AuthenticationError> for RealmError {
    fn from(error: AuthenticationError) -> Self {
        RealmError::Authentication(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_domain_errors_pass_through_unchanged() {
        let error = RealmError::from(AuthenticationError::IncorrectCredentials("bad".into()));
        let error = error.into_authentication_error("local");
        assert!(matches!(error, AuthenticationError::IncorrectCredentials(msg) if msg == "bad"));
    }

    #[test]
    fn test_internal_errors_are_wrapped() {
        let error = RealmError::internal(io::Error::other("boom"));
        match error.into_authentication_error("local") {
            AuthenticationError::RealmQueryFailure { realm, source } => {
                assert_eq!(realm, "local");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("Expected RealmQueryFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_unavailable_errors_are_transient() {
        let error = RealmError::unavailable("connection refused").into_authentication_error("corp");
        assert!(error.is_transient());
        assert_eq!(format!("{error}"), "Realm 'corp' is unavailable: connection refused");
    }
}
