use std::{error, fmt};

pub type BoxError = Box<dyn error::Error + Send + Sync>;

/// The single error family surfaced to callers of the authentication pipeline.
#[derive(Debug)]
pub enum AuthenticationError {
    /// A realm was required to process a token type it does not handle.
    UnsupportedToken(String),
    /// A realm completed its query but found no matching identity.
    UnknownAccount(String),
    IncorrectCredentials(String),
    DisabledAccount(String),
    ExpiredCredentials(String),
    /// Unexpected error while querying a realm, cause retained.
    RealmQueryFailure { realm: String, source: BoxError },
    /// Transient realm failure (network, timeout). Never retried by the pipeline.
    RealmUnavailable { realm: String, source: BoxError },
    /// The strategy rejected the overall result.
    AggregationFailure(String),
    Configuration(String),
}

impl AuthenticationError {
    /// Stable label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthenticationError::UnsupportedToken(_) => "unsupported_token",
            AuthenticationError::UnknownAccount(_) => "unknown_account",
            AuthenticationError::IncorrectCredentials(_) => "incorrect_credentials",
            AuthenticationError::DisabledAccount(_) => "disabled_account",
            AuthenticationError::ExpiredCredentials(_) => "expired_credentials",
            AuthenticationError::RealmQueryFailure { .. } => "realm_query_failure",
            AuthenticationError::RealmUnavailable { .. } => "realm_unavailable",
            AuthenticationError::AggregationFailure(_) => "aggregation_failure",
            AuthenticationError::Configuration(_) => "configuration",
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, AuthenticationError::RealmUnavailable { .. })
    }
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthenticationError::UnsupportedToken(msg) => write!(f, "Unsupported token: {msg}"),
            AuthenticationError::UnknownAccount(msg) => write!(f, "Unknown account: {msg}"),
            AuthenticationError::IncorrectCredentials(msg) => {
                write!(f, "Incorrect credentials: {msg}")
            }
            AuthenticationError::DisabledAccount(msg) => write!(f, "Disabled account: {msg}"),
            AuthenticationError::ExpiredCredentials(msg) => {
                write!(f, "Expired credentials: {msg}")
            }
            AuthenticationError::RealmQueryFailure { realm, source } => {
                write!(f, "Unable to acquire account data from realm '{realm}': {source}")
            }
            AuthenticationError::RealmUnavailable { realm, source } => {
                write!(f, "Realm '{realm}' is unavailable: {source}")
            }
            AuthenticationError::AggregationFailure(msg) => {
                write!(f, "Authentication aggregation failure: {msg}")
            }
            AuthenticationError::Configuration(msg) => {
                write!(f, "Authentication configuration error: {msg}")
            }
        }
    }
}

impl error::Error for AuthenticationError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            AuthenticationError::RealmQueryFailure { source, .. }
            | AuthenticationError::RealmUnavailable { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn test_error_display() {
        let error = AuthenticationError::UnknownAccount("no user 'bob'".to_string());
        assert_eq!(format!("{error}"), "Unknown account: no user 'bob'");

        let error = AuthenticationError::RealmQueryFailure {
            realm: "ldap".to_string(),
            source: Box::new(io::Error::other("connection reset")),
        };
        assert_eq!(
            format!("{error}"),
            "Unable to acquire account data from realm 'ldap': connection reset"
        );
    }

    #[test]
    fn test_wrapped_errors_keep_their_source() {
        let error = AuthenticationError::RealmUnavailable {
            realm: "corp".to_string(),
            source: Box::new(io::Error::other("timed out")),
        };

        let source = error.source().expect("source should be retained");
        assert_eq!(source.to_string(), "timed out");
        assert!(error.is_transient());

        let error = AuthenticationError::IncorrectCredentials(String::new());
        assert!(error.source().is_none());
        assert!(!error.is_transient());
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(
            AuthenticationError::UnsupportedToken(String::new()).kind(),
            "unsupported_token"
        );
        assert_eq!(
            AuthenticationError::AggregationFailure(String::new()).kind(),
            "aggregation_failure"
        );
    }
}
