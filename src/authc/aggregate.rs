use tracing::debug;

use super::{Account, AuthenticationError, AuthenticationToken};
use crate::realm::RealmError;

/// What happened when one realm was consulted.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The realm does not support the submitted token and was not queried.
    Skipped,
    Completed(Result<Option<Account>, RealmError>),
}

#[derive(Debug)]
pub struct RealmFailure {
    pub realm: String,
    pub error: AuthenticationError,
}

/// Accumulator threaded through the strategy callbacks of a single authentication call.
#[derive(Debug, Default)]
pub struct AttemptAggregate {
    accounts: Vec<Account>,
    failures: Vec<RealmFailure>,
    attempted: usize,
    supported: usize,
}

impl AttemptAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_attempt(&mut self, supported: bool) {
        self.attempted += 1;
        if supported {
            self.supported += 1;
        }
    }

    pub fn record_account(&mut self, account: Account) {
        self.accounts.push(account);
    }

    pub fn record_failure(&mut self, realm: &str, error: AuthenticationError) {
        debug!(realm, error = %error, "Recording realm failure");
        self.failures.push(RealmFailure {
            realm: realm.to_string(),
            error,
        });
    }

    /// Records an outcome without failing: accounts are kept, errors are remembered.
    pub fn record_outcome(&mut self, realm: &str, outcome: AttemptOutcome) {
        match outcome {
            AttemptOutcome::Skipped => self.count_attempt(false),
            AttemptOutcome::Completed(result) => {
                self.count_attempt(true);
                match result {
                    Ok(Some(account)) => self.record_account(account),
                    Ok(None) => debug!(realm, "Realm returned no account"),
                    Err(error) => {
                        let error = error.into_authentication_error(realm);
                        self.record_failure(realm, error);
                    }
                }
            }
        }
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn failures(&self) -> &[RealmFailure] {
        &self.failures
    }

    pub fn has_accounts(&self) -> bool {
        !self.accounts.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn supported(&self) -> usize {
        self.supported
    }

    /// Error reported when no realm contributed an account: the last observed realm error,
    /// otherwise `UnsupportedToken` when no realm could process the token, otherwise
    /// `UnknownAccount`.
    pub fn into_failure(mut self, token: &AuthenticationToken) -> AuthenticationError {
        if let Some(failure) = self.failures.pop() {
            return failure.error;
        }

        if self.supported == 0 {
            return AuthenticationError::UnsupportedToken(format!(
                "No configured realm supports the submitted token {token}"
            ));
        }

        AuthenticationError::UnknownAccount(format!(
            "No account data found for the submitted token {token}"
        ))
    }

    /// Merges every contributed account into one, in contribution order.
    ///
    /// Fails closed when nothing was contributed or any contributed principal is blank.
    pub fn merge(self) -> Result<Account, AuthenticationError> {
        let mut accounts = self.accounts.into_iter();
        let Some(mut merged) = accounts.next() else {
            return Err(AuthenticationError::AggregationFailure(
                "No realm contributed account data".to_string(),
            ));
        };

        for account in accounts {
            merged.merge(account);
        }

        if let Some(principal) = merged
            .principals()
            .iter()
            .find(|principal| principal.name.trim().is_empty())
        {
            return Err(AuthenticationError::AggregationFailure(format!(
                "Realm {} contributed a blank principal",
                principal.realm
            )));
        }

        Ok(merged)
    }
}
