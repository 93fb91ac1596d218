use tracing::debug;

use super::AuthenticationStrategy;
use crate::authc::{
    Account, AttemptAggregate, AttemptOutcome, AuthenticationError, AuthenticationToken,
};
use crate::realm::Realm;

/// The first realm, in configured order, that returns an account wins.
///
/// Once an account has been captured the remaining realms are not consulted.
pub struct FirstSuccessfulStrategy;

impl AuthenticationStrategy for FirstSuccessfulStrategy {
    fn name(&self) -> &'static str {
        "first_successful"
    }

    fn after_attempt(
        &self,
        realm: &dyn Realm,
        _token: &AuthenticationToken,
        outcome: AttemptOutcome,
        mut aggregate: AttemptAggregate,
    ) -> Result<AttemptAggregate, AuthenticationError> {
        if aggregate.has_accounts() {
            debug!(realm = realm.name(), "Account already captured, ignoring outcome");
            return Ok(aggregate);
        }

        aggregate.record_outcome(realm.name(), outcome);
        Ok(aggregate)
    }

    fn after_all_attempts(
        &self,
        token: &AuthenticationToken,
        aggregate: AttemptAggregate,
    ) -> Result<Account, AuthenticationError> {
        if aggregate.has_accounts() {
            aggregate.merge()
        } else {
            Err(aggregate.into_failure(token))
        }
    }

    fn is_satisfied(&self, aggregate: &AttemptAggregate) -> bool {
        aggregate.has_accounts()
    }
}
