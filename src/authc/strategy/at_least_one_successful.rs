use tracing::warn;

use super::AuthenticationStrategy;
use crate::authc::{
    Account, AttemptAggregate, AttemptOutcome, AuthenticationError, AuthenticationToken,
};
use crate::realm::Realm;

/// Succeeds when at least one realm returns an account; all contributed accounts are merged.
///
/// Every realm is consulted. Failures from individual realms are tolerated as long as another
/// realm vouches for the token, but they are kept on the aggregate and logged.
pub struct AtLeastOneSuccessfulStrategy;

impl AuthenticationStrategy for AtLeastOneSuccessfulStrategy {
    fn name(&self) -> &'static str {
        "at_least_one_successful"
    }

    fn after_attempt(
        &self,
        realm: &dyn Realm,
        _token: &AuthenticationToken,
        outcome: AttemptOutcome,
        mut aggregate: AttemptAggregate,
    ) -> Result<AttemptAggregate, AuthenticationError> {
        aggregate.record_outcome(realm.name(), outcome);
        Ok(aggregate)
    }

    fn after_all_attempts(
        &self,
        token: &AuthenticationToken,
        aggregate: AttemptAggregate,
    ) -> Result<Account, AuthenticationError> {
        if !aggregate.has_accounts() {
            return Err(aggregate.into_failure(token));
        }

        for failure in aggregate.failures() {
            warn!(
                realm = %failure.realm,
                kind = failure.error.kind(),
                "Realm failed while authenticating {token}: {}",
                failure.error
            );
        }

        aggregate.merge()
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::sync::Arc;

    use super::*;
    use crate::authc::strategy::test_support::{alice, run};
    use crate::authz::AuthorizationInfo;
    use crate::realm::stub::{Behavior, StubRealm};

    #[test]
    fn test_unsupported_realm_is_skipped() {
        let b = StubRealm::unsupported("b").shared();
        let realms: Vec<Arc<dyn Realm>> =
            vec![StubRealm::new("a", Behavior::Found).shared(), b.clone()];

        let account = run(AtLeastOneSuccessfulStrategy, &realms, &alice()).unwrap();
        assert_eq!(account.primary_principal().name, "alice@a");
        assert_eq!(b.queries(), 0);
    }

    #[test]
    fn test_all_accounts_are_merged() {
        let realms: Vec<Arc<dyn Realm>> = vec![
            StubRealm::new("a", Behavior::Found).with_role("dev").shared(),
            StubRealm::new("b", Behavior::Internal).shared(),
            StubRealm::new("c", Behavior::Found).with_role("ops").shared(),
        ];

        let account = run(AtLeastOneSuccessfulStrategy, &realms, &alice()).unwrap();
        assert_eq!(account.realm_names(), vec!["a", "c"]);
        assert!(account.has_all_roles(["dev", "ops"]));
    }

    #[test]
    fn test_only_middle_realm_succeeds() {
        let realms: Vec<Arc<dyn Realm>> = vec![
            StubRealm::new("a", Behavior::NotFound).shared(),
            StubRealm::new("b", Behavior::Found).shared(),
            StubRealm::new("c", Behavior::NotFound).shared(),
        ];

        let account = run(AtLeastOneSuccessfulStrategy, &realms, &alice()).unwrap();
        assert_eq!(account.realm_names(), vec!["b"]);
    }

    #[test]
    fn test_no_account_reports_last_error_with_cause() {
        let realms: Vec<Arc<dyn Realm>> = vec![
            StubRealm::new("a", Behavior::WrongPassword).shared(),
            StubRealm::new("b", Behavior::Internal).shared(),
        ];

        let error = run(AtLeastOneSuccessfulStrategy, &realms, &alice()).unwrap_err();
        assert!(matches!(
            error,
            AuthenticationError::RealmQueryFailure { ref realm, .. } if realm == "b"
        ));
        assert_eq!(error.source().unwrap().to_string(), "directory down");
    }

    #[test]
    fn test_single_realm_without_account() {
        let realms: Vec<Arc<dyn Realm>> = vec![StubRealm::new("a", Behavior::NotFound).shared()];

        let result = run(AtLeastOneSuccessfulStrategy, &realms, &alice());
        assert!(matches!(result, Err(AuthenticationError::UnknownAccount(_))));
    }

    #[test]
    fn test_repeated_authentication_is_idempotent() {
        let realms: Vec<Arc<dyn Realm>> = vec![
            StubRealm::new("a", Behavior::Found).with_role("dev").shared(),
            StubRealm::new("b", Behavior::NotFound).shared(),
        ];

        let first = run(AtLeastOneSuccessfulStrategy, &realms, &alice()).unwrap();
        let second = run(AtLeastOneSuccessfulStrategy, &realms, &alice()).unwrap();
        assert_eq!(first.principals(), second.principals());
        assert_eq!(first.roles(), second.roles());
    }
}
