use tracing::debug;

use super::AuthenticationStrategy;
use crate::authc::{
    Account, AttemptAggregate, AttemptOutcome, AuthenticationError, AuthenticationToken,
};
use crate::realm::Realm;

/// Every configured realm must support the token and vouch for it.
///
/// The first realm that cannot process the token, does not know the account or fails aborts
/// the attempt. The resulting account is the merge of every realm's account.
pub struct AllSuccessfulStrategy;

impl AuthenticationStrategy for AllSuccessfulStrategy {
    fn name(&self) -> &'static str {
        "all_successful"
    }

    fn before_attempt(
        &self,
        realm: &dyn Realm,
        token: &AuthenticationToken,
        _aggregate: &AttemptAggregate,
    ) -> Result<(), AuthenticationError> {
        if !realm.supports(token) {
            return Err(AuthenticationError::UnsupportedToken(format!(
                "Realm '{}' does not support token {token}",
                realm.name()
            )));
        }

        Ok(())
    }

    fn after_attempt(
        &self,
        realm: &dyn Realm,
        token: &AuthenticationToken,
        outcome: AttemptOutcome,
        mut aggregate: AttemptAggregate,
    ) -> Result<AttemptAggregate, AuthenticationError> {
        let result = match outcome {
            AttemptOutcome::Completed(result) => result,
            AttemptOutcome::Skipped => {
                return Err(AuthenticationError::UnsupportedToken(format!(
                    "Realm '{}' does not support token {token}",
                    realm.name()
                )));
            }
        };

        match result {
            Ok(Some(account)) => {
                debug!(realm = realm.name(), "Realm contributed account {account}");
                aggregate.count_attempt(true);
                aggregate.record_account(account);
                Ok(aggregate)
            }
            Ok(None) => Err(AuthenticationError::UnknownAccount(format!(
                "Realm '{}' has no account for token {token}",
                realm.name()
            ))),
            Err(error) => Err(error.into_authentication_error(realm.name())),
        }
    }

    fn after_all_attempts(
        &self,
        _token: &AuthenticationToken,
        aggregate: AttemptAggregate,
    ) -> Result<Account, AuthenticationError> {
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
    fn test_all_realms_contribute() {
        let realms: Vec<Arc<dyn Realm>> = vec![
            StubRealm::new("a", Behavior::Found).with_role("dev").shared(),
            StubRealm::new("b", Behavior::Found).with_role("ops").shared(),
        ];

        let account = run(AllSuccessfulStrategy, &realms, &alice()).unwrap();
        assert_eq!(account.principals().len(), 2);
        assert_eq!(account.realm_names(), vec!["a", "b"]);
        assert_eq!(account.primary_principal().name, "alice@a");
        assert!(account.has_all_roles(["dev", "ops"]));
    }

    #[test]
    fn test_unsupported_realm_fails() {
        let a = StubRealm::new("a", Behavior::Found).shared();
        let b = StubRealm::unsupported("b").shared();
        let realms: Vec<Arc<dyn Realm>> = vec![a.clone(), b.clone()];

        let result = run(AllSuccessfulStrategy, &realms, &alice());
        assert!(matches!(result, Err(AuthenticationError::UnsupportedToken(_))));
        assert_eq!(a.queries(), 1);
        assert_eq!(b.queries(), 0);
    }

    #[test]
    fn test_missing_account_fails() {
        let c = StubRealm::new("c", Behavior::Found).shared();
        let realms: Vec<Arc<dyn Realm>> = vec![
            StubRealm::new("a", Behavior::Found).shared(),
            StubRealm::new("b", Behavior::NotFound).shared(),
            c.clone(),
        ];

        let result = run(AllSuccessfulStrategy, &realms, &alice());
        assert!(matches!(result, Err(AuthenticationError::UnknownAccount(_))));
        assert_eq!(c.queries(), 0);
    }

    #[test]
    fn test_domain_error_propagates_unchanged() {
        let realms: Vec<Arc<dyn Realm>> = vec![
            StubRealm::new("a", Behavior::WrongPassword).shared(),
            StubRealm::new("b", Behavior::Found).shared(),
        ];

        let result = run(AllSuccessfulStrategy, &realms, &alice());
        assert!(matches!(
            result,
            Err(AuthenticationError::IncorrectCredentials(ref msg)) if msg == "bad password in a"
        ));
    }

    #[test]
    fn test_internal_error_is_wrapped_with_cause() {
        let realms: Vec<Arc<dyn Realm>> =
            vec![StubRealm::new("ldap", Behavior::Internal).shared()];

        let error = run(AllSuccessfulStrategy, &realms, &alice()).unwrap_err();
        assert!(matches!(
            error,
            AuthenticationError::RealmQueryFailure { ref realm, .. } if realm == "ldap"
        ));
        assert_eq!(error.source().unwrap().to_string(), "directory down");
    }

    #[test]
    fn test_skipped_outcome_fails() {
        let realm = StubRealm::unsupported("a");
        let result = AllSuccessfulStrategy.after_attempt(
            &realm,
            &alice(),
            AttemptOutcome::Skipped,
            AttemptAggregate::new(),
        );
        assert!(matches!(result, Err(AuthenticationError::UnsupportedToken(_))));
    }
}
