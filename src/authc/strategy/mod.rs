mod all_successful;
mod at_least_one_successful;
mod first_successful;

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use super::{Account, AttemptAggregate, AttemptOutcome, AuthenticationError, AuthenticationToken};
use crate::realm::Realm;
pub use all_successful::AllSuccessfulStrategy;
pub use at_least_one_successful::AtLeastOneSuccessfulStrategy;
pub use first_successful::FirstSuccessfulStrategy;

/// Policy deciding how the results of several realms combine into a single outcome.
///
/// The authenticator drives the callbacks in this order for every call:
/// `before_all_attempts`, then for each realm `before_attempt` and `after_attempt`, then
/// `after_all_attempts`. Any callback returning an error aborts the remaining pipeline.
pub trait AuthenticationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn before_all_attempts(
        &self,
        realms: &[Arc<dyn Realm>],
        token: &AuthenticationToken,
    ) -> Result<AttemptAggregate, AuthenticationError> {
        if realms.is_empty() {
            return Err(AuthenticationError::Configuration(format!(
                "No realms configured to authenticate {token}"
            )));
        }

        Ok(AttemptAggregate::new())
    }

    fn before_attempt(
        &self,
        _realm: &dyn Realm,
        _token: &AuthenticationToken,
        _aggregate: &AttemptAggregate,
    ) -> Result<(), AuthenticationError> {
        Ok(())
    }

    fn after_attempt(
        &self,
        realm: &dyn Realm,
        token: &AuthenticationToken,
        outcome: AttemptOutcome,
        aggregate: AttemptAggregate,
    ) -> Result<AttemptAggregate, AuthenticationError>;

    fn after_all_attempts(
        &self,
        token: &AuthenticationToken,
        aggregate: AttemptAggregate,
    ) -> Result<Account, AuthenticationError>;

    /// Whether the remaining realms can be skipped.
    fn is_satisfied(&self, _aggregate: &AttemptAggregate) -> bool {
        false
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    AllSuccessful,
    FirstSuccessful,
    #[default]
    AtLeastOneSuccessful,
}

impl StrategyKind {
    pub fn build(self) -> Arc<dyn AuthenticationStrategy> {
        match self {
            StrategyKind::AllSuccessful => Arc::new(AllSuccessfulStrategy),
            StrategyKind::FirstSuccessful => Arc::new(FirstSuccessfulStrategy),
            StrategyKind::AtLeastOneSuccessful => Arc::new(AtLeastOneSuccessfulStrategy),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            StrategyKind::AllSuccessful => "all_successful",
            StrategyKind::FirstSuccessful => "first_successful",
            StrategyKind::AtLeastOneSuccessful => "at_least_one_successful",
        };
        write!(f, "{name}")
    }
}
