use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use prometheus::IntGauge;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::strategy::AuthenticationStrategy;
use super::{Account, AttemptOutcome, AuthenticationError, AuthenticationToken};
use crate::configuration::{self, Configuration};
use crate::metrics_provider::METRICS_PROVIDER;
use crate::realm::{build_realms, Realm, RealmError};

/// Coordinates an ordered set of realms under an aggregation strategy.
///
/// Realms are consulted one after the other, in configured order. The realm set and the
/// strategy are fixed for the lifetime of the authenticator.
pub struct ModularRealmAuthenticator {
    realms: Vec<Arc<dyn Realm>>,
    strategy: Arc<dyn AuthenticationStrategy>,
    in_flight: IntGauge,
}

/// Holds one slot of the in-flight gauge until dropped, including when the login future is
/// cancelled mid-query.
struct InFlightGuard(IntGauge);

impl InFlightGuard {
    fn new(gauge: &IntGauge) -> Self {
        gauge.inc();
        Self(gauge.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}

impl ModularRealmAuthenticator {
    pub fn new(
        realms: Vec<Arc<dyn Realm>>,
        strategy: Arc<dyn AuthenticationStrategy>,
    ) -> Result<Self, AuthenticationError> {
        if realms.is_empty() {
            return Err(AuthenticationError::Configuration(
                "At least one realm must be configured".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for realm in &realms {
            if !names.insert(realm.name()) {
                return Err(AuthenticationError::Configuration(format!(
                    "Duplicate realm name '{}'",
                    realm.name()
                )));
            }
        }

        Ok(Self {
            realms,
            strategy,
            in_flight: METRICS_PROVIDER.logins_in_flight.clone(),
        })
    }

    #[cfg(test)]
    fn with_in_flight_gauge(mut self, gauge: IntGauge) -> Self {
        self.in_flight = gauge;
        self
    }

    pub fn from_configuration(config: &Configuration) -> Result<Self, configuration::Error> {
        let realms = build_realms(&config.realms)?;
        let strategy = config.global.strategy.build();
        info!(
            "Authenticating with {} realm(s) using strategy {}",
            realms.len(),
            strategy.name()
        );

        Ok(Self::new(realms, strategy)?)
    }

    pub fn realms(&self) -> &[Arc<dyn Realm>] {
        &self.realms
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    #[instrument(
        skip(self, token),
        fields(principal = token.principal(), strategy = self.strategy.name())
    )]
    pub async fn authenticate(
        &self,
        token: &AuthenticationToken,
    ) -> Result<Account, AuthenticationError> {
        let in_flight = InFlightGuard::new(&self.in_flight);
        let result = self.run_pipeline(token).await;
        drop(in_flight);

        let label = match &result {
            Ok(_) => "success",
            Err(error) => error.kind(),
        };
        METRICS_PROVIDER
            .login_attempts
            .with_label_values(&[self.strategy.name(), label])
            .inc();

        match &result {
            Ok(account) => info!("Authenticated {account} for token {token}"),
            Err(error) => info!("Authentication failed for token {token}: {error}"),
        }

        result
    }

    async fn run_pipeline(
        &self,
        token: &AuthenticationToken,
    ) -> Result<Account, AuthenticationError> {
        let mut aggregate = self.strategy.before_all_attempts(&self.realms, token)?;

        for realm in &self.realms {
            if self.strategy.is_satisfied(&aggregate) {
                debug!("Strategy satisfied, skipping remaining realms");
                break;
            }

            self.strategy
                .before_attempt(realm.as_ref(), token, &aggregate)?;

            let outcome = if realm.supports(token) {
                AttemptOutcome::Completed(query_realm(realm.as_ref(), token).await)
            } else {
                debug!(realm = realm.name(), "Realm does not support token, skipping");
                record_realm_result(realm.name(), "skipped");
                AttemptOutcome::Skipped
            };

            aggregate = self
                .strategy
                .after_attempt(realm.as_ref(), token, outcome, aggregate)?;
        }

        self.strategy.after_all_attempts(token, aggregate)
    }

    /// Lets every realm drop state it keeps for a logged out account.
    pub async fn on_logout(&self, account: &Account) {
        for realm in &self.realms {
            realm.on_logout(account).await;
        }
    }
}

fn record_realm_result(realm: &str, result: &str) {
    METRICS_PROVIDER
        .realm_attempts
        .with_label_values(&[realm, result])
        .inc();
}

/// Queries a realm exactly once. A panicking realm is reported as an internal realm error.
async fn query_realm(
    realm: &dyn Realm,
    token: &AuthenticationToken,
) -> Result<Option<Account>, RealmError> {
    let start = Instant::now();

    let result = match AssertUnwindSafe(realm.get_account(token))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(_) => {
            warn!(realm = realm.name(), "Realm panicked while resolving account");
            Err(RealmError::internal(format!(
                "Realm '{}' panicked while resolving account",
                realm.name()
            )))
        }
    };

    METRICS_PROVIDER
        .realm_query_duration
        .with_label_values(&[realm.name()])
        .observe(start.elapsed().as_secs_f64());

    let label = match &result {
        Ok(Some(_)) => "success",
        Ok(None) => "none",
        Err(RealmError::Authentication(error)) => error.kind(),
        Err(RealmError::Unavailable(_)) => "unavailable",
        Err(RealmError::Internal(_)) => "internal",
    };
    record_realm_result(realm.name(), label);

    result
}
