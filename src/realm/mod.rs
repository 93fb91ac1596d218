mod error;
pub mod memory;
pub mod webhook;

#[cfg(test)]
pub mod stub;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::authc::{Account, AuthenticationToken};
use crate::configuration::Error;
pub use error::RealmError;
pub use memory::MemoryRealm;
pub use webhook::WebhookRealm;

/// A pluggable identity source.
///
/// Realms are shared between concurrent login attempts and must not keep per-attempt state.
#[async_trait]
pub trait Realm: Send + Sync {
    /// Unique, stable name of this realm.
    fn name(&self) -> &str;

    /// Whether this realm is able to process the given token at all.
    fn supports(&self, token: &AuthenticationToken) -> bool;

    /// Resolves the account matching `token`.
    ///
    /// Returns:
    /// - `Ok(Some(account))` when the credentials were verified
    /// - `Ok(None)` when no matching identity exists in this realm
    /// - `Err(RealmError::Authentication(_))` when an identity exists but cannot log in
    /// - `Err(_)` for any other failure while querying the backing store
    async fn get_account(
        &self,
        token: &AuthenticationToken,
    ) -> Result<Option<Account>, RealmError>;

    /// Called when a subject this realm contributed to logs out.
    async fn on_logout(&self, _account: &Account) {}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealmConfig {
    Memory(memory::Config),
    Webhook(webhook::Config),
}

impl RealmConfig {
    pub fn name(&self) -> &str {
        match self {
            RealmConfig::Memory(config) => &config.name,
            RealmConfig::Webhook(config) => &config.name,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.name().trim().is_empty() {
            return Err(Error::InvalidRealm("Realm name cannot be empty".to_string()));
        }

        match self {
            RealmConfig::Memory(_) => Ok(()),
            RealmConfig::Webhook(config) => config.validate(),
        }
    }

    pub fn to_realm(&self) -> Result<Arc<dyn Realm>, Error> {
        let realm: Arc<dyn Realm> = match self {
            RealmConfig::Memory(config) => Arc::new(MemoryRealm::new(config)),
            RealmConfig::Webhook(config) => Arc::new(WebhookRealm::new(config)?),
        };

        Ok(realm)
    }
}

/// Builds the realms in configuration order, rejecting duplicate names.
pub fn build_realms(configs: &[RealmConfig]) -> Result<Vec<Arc<dyn Realm>>, Error> {
    let mut names = HashSet::new();
    let mut realms = Vec::with_capacity(configs.len());

    for config in configs {
        config.validate()?;

        if !names.insert(config.name()) {
            return Err(Error::InvalidRealm(format!(
                "Duplicate realm name '{}'",
                config.name()
            )));
        }

        let realm = config.to_realm()?;
        info!("Configured realm '{}'", realm.name());
        realms.push(realm);
    }

    Ok(realms)
}
