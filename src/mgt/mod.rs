//! Login and logout lifecycle on top of the realm authenticator.

mod listener;
mod subject;

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{info, instrument};

use crate::authc::{AuthenticationError, AuthenticationToken, ModularRealmAuthenticator};
use crate::configuration::{self, Configuration};
#[cfg(test)]
pub use listener::MockLoginListener;
pub use listener::{AuditLogListener, LoginListener};
pub use subject::Subject;

pub struct SecurityManager {
    authenticator: ArcSwap<ModularRealmAuthenticator>,
    listeners: Vec<Arc<dyn LoginListener>>,
}

impl SecurityManager {
    pub fn new(authenticator: ModularRealmAuthenticator) -> Self {
        Self {
            authenticator: ArcSwap::new(Arc::new(authenticator)),
            listeners: Vec::new(),
        }
    }

    pub fn from_configuration(config: &Configuration) -> Result<Self, configuration::Error> {
        let authenticator = ModularRealmAuthenticator::from_configuration(config)?;
        Ok(Self::new(authenticator))
    }

    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn LoginListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Replaces the realms and strategy used for subsequent logins.
    ///
    /// Logins already in progress finish with the authenticator they started with.
    pub fn reconfigure(&self, authenticator: ModularRealmAuthenticator) {
        info!(
            "Reconfiguring security manager: {} realm(s), strategy {}",
            authenticator.realms().len(),
            authenticator.strategy_name()
        );
        self.authenticator.store(Arc::new(authenticator));
    }

    pub fn authenticator(&self) -> Arc<ModularRealmAuthenticator> {
        self.authenticator.load_full()
    }

    #[instrument(skip(self, token))]
    pub async fn login(&self, token: AuthenticationToken) -> Result<Subject, AuthenticationError> {
        let authenticator = self.authenticator.load_full();

        match authenticator.authenticate(&token).await {
            Ok(account) => {
                for listener in &self.listeners {
                    listener.on_success(&token, &account);
                }
                Ok(Subject::new(account, &token))
            }
            Err(error) => {
                for listener in &self.listeners {
                    listener.on_failure(&token, &error);
                }
                Err(error)
            }
        }
    }

    #[instrument(skip(self, subject), fields(subject = %subject))]
    pub async fn logout(&self, subject: &Subject) {
        for listener in &self.listeners {
            listener.on_logout(subject);
        }

        self.authenticator
            .load_full()
            .on_logout(subject.account())
            .await;
    }
}
