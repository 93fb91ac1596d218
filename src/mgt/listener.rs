#[cfg(test)]
use mockall::automock;
use tracing::{info, warn};

use super::Subject;
use crate::authc::{Account, AuthenticationError, AuthenticationToken};

/// Hook notified about login and logout events.
///
/// Listeners observe outcomes, they cannot change them.
#[cfg_attr(test, automock)]
pub trait LoginListener: Send + Sync {
    fn on_success(&self, token: &AuthenticationToken, account: &Account);

    fn on_failure(&self, token: &AuthenticationToken, error: &AuthenticationError);

    fn on_logout(&self, subject: &Subject);
}

/// Writes an audit line for every login event.
pub struct AuditLogListener;

impl LoginListener for AuditLogListener {
    fn on_success(&self, token: &AuthenticationToken, account: &Account) {
        info!(
            audit = true,
            realms = ?account.realm_names(),
            "Login succeeded for {token} as {account}"
        );
    }

    fn on_failure(&self, token: &AuthenticationToken, error: &AuthenticationError) {
        warn!(audit = true, kind = error.kind(), "Login failed for {token}: {error}");
    }

    fn on_logout(&self, subject: &Subject) {
        info!(audit = true, "Logout of {subject}");
    }
}
