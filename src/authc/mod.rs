//! Authentication: tokens, accounts and the modular realm pipeline.

mod account;
mod aggregate;
mod authenticator;
mod error;
pub mod strategy;
mod token;

pub use account::{Account, Principal};
pub use aggregate::{AttemptAggregate, AttemptOutcome, RealmFailure};
pub use authenticator::ModularRealmAuthenticator;
pub use error::{AuthenticationError, BoxError};
pub use token::{AuthenticationToken, Credentials, TokenKind};
