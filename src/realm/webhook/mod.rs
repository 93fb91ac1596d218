mod client;
#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request, StatusCode, Uri};
use serde::Deserialize;
use serde_json::json;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use super::{Realm, RealmError};
use crate::authc::{Account, AuthenticationError, AuthenticationToken, Credentials};
use crate::authz::Permission;
use crate::configuration::Error;
use client::{build_client, HttpClient, HttpClientConfig};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub name: String,
    pub url: String,
    #[serde(default = "Config::default_timeout_ms")]
    pub timeout_ms: u64,

    pub server_ca_bundle: Option<PathBuf>,
    pub client_certificate_bundle: Option<PathBuf>,
    pub client_private_key: Option<PathBuf>,

    /// Forward bearer tokens too, not only username/password pairs.
    #[serde(default)]
    pub accept_bearer: bool,
}

impl Config {
    fn default_timeout_ms() -> u64 {
        5000
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.client_certificate_bundle.is_some() != self.client_private_key.is_some() {
            return Err(Error::InvalidRealm(format!(
                "Realm '{}': both certificate and key required for mTLS",
                self.name
            )));
        }

        let uri = Uri::try_from(&self.url).map_err(|e| {
            Error::InvalidRealm(format!("Realm '{}': invalid webhook URL: {e}", self.name))
        })?;

        if !matches!(uri.scheme_str(), Some("http" | "https")) {
            return Err(Error::InvalidRealm(format!(
                "Realm '{}': webhook URL must use http or https",
                self.name
            )));
        }

        Ok(())
    }

    /// Files referenced by this realm whose content changes require a reload.
    pub fn tls_paths(&self) -> impl Iterator<Item = &PathBuf> {
        [
            self.server_ca_bundle.as_ref(),
            self.client_certificate_bundle.as_ref(),
            self.client_private_key.as_ref(),
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Deserialize)]
struct WebhookAccount {
    principal: String,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    permissions: Vec<Permission>,
}

/// Realm delegating credential verification to an external HTTP endpoint.
///
/// The endpoint receives a JSON document with the submitted credentials and answers with the
/// account data (2xx), 404 for unknown accounts, 401 for bad credentials or 403 for disabled
/// accounts. Server errors, timeouts and connection failures are reported as transient.
pub struct WebhookRealm {
    name: String,
    url: String,
    timeout: Duration,
    accept_bearer: bool,
    client: HttpClient,
}

impl WebhookRealm {
    pub fn new(config: &Config) -> Result<Self, Error> {
        config.validate()?;

        let client = build_client(&HttpClientConfig {
            server_ca_bundle: config.server_ca_bundle.clone(),
            client_certificate: config.client_certificate_bundle.clone(),
            client_private_key: config.client_private_key.clone(),
        })?;

        Ok(Self {
            name: config.name.clone(),
            url: config.url.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            accept_bearer: config.accept_bearer,
            client,
        })
    }

    fn build_request(
        &self,
        token: &AuthenticationToken,
    ) -> Result<Request<Full<Bytes>>, RealmError> {
        let payload = match token.credentials() {
            Credentials::UsernamePassword { username, password } => {
                json!({ "username": username, "password": password.expose() })
            }
            Credentials::Bearer(value) => json!({ "token": value.expose() }),
        };
        let payload = serde_json::to_vec(&payload).map_err(RealmError::internal)?;

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(&self.url)
            .header(CONTENT_TYPE, "application/json");

        if let Some(host) = token.host() {
            builder = builder.header("X-Forwarded-For", host.to_string());
        }

        builder
            .body(Full::new(Bytes::from(payload)))
            .map_err(RealmError::internal)
    }

    async fn exchange(
        &self,
        request: Request<Full<Bytes>>,
    ) -> Result<(StatusCode, Bytes), RealmError> {
        let response = self
            .client
            .request(request)
            .await
            .map_err(RealmError::unavailable)?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(RealmError::unavailable)?
            .to_bytes();

        Ok((status, body))
    }
}

fn map_response(
    realm: &str,
    status: StatusCode,
    body: &[u8],
) -> Result<Option<Account>, RealmError> {
    match status {
        status if status.is_success() => {
            let account: WebhookAccount =
                serde_json::from_slice(body).map_err(RealmError::internal)?;

            if account.principal.trim().is_empty() {
                return Err(RealmError::internal(format!(
                    "Webhook for realm '{realm}' returned an empty principal"
                )));
            }

            Ok(Some(
                Account::new(realm, account.principal)
                    .with_roles(account.roles)
                    .with_permissions(account.permissions),
            ))
        }
        StatusCode::NOT_FOUND => Ok(None),
        StatusCode::UNAUTHORIZED => Err(AuthenticationError::IncorrectCredentials(format!(
            "Realm '{realm}' rejected the submitted credentials"
        ))
        .into()),
        StatusCode::FORBIDDEN => Err(AuthenticationError::DisabledAccount(format!(
            "Realm '{realm}' reports the account as disabled"
        ))
        .into()),
        status if status.is_server_error() => Err(RealmError::unavailable(format!(
            "Webhook returned {status}"
        ))),
        status => Err(RealmError::internal(format!(
            "Unexpected webhook response status {status}"
        ))),
    }
}

#[async_trait]
impl Realm for WebhookRealm {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, token: &AuthenticationToken) -> bool {
        match token.credentials() {
            Credentials::UsernamePassword { .. } => true,
            Credentials::Bearer(_) => self.accept_bearer,
        }
    }

    #[instrument(skip(self, token), fields(realm = %self.name))]
    async fn get_account(
        &self,
        token: &AuthenticationToken,
    ) -> Result<Option<Account>, RealmError> {
        let request = self.build_request(token)?;

        let (status, body) = match timeout(self.timeout, self.exchange(request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Webhook request timed out");
                return Err(RealmError::unavailable(format!(
                    "Webhook request timed out after {}ms",
                    self.timeout.as_millis()
                )));
            }
        };

        debug!("Webhook answered with status {status}");
        map_response(&self.name, status, &body)
    }
}
