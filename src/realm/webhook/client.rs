use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use rustls::RootCertStore;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tracing::warn;

use crate::configuration::Error;

pub type HttpClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

#[derive(Clone, Debug, Default)]
pub struct HttpClientConfig {
    pub server_ca_bundle: Option<PathBuf>,
    pub client_certificate: Option<PathBuf>,
    pub client_private_key: Option<PathBuf>,
}

pub fn build_client(config: &HttpClientConfig) -> Result<HttpClient, Error> {
    let tls_config = build_tls_config(config)?;

    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .build();

    Ok(Client::builder(TokioExecutor::new()).build(connector))
}

fn build_tls_config(config: &HttpClientConfig) -> Result<rustls::ClientConfig, Error> {
    let mut root_store = RootCertStore::empty();

    let certs = if let Some(bundle) = &config.server_ca_bundle {
        CertificateDer::pem_file_iter(bundle)?.collect::<Result<Vec<_>, _>>()?
    } else {
        rustls_native_certs::load_native_certs().certs
    };

    root_store.add_parsable_certificates(certs);

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let tls_config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(root_store);

    match (&config.client_certificate, &config.client_private_key) {
        (Some(cert), Some(key)) => {
            let certs = CertificateDer::pem_file_iter(cert)?.collect::<Result<Vec<_>, _>>()?;
            let key = PrivateKeyDer::from_pem_file(key)?;
            Ok(tls_config.with_client_auth_cert(certs, key)?)
        }
        (None, None) => Ok(tls_config.with_no_client_auth()),
        _ => {
            warn!("Client certificate and key must both be provided");
            Ok(tls_config.with_no_client_auth())
        }
    }
}
