use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::*;
use crate::authz::AuthorizationInfo;

fn config(url: &str) -> Config {
    Config {
        name: "corp".to_string(),
        url: url.to_string(),
        timeout_ms: 1000,
        server_ca_bundle: None,
        client_certificate_bundle: None,
        client_private_key: None,
        accept_bearer: false,
    }
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn content_length(headers: &str) -> usize {
    headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse().ok())
                .flatten()
        })
        .unwrap_or(0)
}

/// Serves exactly one HTTP/1.1 exchange and returns the raw request it received.
async fn serve_once(
    status_line: &'static str,
    body: &'static str,
) -> (SocketAddr, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let read = stream.read(&mut chunk).await.unwrap();
            buffer.extend_from_slice(&chunk[..read]);
            if let Some(end) = find_header_end(&buffer) {
                let headers = String::from_utf8_lossy(&buffer[..end]).to_string();
                if buffer.len() >= end + content_length(&headers) {
                    break;
                }
            }
            if read == 0 {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();

        String::from_utf8_lossy(&buffer).to_string()
    });

    (address, handle)
}

#[test]
fn test_webhook_config_deserialize_defaults() {
    let toml = r#"
        name = "corp"
        url = "https://auth.example.com/verify"
    "#;

    let config: Config = toml::from_str(toml).unwrap();
    assert_eq!(config.timeout_ms, 5000);
    assert!(!config.accept_bearer);
    assert_eq!(config.tls_paths().count(), 0);
}

#[test]
fn test_webhook_config_validation() {
    assert!(config("https://auth.example.com/verify").validate().is_ok());
    assert!(config("ftp://auth.example.com").validate().is_err());
    assert!(config("not a url").validate().is_err());

    let mut invalid = config("https://auth.example.com/verify");
    invalid.client_certificate_bundle = Some(PathBuf::from("/cert.pem"));
    assert!(matches!(invalid.validate(), Err(Error::InvalidRealm(_))));

    invalid.client_private_key = Some(PathBuf::from("/key.pem"));
    assert!(invalid.validate().is_ok());
    assert_eq!(invalid.tls_paths().count(), 2);
}

#[test]
fn test_map_response_success() {
    let body = br#"{"principal": "alice", "roles": ["dev"], "permissions": ["registry:pull"]}"#;
    let account = map_response("corp", StatusCode::OK, body).unwrap().unwrap();

    assert_eq!(account.primary_principal().name, "alice");
    assert_eq!(account.primary_principal().realm, "corp");
    assert!(account.has_role("dev"));
    assert!(account.is_permitted(&"registry:pull".parse().unwrap()));
}

#[test]
fn test_map_response_failures() {
    assert!(matches!(
        map_response("corp", StatusCode::NOT_FOUND, b""),
        Ok(None)
    ));
    assert!(matches!(
        map_response("corp", StatusCode::UNAUTHORIZED, b""),
        Err(RealmError::Authentication(
            AuthenticationError::IncorrectCredentials(_)
        ))
    ));
    assert!(matches!(
        map_response("corp", StatusCode::FORBIDDEN, b""),
        Err(RealmError::Authentication(AuthenticationError::DisabledAccount(_)))
    ));
    assert!(matches!(
        map_response("corp", StatusCode::BAD_GATEWAY, b""),
        Err(RealmError::Unavailable(_))
    ));
    assert!(matches!(
        map_response("corp", StatusCode::IM_A_TEAPOT, b""),
        Err(RealmError::Internal(_))
    ));
    assert!(matches!(
        map_response("corp", StatusCode::OK, b"not json"),
        Err(RealmError::Internal(_))
    ));
    assert!(matches!(
        map_response("corp", StatusCode::OK, br#"{"principal": " "}"#),
        Err(RealmError::Internal(_))
    ));
}

#[tokio::test]
async fn test_supports_bearer_only_when_enabled() {
    let realm = WebhookRealm::new(&config("http://127.0.0.1:1/verify")).unwrap();
    assert!(realm.supports(&AuthenticationToken::username_password("a", "b")));
    assert!(!realm.supports(&AuthenticationToken::bearer("t")));

    let mut bearer_config = config("http://127.0.0.1:1/verify");
    bearer_config.accept_bearer = true;
    let realm = WebhookRealm::new(&bearer_config).unwrap();
    assert!(realm.supports(&AuthenticationToken::bearer("t")));
}

#[tokio::test]
async fn test_get_account_round_trip() {
    let (address, handle) = serve_once(
        "200 OK",
        r#"{"principal": "alice", "roles": ["admin"]}"#,
    )
    .await;

    let realm = WebhookRealm::new(&config(&format!("http://{address}/verify"))).unwrap();
    let token = AuthenticationToken::username_password("alice", "wonderland")
        .with_host("10.1.2.3".parse().unwrap());

    let account = realm.get_account(&token).await.unwrap().unwrap();
    assert_eq!(account.primary_principal().name, "alice");
    assert!(account.has_role("admin"));

    let request = handle.await.unwrap();
    assert!(request.starts_with("POST /verify HTTP/1.1"));
    assert!(request.to_lowercase().contains("x-forwarded-for: 10.1.2.3"));
    assert!(request.contains(r#""username":"alice""#));
    assert!(request.contains(r#""password":"wonderland""#));
}

#[tokio::test]
async fn test_get_account_rejected_credentials() {
    let (address, handle) = serve_once("401 Unauthorized", "{}").await;

    let realm = WebhookRealm::new(&config(&format!("http://{address}/verify"))).unwrap();
    let token = AuthenticationToken::username_password("alice", "nope");

    let result = realm.get_account(&token).await;
    assert!(matches!(
        result,
        Err(RealmError::Authentication(
            AuthenticationError::IncorrectCredentials(_)
        ))
    ));
    handle.await.unwrap();
}

#[tokio::test]
async fn test_get_account_unreachable_endpoint_is_transient() {
    // Bind then drop to get a local port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let realm = WebhookRealm::new(&config(&format!("http://{address}/verify"))).unwrap();
    let token = AuthenticationToken::username_password("alice", "wonderland");

    let result = realm.get_account(&token).await;
    assert!(matches!(result, Err(RealmError::Unavailable(_))));
}
