#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end calls against an in-process server that requires client
//! certificates.

mod common;

use std::time::Duration;

use common::{SERVER_GREETING, ServerOptions, closed_port, fixture_bytes};
use http::StatusCode;
use mtls_http::{
    ClientIdentity, DEFAULT_USER_AGENT, ErrorKind, MtlsError, SecureClient, SecureClientConfig,
    TrustPolicy, build_client, load_store,
};

fn identity(file: &str, passphrase: &str) -> ClientIdentity {
    ClientIdentity::new(load_store(&fixture_bytes(file), passphrase).unwrap(), passphrase)
}

fn trust(file: &str) -> TrustPolicy {
    TrustPolicy::new(load_store(&fixture_bytes(file), "changeit").unwrap())
}

fn client_for(url: &str) -> SecureClient {
    build_client(SecureClientConfig::new(
        url,
        identity("client-keystore.p12", "secret"),
        trust("client-truststore.p12"),
    ))
    .unwrap()
}

#[tokio::test]
async fn test_call_returns_server_body() {
    let server = ServerOptions::default().start().await;
    let client = client_for(&server.url());

    let body = client.call_path("/server").await.unwrap();
    assert_eq!(body, SERVER_GREETING);

    let seen = server.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/server");
    assert_eq!(seen[0].accept.as_deref(), Some("text/plain"));
    assert_eq!(seen[0].user_agent.as_deref(), Some(DEFAULT_USER_AGENT));
}

#[tokio::test]
async fn test_call_targets_root() {
    let server = ServerOptions::default().start().await;
    let client = client_for(&server.url());

    client.call().await.unwrap();
    assert_eq!(server.seen()[0].path, "/");
}

#[tokio::test]
async fn test_repeated_calls_are_independent() {
    let server = ServerOptions::default().start().await;
    let client = client_for(&server.url());

    for _ in 0..3 {
        assert_eq!(client.call_path("/server").await.unwrap(), SERVER_GREETING);
    }
    assert_eq!(server.seen().len(), 3);
}

#[tokio::test]
async fn test_concurrent_calls_share_one_client() {
    let server = ServerOptions::default().start().await;
    let client = client_for(&server.url());

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let client = client.clone();
        tasks.push(tokio::spawn(
            async move { client.call_path("/server").await },
        ));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), SERVER_GREETING);
    }
}

#[tokio::test]
async fn test_pem_identity_is_accepted() {
    let server = ServerOptions::default().start().await;
    let client = build_client(SecureClientConfig::new(
        server.url(),
        identity("client-identity.pem", ""),
        trust("client-truststore.p12"),
    ))
    .unwrap();

    assert_eq!(client.call_path("/server").await.unwrap(), SERVER_GREETING);
}

#[tokio::test]
async fn test_untrusted_server_is_handshake_error() {
    let server = ServerOptions::default().start().await;
    let client = build_client(SecureClientConfig::new(
        server.url(),
        identity("client-keystore.p12", "secret"),
        trust("rogue-truststore.p12"),
    ))
    .unwrap();

    let err = client.call_path("/server").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Handshake, "{err}");
    assert!(server.seen().is_empty());
}

#[tokio::test]
async fn test_rejected_client_certificate_is_handshake_error() {
    let server = ServerOptions::default().tls12_only().start().await;
    let client = build_client(SecureClientConfig::new(
        server.url(),
        identity("rogue-client-keystore.p12", "secret"),
        trust("client-truststore.p12"),
    ))
    .unwrap();

    let err = client.call_path("/server").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Handshake, "{err}");
    assert!(server.seen().is_empty());
}

#[tokio::test]
async fn test_rejected_client_certificate_over_tls13_is_handshake_error() {
    let server = ServerOptions::default().start().await;
    let client = build_client(SecureClientConfig::new(
        server.url(),
        identity("rogue-client-keystore.p12", "secret"),
        trust("client-truststore.p12"),
    ))
    .unwrap();

    let err = client.call_path("/server").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Handshake, "{err}");
    assert!(err.to_string().contains("UnknownCA"), "{err}");
    assert!(server.seen().is_empty());
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let server = ServerOptions::default()
        .respond(StatusCode::INTERNAL_SERVER_ERROR, "server exploded")
        .start()
        .await;
    let client = client_for(&server.url());

    match client.call_path("/server").await.unwrap_err() {
        MtlsError::UnexpectedStatus { status, body } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, "server exploded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_not_found_is_unexpected_status() {
    let server = ServerOptions::default()
        .respond(StatusCode::NOT_FOUND, "")
        .start()
        .await;
    let client = client_for(&server.url());

    let err = client.call_path("/missing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedStatus);
}

#[tokio::test]
async fn test_unreachable_server_is_connection_error() {
    let port = closed_port().await;
    let client = client_for(&format!("https://127.0.0.1:{port}"));

    let err = client.call_path("/server").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection, "{err}");
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _hold = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });

    let client = SecureClient::builder(SecureClientConfig::new(
        format!("https://{addr}"),
        identity("client-keystore.p12", "secret"),
        trust("client-truststore.p12"),
    ))
    .timeout(Duration::from_millis(300))
    .build()
    .unwrap();

    let err = client.call_path("/server").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.to_string().contains("timed out"), "{err}");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let server = ServerOptions::default()
        .respond(StatusCode::OK, &"x".repeat(4096))
        .start()
        .await;
    let client = SecureClient::builder(SecureClientConfig::new(
        server.url(),
        identity("client-keystore.p12", "secret"),
        trust("client-truststore.p12"),
    ))
    .max_body_size(1024)
    .build()
    .unwrap();

    let err = client.call_path("/server").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BodyTooLarge);
}

#[test]
fn test_wrong_passphrase_is_bad_passphrase() {
    let err = load_store(&fixture_bytes("client-keystore.p12"), "wrong").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadPassphrase);
}

#[test]
fn test_corrupt_keystore_is_store_decode() {
    let err = load_store(&fixture_bytes("truncated-keystore.p12"), "secret").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreDecode);
}

#[tokio::test]
async fn test_mismatched_key_is_tls_context_error() {
    let err = build_client(SecureClientConfig::new(
        "https://127.0.0.1:8443",
        identity("mismatched-identity.pem", ""),
        trust("client-truststore.p12"),
    ))
    .err()
    .expect("mismatched key must not build");
    assert_eq!(err.kind(), ErrorKind::TlsContext);
}
