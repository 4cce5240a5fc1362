//! In-process HTTPS server that requires client certificates.

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig, SupportedProtocolVersion};
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

pub const SERVER_GREETING: &str = "Hello from Server\n";

/// Shared fixture directory. This module is also compiled into the service's
/// tests, and both crates sit two levels below the workspace root.
const FIXTURES: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../libs/mtls-http/tests/fixtures"
);

pub fn fixture(name: &str) -> PathBuf {
    Path::new(FIXTURES).join(name)
}

pub fn fixture_bytes(name: &str) -> Vec<u8> {
    std::fs::read(fixture(name)).unwrap()
}

/// What the server saw for one request.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub accept: Option<String>,
    pub user_agent: Option<String>,
}

pub struct TestServer {
    pub addr: SocketAddr,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("https://127.0.0.1:{}", self.addr.port())
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct ServerOptions {
    status: StatusCode,
    body: String,
    tls12_only: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            body: SERVER_GREETING.to_owned(),
            tls12_only: false,
        }
    }
}

impl ServerOptions {
    pub fn respond(mut self, status: StatusCode, body: &str) -> Self {
        self.status = status;
        self.body = body.to_owned();
        self
    }

    /// TLS 1.2 finishes the handshake only after the server has checked the
    /// client certificate, so a rejection surfaces during connect.
    pub fn tls12_only(mut self) -> Self {
        self.tls12_only = true;
        self
    }

    pub async fn start(self) -> TestServer {
        let acceptor = TlsAcceptor::from(Arc::new(self.tls_config()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let status = self.status;
        let body = Bytes::from(self.body);
        let log = Arc::clone(&seen);

        let handle = tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let body = body.clone();
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let Ok(tls) = acceptor.accept(tcp).await else {
                        return;
                    };
                    let service = service_fn(move |req: Request<Incoming>| {
                        log.lock().unwrap().push(SeenRequest {
                            path: req.uri().path().to_owned(),
                            accept: header(&req, ACCEPT),
                            user_agent: header(&req, USER_AGENT),
                        });
                        let response = Response::builder()
                            .status(status)
                            .header(CONTENT_TYPE, "text/plain")
                            .body(Full::new(body.clone()))
                            .unwrap();
                        async move { Ok::<_, Infallible>(response) }
                    });
                    let _ = auto::Builder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(tls), service)
                        .await;
                });
            }
        });

        TestServer { addr, seen, handle }
    }

    fn tls_config(&self) -> ServerConfig {
        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());

        let mut roots = RootCertStore::empty();
        for cert in CertificateDer::pem_file_iter(fixture("ca.pem")).unwrap() {
            roots.add(cert.unwrap()).unwrap();
        }
        let verifier =
            WebPkiClientVerifier::builder_with_provider(Arc::new(roots), Arc::clone(&provider))
                .build()
                .unwrap();

        let chain = CertificateDer::pem_file_iter(fixture("server.pem"))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        let key = PrivateKeyDer::from_pem_file(fixture("server-key.pem")).unwrap();

        let tls12 = [&rustls::version::TLS12];
        let versions: &[&'static SupportedProtocolVersion] = if self.tls12_only {
            &tls12
        } else {
            rustls::DEFAULT_VERSIONS
        };

        let mut config = ServerConfig::builder_with_provider(provider)
            .with_protocol_versions(versions)
            .unwrap()
            .with_client_cert_verifier(verifier)
            .with_single_cert(chain, key)
            .unwrap();
        config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
        config
    }
}

fn header(req: &Request<Incoming>, name: http::header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// A port nothing listens on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}
