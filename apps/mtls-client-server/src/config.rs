//! Layered application configuration.
//!
//! Sources are merged in this order, later ones winning:
//! 1. built-in defaults
//! 2. YAML file passed with `--config`
//! 3. environment variables prefixed with `APP__` (`APP__CLIENT__URL=...`)
//! 4. command-line overrides

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use figment::value::{Uncased, UncasedStr};
use mtls_utils::SecretString;
use serde::{Deserialize, Serialize};

/// Multi-word keys, used to restore their case after environment variables
/// have been read.
const CAMEL_CASE_KEYS: &[&str] = &[
    "bindAddr",
    "keyStore",
    "keyStorePassword",
    "trustStore",
    "trustStorePassword",
    "resourcesDir",
    "requestTimeout",
    "connectTimeout",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub client: ClientSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `mtls_http=debug,info`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
        }
    }
}

/// Upstream server and certificate material used by the `/client` routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ClientSettings {
    /// Base URL of the upstream server
    pub url: String,
    /// Resource name of the client identity bundle
    pub key_store: String,
    pub key_store_password: SecretString,
    /// Resource name of the trusted-peer bundle
    pub trust_store: String,
    pub trust_store_password: SecretString,
    /// Directory resource names are resolved against
    pub resources_dir: PathBuf,
    #[serde(with = "mtls_utils::humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "mtls_utils::humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            url: "https://localhost:8443".to_owned(),
            key_store: "client-keystore.p12".to_owned(),
            key_store_password: SecretString::default(),
            trust_store: "client-truststore.p12".to_owned(),
            trust_store_password: SecretString::default(),
            resources_dir: PathBuf::from("resources"),
            request_timeout: mtls_http::DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: mtls_http::DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// Loads defaults, then the optional YAML file, then `APP__*` variables.
    ///
    /// # Errors
    /// Returns an error if a source cannot be parsed, carries unknown keys,
    /// or the result fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        Self::extract(figment.merge(app_env()))
    }

    /// Extracts and validates a config from an assembled figment.
    ///
    /// Defaults come from the serde `default` attributes, so secrets never
    /// pass through their redacting serializer.
    ///
    /// # Errors
    /// Returns an error if extraction or validation fails.
    pub fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment
            .extract()
            .context("failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_cli_overrides(&mut self, port: Option<u16>) {
        if let Some(port) = port {
            self.server.bind_addr.set_port(port);
        }
    }

    /// Effective configuration as YAML, with passphrases redacted.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(self).context("failed to serialize configuration")
    }

    fn validate(&self) -> Result<()> {
        let client = &self.client;
        for (key, value) in [
            ("client.url", &client.url),
            ("client.keyStore", &client.key_store),
            ("client.trustStore", &client.trust_store),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{key} must not be empty");
            }
        }
        if client.request_timeout.is_zero() {
            anyhow::bail!("client.requestTimeout must be greater than zero");
        }
        Ok(())
    }
}

/// `APP__SECTION__KEY` variables, split on `__`.
///
/// Keys keep their case through the provider and are matched against the
/// known camelCase names here; everything else is lowercased.
fn app_env() -> Env {
    Env::prefixed("APP__")
        .split("__")
        .map(restore_key_case)
        .lowercase(false)
}

fn restore_key_case(key: &UncasedStr) -> Uncased<'_> {
    let restored = key
        .as_str()
        .split('.')
        .map(|segment| {
            CAMEL_CASE_KEYS
                .iter()
                .find(|known| known.eq_ignore_ascii_case(segment))
                .map_or_else(|| segment.to_ascii_lowercase(), |known| (*known).to_owned())
        })
        .collect::<Vec<_>>()
        .join(".");
    Uncased::from(restored)
}
