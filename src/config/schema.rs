//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the appraisal
//! service. All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the appraisal service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the persistent stores and the certificate cache.
    pub db_path: String,

    /// Public base URL used when building appraisal links.
    pub base_url: String,

    /// Reference catalog source and refresh settings.
    pub catalog: CatalogConfig,

    /// Recognizer registration order.
    pub classifier: ClassifierConfig,

    /// Network listeners (plain, encrypted, management).
    pub listeners: Vec<ListenerConfig>,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Request limits.
    pub limits: LimitsConfig,

    /// Management API settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "data".to_string(),
            base_url: "http://localhost:8080".to_string(),
            catalog: CatalogConfig::default(),
            classifier: ClassifierConfig::default(),
            listeners: vec![
                ListenerConfig {
                    transport: Transport::Plain,
                    address: "0.0.0.0:8080".to_string(),
                    required: true,
                    tls: None,
                },
                ListenerConfig {
                    transport: Transport::Management,
                    address: "127.0.0.1:8090".to_string(),
                    required: false,
                    tls: None,
                },
            ],
            shutdown: ShutdownConfig::default(),
            limits: LimitsConfig::default(),
            admin: AdminConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Base URL without a trailing slash.
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Path of a named entry below `db_path`.
    pub fn db_file(&self, name: &str) -> PathBuf {
        PathBuf::from(&self.db_path).join(name)
    }
}

/// Where reference catalog data comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSourceConfig {
    /// A JSON array of items on local disk.
    File(String),
    /// A JSON array of items served over HTTP(S).
    Url(String),
}

/// Reference catalog configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog supplier.
    pub source: CatalogSourceConfig,

    /// Periodic refresh interval in seconds.
    pub refresh_interval_secs: u64,

    /// Base delay before retrying a failed build, in milliseconds.
    pub retry_base_ms: u64,

    /// Maximum retry delay, in milliseconds.
    pub retry_max_ms: u64,

    /// Trigger a refresh when a file source changes on disk.
    pub watch: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            source: CatalogSourceConfig::File("data/catalog.json".to_string()),
            refresh_interval_secs: 6 * 60 * 60,
            retry_base_ms: 1_000,
            retry_max_ms: 60_000,
            watch: true,
        }
    }
}

/// Classifier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Recognizer names, strictest first. The fallback is always last and
    /// is not listed here.
    pub order: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            order: crate::classify::recognizers::STANDARD_ORDER
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

/// Listener transport mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Plain HTTP serving the public API.
    Plain,
    /// HTTPS serving the public API.
    Encrypted,
    /// Plain HTTP serving the management API.
    Management,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Plain => write!(f, "plain"),
            Transport::Encrypted => write!(f, "encrypted"),
            Transport::Management => write!(f, "management"),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerConfig {
    /// Transport mode.
    pub transport: Transport,

    /// Bind address (e.g., "0.0.0.0:8080").
    pub address: String,

    /// A required listener that fails to bind aborts startup.
    #[serde(default)]
    pub required: bool,

    /// TLS settings, mandatory for encrypted listeners.
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// TLS configuration for encrypted listeners.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Host names certificates may be served for.
    pub allowed_hosts: Vec<String>,

    /// Certificate cache directory. Defaults to `<db_path>/certs`.
    #[serde(default)]
    pub cache_dir: Option<String>,
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Per-listener drain window in seconds.
    pub grace_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_secs: 5 }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum accepted body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

/// Management API configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer token required by the management API. Empty disables auth.
    pub api_key: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format: "pretty" or "compact".
    pub log_format: String,

    /// Prometheus exporter bind address. Empty disables the exporter.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "compact".to_string(),
            metrics_address: String::new(),
        }
    }
}
