//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check recognizer order against the registered recognizer names
//! - Validate value ranges (intervals > 0, addresses parse)
//! - Detect conflicting listeners
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::classify::recognizers::{recognizer_names, FALLBACK_NAME};
use crate::config::schema::{AppConfig, CatalogSourceConfig, Transport};

/// Longest accepted periodic refresh interval (30 days).
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 30 * 24 * 60 * 60;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no listeners configured")]
    NoListeners,

    #[error("listener address '{0}' is not a valid socket address")]
    InvalidAddress(String),

    #[error("listener address '{0}' is configured more than once")]
    DuplicateAddress(String),

    #[error("encrypted listener '{0}' needs a tls table with at least one allowed host")]
    MissingTls(String),

    #[error("unknown recognizer '{0}' in classifier order")]
    UnknownRecognizer(String),

    #[error("recognizer '{0}' appears more than once in classifier order")]
    DuplicateRecognizer(String),

    #[error("the fallback recognizer '{0}' is always last and must not be listed")]
    FallbackListed(String),

    #[error("catalog url '{0}' must be an absolute http(s) url")]
    InvalidCatalogUrl(String),

    #[error("base_url '{0}' must be an absolute http(s) url")]
    InvalidBaseUrl(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{field} must not exceed {max}")]
    TooLarge { field: &'static str, max: u64 },
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_listeners(config, &mut errors);
    validate_classifier(config, &mut errors);

    if let CatalogSourceConfig::Url(raw) = &config.catalog.source {
        if !is_http_url(raw) {
            errors.push(ValidationError::InvalidCatalogUrl(raw.clone()));
        }
    }
    if !is_http_url(&config.base_url) {
        errors.push(ValidationError::InvalidBaseUrl(config.base_url.clone()));
    }

    if config.catalog.refresh_interval_secs == 0 {
        errors.push(ValidationError::Zero("catalog.refresh_interval_secs"));
    } else if config.catalog.refresh_interval_secs > MAX_REFRESH_INTERVAL_SECS {
        errors.push(ValidationError::TooLarge {
            field: "catalog.refresh_interval_secs",
            max: MAX_REFRESH_INTERVAL_SECS,
        });
    }
    if config.catalog.retry_base_ms == 0 {
        errors.push(ValidationError::Zero("catalog.retry_base_ms"));
    }
    if config.catalog.retry_max_ms == 0 {
        errors.push(ValidationError::Zero("catalog.retry_max_ms"));
    }
    if config.shutdown.grace_secs == 0 {
        errors.push(ValidationError::Zero("shutdown.grace_secs"));
    }
    if config.limits.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("limits.request_timeout_secs"));
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_body_bytes"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_listeners(config: &AppConfig, errors: &mut Vec<ValidationError>) {
    if config.listeners.is_empty() {
        errors.push(ValidationError::NoListeners);
        return;
    }

    let mut seen = HashSet::new();
    for listener in &config.listeners {
        if listener.address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress(listener.address.clone()));
        } else if !seen.insert(listener.address.as_str()) {
            errors.push(ValidationError::DuplicateAddress(listener.address.clone()));
        }

        if listener.transport == Transport::Encrypted {
            let has_hosts = listener
                .tls
                .as_ref()
                .map(|tls| !tls.allowed_hosts.is_empty())
                .unwrap_or(false);
            if !has_hosts {
                errors.push(ValidationError::MissingTls(listener.address.clone()));
            }
        }
    }
}

fn validate_classifier(config: &AppConfig, errors: &mut Vec<ValidationError>) {
    let known = recognizer_names();
    let mut seen = HashSet::new();

    for name in &config.classifier.order {
        if name == FALLBACK_NAME {
            errors.push(ValidationError::FallbackListed(name.clone()));
        } else if !known.contains(&name.as_str()) {
            errors.push(ValidationError::UnknownRecognizer(name.clone()));
        } else if !seen.insert(name.as_str()) {
            errors.push(ValidationError::DuplicateRecognizer(name.clone()));
        }
    }
}

fn is_http_url(raw: &str) -> bool {
    match url::Url::parse(raw) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.has_host(),
        Err(_) => false,
    }
}
