//! TCP listener binding.
//!
//! # Responsibilities
//! - Parse and bind the configured address
//! - Report bind failures with the offending address
//! - Hand a non-blocking std listener to axum-server

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{ListenerConfig, Transport};
use crate::net::tls::TlsError;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {transport} listener on {address}: {source}")]
    Bind {
        transport: Transport,
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to prepare TLS for an encrypted listener.
    #[error("failed to configure TLS for {address}: {source}")]
    Tls {
        address: String,
        #[source]
        source: TlsError,
    },
}

/// Bind the configured address.
pub async fn bind(config: &ListenerConfig) -> Result<(std::net::TcpListener, SocketAddr), ListenerError> {
    let bind_error = |source| ListenerError::Bind {
        transport: config.transport,
        address: config.address.clone(),
        source,
    };

    let addr: SocketAddr = config
        .address
        .parse()
        .map_err(|e| bind_error(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;

    let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
    let local_addr = listener.local_addr().map_err(bind_error)?;

    tracing::info!(
        transport = %config.transport,
        address = %local_addr,
        "Listener bound"
    );

    // into_std keeps the socket in non-blocking mode.
    let std_listener = listener.into_std().map_err(bind_error)?;
    Ok((std_listener, local_addr))
}
