//! Listener startup and bounded, concurrent drain.
//!
//! # Responsibilities
//! - Bind every configured listener and serve it with axum-server
//! - Skip optional listeners that fail to start; abort on required ones
//! - On shutdown, stop accepting everywhere at once and give each listener
//!   its own grace window before in-flight connections are force-closed

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use futures_util::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::{ListenerConfig, Transport};
use crate::net::{self, ListenerError, OnDemandCertResolver};
use crate::observability::metrics;

/// Extra time allowed after the grace window for force-closed connections
/// to be torn down.
const FORCE_CLOSE_SLACK: Duration = Duration::from_secs(2);

/// Routers served by the listeners, by transport family.
#[derive(Clone)]
pub struct Routers {
    /// Served on plain and encrypted listeners.
    pub public: Router,
    /// Served on management listeners.
    pub management: Router,
}

/// Serializable summary of a running listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerInfo {
    pub transport: Transport,
    pub address: SocketAddr,
}

/// A listener that is bound and serving.
pub struct ListenerDescriptor {
    pub transport: Transport,
    pub address: SocketAddr,
    handle: Handle,
    task: JoinHandle<std::io::Result<()>>,
}

impl ListenerDescriptor {
    pub fn info(&self) -> ListenerInfo {
        ListenerInfo {
            transport: self.transport,
            address: self.address,
        }
    }
}

/// A listener that still had open connections when its grace window ended.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{transport} listener {address} did not drain within {grace:?}; {open} connection(s) force-closed")]
pub struct ShutdownTimeout {
    pub transport: Transport,
    pub address: SocketAddr,
    pub grace: Duration,
    pub open: usize,
}

/// Outcome of draining every listener.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub drained: Vec<SocketAddr>,
    pub forced: Vec<ShutdownTimeout>,
}

/// One or more listeners missed their grace window.
#[derive(Debug, Error)]
#[error("{} listener(s) force-closed after the grace period", .0.len())]
pub struct ForcedClose(pub Vec<ShutdownTimeout>);

impl ShutdownReport {
    pub fn into_result(self) -> Result<Vec<SocketAddr>, ForcedClose> {
        if self.forced.is_empty() {
            Ok(self.drained)
        } else {
            Err(ForcedClose(self.forced))
        }
    }
}

/// Every listener started for one service instance.
pub struct ListenerSet {
    listeners: Vec<ListenerDescriptor>,
}

impl ListenerSet {
    /// Bind and serve each configured listener.
    ///
    /// A failing listener aborts startup only when it is `required`; the
    /// listeners already started are stopped before the error is returned.
    pub async fn start(
        configs: &[ListenerConfig],
        routers: &Routers,
        db_path: &Path,
    ) -> Result<Self, ListenerError> {
        let mut listeners = Vec::with_capacity(configs.len());

        for config in configs {
            match Self::start_one(config, routers, db_path).await {
                Ok(descriptor) => listeners.push(descriptor),
                Err(e) if config.required => {
                    tracing::error!(error = %e, "Required listener failed to start");
                    for started in &listeners {
                        started.handle.shutdown();
                    }
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Optional listener failed to start, skipping");
                }
            }
        }

        Ok(Self { listeners })
    }

    async fn start_one(
        config: &ListenerConfig,
        routers: &Routers,
        db_path: &Path,
    ) -> Result<ListenerDescriptor, ListenerError> {
        let router = match config.transport {
            Transport::Management => routers.management.clone(),
            Transport::Plain | Transport::Encrypted => routers.public.clone(),
        };

        // Prepare TLS before binding so a bad TLS setup leaves no open socket.
        let tls = match (&config.transport, &config.tls) {
            (Transport::Encrypted, Some(tls)) => {
                let cache_dir = tls
                    .cache_dir
                    .clone()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| db_path.join("certs"));
                let resolver = OnDemandCertResolver::new(&tls.allowed_hosts, cache_dir);
                let rustls = net::server_config(resolver).map_err(|source| ListenerError::Tls {
                    address: config.address.clone(),
                    source,
                })?;
                tracing::info!(
                    address = %config.address,
                    allowed_hosts = ?tls.allowed_hosts,
                    "TLS configured"
                );
                Some(rustls)
            }
            (Transport::Encrypted, None) => {
                return Err(ListenerError::Tls {
                    address: config.address.clone(),
                    source: net::TlsError::NoCertificate("no tls table configured".into()),
                });
            }
            _ => None,
        };

        let (std_listener, address) = net::bind(config).await?;
        let handle = Handle::new();
        let app = router.into_make_service();

        let task = match tls {
            Some(rustls) => tokio::spawn(
                axum_server::tls_rustls::from_tcp_rustls(std_listener, rustls)
                    .handle(handle.clone())
                    .serve(app),
            ),
            None => tokio::spawn(
                axum_server::from_tcp(std_listener)
                    .handle(handle.clone())
                    .serve(app),
            ),
        };

        tracing::info!(transport = %config.transport, address = %address, "Listener serving");

        Ok(ListenerDescriptor {
            transport: config.transport,
            address,
            handle,
            task,
        })
    }

    pub fn descriptors(&self) -> &[ListenerDescriptor] {
        &self.listeners
    }

    pub fn infos(&self) -> Vec<ListenerInfo> {
        self.listeners.iter().map(ListenerDescriptor::info).collect()
    }

    /// Address of the first listener with the given transport.
    pub fn address_of(&self, transport: Transport) -> Option<SocketAddr> {
        self.listeners
            .iter()
            .find(|l| l.transport == transport)
            .map(|l| l.address)
    }

    /// Drain every listener concurrently, each bounded by `grace`.
    pub async fn shutdown(self, grace: Duration) -> ShutdownReport {
        tracing::info!(listeners = self.listeners.len(), grace = ?grace, "Draining listeners");

        let outcomes = join_all(self.listeners.into_iter().map(|l| drain(l, grace))).await;

        let mut report = ShutdownReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(address) => report.drained.push(address),
                Err(timeout) => report.forced.push(timeout),
            }
        }
        report
    }
}

async fn drain(listener: ListenerDescriptor, grace: Duration) -> Result<SocketAddr, ShutdownTimeout> {
    let ListenerDescriptor {
        transport,
        address,
        handle,
        mut task,
    } = listener;

    // Stop accepting and let in-flight requests finish; the deadline below
    // is enforced here rather than by axum-server.
    handle.graceful_shutdown(None);

    tokio::select! {
        result = &mut task => {
            log_stopped(transport, address, result);
            Ok(address)
        }
        _ = tokio::time::sleep(grace) => {
            let open = handle.connection_count();
            tracing::warn!(
                transport = %transport,
                address = %address,
                open,
                "Grace period elapsed, forcing connections closed"
            );
            metrics::record_forced_close(transport.to_string());
            handle.shutdown();

            match tokio::time::timeout(FORCE_CLOSE_SLACK, &mut task).await {
                Ok(result) => log_stopped(transport, address, result),
                Err(_) => {
                    tracing::error!(transport = %transport, address = %address, "Listener task did not stop, aborting");
                    task.abort();
                }
            }

            Err(ShutdownTimeout { transport, address, grace, open })
        }
    }
}

fn log_stopped(
    transport: Transport,
    address: SocketAddr,
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) {
    match result {
        Ok(Ok(())) => tracing::info!(transport = %transport, address = %address, "Listener stopped"),
        Ok(Err(e)) => tracing::error!(transport = %transport, address = %address, error = %e, "Listener failed"),
        Err(e) => tracing::error!(transport = %transport, address = %address, error = %e, "Listener task panicked"),
    }
}
