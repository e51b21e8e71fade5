//! Startup orchestration and ordered teardown.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order: stores, fetchers, listeners
//! - Record every acquired resource in a [`ResourceLedger`]
//! - Release them in strict reverse order whether startup succeeded or not
//!
//! # Design Decisions
//! - Fail fast: a failure while acquiring is fatal and unwinds what was acquired
//! - Listeners start last (traffic only when ready)
//! - Release failures are logged and never stop the remaining releases

use std::error::Error as StdError;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use notify::RecommendedWatcher;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::admin::{self, AdminState};
use crate::catalog::{
    source_from_config, HotSwapController, InstallEvent, RefreshSchedule, SourceWatcher,
};
use crate::classify::recognizers::chain_from_order;
use crate::classify::{ChainError, Dispatcher};
use crate::config::{AppConfig, CatalogSourceConfig};
use crate::http::{self, AppState};
use crate::lifecycle::listeners::{ListenerSet, Routers};
use crate::lifecycle::shutdown::Shutdown;
use crate::net::ListenerError;
use crate::observability::metrics;
use crate::store::{AppraisalStore, LookupCache, StoreError};

/// How long the refresher gets to notice shutdown before it is aborted.
const REFRESHER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Error surfaced by a failing release.
pub type ReleaseError = Box<dyn StdError + Send + Sync>;

/// A resource that needs explicit, asynchronous cleanup.
#[async_trait]
pub trait Release: Send {
    async fn release(self: Box<Self>) -> Result<(), ReleaseError>;
}

/// A release that failed; recorded and logged, never fatal.
#[derive(Debug)]
pub struct ReleaseFailure {
    pub name: String,
    pub error: ReleaseError,
}

/// Acquired resources, released in reverse acquisition order.
#[derive(Default)]
pub struct ResourceLedger {
    entries: Vec<(String, Box<dyn Release>)>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self, name: impl Into<String>, resource: impl Release + 'static) {
        let name = name.into();
        tracing::debug!(resource = %name, "Resource acquired");
        self.entries.push((name, Box::new(resource)));
    }

    /// Names in acquisition order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release everything, newest first.
    pub async fn release_all(self) -> Vec<ReleaseFailure> {
        let mut failures = Vec::new();
        for (name, resource) in self.entries.into_iter().rev() {
            match resource.release().await {
                Ok(()) => tracing::info!(resource = %name, "Resource released"),
                Err(error) => {
                    tracing::error!(resource = %name, error = %error, "Resource release failed");
                    failures.push(ReleaseFailure { name, error });
                }
            }
        }
        failures
    }
}

#[async_trait]
impl Release for AppraisalStore {
    async fn release(self: Box<Self>) -> Result<(), ReleaseError> {
        self.flush()?;
        Ok(())
    }
}

#[async_trait]
impl Release for LookupCache {
    async fn release(self: Box<Self>) -> Result<(), ReleaseError> {
        self.flush()?;
        Ok(())
    }
}

#[async_trait]
impl Release for RecommendedWatcher {
    async fn release(self: Box<Self>) -> Result<(), ReleaseError> {
        drop(self);
        Ok(())
    }
}

/// The background catalog refresher.
pub struct RefresherTask {
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

#[async_trait]
impl Release for RefresherTask {
    async fn release(self: Box<Self>) -> Result<(), ReleaseError> {
        let RefresherTask { shutdown, mut task } = *self;
        shutdown.trigger();
        match tokio::time::timeout(REFRESHER_STOP_TIMEOUT, &mut task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                task.abort();
                Err("catalog refresher did not stop in time, aborted".into())
            }
        }
    }
}

/// Listeners plus the grace they get when released.
pub struct DrainingListeners {
    set: ListenerSet,
    grace: Duration,
}

#[async_trait]
impl Release for DrainingListeners {
    async fn release(self: Box<Self>) -> Result<(), ReleaseError> {
        let DrainingListeners { set, grace } = *self;
        set.shutdown(grace).await.into_result()?;
        Ok(())
    }
}

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("listener failed: {0}")]
    Listener(#[from] ListenerError),

    #[error("invalid recognizer chain: {0}")]
    Chain(#[from] ChainError),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// Run the service until `terminate` resolves, then tear everything down.
///
/// Resources are released in reverse order on both the normal and the
/// error path; the startup error, if any, is returned after teardown.
pub async fn run_service<F>(config: AppConfig, terminate: F) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send,
{
    let mut ledger = ResourceLedger::new();
    let outcome = start_and_wait(&config, &mut ledger, terminate).await;

    if let Err(e) = &outcome {
        tracing::error!(error = %e, "Startup failed, releasing acquired resources");
    }

    let failures = ledger.release_all().await;
    if failures.is_empty() {
        tracing::info!("Shutdown complete");
    } else {
        tracing::warn!(failures = failures.len(), "Shutdown complete with release failures");
    }
    outcome
}

async fn start_and_wait<F>(
    config: &AppConfig,
    ledger: &mut ResourceLedger,
    terminate: F,
) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send,
{
    // 1. Stores
    let appraisals = AppraisalStore::open(&config.db_file("appraisals.json"))?;
    ledger.acquire("appraisal store", appraisals.clone());
    let lookups = LookupCache::open(&config.db_file("httpcache.json"))?;
    ledger.acquire("lookup cache", lookups.clone());

    // 2. Catalog and classifier
    let catalog = Arc::new(HotSwapController::new());
    catalog.on_installed(|event: &InstallEvent| {
        metrics::record_catalog_installed(event.current, event.items);
    });

    let source = source_from_config(&config.catalog.source, lookups);
    if let Err(e) = catalog.refresh(source.as_ref()).await {
        tracing::warn!(error = %e, "Initial catalog load failed, serving generation 0 until a refresh succeeds");
    }

    let chain = chain_from_order(config.classifier.order.as_slice())?;
    let dispatcher = Dispatcher::new(chain, catalog.clone());
    tracing::info!(
        recognizers = ?dispatcher.recognizer_names(),
        generation = catalog.generation(),
        "Classifier ready"
    );

    // 3. Fetchers
    let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();

    if let (CatalogSourceConfig::File(path), true) = (&config.catalog.source, config.catalog.watch) {
        match SourceWatcher::new(&PathBuf::from(path), trigger_tx.clone()).run() {
            Ok(watcher) => ledger.acquire("catalog watcher", watcher),
            Err(e) => tracing::warn!(path = %path, error = %e, "Catalog watcher unavailable"),
        }
    }

    let refresher_shutdown = Shutdown::new();
    let schedule = RefreshSchedule {
        interval: Duration::from_secs(config.catalog.refresh_interval_secs),
        retry_base_ms: config.catalog.retry_base_ms,
        retry_max_ms: config.catalog.retry_max_ms,
    };
    let task = tokio::spawn(catalog.clone().run(
        source,
        schedule,
        trigger_rx,
        refresher_shutdown.subscribe(),
    ));
    ledger.acquire(
        "catalog refresher",
        RefresherTask {
            shutdown: refresher_shutdown,
            task,
        },
    );

    // 4. Listeners
    let listener_infos = Arc::new(OnceLock::new());
    let routers = Routers {
        public: http::build_public_router(
            AppState::new(dispatcher, appraisals, config.trimmed_base_url()),
            &config.limits,
        ),
        management: admin::build_admin_router(AdminState {
            catalog: catalog.clone(),
            triggers: trigger_tx,
            listeners: listener_infos.clone(),
            api_key: config.admin.api_key.clone(),
        }),
    };

    let set = ListenerSet::start(&config.listeners, &routers, &PathBuf::from(&config.db_path)).await?;
    let _ = listener_infos.set(set.infos());
    ledger.acquire(
        "listeners",
        DrainingListeners {
            set,
            grace: Duration::from_secs(config.shutdown.grace_secs),
        },
    );

    if !config.observability.metrics_address.is_empty() {
        let addr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr);
    }

    tracing::info!(resources = ?ledger.names(), "Service started");

    terminate.await;
    tracing::info!("Beginning graceful shutdown");
    Ok(())
}
